//! Tailoring Pipeline: orchestrates the four tailoring stages.
//!
//! Flow: extract keywords ┐
//!       score résumé     ┴→ select + filter → optimize wording → tailored YAML
//!
//! Stages 1–3 are all-or-nothing: any failure returns the original document
//! with `success = false`. Stage 4 degrades instead: on failure the filtered,
//! unoptimized document is returned and the run still counts as a success.

use std::future::Future;
use std::time::Instant;

use serde::Serialize;
use serde_yaml::Value;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::llm_client::prompts::{FIDELITY_INSTRUCTION, JSON_ONLY_INSTRUCTION, YAML_ONLY_INSTRUCTION};
use crate::llm_client::{strip_code_fences, ChatMessage, Completion};
use crate::tailoring::filter::build_filtered_document;
use crate::tailoring::keywords::{extract_keywords, JobKeywords};
use crate::tailoring::prompts::{
    OPTIMIZE_PROMPT_TEMPLATE, OPTIMIZE_SYSTEM, SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM,
};
use crate::tailoring::scores::{materialize, parse_scores};
use crate::tailoring::selector::{
    select, top_skills, SelectionMetrics, SelectionOptions, DEFAULT_TOP_SKILLS,
};
use crate::tailoring::stage::{
    complete_with_retry, validate_yaml_document, RetryPolicy, Stage, StageError,
};

const SCORING_TEMPERATURE: f32 = 0.1;
const OPTIMIZE_TEMPERATURE: f32 = 0.4;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub retry: RetryPolicy,
    /// Run keyword extraction and scoring concurrently.
    pub parallel_stages: bool,
    pub top_skills_limit: usize,
    pub selection: SelectionOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            parallel_stages: true,
            top_skills_limit: DEFAULT_TOP_SKILLS,
            selection: SelectionOptions::default(),
        }
    }
}

/// Milliseconds spent in each stage. A stage that never finished is `None`.
/// `total_ms` is wall-clock, so with parallel stages it is less than the sum.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub keyword_extraction_ms: Option<u64>,
    pub scoring_ms: Option<u64>,
    pub selection_ms: Option<u64>,
    pub optimization_ms: Option<u64>,
    pub total_ms: u64,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct TailoringResult {
    pub run_id: Uuid,
    pub success: bool,
    /// Tailored document on success, the untouched input on failure.
    pub tailored_yaml: String,
    /// False when wording optimization failed and the filtered document was kept.
    pub optimized: bool,
    pub timings: Option<StageTimings>,
    pub selection_metrics: Option<SelectionMetrics>,
    pub error: Option<String>,
}

/// Output of Stage 3.
struct SelectionStage {
    filtered_yaml: String,
    metrics: SelectionMetrics,
}

struct Tailored {
    yaml: String,
    optimized: bool,
    metrics: SelectionMetrics,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the four-stage pipeline for one job application. Never fails: errors
/// are reported in the result alongside the original document.
pub async fn run_tailoring_pipeline(
    llm: &dyn Completion,
    settings: &PipelineSettings,
    resume_yaml: &str,
    job_description: &str,
) -> TailoringResult {
    let run_id = Uuid::new_v4();
    let span = info_span!("tailoring_pipeline", %run_id);

    async move {
        let started = Instant::now();
        let mut timings = StageTimings::default();
        let outcome = run_stages(llm, settings, resume_yaml, job_description, &mut timings).await;
        timings.total_ms = elapsed_ms(started);

        match outcome {
            Ok(tailored) => {
                info!(
                    "Pipeline finished in {}ms (optimized: {})",
                    timings.total_ms, tailored.optimized
                );
                TailoringResult {
                    run_id,
                    success: true,
                    tailored_yaml: tailored.yaml,
                    optimized: tailored.optimized,
                    timings: Some(timings),
                    selection_metrics: Some(tailored.metrics),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Pipeline aborted after {}ms: {}", timings.total_ms, e);
                TailoringResult {
                    run_id,
                    success: false,
                    tailored_yaml: resume_yaml.to_string(),
                    optimized: false,
                    timings: Some(timings),
                    selection_metrics: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
    .instrument(span)
    .await
}

async fn run_stages(
    llm: &dyn Completion,
    settings: &PipelineSettings,
    resume_yaml: &str,
    job_description: &str,
    timings: &mut StageTimings,
) -> Result<Tailored, StageError> {
    let document = parse_document(resume_yaml)?;

    // Stages 1 and 2 are independent of each other.
    let keyword_stage = timed(extract_keywords(llm, &settings.retry, job_description));
    let scoring_stage = timed(score_resume(
        llm,
        &settings.retry,
        job_description,
        resume_yaml,
    ));
    let ((keywords, keyword_ms), (raw_scores, scoring_ms)) = if settings.parallel_stages {
        tokio::try_join!(keyword_stage, scoring_stage)?
    } else {
        let keywords = keyword_stage.await?;
        (keywords, scoring_stage.await?)
    };
    timings.keyword_extraction_ms = Some(keyword_ms);
    timings.scoring_ms = Some(scoring_ms);
    info!(
        "Extracted {} keywords in {}ms, scored resume in {}ms",
        keywords.total(),
        keyword_ms,
        scoring_ms
    );

    let started = Instant::now();
    let selection = select_and_filter(&raw_scores, &document, settings)?;
    timings.selection_ms = Some(elapsed_ms(started));

    let started = Instant::now();
    let optimized = optimize_wording(
        llm,
        &settings.retry,
        job_description,
        &selection.filtered_yaml,
        &keywords,
    )
    .await;
    timings.optimization_ms = Some(elapsed_ms(started));

    let (yaml, optimized) = match optimized {
        Ok(yaml) => (yaml, true),
        Err(e) => {
            warn!("Wording optimization failed, keeping filtered resume: {}", e);
            (selection.filtered_yaml, false)
        }
    };

    Ok(Tailored {
        yaml,
        optimized,
        metrics: selection.metrics,
    })
}

fn parse_document(resume_yaml: &str) -> Result<Value, StageError> {
    let document: Value = serde_yaml::from_str(resume_yaml)
        .map_err(|e| StageError::InvalidDocument(e.to_string()))?;
    if !document.is_mapping() {
        return Err(StageError::InvalidDocument(
            "expected a YAML mapping at the top level".to_string(),
        ));
    }
    Ok(document)
}

/// Stage 2: asks the model to score every résumé item. Only checks that the
/// reply is JSON; its shape is validated by Stage 3.
async fn score_resume(
    llm: &dyn Completion,
    policy: &RetryPolicy,
    job_description: &str,
    resume_yaml: &str,
) -> Result<String, StageError> {
    let messages = [
        ChatMessage::system(format!("{SCORING_SYSTEM} {JSON_ONLY_INSTRUCTION}")),
        ChatMessage::user(
            SCORING_PROMPT_TEMPLATE
                .replace("{job_description}", job_description)
                .replace("{resume_yaml}", resume_yaml),
        ),
    ];

    complete_with_retry(
        llm,
        policy,
        Stage::RelevanceScoring,
        &messages,
        SCORING_TEMPERATURE,
        |text| {
            serde_json::from_str::<serde_json::Value>(strip_code_fences(text))
                .map(|_| text.to_string())
                .map_err(|e| format!("scores are not valid JSON: {e}"))
        },
    )
    .await
}

/// Stage 3: parse → materialize → select → filter. No LLM call.
fn select_and_filter(
    raw_scores: &str,
    document: &Value,
    settings: &PipelineSettings,
) -> Result<SelectionStage, StageError> {
    let scores = parse_scores(raw_scores)?;
    let items = materialize(&scores, document);
    let outcome = select(&items, &settings.selection);
    let skills = top_skills(&items, settings.top_skills_limit);

    let filtered = build_filtered_document(document, &outcome.items, &skills);
    let filtered_yaml = serde_yaml::to_string(&filtered)
        .map_err(|e| StageError::InvalidDocument(e.to_string()))?;

    info!(
        "Kept {} items and {} skills",
        outcome.metrics.items_selected,
        skills.len()
    );

    Ok(SelectionStage {
        filtered_yaml,
        metrics: outcome.metrics,
    })
}

/// Stage 4: rephrases the filtered résumé toward the job's terminology.
async fn optimize_wording(
    llm: &dyn Completion,
    policy: &RetryPolicy,
    job_description: &str,
    filtered_yaml: &str,
    keywords: &JobKeywords,
) -> Result<String, StageError> {
    let messages = [
        ChatMessage::system(format!("{OPTIMIZE_SYSTEM} {YAML_ONLY_INSTRUCTION}")),
        ChatMessage::user(
            OPTIMIZE_PROMPT_TEMPLATE
                .replace("{fidelity_instruction}", FIDELITY_INSTRUCTION)
                .replace("{keywords}", &keywords.render())
                .replace("{job_description}", job_description)
                .replace("{resume_yaml}", filtered_yaml),
        ),
    ];

    complete_with_retry(
        llm,
        policy,
        Stage::WordingOptimization,
        &messages,
        OPTIMIZE_TEMPERATURE,
        validate_yaml_document,
    )
    .await
}

async fn timed<T, F>(stage: F) -> Result<(T, u64), StageError>
where
    F: Future<Output = Result<T, StageError>>,
{
    let started = Instant::now();
    let value = stage.await?;
    Ok((value, elapsed_ms(started)))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
