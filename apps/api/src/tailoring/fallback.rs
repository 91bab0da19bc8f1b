//! Fallback chain: tries tailoring strategies from most to least sophisticated.
//!
//! Order: four-stage pipeline → single-prompt rewrite → original document.
//! Each strategy runs in its own failure boundary; the last one cannot fail,
//! so the caller always receives a usable résumé.

use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::prompts::{FIDELITY_INSTRUCTION, YAML_ONLY_INSTRUCTION};
use crate::llm_client::{ChatMessage, Completion};
use crate::tailoring::pipeline::{run_tailoring_pipeline, PipelineSettings, TailoringResult};
use crate::tailoring::prompts::{SINGLE_PROMPT_SYSTEM, SINGLE_PROMPT_TEMPLATE};
use crate::tailoring::stage::{
    complete_with_retry, validate_yaml_document, RetryPolicy, Stage, StageError,
};

const SINGLE_PROMPT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Pipeline,
    SinglePrompt,
    Original,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyFailure {
    pub strategy: Strategy,
    pub error: String,
}

/// Final answer for one job application.
#[derive(Debug, Clone, Serialize)]
pub struct TailoredResume {
    /// Strategy that produced `tailored_yaml`.
    pub strategy: Strategy,
    pub tailored_yaml: String,
    /// Strategies that were tried and failed, in order.
    pub attempts: Vec<StrategyFailure>,
    /// Report of the pipeline run, which always goes first.
    pub pipeline: TailoringResult,
}

/// Tailors `resume_yaml` to `job_description`, falling back until a strategy
/// succeeds.
pub async fn tailor_resume(
    llm: &dyn Completion,
    settings: &PipelineSettings,
    resume_yaml: &str,
    job_description: &str,
) -> TailoredResume {
    let mut attempts = Vec::new();

    let pipeline = run_tailoring_pipeline(llm, settings, resume_yaml, job_description).await;
    if pipeline.success {
        info!("Tailored resume produced by the pipeline");
        return TailoredResume {
            strategy: Strategy::Pipeline,
            tailored_yaml: pipeline.tailored_yaml.clone(),
            attempts,
            pipeline,
        };
    }
    let error = pipeline
        .error
        .clone()
        .unwrap_or_else(|| "pipeline failed".to_string());
    warn!("Pipeline strategy failed: {}", error);
    attempts.push(StrategyFailure {
        strategy: Strategy::Pipeline,
        error,
    });

    match single_prompt_rewrite(llm, &settings.retry, resume_yaml, job_description).await {
        Ok(tailored_yaml) => {
            info!("Tailored resume produced by the single-prompt rewrite");
            return TailoredResume {
                strategy: Strategy::SinglePrompt,
                tailored_yaml,
                attempts,
                pipeline,
            };
        }
        Err(e) => {
            warn!("Single-prompt strategy failed: {}", e);
            attempts.push(StrategyFailure {
                strategy: Strategy::SinglePrompt,
                error: e.to_string(),
            });
        }
    }

    warn!("Every tailoring strategy failed, returning the original resume");
    TailoredResume {
        strategy: Strategy::Original,
        tailored_yaml: resume_yaml.to_string(),
        attempts,
        pipeline,
    }
}

/// Asks the model to tailor the whole résumé in one call.
async fn single_prompt_rewrite(
    llm: &dyn Completion,
    policy: &RetryPolicy,
    resume_yaml: &str,
    job_description: &str,
) -> Result<String, StageError> {
    let messages = [
        ChatMessage::system(format!("{SINGLE_PROMPT_SYSTEM} {YAML_ONLY_INSTRUCTION}")),
        ChatMessage::user(
            SINGLE_PROMPT_TEMPLATE
                .replace("{fidelity_instruction}", FIDELITY_INSTRUCTION)
                .replace("{job_description}", job_description)
                .replace("{resume_yaml}", resume_yaml),
        ),
    ];

    complete_with_retry(
        llm,
        policy,
        Stage::SinglePromptRewrite,
        &messages,
        SINGLE_PROMPT_TEMPERATURE,
        validate_yaml_document,
    )
    .await
}
