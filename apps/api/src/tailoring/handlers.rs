//! Axum route handlers for the Tailoring API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value;

use crate::errors::AppError;
use crate::state::AppState;
use crate::tailoring::fallback::{tailor_resume, TailoredResume};
use crate::tailoring::filter::build_filtered_document;
use crate::tailoring::scores::{materialize, parse_scores, ScoredItem};
use crate::tailoring::selector::{select, top_skills, SelectionMetrics, SelectionOptions};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    pub resume_yaml: String,
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub resume_yaml: String,
    /// Score document as returned by the model: raw text or an inline JSON object.
    pub scores: JsonValue,
    #[serde(default)]
    pub options: SelectionOptions,
    pub top_skills: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub items: Vec<ScoredItem>,
    pub skills: Vec<ScoredItem>,
    pub metrics: SelectionMetrics,
    pub filtered_yaml: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/tailor
///
/// Runs the fallback chain: pipeline → single-prompt rewrite → original.
/// Always answers 200 with a usable résumé once the inputs are non-empty.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<TailoredResume>, AppError> {
    if request.resume_yaml.trim().is_empty() {
        return Err(AppError::Validation("resume_yaml cannot be empty".to_string()));
    }
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let tailored = tailor_resume(
        state.llm.as_ref(),
        &state.settings,
        &request.resume_yaml,
        &request.job_description,
    )
    .await;

    Ok(Json(tailored))
}

/// POST /api/v1/select
///
/// Runs only the deterministic part of the pipeline over caller-supplied scores.
pub async fn handle_select(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, AppError> {
    let document: Value = serde_yaml::from_str(&request.resume_yaml)
        .map_err(|e| AppError::Validation(format!("resume_yaml is not valid YAML: {e}")))?;
    if !document.is_mapping() {
        return Err(AppError::Validation(
            "resume_yaml must be a YAML mapping".to_string(),
        ));
    }

    let raw_scores = match &request.scores {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    };
    let scores = parse_scores(&raw_scores)?;

    let items = materialize(&scores, &document);
    let outcome = select(&items, &request.options);
    let skills = top_skills(
        &items,
        request.top_skills.unwrap_or(state.settings.top_skills_limit),
    );

    let filtered = build_filtered_document(&document, &outcome.items, &skills);
    let filtered_yaml = serde_yaml::to_string(&filtered)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;

    Ok(Json(SelectResponse {
        items: outcome.items,
        skills,
        metrics: outcome.metrics,
        filtered_yaml,
    }))
}
