//! Pipeline stages and the bounded-retry wrapper around LLM calls.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_yaml::Value;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::{strip_code_fences, ChatMessage, Completion, LlmError};
use crate::tailoring::scores::ScoreParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    KeywordExtraction,
    RelevanceScoring,
    WordingOptimization,
    SinglePromptRewrite,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::KeywordExtraction => "keyword extraction",
            Stage::RelevanceScoring => "relevance scoring",
            Stage::WordingOptimization => "wording optimization",
            Stage::SinglePromptRewrite => "single-prompt rewrite",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{stage} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        stage: Stage,
        attempts: u32,
        last_error: String,
    },

    #[error("selection failed: {0}")]
    Selection(#[from] ScoreParseError),

    #[error("resume document is not usable: {0}")]
    InvalidDocument(String),
}

/// Retry budget for one LLM-backed stage.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Backoff before attempt `n + 1` is `n × retry_delay`.
    pub retry_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            call_timeout: Duration::from_secs(90),
        }
    }
}

/// Calls the model until `validate` accepts the reply or the attempts run out.
///
/// Transport errors, timeouts, and rejected replies all consume an attempt.
pub async fn complete_with_retry<T, F>(
    llm: &dyn Completion,
    policy: &RetryPolicy,
    stage: Stage,
    messages: &[ChatMessage],
    temperature: f32,
    validate: F,
) -> Result<T, StageError>
where
    F: Fn(&str) -> Result<T, String>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.retry_delay * (attempt - 1)).await;
        }

        let reply = tokio::time::timeout(policy.call_timeout, llm.complete(messages, temperature))
            .await
            .unwrap_or_else(|_| {
                Err(LlmError::Timeout {
                    secs: policy.call_timeout.as_secs(),
                })
            });

        last_error = match reply {
            Ok(text) => match validate(&text) {
                Ok(value) => return Ok(value),
                Err(rejection) => rejection,
            },
            Err(e) => e.to_string(),
        };

        warn!(
            "{} attempt {}/{} failed: {}",
            stage, attempt, attempts, last_error
        );
    }

    Err(StageError::Exhausted {
        stage,
        attempts,
        last_error,
    })
}

/// Accepts a reply only when it is a YAML mapping; returns it without fences.
pub fn validate_yaml_document(text: &str) -> Result<String, String> {
    let body = strip_code_fences(text);
    let document: Value =
        serde_yaml::from_str(body).map_err(|e| format!("reply is not valid YAML: {e}"))?;
    if !document.is_mapping() {
        return Err("reply is not a YAML mapping".to_string());
    }
    Ok(body.to_string())
}
