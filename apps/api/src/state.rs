use std::sync::Arc;

use crate::llm_client::Completion;
use crate::tailoring::pipeline::PipelineSettings;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Completion backend. Default: `LlmClient` against the Anthropic API.
    pub llm: Arc<dyn Completion>,
    /// Retry, concurrency, and selection tunables derived from `Config`.
    pub settings: PipelineSettings,
}
