// Résumé tailoring: relevance scoring, deterministic selection, and the
// multi-stage pipeline with its fallback chain.
// All LLM calls go through the llm_client::Completion seam.

pub mod fallback;
pub mod filter;
pub mod handlers;
pub mod keywords;
pub mod pipeline;
pub mod prompts;
pub mod scores;
pub mod selector;
pub mod stage;

#[cfg(test)]
pub mod test_support;
