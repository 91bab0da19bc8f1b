//! Keyword Extractor: Stage 1 of the tailoring pipeline.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{strip_code_fences, ChatMessage, Completion};
use crate::tailoring::prompts::{KEYWORD_PROMPT_TEMPLATE, KEYWORD_SYSTEM};
use crate::tailoring::stage::{complete_with_retry, RetryPolicy, Stage, StageError};

const KEYWORD_TEMPERATURE: f32 = 0.1;

/// Vocabulary extracted from a job description. All four keys are required
/// on the wire; a reply missing one is rejected and retried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobKeywords {
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub domain_terms: Vec<String>,
    pub action_verbs: Vec<String>,
}

impl JobKeywords {
    /// Drops repeated entries in each list, keeping first occurrences.
    pub fn deduplicated(self) -> Self {
        Self {
            technical_skills: dedup(self.technical_skills),
            soft_skills: dedup(self.soft_skills),
            domain_terms: dedup(self.domain_terms),
            action_verbs: dedup(self.action_verbs),
        }
    }

    /// Human-readable block for the wording-optimization prompt.
    pub fn render(&self) -> String {
        [
            ("Technical skills", &self.technical_skills),
            ("Soft skills", &self.soft_skills),
            ("Domain terms", &self.domain_terms),
            ("Action verbs", &self.action_verbs),
        ]
        .iter()
        .map(|(label, terms)| {
            if terms.is_empty() {
                format!("{label}: (none)")
            } else {
                format!("{label}: {}", terms.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
    }

    pub fn total(&self) -> usize {
        self.technical_skills.len()
            + self.soft_skills.len()
            + self.domain_terms.len()
            + self.action_verbs.len()
    }
}

fn dedup(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

/// Parses a keyword reply. Fails when any of the four keys is missing.
pub fn parse_keywords(text: &str) -> Result<JobKeywords, String> {
    serde_json::from_str::<JobKeywords>(strip_code_fences(text))
        .map(JobKeywords::deduplicated)
        .map_err(|e| format!("invalid keyword document: {e}"))
}

/// Stage 1: asks the model for the job description's vocabulary.
pub async fn extract_keywords(
    llm: &dyn Completion,
    policy: &RetryPolicy,
    job_description: &str,
) -> Result<JobKeywords, StageError> {
    let messages = [
        ChatMessage::system(format!("{KEYWORD_SYSTEM} {JSON_ONLY_INSTRUCTION}")),
        ChatMessage::user(KEYWORD_PROMPT_TEMPLATE.replace("{job_description}", job_description)),
    ];

    complete_with_retry(
        llm,
        policy,
        Stage::KeywordExtraction,
        &messages,
        KEYWORD_TEMPERATURE,
        parse_keywords,
    )
    .await
}
