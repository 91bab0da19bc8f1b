//! Scripted `Completion` fake and fixtures shared by the tailoring tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{ChatMessage, Completion, LlmError, Role};
use crate::tailoring::pipeline::PipelineSettings;
use crate::tailoring::selector::SelectionOptions;
use crate::tailoring::stage::RetryPolicy;

enum Reply {
    Text(String),
    Delayed(Duration, String),
    Failure,
}

/// Replies are queued per system-prompt prefix, so concurrent stages each get
/// their own script regardless of call order.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<Vec<(&'static str, VecDeque<Reply>)>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_prompts: Mutex<HashMap<&'static str, String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, system_prefix: &'static str, text: &str) -> Self {
        self.push(system_prefix, Reply::Text(text.to_string()))
    }

    pub fn delayed(self, system_prefix: &'static str, delay: Duration, text: &str) -> Self {
        self.push(system_prefix, Reply::Delayed(delay, text.to_string()))
    }

    pub fn fail(self, system_prefix: &'static str) -> Self {
        self.push(system_prefix, Reply::Failure)
    }

    /// Number of calls made whose system prompt starts with `system_prefix`.
    pub fn calls(&self, system_prefix: &'static str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(system_prefix)
            .copied()
            .unwrap_or(0)
    }

    /// User message of the most recent call matched by `system_prefix`.
    pub fn last_prompt(&self, system_prefix: &'static str) -> Option<String> {
        self.last_prompts.lock().unwrap().get(system_prefix).cloned()
    }

    fn push(self, system_prefix: &'static str, reply: Reply) -> Self {
        {
            let mut replies = self.replies.lock().unwrap();
            match replies.iter_mut().find(|(prefix, _)| *prefix == system_prefix) {
                Some((_, queue)) => queue.push_back(reply),
                None => replies.push((system_prefix, VecDeque::from([reply]))),
            }
        }
        self
    }

    fn next_reply(&self, system: &str, user: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let (prefix, queue) = replies
            .iter_mut()
            .find(|(prefix, _)| system.starts_with(prefix))?;
        *self.calls.lock().unwrap().entry(*prefix).or_insert(0) += 1;
        self.last_prompts
            .lock()
            .unwrap()
            .insert(*prefix, user.to_string());
        queue.pop_front()
    }
}

#[async_trait]
impl Completion for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<String, LlmError> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let user = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        match self.next_reply(system, &user) {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(Reply::Failure) | None => Err(LlmError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        retry_delay: Duration::ZERO,
        call_timeout: Duration::from_secs(5),
    }
}

pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        retry: fast_retry(),
        parallel_stages: true,
        top_skills_limit: 2,
        selection: SelectionOptions {
            min_items: 5,
            ..SelectionOptions::default()
        },
    }
}

pub const RESUME_YAML: &str = r#"basics:
  name: Ada Lovelace
  label: Software Engineer
work:
  - name: Analytical Engines Ltd
    position: Principal Engineer
    startDate: 2019-01
  - name: Difference Co
    position: Support Technician
    startDate: 2015-03
  - name: Babbage Labs
    position: Backend Engineer
    startDate: 2012-06
projects:
  - name: Note G
    description: Bernoulli number generator
  - name: Poetry Engine
    description: Verse composer
education:
  - institution: University of London
    studyType: BSc
    endDate: 2011-06
certificates:
  - name: Certified Kubernetes Administrator
skills:
  - name: Languages
    keywords: [English, French]
  - name: Backend
    keywords: [Rust, Go, Python]
"#;

/// Scores for `RESUME_YAML`. With `test_settings` the selection keeps work 0
/// and 2, project 0, the certificate, the degree, and skills Rust and Python.
pub const SCORES_JSON: &str = r#"{
  "work": [
    {"index": 0, "score": 90, "reasoning": "distributed systems"},
    {"index": 1, "score": 30},
    {"index": 2, "score": 70}
  ],
  "projects": [{"index": 0, "score": 85}, {"index": 1, "score": 20}],
  "education": [{"index": 0, "score": 60}],
  "certificates": [{"index": 0, "score": 45}],
  "skills": [
    {"index": 0, "score": 95, "name": "Rust"},
    {"index": 1, "score": 10, "name": "Go"},
    {"index": 2, "score": 50, "name": "Python"}
  ]
}"#;

pub const KEYWORDS_JSON: &str = r#"{
  "technical_skills": ["Rust", "Kubernetes", "Rust"],
  "soft_skills": ["ownership"],
  "domain_terms": ["distributed systems"],
  "action_verbs": ["architected", "shipped"]
}"#;
