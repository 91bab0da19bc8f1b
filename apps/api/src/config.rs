use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::tailoring::pipeline::PipelineSettings;
use crate::tailoring::selector::{SelectionOptions, DEFAULT_TOP_SKILLS};
use crate::tailoring::stage::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub pipeline_max_attempts: u32,
    pub pipeline_retry_delay_ms: u64,
    pub llm_timeout_secs: u64,
    pub pipeline_parallel_stages: bool,
    pub top_skills_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            pipeline_max_attempts: parse_env("PIPELINE_MAX_ATTEMPTS", 3)?,
            pipeline_retry_delay_ms: parse_env("PIPELINE_RETRY_DELAY_MS", 1000)?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 90)?,
            pipeline_parallel_stages: parse_env("PIPELINE_PARALLEL_STAGES", true)?,
            top_skills_limit: parse_env("TOP_SKILLS_LIMIT", DEFAULT_TOP_SKILLS)?,
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            retry: RetryPolicy {
                max_attempts: self.pipeline_max_attempts,
                retry_delay: Duration::from_millis(self.pipeline_retry_delay_ms),
                call_timeout: Duration::from_secs(self.llm_timeout_secs),
            },
            parallel_stages: self.pipeline_parallel_stages,
            top_skills_limit: self.top_skills_limit,
            selection: SelectionOptions::default(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
