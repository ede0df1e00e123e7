//! Runtime configuration, read from the environment with defaults.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plan database location. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    pub llm: LlmConfig,
    pub workflow: WorkflowConfig,
}

impl Config {
    /// Applies `PLANNER_*` environment overrides on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = env_var("PLANNER_DB_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        let llm = &mut config.llm;
        if let Some(model) = env_var("PLANNER_MODEL") {
            llm.model = model;
        }
        if let Some(url) = env_var("PLANNER_BASE_URL") {
            llm.base_url = url;
        }
        if let Some(name) = env_var("PLANNER_API_KEY_ENV") {
            llm.api_key_env = name;
        }
        llm.max_tokens = env_parse("PLANNER_MAX_TOKENS").unwrap_or(llm.max_tokens);
        llm.timeout_ms = env_parse("PLANNER_TIMEOUT_MS").unwrap_or(llm.timeout_ms);

        let workflow = &mut config.workflow;
        workflow.max_regenerations =
            env_parse("PLANNER_MAX_REGENERATIONS").unwrap_or(workflow.max_regenerations);
        workflow.generation_attempts =
            env_parse("PLANNER_GENERATION_ATTEMPTS").unwrap_or(workflow.generation_attempts);
        config
    }
}

/// LLM provider configuration (Anthropic Messages API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 2000,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// The API key, or `None` when the variable is unset or blank.
    pub fn api_key(&self) -> Option<String> {
        env_var(&self.api_key_env)
    }
}

/// Knobs for the plan-generation workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Feedback rounds allowed before the last draft is offered as final.
    pub max_regenerations: u32,
    /// Generation calls per draft before falling back to the template.
    pub generation_attempts: u32,
    /// Upper bound on clarifying questions surfaced to the user.
    pub max_questions: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_regenerations: 3,
            generation_attempts: 2,
            max_questions: 5,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}
