//! Generation capability backed by a completion model.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::collaborators::{
    GeneratedTask, GenerationContext, GenerationError, Sufficiency, TaskGenerator,
};
use super::parse::{parse_judgment, parse_tasks};
use super::prompts::{analysis_prompt, generation_prompt, SYSTEM_PROMPT};
use super::strategy::CategoryStrategy;
use crate::config::{LlmConfig, WorkflowConfig};
use crate::llm::{AnthropicClient, CompletionRequest, LlmClient};

const ANALYSIS_MAX_TOKENS: u32 = 500;
const ANALYSIS_TEMPERATURE: f32 = 0.3;
const GENERATION_TEMPERATURE: f32 = 0.7;

pub struct LlmTaskGenerator {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    max_questions: usize,
}

impl LlmTaskGenerator {
    pub fn new(client: Arc<dyn LlmClient>, max_tokens: u32, max_questions: usize) -> Self {
        Self {
            client,
            max_tokens,
            max_questions,
        }
    }
}

#[async_trait]
impl TaskGenerator for LlmTaskGenerator {
    async fn judge_sufficiency(
        &self,
        context: &GenerationContext,
        strategy: &CategoryStrategy,
    ) -> Result<Sufficiency, GenerationError> {
        let request = CompletionRequest::new(
            analysis_prompt(context, strategy, self.max_questions),
            ANALYSIS_MAX_TOKENS,
            ANALYSIS_TEMPERATURE,
        )
        .with_system(SYSTEM_PROMPT);
        let reply = self.client.complete(request).await?;
        debug!("Analysis reply: {} chars", reply.len());
        parse_judgment(&reply)
    }

    async fn generate_tasks(
        &self,
        context: &GenerationContext,
        strategy: &CategoryStrategy,
    ) -> Result<Vec<GeneratedTask>, GenerationError> {
        let request = CompletionRequest::new(
            generation_prompt(context, strategy),
            self.max_tokens,
            GENERATION_TEMPERATURE,
        )
        .with_system(SYSTEM_PROMPT);
        let reply = self.client.complete(request).await?;
        debug!("Generation reply: {} chars", reply.len());
        parse_tasks(&reply)
    }
}

/// Stand-in when no model is configured. Every plan uses the templates.
#[derive(Debug, Clone)]
pub struct UnavailableGenerator {
    reason: String,
}

impl UnavailableGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TaskGenerator for UnavailableGenerator {
    async fn judge_sufficiency(
        &self,
        _context: &GenerationContext,
        _strategy: &CategoryStrategy,
    ) -> Result<Sufficiency, GenerationError> {
        Err(GenerationError::Unavailable(self.reason.clone()))
    }

    async fn generate_tasks(
        &self,
        _context: &GenerationContext,
        _strategy: &CategoryStrategy,
    ) -> Result<Vec<GeneratedTask>, GenerationError> {
        Err(GenerationError::Unavailable(self.reason.clone()))
    }
}

/// Build the generator from configuration, degrading to templates without a key.
pub fn generator_from_config(llm: &LlmConfig, workflow: &WorkflowConfig) -> Arc<dyn TaskGenerator> {
    match AnthropicClient::from_config(llm) {
        Ok(client) => Arc::new(LlmTaskGenerator::new(
            Arc::new(client),
            llm.max_tokens,
            workflow.max_questions,
        )),
        Err(err) => {
            warn!("Task generation disabled, plans will use templates: {}", err);
            Arc::new(UnavailableGenerator::new(err.to_string()))
        }
    }
}
