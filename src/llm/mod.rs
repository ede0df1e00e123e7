//! Text-completion client used as the generation capability's backend.

mod anthropic;
mod error;

use async_trait::async_trait;

pub use anthropic::AnthropicClient;
pub use error::LlmError;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            system_prompt: None,
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Stateless completion: every call is an independent single-turn exchange.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the model's text reply.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
