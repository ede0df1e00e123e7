//! Completion backend that borrows the MCP client's model.

use async_trait::async_trait;
use rmcp::model::{Content, CreateMessageRequestParam, CreateMessageResult, Role, SamplingMessage};
use rmcp::{Peer, RoleServer};

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// Sends each completion to the connected client as a `sampling/createMessage` request.
pub struct SamplingClient {
    peer: Peer<RoleServer>,
}

impl SamplingClient {
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Self { peer }
    }
}

fn message_params(request: CompletionRequest) -> CreateMessageRequestParam {
    CreateMessageRequestParam {
        messages: vec![SamplingMessage {
            role: Role::User,
            content: Content::text(request.prompt),
        }],
        model_preferences: None,
        system_prompt: request.system_prompt,
        include_context: None,
        temperature: Some(request.temperature),
        max_tokens: request.max_tokens,
        stop_sequences: None,
        metadata: None,
    }
}

fn reply_text(result: CreateMessageResult) -> Result<String, LlmError> {
    match result.message.content.as_text() {
        Some(text) if !text.text.trim().is_empty() => Ok(text.text.clone()),
        Some(_) => Err(LlmError::InvalidResponse("empty sampling reply".into())),
        None => Err(LlmError::InvalidResponse(format!(
            "sampling reply from {} was not text",
            result.model
        ))),
    }
}

#[async_trait]
impl LlmClient for SamplingClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let result = self
            .peer
            .create_message(message_params(request))
            .await
            .map_err(|e| LlmError::Sampling(e.to_string()))?;
        tracing::debug!(model = %result.model, "Client sampling reply received");
        reply_text(result)
    }
}
