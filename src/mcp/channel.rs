//! Asks the MCP client's user through `elicitation/create` requests.

use async_trait::async_trait;
use rmcp::model::ClientCapabilities;
use rmcp::schemars::JsonSchema;
use rmcp::service::ElicitationError;
use rmcp::{Peer, RoleServer};
use serde::{Deserialize, Serialize};

use crate::planning::{ChannelClosed, UserChannel, UserPrompt};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClarificationReply {
    #[schemars(description = "Answers to the questions above; leave empty to continue with what is known")]
    #[serde(default)]
    pub answers: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewReview {
    #[schemars(description = "Save this plan as shown")]
    pub approve: bool,
    #[schemars(description = "When not approving: the changes to make. Leave empty to cancel the plan")]
    #[serde(default)]
    pub feedback: String,
}

rmcp::elicit_safe!(ClarificationReply, PreviewReview);

impl PreviewReview {
    /// The reply in the preview grammar the workflow parses.
    pub fn into_reply(self) -> String {
        let feedback = self.feedback.trim();
        if self.approve {
            "yes".to_string()
        } else if feedback.is_empty() {
            "cancel".to_string()
        } else {
            feedback.to_string()
        }
    }
}

pub fn supports_elicitation(capabilities: &ClientCapabilities) -> bool {
    capabilities.elicitation.is_some()
}

pub fn supports_sampling(capabilities: &ClientCapabilities) -> bool {
    capabilities.sampling.is_some()
}

/// Maps an elicitation result onto the channel contract: an empty accept
/// proceeds, decline and cancel end the workflow.
fn settle<T>(
    result: Result<Option<T>, ElicitationError>,
    answer: impl FnOnce(T) -> String,
) -> Result<String, ChannelClosed> {
    match result {
        Ok(Some(value)) => Ok(answer(value)),
        Ok(None) | Err(ElicitationError::NoContent) => Ok(String::new()),
        Err(ElicitationError::UserDeclined | ElicitationError::UserCancelled) => {
            tracing::info!("User declined the elicitation");
            Err(ChannelClosed)
        }
        Err(err) => {
            tracing::warn!("Elicitation failed: {}", err);
            Err(ChannelClosed)
        }
    }
}

pub struct McpChannel {
    peer: Peer<RoleServer>,
}

impl McpChannel {
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Self { peer }
    }
}

#[async_trait]
impl UserChannel for McpChannel {
    async fn ask_user(&self, prompt: UserPrompt<'_>) -> Result<String, ChannelClosed> {
        let message = prompt.render();
        match prompt {
            UserPrompt::Clarify { .. } => settle(
                self.peer.elicit::<ClarificationReply>(message).await,
                |reply| reply.answers,
            ),
            UserPrompt::Preview { .. } => settle(
                self.peer.elicit::<PreviewReview>(message).await,
                PreviewReview::into_reply,
            ),
        }
    }
}
