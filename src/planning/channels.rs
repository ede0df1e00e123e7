//! `UserChannel` implementations for the different front ends.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use super::collaborators::{ChannelClosed, UserChannel, UserPrompt};

/// Interactive terminal channel: prints the prompt, reads one line.
/// End of input counts as the user walking away.
pub struct StdinChannel {
    input: Mutex<BufReader<Stdin>>,
}

impl StdinChannel {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for StdinChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserChannel for StdinChannel {
    async fn ask_user(&self, prompt: UserPrompt<'_>) -> Result<String, ChannelClosed> {
        let text = format!("\n{}\n> ", prompt.render());
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(text.as_bytes())
            .await
            .map_err(|_| ChannelClosed)?;
        stdout.flush().await.map_err(|_| ChannelClosed)?;

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(|_| ChannelClosed)?;
        if read == 0 {
            return Err(ChannelClosed);
        }
        Ok(line.trim().to_string())
    }
}

/// Non-interactive channel for MCP and HTTP callers: clarifying questions
/// get an empty reply and the first preview is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl UserChannel for AutoApprove {
    async fn ask_user(&self, prompt: UserPrompt<'_>) -> Result<String, ChannelClosed> {
        match prompt {
            UserPrompt::Clarify { questions, .. } => {
                tracing::debug!("Skipping {} clarifying question(s)", questions.len());
                Ok(String::new())
            }
            UserPrompt::Preview { .. } => Ok("yes".to_string()),
        }
    }
}
