use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured (set {0})")]
    MissingApiKey(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("client sampling failed: {0}")]
    Sampling(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::MissingApiKey(_) | Self::InvalidResponse(_) | Self::Sampling(_) => false,
        }
    }
}
