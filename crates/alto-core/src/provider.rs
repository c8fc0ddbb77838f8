use async_trait::async_trait;
use thiserror::Error;

/// Bot text for transport and HTTP status failures
pub const GENERIC_ERROR_TEXT: &str =
    "Sorry, there was an error processing your message. Please try again.";

/// Bot text for a successful response without a usable `result`
pub const UNPROCESSABLE_TEXT: &str = "Sorry, I couldn't process your request.";

/// Everything that can go wrong between sending a message and reading a reply.
///
/// None of these reach the user directly: the controller turns each one into
/// a bot message via [`ProviderError::reply_text`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request never completed (DNS, connect, timeout, body read)
    #[error("Network failure: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status
    #[error("Completion endpoint returned status {0}")]
    Status(u16),

    /// 2xx, but the body was not JSON
    #[error("Undecodable response body: {0}")]
    Undecodable(String),

    /// 2xx JSON body without a non-empty string `result`
    #[error("Response contained no result")]
    MissingResult,
}

impl ProviderError {
    pub fn reply_text(&self) -> &'static str {
        match self {
            ProviderError::MissingResult => UNPROCESSABLE_TEXT,
            ProviderError::Network(_)
            | ProviderError::Status(_)
            | ProviderError::Undecodable(_) => GENERIC_ERROR_TEXT,
        }
    }

    /// Stable label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::Status(_) => "status",
            ProviderError::Undecodable(_) => "undecodable",
            ProviderError::MissingResult => "missing_result",
        }
    }
}

/// Anything that can turn one user message into one reply.
///
/// Only the latest message is passed; providers never see the transcript.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, message: &str) -> Result<String, ProviderError>;
}
