pub mod client;
pub mod config;
pub mod controller;
pub mod message;
pub mod provider;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use client::HttpCompletionClient;
pub use config::{Config, ConfigError};
pub use controller::{ConversationController, PendingReply};
pub use message::{Message, Sender, Snapshot};
pub use provider::{CompletionProvider, ProviderError, GENERIC_ERROR_TEXT, UNPROCESSABLE_TEXT};
