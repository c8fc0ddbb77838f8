//! UI-agnostic transcript types
//!
//! These are shared by every front end (TUI, one-shot CLI) and don't depend
//! on any specific UI framework. A `Message` is immutable once created.

use serde::{Deserialize, Serialize};

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Short label shown next to a message bubble
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Bot => "AI",
        }
    }
}

/// A single entry in the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    text: String,
    sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }
}

/// Detached copy of the controller state, taken for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub transcript: Vec<Message>,
    pub busy: bool,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }
}
