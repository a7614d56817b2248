//! AI tutor explanations for reviewed questions.
//!
//! The engine never depends on this module; explanations only read
//! `ExamResult`s.

mod chat;
mod client;
mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExplainError;

pub use chat::{ChatKey, ExplanationService};
pub use client::{ChatClient, ChatConfig};
pub use prompt::{EXPLAIN_REQUEST, build_tutor_prompt};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Anything that turns a conversation into a reply.
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    /// Send the full conversation and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns `ExplainError` when the provider is unavailable or replies
    /// with nothing.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ExplainError>;
}
