//! Model backend seam and error taxonomy.
//!
//! [`ModelBackend`] is the single point the rest of the crate talks to the
//! provider through; tests substitute a scripted mock at this trait.

mod dto;
mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChatRequest, ChatResponse, ModelInfo};

/// Classified failures from the model backend.
///
/// Every variant carries enough context to render a useful message at the
/// tool boundary; nothing is swallowed on the way up.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("network error calling Gemini: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    #[error("Gemini API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The prompt was blocked before generation. Callers must never retry
    /// this automatically; the same prompt will be blocked again.
    #[error("response blocked by safety filters, reason={reason}")]
    SafetyBlocked { reason: String },

    #[error("model returned no content ({hint})")]
    EmptyContent {
        finish_reason: Option<String>,
        hint: String,
    },

    #[error("invalid response from Gemini: {reason}")]
    InvalidResponse { reason: String },
}

impl ModelError {
    pub fn network(source: reqwest::Error) -> Self {
        Self::Network { source }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn safety_blocked(reason: impl Into<String>) -> Self {
        Self::SafetyBlocked {
            reason: reason.into(),
        }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// True for safety blocks, which must not be retried by any caller.
    pub fn is_safety_block(&self) -> bool {
        matches!(self, Self::SafetyBlocked { .. })
    }
}

/// The model backend: one chat completion call plus model discovery.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Execute a single chat completion.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ModelError>;

    /// Discover available models and their context windows.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError>;
}
