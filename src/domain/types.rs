//! Core value objects: chat requests and responses, model metadata, and
//! research steps.
//!
//! Everything here is a plain data carrier. Behavior lives in the backend
//! adapter (`infrastructure::model`) and the research orchestrator
//! (`application::research`).

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A model known to the catalog.
///
/// Immutable once constructed. The catalog replaces its whole model set when
/// discovery succeeds; individual entries are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Model identifier used in API calls (e.g., "gemini-2.5-flash")
    pub name: String,
    /// Human-readable display name (e.g., "Gemini 2.5 Flash")
    pub display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Maximum combined input capacity in tokens
    pub context_window: u32,
}

impl ModelInfo {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        context_window: u32,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            context_window,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A single chat completion request. Constructed per call.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    /// Explicit model name; resolved via the catalog default when absent
    pub model: Option<String>,
    /// Sampling temperature (0.0 - 1.0); configuration default when absent
    pub temperature: Option<f32>,
    /// Output token cap; configuration default when absent
    pub max_output_tokens: Option<u32>,
    /// Optional system instruction, composed into the prompt
    pub system_prompt: Option<String>,
    /// Attach web-search grounding; configuration default when absent
    pub grounding: Option<bool>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    #[must_use]
    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = Some(grounding);
        self
    }
}

/// Token usage reported by the provider for one call.
///
/// Absence of usage metadata on a response means "treat as zero usage",
/// never an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageMetadata {
    pub prompt_tokens: u32,
    pub candidate_tokens: u32,
    pub total_tokens: u32,
}

/// One citation source returned by search grounding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroundingChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

/// A support entry linking response text to citation chunks by index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroundingSupport {
    pub chunk_indices: Vec<usize>,
}

/// Search-grounding metadata attached to a response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroundingMetadata {
    pub search_queries: Vec<String>,
    pub chunks: Vec<GroundingChunk>,
    pub supports: Vec<GroundingSupport>,
}

impl GroundingMetadata {
    /// Whether grounding actually ran: at least one search query was issued
    /// or one citation support was recorded.
    pub fn fired(&self) -> bool {
        !self.search_queries.is_empty() || !self.supports.is_empty()
    }
}

/// A completed chat call. Immutable, one per backend call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Response text, after citation post-processing
    pub content: String,
    /// Model that actually served the request
    pub model: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding: Option<GroundingMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
}

/// One completed research round. Append-only, owned by a single run.
#[derive(Debug, Clone)]
pub struct ResearchStep {
    /// The prompt issued for this round
    pub prompt: String,
    /// Raw response text
    pub response_text: String,
    /// Source URLs extracted from the response, insertion order
    pub sources: Vec<String>,
    pub usage: Option<UsageMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_builder_chain() {
        let request = ChatRequest::new("hello")
            .with_model("gemini-2.5-pro")
            .with_temperature(0.3)
            .with_max_output_tokens(512)
            .with_system_prompt("be brief")
            .with_grounding(true);

        assert_eq!(request.message, "hello");
        assert_eq!(request.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_output_tokens, Some(512));
        assert_eq!(request.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(request.grounding, Some(true));
    }

    #[test]
    fn chat_request_defaults_are_unset() {
        let request = ChatRequest::new("hello");
        assert!(request.model.is_none());
        assert!(request.temperature.is_none());
        assert!(request.max_output_tokens.is_none());
        assert!(request.system_prompt.is_none());
        assert!(request.grounding.is_none());
    }

    #[test]
    fn grounding_fired_requires_queries_or_supports() {
        assert!(!GroundingMetadata::default().fired());

        let with_queries = GroundingMetadata {
            search_queries: vec!["rust released".to_string()],
            ..Default::default()
        };
        assert!(with_queries.fired());

        let with_supports = GroundingMetadata {
            supports: vec![GroundingSupport {
                chunk_indices: vec![0],
            }],
            ..Default::default()
        };
        assert!(with_supports.fired());

        // Chunks alone mean nothing was actually cited.
        let chunks_only = GroundingMetadata {
            chunks: vec![GroundingChunk {
                uri: Some("https://example.com".to_string()),
                title: None,
            }],
            ..Default::default()
        };
        assert!(!chunks_only.fired());
    }
}
