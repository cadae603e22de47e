//! Gemini research tool core.
//!
//! Wraps the Gemini generative-language REST API behind a [`ModelBackend`]
//! trait, keeps a lazily-discovered [`ModelCatalog`] of available models,
//! and exposes three callable tools through [`ToolHandler`]: single-turn
//! chat, model listing, and an iterative search-grounded deep-research loop
//! that assembles a structured report under a token budget.

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::research::{
    DeepResearch, ResearchBudget, ResearchError, ResearchRequest, extract_sources,
};
pub use application::tools::{ToolDefinition, ToolHandler, ToolOutcome};
pub use config::{ConfigError, GeminiConfig, HarmCategory, SafetySetting};
pub use domain::{
    ChatRequest, ChatResponse, GroundingChunk, GroundingMetadata, GroundingSupport, ModelInfo,
    ResearchStep, UsageMetadata,
};
pub use infrastructure::catalog::ModelCatalog;
pub use infrastructure::model::{GeminiClient, ModelBackend, ModelError};
