//! Domain types shared across the tool surface and the backend adapter

mod types;

pub use types::{
    ChatRequest, ChatResponse, GroundingChunk, GroundingMetadata, GroundingSupport, ModelInfo,
    ResearchStep, UsageMetadata,
};
