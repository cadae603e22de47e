//! Wire types for the Gemini v1beta REST API.

use serde::{Deserialize, Serialize};

use crate::domain::{GroundingChunk, GroundingMetadata, GroundingSupport, UsageMetadata};

// ---- request ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySettingDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDto>,
}

#[derive(Debug, Serialize)]
pub(super) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub(super) struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct SafetySettingDto {
    pub category: String,
    pub threshold: String,
}

/// A tool attachment. `{"google_search": {}}` enables search grounding.
#[derive(Debug, Serialize)]
pub(super) struct ToolDto {
    pub google_search: serde_json::Value,
}

// ---- response ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadataDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Candidate {
    pub content: Option<ContentDto>,
    pub finish_reason: Option<String>,
    pub grounding_metadata: Option<GroundingMetadataDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentDto {
    #[serde(default)]
    pub parts: Vec<PartDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PartDto {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UsageMetadataDto {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

impl From<UsageMetadataDto> for UsageMetadata {
    fn from(dto: UsageMetadataDto) -> Self {
        Self {
            prompt_tokens: dto.prompt_token_count,
            candidate_tokens: dto.candidates_token_count,
            total_tokens: dto.total_token_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GroundingMetadataDto {
    #[serde(default)]
    pub web_search_queries: Vec<String>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunkDto>,
    #[serde(default)]
    pub grounding_supports: Vec<GroundingSupportDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GroundingChunkDto {
    pub web: Option<WebChunkDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WebChunkDto {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GroundingSupportDto {
    #[serde(default)]
    pub grounding_chunk_indices: Vec<usize>,
}

impl From<GroundingMetadataDto> for GroundingMetadata {
    fn from(dto: GroundingMetadataDto) -> Self {
        Self {
            search_queries: dto.web_search_queries,
            chunks: dto
                .grounding_chunks
                .into_iter()
                .map(|chunk| {
                    let web = chunk.web;
                    GroundingChunk {
                        uri: web.as_ref().and_then(|w| w.uri.clone()),
                        title: web.and_then(|w| w.title),
                    }
                })
                .collect(),
            supports: dto
                .grounding_supports
                .into_iter()
                .map(|support| GroundingSupport {
                    chunk_indices: support.grounding_chunk_indices,
                })
                .collect(),
        }
    }
}

// ---- model listing ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ModelDto {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub input_token_limit: Option<u32>,
}

// ---- error body ----

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorDetail {
    pub message: Option<String>,
}
