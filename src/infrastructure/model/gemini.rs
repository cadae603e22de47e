//! Gemini REST client: chat completion and model discovery.
//!
//! Wraps a single `generateContent` call per [`ModelBackend::chat`]: builds
//! the request payload, classifies safety blocks and empty responses, and
//! post-processes grounded responses with a citation trailer. Authentication
//! uses the query-param key form the Gemini API expects.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use super::dto::{
    ApiErrorBody, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    ListModelsResponse, Part, SafetySettingDto, ToolDto,
};
use super::{ModelBackend, ModelError};
use crate::config::GeminiConfig;
use crate::constants::{DEFAULT_MODEL, FALLBACK_CONTEXT_WINDOW, GEMINI_API_PATH};
use crate::domain::{ChatRequest, ChatResponse, GroundingMetadata, ModelInfo};

/// Gemini client for the generative-language REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn generate_url(&self, model: &str) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        format!(
            "{base}/{GEMINI_API_PATH}/{model}:generateContent?key={}",
            self.config.api_key
        )
    }

    fn list_url(&self) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        format!("{base}/{GEMINI_API_PATH}?key={}", self.config.api_key)
    }

    /// Explicit request value, else configured default, else the static
    /// fallback. Callers that hold the catalog resolve its default before
    /// building the request.
    fn resolve_model(&self, request: &ChatRequest) -> String {
        request
            .model
            .clone()
            .or_else(|| self.config.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    fn build_payload(&self, request: &ChatRequest) -> GenerateContentRequest {
        let prompt = compose_prompt(request.system_prompt.as_deref(), &request.message);

        let tools = if request.grounding.unwrap_or(self.config.grounding_by_default) {
            vec![ToolDto {
                google_search: json!({}),
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: request
                    .temperature
                    .unwrap_or(self.config.default_temperature)
                    .clamp(0.0, 1.0),
                max_output_tokens: request
                    .max_output_tokens
                    .unwrap_or(self.config.default_max_tokens),
            },
            safety_settings: self
                .config
                .safety_settings
                .iter()
                .map(|setting| SafetySettingDto {
                    category: setting.category.as_api_str().to_string(),
                    threshold: setting.threshold.clone(),
                })
                .collect(),
            tools,
        }
    }

    /// Decode a response body, mapping non-success statuses to `Api` errors
    /// with the provider's own message when the error body is parseable.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ModelError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.error)
                .and_then(|detail| detail.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unrecognized error")
                        .to_string()
                });
            return Err(ModelError::api(status.as_u16(), message));
        }
        let body = response.text().await.map_err(ModelError::network)?;
        serde_json::from_str(&body)
            .map_err(|error| ModelError::invalid_response(format!("body did not parse: {error}")))
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ModelError> {
        let model = self.resolve_model(&request);
        let payload = self.build_payload(&request);

        info!(
            model = model.as_str(),
            grounding = !payload.tools.is_empty(),
            "Sending request to Gemini"
        );

        let response = self
            .http
            .post(self.generate_url(&model))
            .json(&payload)
            .send()
            .await
            .map_err(ModelError::network)?;
        let response: GenerateContentResponse = Self::decode(response).await?;
        debug!("Received response from Gemini");

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(ModelError::safety_blocked(reason));
        }

        let candidate = response.candidates.into_iter().next();
        let finish_reason = candidate
            .as_ref()
            .and_then(|candidate| candidate.finish_reason.clone());
        let text = candidate.as_ref().and_then(|candidate| {
            candidate
                .content
                .as_ref()
                .and_then(|content| content.parts.iter().find_map(|part| part.text.clone()))
        });

        let Some(text) = text else {
            return Err(empty_content_error(finish_reason));
        };

        let grounding: Option<GroundingMetadata> = candidate
            .and_then(|candidate| candidate.grounding_metadata)
            .map(Into::into);

        let content = match &grounding {
            Some(metadata) => append_citations(&text, metadata),
            None => text,
        };

        Ok(ChatResponse {
            content,
            model,
            timestamp: Utc::now(),
            finish_reason,
            grounding,
            usage: response.usage_metadata.map(Into::into),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        debug!("Fetching model list from Gemini");
        let response = self
            .http
            .get(self.list_url())
            .send()
            .await
            .map_err(ModelError::network)?;
        let listing: ListModelsResponse = Self::decode(response).await?;

        Ok(listing
            .models
            .into_iter()
            .map(|model| {
                // The API returns resource names like "models/gemini-2.5-pro".
                let name = model
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(&model.name)
                    .to_string();
                let display_name = model.display_name.unwrap_or_else(|| name.clone());
                let mut info = ModelInfo::new(
                    name,
                    display_name,
                    model.input_token_limit.unwrap_or(FALLBACK_CONTEXT_WINDOW),
                );
                if let Some(description) = model.description {
                    info = info.with_description(description);
                }
                info
            })
            .collect())
    }
}

/// Compose the prompt the model sees. A system instruction wraps the user
/// message in a chat-shaped transcript; without one the message passes
/// through untouched.
fn compose_prompt(system_prompt: Option<&str>, message: &str) -> String {
    match system_prompt {
        Some(system) => format!("{system}\n\nUser: {message}\n\nAssistant:"),
        None => message.to_string(),
    }
}

/// Map a missing-text response to a human-readable failure.
fn empty_content_error(finish_reason: Option<String>) -> ModelError {
    let hint = match finish_reason.as_deref() {
        Some("STOP") => {
            "generation finished normally but produced no text; try rephrasing the prompt"
                .to_string()
        }
        Some("SAFETY") => {
            "content was filtered by safety settings; soften the prompt or relax the safety thresholds"
                .to_string()
        }
        Some("MAX_TOKENS") => {
            "the output budget ran out before any text was produced; raise max_output_tokens"
                .to_string()
        }
        Some("FINISH_REASON_UNSPECIFIED") => {
            "the model gave no reason; retry with a simpler prompt".to_string()
        }
        Some(other) => format!("generation stopped with reason {other}"),
        None => "the response carried no candidates".to_string(),
    };
    ModelError::EmptyContent {
        finish_reason,
        hint,
    }
}

/// Append a citation trailer to grounded content.
///
/// Only chunks actually referenced by a support entry are listed; an index
/// out of range or a chunk without a URI is silently skipped. Content passes
/// through unmodified when the metadata carries nothing to report.
fn append_citations(text: &str, grounding: &GroundingMetadata) -> String {
    let mut sources: Vec<&str> = Vec::new();
    for support in &grounding.supports {
        for &index in &support.chunk_indices {
            let Some(chunk) = grounding.chunks.get(index) else {
                continue;
            };
            let Some(uri) = chunk.uri.as_deref() else {
                continue;
            };
            if !sources.contains(&uri) {
                sources.push(uri);
            }
        }
    }

    if sources.is_empty() && grounding.search_queries.is_empty() {
        return text.to_string();
    }

    let mut content = text.to_string();
    if !sources.is_empty() {
        content.push_str("\n\nSources:\n");
        for (index, uri) in sources.iter().enumerate() {
            content.push_str(&format!("[{}] {uri}\n", index + 1));
        }
    }
    if !grounding.search_queries.is_empty() {
        content.push_str(&format!(
            "\nSearch queries used: {}\n",
            grounding.search_queries.join(", ")
        ));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroundingChunk, GroundingSupport};

    fn metadata(
        queries: &[&str],
        chunks: Vec<GroundingChunk>,
        supports: Vec<GroundingSupport>,
    ) -> GroundingMetadata {
        GroundingMetadata {
            search_queries: queries.iter().map(|q| q.to_string()).collect(),
            chunks,
            supports,
        }
    }

    fn chunk(uri: Option<&str>) -> GroundingChunk {
        GroundingChunk {
            uri: uri.map(|u| u.to_string()),
            title: None,
        }
    }

    #[test]
    fn compose_prompt_without_system_is_passthrough() {
        assert_eq!(compose_prompt(None, "hello"), "hello");
    }

    #[test]
    fn compose_prompt_with_system_wraps_transcript() {
        let prompt = compose_prompt(Some("be terse"), "hello");
        assert_eq!(prompt, "be terse\n\nUser: hello\n\nAssistant:");
    }

    #[test]
    fn citations_appended_with_dedup() {
        let grounding = metadata(
            &[],
            vec![chunk(Some("https://a.example/page"))],
            vec![
                GroundingSupport {
                    chunk_indices: vec![0],
                },
                GroundingSupport {
                    chunk_indices: vec![0],
                },
            ],
        );
        let content = append_citations("answer", &grounding);
        assert_eq!(content.matches("https://a.example/page").count(), 1);
        assert!(content.contains("Sources:"));
        assert!(!content.contains("Search queries used:"));
    }

    #[test]
    fn citations_skip_bad_indices_and_missing_uris() {
        let grounding = metadata(
            &[],
            vec![chunk(None), chunk(Some("https://b.example/doc"))],
            vec![GroundingSupport {
                chunk_indices: vec![0, 1, 7],
            }],
        );
        let content = append_citations("answer", &grounding);
        assert!(content.contains("[1] https://b.example/doc"));
        assert!(!content.contains("[2]"));
    }

    #[test]
    fn unreferenced_chunks_are_not_listed() {
        let grounding = metadata(
            &[],
            vec![
                chunk(Some("https://cited.example")),
                chunk(Some("https://uncited.example")),
            ],
            vec![GroundingSupport {
                chunk_indices: vec![0],
            }],
        );
        let content = append_citations("answer", &grounding);
        assert!(content.contains("https://cited.example"));
        assert!(!content.contains("https://uncited.example"));
    }

    #[test]
    fn empty_grounding_passes_content_through() {
        let grounding = metadata(&[], Vec::new(), Vec::new());
        assert_eq!(append_citations("answer", &grounding), "answer");
    }

    #[test]
    fn queries_alone_still_add_trailer() {
        let grounding = metadata(&["rust 1.80 release"], Vec::new(), Vec::new());
        let content = append_citations("answer", &grounding);
        assert!(!content.contains("Sources:"));
        assert!(content.contains("Search queries used: rust 1.80 release"));
    }

    #[test]
    fn empty_content_hints_follow_finish_reason() {
        for (reason, fragment) in [
            ("STOP", "rephrasing"),
            ("SAFETY", "safety"),
            ("MAX_TOKENS", "max_output_tokens"),
            ("FINISH_REASON_UNSPECIFIED", "no reason"),
            ("RECITATION", "RECITATION"),
        ] {
            let error = empty_content_error(Some(reason.to_string()));
            let rendered = error.to_string();
            assert!(
                rendered.contains(fragment),
                "reason {reason} should mention {fragment}, got: {rendered}"
            );
        }

        let generic = empty_content_error(None).to_string();
        assert!(generic.contains("no candidates"));
    }

    #[test]
    fn resolve_model_prefers_request_then_config() {
        let client = GeminiClient::new(
            crate::config::GeminiConfig::new("key").with_default_model("gemini-2.0-flash"),
        );

        let explicit = ChatRequest::new("hi").with_model("gemini-2.5-pro");
        assert_eq!(client.resolve_model(&explicit), "gemini-2.5-pro");

        let implicit = ChatRequest::new("hi");
        assert_eq!(client.resolve_model(&implicit), "gemini-2.0-flash");

        let bare = GeminiClient::new(crate::config::GeminiConfig::new("key"));
        assert_eq!(bare.resolve_model(&implicit), DEFAULT_MODEL);
    }

    #[test]
    fn payload_defaults_come_from_config() {
        let client = GeminiClient::new(
            crate::config::GeminiConfig::new("key")
                .with_default_temperature(0.4)
                .with_default_max_tokens(1024)
                .with_grounding_by_default(true),
        );
        let payload = client.build_payload(&ChatRequest::new("hi"));
        assert_eq!(payload.generation_config.temperature, 0.4);
        assert_eq!(payload.generation_config.max_output_tokens, 1024);
        assert_eq!(payload.tools.len(), 1);

        // Explicit request values override the configured defaults.
        let request = ChatRequest::new("hi")
            .with_temperature(0.9)
            .with_max_output_tokens(64)
            .with_grounding(false);
        let payload = client.build_payload(&request);
        assert_eq!(payload.generation_config.temperature, 0.9);
        assert_eq!(payload.generation_config.max_output_tokens, 64);
        assert!(payload.tools.is_empty());
    }
}
