//! The callable tool surface.
//!
//! Three tools are exposed: a single-turn chat, a model listing, and the
//! deep-research loop. Tool failures are reported as unsuccessful outcomes
//! with a readable message rather than surfaced as transport errors, so a
//! caller always gets something it can show.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::application::research::{
    DEFAULT_ITERATIONS, DeepResearch, MAX_ITERATIONS, MIN_ITERATIONS, ResearchRequest,
};
use crate::domain::ChatRequest;
use crate::infrastructure::catalog::ModelCatalog;
use crate::infrastructure::model::ModelBackend;

pub const CHAT_TOOL: &str = "gemini_chat";
pub const LIST_MODELS_TOOL: &str = "gemini_list_models";
pub const DEEP_RESEARCH_TOOL: &str = "gemini_deep_research";

/// A tool advertisement: name, human description, JSON schema of the input.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub success: bool,
    pub content: String,
}

impl ToolOutcome {
    fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
        }
    }

    fn failure(content: impl Into<String>) -> Self {
        Self {
            success: false,
            content: content.into(),
        }
    }
}

/// Dispatches tool calls to the backend, catalog and research orchestrator.
pub struct ToolHandler {
    backend: Arc<dyn ModelBackend>,
    catalog: Arc<ModelCatalog>,
    research: DeepResearch,
}

impl ToolHandler {
    pub fn new(backend: Arc<dyn ModelBackend>, catalog: Arc<ModelCatalog>) -> Self {
        let research = DeepResearch::new(Arc::clone(&backend), Arc::clone(&catalog));
        Self {
            backend,
            catalog,
            research,
        }
    }

    /// The advertised tool set, in stable order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: CHAT_TOOL,
                description: "Send a single message to a Gemini model and return its reply, \
                              optionally grounded with web search",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The message to send to the model"
                        },
                        "model": {
                            "type": "string",
                            "description": "Model name; the catalog default when omitted"
                        },
                        "temperature": {
                            "type": "number",
                            "minimum": 0.0,
                            "maximum": 1.0,
                            "description": "Sampling temperature"
                        },
                        "max_output_tokens": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Cap on response tokens"
                        },
                        "system_prompt": {
                            "type": "string",
                            "description": "Instructions prepended to the message"
                        },
                        "enable_grounding": {
                            "type": "boolean",
                            "description": "Attach web search grounding to this request"
                        }
                    },
                    "required": ["message"]
                }),
            },
            ToolDefinition {
                name: LIST_MODELS_TOOL,
                description: "List the Gemini models currently available, with their context \
                              window sizes",
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            ToolDefinition {
                name: DEEP_RESEARCH_TOOL,
                description: "Run an iterative, search-grounded research loop on a question and \
                              return a structured report with sources",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "research_question": {
                            "type": "string",
                            "description": "The question to research"
                        },
                        "model": {
                            "type": "string",
                            "description": "Model name; the catalog default when omitted"
                        },
                        "max_iterations": {
                            "type": "integer",
                            "minimum": MIN_ITERATIONS,
                            "maximum": MAX_ITERATIONS,
                            "default": DEFAULT_ITERATIONS,
                            "description": "Number of research iterations"
                        },
                        "focus_areas": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Per-iteration focus directives, applied in order"
                        }
                    },
                    "required": ["research_question"]
                }),
            },
        ]
    }

    /// Invoke a tool by name. Unknown tools, malformed arguments and backend
    /// errors all come back as unsuccessful outcomes.
    pub async fn call(&self, name: &str, arguments: Value) -> ToolOutcome {
        info!(tool = name, "Tool call received");
        match name {
            CHAT_TOOL => self.chat(arguments).await,
            LIST_MODELS_TOOL => self.list_models().await,
            DEEP_RESEARCH_TOOL => self.deep_research(arguments).await,
            other => {
                warn!(tool = other, "Unknown tool requested");
                ToolOutcome::failure(format!("Unknown tool: {other}"))
            }
        }
    }

    async fn chat(&self, arguments: Value) -> ToolOutcome {
        let Some(message) = arguments.get("message").and_then(Value::as_str) else {
            return ToolOutcome::failure("Missing required argument: message");
        };

        self.catalog.ensure_initialized().await;

        let model = arguments
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.catalog.default_model());

        let mut request = ChatRequest::new(message).with_model(model);
        if let Some(temperature) = arguments.get("temperature").and_then(Value::as_f64) {
            request = request.with_temperature(temperature as f32);
        }
        if let Some(max_tokens) = arguments.get("max_output_tokens").and_then(Value::as_u64) {
            request = request.with_max_output_tokens(max_tokens as u32);
        }
        if let Some(system_prompt) = arguments.get("system_prompt").and_then(Value::as_str) {
            request = request.with_system_prompt(system_prompt);
        }
        if let Some(grounding) = arguments.get("enable_grounding").and_then(Value::as_bool) {
            request = request.with_grounding(grounding);
        }

        match self.backend.chat(request).await {
            Ok(response) => match serde_json::to_string_pretty(&response) {
                Ok(body) => ToolOutcome::ok(body),
                Err(error) => ToolOutcome::failure(format!("Failed to encode response: {error}")),
            },
            Err(error) => ToolOutcome::failure(format!("Chat failed: {error}")),
        }
    }

    async fn list_models(&self) -> ToolOutcome {
        self.catalog.ensure_initialized().await;

        let listing = json!({
            "models": self.catalog.model_infos(),
            "default_model": self.catalog.default_model(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        match serde_json::to_string_pretty(&listing) {
            Ok(body) => ToolOutcome::ok(body),
            Err(error) => ToolOutcome::failure(format!("Failed to encode model list: {error}")),
        }
    }

    async fn deep_research(&self, arguments: Value) -> ToolOutcome {
        let Some(question) = arguments.get("research_question").and_then(Value::as_str) else {
            return ToolOutcome::failure("Missing required argument: research_question");
        };

        let mut request = ResearchRequest::new(question);
        request.model = arguments
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string);
        request.max_iterations = arguments
            .get("max_iterations")
            .and_then(Value::as_u64)
            .map(|n| n as u32);
        if let Some(areas) = arguments.get("focus_areas").and_then(Value::as_array) {
            request.focus_areas = areas
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }

        match self.research.run(request).await {
            Ok(report) => ToolOutcome::ok(report),
            Err(error) => ToolOutcome::failure(format!("Deep research failed: {error}")),
        }
    }
}
