//! Shared test backend: a scripted [`ModelBackend`] that replays canned
//! chat outcomes and records every request it was given.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use gemini_research_mcp::{
    ChatRequest, ChatResponse, GroundingMetadata, ModelBackend, ModelError, ModelInfo,
    UsageMetadata,
};

/// Install a fmt subscriber once; repeat calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted chat outcome, consumed in order.
#[derive(Debug, Clone)]
pub enum Scripted {
    Ok {
        content: String,
        tokens: u32,
        grounded: bool,
    },
    Fail(String),
    Blocked(String),
}

impl Scripted {
    pub fn ok(content: &str, tokens: u32) -> Self {
        Scripted::Ok {
            content: content.to_string(),
            tokens,
            grounded: true,
        }
    }

    pub fn ok_ungrounded(content: &str, tokens: u32) -> Self {
        Scripted::Ok {
            content: content.to_string(),
            tokens,
            grounded: false,
        }
    }

    pub fn fail(message: &str) -> Self {
        Scripted::Fail(message.to_string())
    }

    pub fn blocked(reason: &str) -> Self {
        Scripted::Blocked(reason.to_string())
    }
}

pub struct MockBackend {
    script: Mutex<VecDeque<Scripted>>,
    chat_calls: Mutex<Vec<ChatRequest>>,
    models: Result<Vec<ModelInfo>, String>,
    list_calls: AtomicUsize,
    list_delay: Option<Duration>,
}

impl MockBackend {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            chat_calls: Mutex::new(Vec::new()),
            models: Ok(default_models()),
            list_calls: AtomicUsize::new(0),
            list_delay: None,
        }
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = Ok(models);
        self
    }

    pub fn with_failing_discovery(mut self) -> Self {
        self.models = Err("listing unavailable".to_string());
        self
    }

    pub fn with_discovery_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Requests seen so far, in call order.
    pub fn chat_calls(&self) -> Vec<ChatRequest> {
        self.chat_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls().len()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ModelError> {
        let model = request.model.clone().unwrap_or_default();
        if let Ok(mut calls) = self.chat_calls.lock() {
            calls.push(request);
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());

        match next {
            Some(Scripted::Ok {
                content,
                tokens,
                grounded,
            }) => {
                let grounding = grounded.then(|| GroundingMetadata {
                    search_queries: vec!["scripted query".to_string()],
                    chunks: Vec::new(),
                    supports: Vec::new(),
                });
                Ok(ChatResponse {
                    content,
                    model,
                    timestamp: Utc::now(),
                    finish_reason: Some("STOP".to_string()),
                    grounding,
                    usage: Some(UsageMetadata {
                        prompt_tokens: 0,
                        candidate_tokens: tokens,
                        total_tokens: tokens,
                    }),
                })
            }
            Some(Scripted::Fail(message)) => Err(ModelError::api(500, message)),
            Some(Scripted::Blocked(reason)) => Err(ModelError::safety_blocked(reason)),
            None => Err(ModelError::api(500, "script exhausted".to_string())),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.models {
            Ok(models) => Ok(models.clone()),
            Err(message) => Err(ModelError::api(503, message.clone())),
        }
    }
}

pub fn default_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new("gemini-2.5-pro", "Gemini 2.5 Pro", 1_048_576),
        ModelInfo::new("gemini-2.5-flash", "Gemini 2.5 Flash", 1_048_576),
    ]
}
