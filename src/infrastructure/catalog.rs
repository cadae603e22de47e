//! Model catalog: discovery, fallback, and default-model selection.
//!
//! Discovery runs at most once per process. Concurrent callers of
//! [`ModelCatalog::ensure_initialized`] share the same in-flight attempt
//! through a `tokio::sync::OnceCell`; whichever outcome it produces (live
//! list or fallback) is what every caller observes. Discovery failure is a
//! soft degrade, never an error surfaced to callers.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::constants::{DEFAULT_MODEL, FALLBACK_CONTEXT_WINDOW};
use crate::domain::ModelInfo;
use crate::infrastructure::model::ModelBackend;

/// Static model set used before discovery completes and whenever it fails.
fn fallback_models() -> Vec<ModelInfo> {
    [
        ("gemini-2.5-pro", "Gemini 2.5 Pro", 1_048_576),
        ("gemini-2.5-flash", "Gemini 2.5 Flash", 1_048_576),
        ("gemini-2.0-flash", "Gemini 2.0 Flash", 1_048_576),
        ("gemini-1.5-pro", "Gemini 1.5 Pro", 2_097_152),
        ("gemini-1.5-flash", "Gemini 1.5 Flash", 1_048_576),
    ]
    .into_iter()
    .map(|(name, display_name, window)| ModelInfo::new(name, display_name, window))
    .collect()
}

struct CatalogState {
    models: HashMap<String, ModelInfo>,
    default_model: String,
}

impl CatalogState {
    fn from_models(models: Vec<ModelInfo>, allow_experimental: bool) -> Self {
        let names: Vec<String> = models.iter().map(|model| model.name.clone()).collect();
        let default_model = select_default_model(&names, allow_experimental)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let models = models
            .into_iter()
            .map(|model| (model.name.clone(), model))
            .collect();
        Self {
            models,
            default_model,
        }
    }
}

/// Catalog of known models and the process-wide default.
pub struct ModelCatalog {
    backend: Arc<dyn ModelBackend>,
    allow_experimental: bool,
    discovery: OnceCell<()>,
    state: RwLock<CatalogState>,
}

impl ModelCatalog {
    /// Create a catalog seeded with the static fallback set.
    pub fn new(backend: Arc<dyn ModelBackend>, allow_experimental: bool) -> Self {
        Self {
            backend,
            allow_experimental,
            discovery: OnceCell::new(),
            state: RwLock::new(CatalogState::from_models(
                fallback_models(),
                allow_experimental,
            )),
        }
    }

    /// Run model discovery at most once per process.
    ///
    /// Idempotent and safe to call from any number of concurrent tasks; all
    /// of them await the same in-flight attempt. On success the model set is
    /// replaced wholesale and the default recomputed; on failure the
    /// fallback set is retained and a warning logged.
    pub async fn ensure_initialized(&self) {
        self.discovery
            .get_or_init(|| async {
                match self.backend.list_models().await {
                    Ok(models) if !models.is_empty() => {
                        info!(count = models.len(), "Model discovery complete");
                        let state = CatalogState::from_models(models, self.allow_experimental);
                        *self.write_state() = state;
                    }
                    Ok(_) => {
                        warn!("Model discovery returned an empty list, keeping fallback models");
                    }
                    Err(error) => {
                        warn!(error = %error, "Model discovery failed, keeping fallback models");
                    }
                }
            })
            .await;
    }

    /// The model used when a request names none.
    pub fn default_model(&self) -> String {
        self.read_state().default_model.clone()
    }

    /// Names of all known models, sorted for stable output.
    pub fn available_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_state().models.keys().cloned().collect();
        names.sort();
        names
    }

    /// Full metadata for all known models, sorted by name.
    pub fn model_infos(&self) -> Vec<ModelInfo> {
        let mut infos: Vec<ModelInfo> = self.read_state().models.values().cloned().collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Context window for a model, or the fixed fallback when the name is
    /// unrecognized. Never fails.
    pub fn context_window(&self, name: &str) -> u32 {
        self.read_state()
            .models
            .get(name)
            .map(|model| model.context_window)
            .unwrap_or(FALLBACK_CONTEXT_WINDOW)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CatalogState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Catalog lock poisoned while reading - recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CatalogState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Catalog lock poisoned while writing - recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Pick a default model from a candidate set.
///
/// Policy: keep names carrying the product keyword (first candidate when
/// none do); drop experimental variants unless allowed, but never down to an
/// empty pool; then take the highest version, preferring "flash" variants on
/// ties.
pub(crate) fn select_default_model(
    candidates: &[String],
    allow_experimental: bool,
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let mut pool: Vec<&String> = candidates
        .iter()
        .filter(|name| name.contains("gemini"))
        .collect();
    if pool.is_empty() {
        return Some(candidates[0].clone());
    }

    if !allow_experimental {
        let stable: Vec<&String> = pool
            .iter()
            .copied()
            .filter(|name| !is_experimental(name))
            .collect();
        if !stable.is_empty() {
            pool = stable;
        }
    }

    pool.sort_by(|a, b| {
        version_token(b)
            .partial_cmp(&version_token(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.contains("flash").cmp(&a.contains("flash")))
    });

    pool.first().map(|name| name.to_string())
}

fn is_experimental(name: &str) -> bool {
    name.contains("exp") || name.contains("preview") || name.contains("thinking")
}

/// First decimal number embedded in the name; 0 when there is none.
fn version_token(name: &str) -> f32 {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            let mut seen_dot = false;
            while i < bytes.len() {
                if bytes[i].is_ascii_digit() {
                    i += 1;
                } else if bytes[i] == b'.'
                    && !seen_dot
                    && i + 1 < bytes.len()
                    && bytes[i + 1].is_ascii_digit()
                {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            return name[start..i].parse().unwrap_or(0.0);
        }
        i += 1;
    }
    0.0
}
