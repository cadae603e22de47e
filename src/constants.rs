//! Application constants
//!
//! Single source of truth for API endpoints and model fallbacks.

/// Default Gemini API endpoint
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Gemini REST API path (version + resource collection)
pub const GEMINI_API_PATH: &str = "v1beta/models";

/// Model used when neither the request nor the catalog can resolve one
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Context window assumed for models the catalog does not recognize
pub const FALLBACK_CONTEXT_WINDOW: u32 = 32_000;
