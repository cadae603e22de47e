//! Environment-based configuration.
//!
//! All settings are collected once into an explicit [`GeminiConfig`] value
//! and passed into constructors; nothing reads the environment at call time.
//! A `.env` file is honored when present (via `dotenvy`) but never required.

use thiserror::Error;

use crate::constants::DEFAULT_GEMINI_ENDPOINT;

/// Configuration errors. Both variants are fatal at startup and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set; export it or add it to a .env file")]
    MissingApiKey,
    #[error("invalid value for {variable}: {reason}")]
    InvalidValue { variable: String, reason: String },
}

impl ConfigError {
    fn invalid(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            variable: variable.into(),
            reason: reason.into(),
        }
    }
}

/// Harm categories the Gemini API accepts safety thresholds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmCategory {
    Harassment,
    HateSpeech,
    SexuallyExplicit,
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];

    /// Category identifier in the REST API's enum form.
    pub fn as_api_str(self) -> &'static str {
        match self {
            HarmCategory::Harassment => "HARM_CATEGORY_HARASSMENT",
            HarmCategory::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
            HarmCategory::SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            HarmCategory::DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
        }
    }

    fn env_suffix(self) -> &'static str {
        match self {
            HarmCategory::Harassment => "HARASSMENT",
            HarmCategory::HateSpeech => "HATE_SPEECH",
            HarmCategory::SexuallyExplicit => "SEXUALLY_EXPLICIT",
            HarmCategory::DangerousContent => "DANGEROUS_CONTENT",
        }
    }
}

/// Blocking threshold for one harm category.
#[derive(Debug, Clone)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: String,
}

const DEFAULT_SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Configuration for the Gemini backend and tool defaults.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (opaque, required)
    pub api_key: String,
    /// API endpoint; overridable for tests and proxies
    pub endpoint: String,
    /// Model used when a request names none and discovery has not run
    pub default_model: Option<String>,
    /// Sampling temperature applied when a request leaves it unset
    pub default_temperature: f32,
    /// Output token cap applied when a request leaves it unset
    pub default_max_tokens: u32,
    /// Attach search grounding when a request leaves the flag unset
    pub grounding_by_default: bool,
    /// Allow experimental/preview models as the catalog default
    pub allow_experimental_models: bool,
    /// Per-category safety thresholds sent with every generation request
    pub safety_settings: Vec<SafetySetting>,
}

impl GeminiConfig {
    /// Create a configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            default_model: None,
            default_temperature: 0.7,
            default_max_tokens: 8192,
            grounding_by_default: false,
            allow_experimental_models: false,
            safety_settings: HarmCategory::ALL
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: DEFAULT_SAFETY_THRESHOLD.to_string(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_grounding_by_default(mut self, grounding: bool) -> Self {
        self.grounding_by_default = grounding;
        self
    }

    #[must_use]
    pub fn with_allow_experimental_models(mut self, allow: bool) -> Self {
        self.allow_experimental_models = allow;
        self
    }

    /// Load configuration from the process environment.
    ///
    /// Recognized variables:
    /// - `GEMINI_API_KEY` (required)
    /// - `GEMINI_ENDPOINT`
    /// - `GEMINI_DEFAULT_MODEL`
    /// - `GEMINI_TEMPERATURE` (0.0 - 1.0)
    /// - `GEMINI_MAX_OUTPUT_TOKENS`
    /// - `GEMINI_ENABLE_GROUNDING` (true/false)
    /// - `GEMINI_ALLOW_EXPERIMENTAL` (true/false)
    /// - `GEMINI_SAFETY_<CATEGORY>` (e.g. `GEMINI_SAFETY_HARASSMENT=BLOCK_NONE`)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is fine; real environment variables win either way.
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(endpoint) = env_nonempty("GEMINI_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(model) = env_nonempty("GEMINI_DEFAULT_MODEL") {
            config.default_model = Some(model);
        }
        if let Some(raw) = env_nonempty("GEMINI_TEMPERATURE") {
            let temperature: f32 = raw
                .parse()
                .map_err(|_| ConfigError::invalid("GEMINI_TEMPERATURE", "not a number"))?;
            if !(0.0..=1.0).contains(&temperature) {
                return Err(ConfigError::invalid(
                    "GEMINI_TEMPERATURE",
                    "must be between 0.0 and 1.0",
                ));
            }
            config.default_temperature = temperature;
        }
        if let Some(raw) = env_nonempty("GEMINI_MAX_OUTPUT_TOKENS") {
            config.default_max_tokens = raw
                .parse()
                .map_err(|_| ConfigError::invalid("GEMINI_MAX_OUTPUT_TOKENS", "not an integer"))?;
        }
        if let Some(raw) = env_nonempty("GEMINI_ENABLE_GROUNDING") {
            config.grounding_by_default = parse_bool("GEMINI_ENABLE_GROUNDING", &raw)?;
        }
        if let Some(raw) = env_nonempty("GEMINI_ALLOW_EXPERIMENTAL") {
            config.allow_experimental_models = parse_bool("GEMINI_ALLOW_EXPERIMENTAL", &raw)?;
        }

        for setting in &mut config.safety_settings {
            let variable = format!("GEMINI_SAFETY_{}", setting.category.env_suffix());
            if let Some(threshold) = env_nonempty(&variable) {
                setting.threshold = threshold;
            }
        }

        Ok(config)
    }
}

fn env_nonempty(variable: &str) -> Option<String> {
    std::env::var(variable)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(variable: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::invalid(variable, "expected true or false")),
    }
}
