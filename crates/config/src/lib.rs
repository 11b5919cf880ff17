//! Configuration loading, validation, and management for Sera.
//!
//! Loads configuration from `~/.sera/config.toml` with environment
//! variable overrides. Validates all settings at startup; the result is
//! treated as immutable for the rest of the process lifetime.

use sera_core::provider::GenerationParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persona instruction placed at the head of every prompt.
pub const DEFAULT_PERSONA_INSTRUCTION: &str = "You are an AI assistant named Sera, designed to be an empathetic listener and supportive companion for women who want to rant or vent about various aspects of their lives. \
Your role is to provide a safe and non-judgmental space for them to express their feelings, frustrations, and experiences. \
Throughout the conversation, maintain a compassionate and supportive tone, and avoid dismissing or minimizing the user's feelings or experiences. \
Your goal is to create a safe space for them to vent and receive the kind of support they need, whether that's affirmations or advice. \
Remember, as an AI assistant, you should respond based on the provided information and avoid making assumptions or judgments about the user's personal life or circumstances.";

/// Reply sent instead of a generated turn when the prompt is over budget.
pub const DEFAULT_ADVISORY_MESSAGE: &str = "Oh, you've reached the token limit. Please restart or refresh the screen to start a new conversation.";

/// The root configuration structure.
///
/// Maps directly to `~/.sera/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum prompt size in backend tokens
    #[serde(default = "default_max_tokens_limit")]
    pub max_tokens_limit: usize,

    /// Persona shown to the backend and to users
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Sampling parameters and call timeout
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Generation backend
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Session storage
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_max_tokens_limit() -> usize {
    4192
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("max_tokens_limit", &self.max_tokens_limit)
            .field("persona", &self.persona)
            .field("generation", &self.generation)
            .field("provider", &self.provider)
            .field("sessions", &self.sessions)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Label used for assistant lines in the rendered history
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    #[serde(default = "default_instruction")]
    pub instruction: String,

    #[serde(default = "default_advisory_message")]
    pub advisory_message: String,
}

fn default_assistant_name() -> String {
    "Sera".into()
}
fn default_instruction() -> String {
    DEFAULT_PERSONA_INSTRUCTION.into()
}
fn default_advisory_message() -> String {
    DEFAULT_ADVISORY_MESSAGE.into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            instruction: default_instruction(),
            advisory_message: default_advisory_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_length")]
    pub max_length: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_true")]
    pub do_sample: bool,

    #[serde(default = "default_num_return_sequences")]
    pub num_return_sequences: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on a single backend call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_length() -> u32 {
    GenerationParams::default().max_length
}
fn default_top_p() -> f32 {
    GenerationParams::default().top_p
}
fn default_num_return_sequences() -> u32 {
    GenerationParams::default().num_return_sequences
}
fn default_temperature() -> f32 {
    GenerationParams::default().temperature
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

impl GenerationConfig {
    /// The sampling parameters handed to the backend.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_length: self.max_length,
            top_p: self.top_p,
            do_sample: self.do_sample,
            num_return_sequences: self.num_return_sequences,
            temperature: self.temperature,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            top_p: default_top_p(),
            do_sample: true,
            num_return_sequences: default_num_return_sequences(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend flavour: "openai", "openrouter", "ollama", "vllm", "llamacpp", "custom"
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Hugging Face tokenizer (local `tokenizer.json` path or hub repo id).
    /// Unset means the character heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,
}

fn default_provider_kind() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo-instruct".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("tokenizer", &self.tokenizer)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_url: None,
            api_key: None,
            model: default_model(),
            tokenizer: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// "memory" or "file"
    #[serde(default = "default_sessions_backend")]
    pub backend: String,

    /// Directory for the file backend (default: `~/.sera/sessions`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Sessions kept by the memory backend before the stalest is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Exchanges allowed per session before a reset is required (0 = unlimited)
    #[serde(default)]
    pub max_exchanges: usize,
}

fn default_sessions_backend() -> String {
    "memory".into()
}
fn default_max_sessions() -> usize {
    1_000
}

impl SessionsConfig {
    /// Resolved directory for the file backend.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("sessions"))
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            backend: default_sessions_backend(),
            path: None,
            max_sessions: default_max_sessions(),
            max_exchanges: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed to call the API with credentials
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Mark the session cookie `Secure` (HTTPS deployments)
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}
fn default_cookie_name() -> String {
    "sera_session".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: default_cors_origins(),
            cookie_name: default_cookie_name(),
            cookie_secure: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sera/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `SERA_API_KEY`, then `OPENAI_API_KEY`
    /// - `SERA_PROVIDER`, `SERA_MODEL`
    /// - `SERA_MAX_TOKENS_LIMIT`
    /// - `PORT`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load from an explicit path, or the default path when `None`.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("SERA_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }

        if let Some(kind) = lookup("SERA_PROVIDER") {
            self.provider.kind = kind;
        }

        if let Some(model) = lookup("SERA_MODEL") {
            self.provider.model = model;
        }

        if let Some(limit) = lookup("SERA_MAX_TOKENS_LIMIT") {
            self.max_tokens_limit = limit.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "SERA_MAX_TOKENS_LIMIT must be a positive integer, got '{limit}'"
                ))
            })?;
        }

        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a valid port, got '{port}'"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sera")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens_limit == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens_limit must be greater than 0".into(),
            ));
        }

        if self.persona.instruction.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.instruction must not be empty".into(),
            ));
        }

        if self.persona.assistant_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.assistant_name must not be empty".into(),
            ));
        }

        if self.persona.advisory_message.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.advisory_message must not be empty".into(),
            ));
        }

        let generation = &self.generation;
        if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be in (0.0, 1.0]".into(),
            ));
        }

        if generation.temperature < 0.0 || generation.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if generation.max_length == 0 || generation.num_return_sequences == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_length and generation.num_return_sequences must be > 0".into(),
            ));
        }

        if generation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0".into(),
            ));
        }

        if !matches!(self.sessions.backend.as_str(), "memory" | "file") {
            return Err(ConfigError::ValidationError(format!(
                "sessions.backend must be 'memory' or 'file', got '{}'",
                self.sessions.backend
            )));
        }

        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "sessions.max_sessions must be > 0".into(),
            ));
        }

        if self.gateway.cookie_name.is_empty()
            || !self
                .gateway
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::ValidationError(
                "gateway.cookie_name must be non-empty and use [A-Za-z0-9_-]".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_tokens_limit: default_max_tokens_limit(),
            persona: PersonaConfig::default(),
            generation: GenerationConfig::default(),
            provider: ProviderConfig::default(),
            sessions: SessionsConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
