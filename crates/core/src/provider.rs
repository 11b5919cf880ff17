//! Provider trait, the abstraction over text-generation backends.
//!
//! A Provider turns one assembled prompt string into generated text. A
//! [`TokenCounter`] measures that same prompt in the backend's tokens so the
//! budget can be enforced before anything expensive happens.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Sampling parameters, passed through to the backend uninterpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum length of the generated sequence
    #[serde(default = "default_max_length")]
    pub max_length: u32,

    /// Nucleus sampling threshold
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Sample instead of greedy decoding
    #[serde(default = "default_do_sample")]
    pub do_sample: bool,

    /// How many candidates the backend should produce
    #[serde(default = "default_num_return_sequences")]
    pub num_return_sequences: u32,

    /// Sampling temperature, only meaningful with `do_sample`
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_length() -> u32 {
    1024
}
fn default_top_p() -> f32 {
    0.95
}
fn default_do_sample() -> bool {
    true
}
fn default_num_return_sequences() -> u32 {
    1
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            top_p: default_top_p(),
            do_sample: default_do_sample(),
            num_return_sequences: default_num_return_sequences(),
            temperature: default_temperature(),
        }
    }
}

/// A single generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The fully assembled prompt
    pub prompt: String,

    /// Sampling parameters
    #[serde(default)]
    pub params: GenerationParams,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The backend's answer to a [`GenerationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text of the first returned candidate
    pub text: String,

    /// Which model actually responded
    pub model: String,

    /// Token usage statistics, when the backend reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Provider trait.
///
/// The orchestrator calls `generate()` without knowing which backend is
/// behind it. Implementations must not retry on their own.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "vllm").
    fn name(&self) -> &str;

    /// Generate a continuation for the prompt.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError>;

    /// Can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Counts how many backend tokens a piece of text occupies.
pub trait TokenCounter: Send + Sync {
    /// A human-readable name (e.g., "heuristic", "hf:allenai/cosmo-xl").
    fn name(&self) -> &str;

    /// Count the tokens in `text`.
    fn count_tokens(&self, text: &str) -> std::result::Result<usize, ProviderError>;
}
