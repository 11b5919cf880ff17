//! Provider builder: turns configuration into a backend and a token counter.

use std::sync::Arc;

use sera_config::AppConfig;
use sera_core::error::ProviderError;
use sera_core::provider::{Provider, TokenCounter};
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;
use crate::token::HeuristicTokenCounter;

/// Build the generation backend named by `config.provider`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider_config = &config.provider;
    let kind = provider_config.kind.as_str();

    let base_url = match (&provider_config.api_url, kind) {
        (Some(url), _) => url.clone(),
        (None, "custom") => {
            return Err(ProviderError::NotConfigured(
                "provider.api_url is required for the custom provider".into(),
            ));
        }
        (None, _) => default_base_url(kind).ok_or_else(|| {
            ProviderError::NotConfigured(format!("Unknown provider kind '{kind}'"))
        })?,
    };

    let api_key = provider_config.api_key.clone().unwrap_or_default();
    if api_key.is_empty() && requires_api_key(kind) {
        return Err(ProviderError::NotConfigured(format!(
            "Provider '{kind}' needs an API key (set SERA_API_KEY or provider.api_key)"
        )));
    }

    info!(provider = kind, url = %base_url, model = %provider_config.model, "Generation backend configured");

    let provider = OpenAiCompatProvider::new(kind, base_url, api_key, &provider_config.model)?;
    Ok(Arc::new(provider))
}

/// Build the token counter used by the budget guard.
pub fn build_token_counter(config: &AppConfig) -> Result<Arc<dyn TokenCounter>, ProviderError> {
    match &config.provider.tokenizer {
        None => Ok(Arc::new(HeuristicTokenCounter)),
        #[cfg(feature = "hf-tokenizer")]
        Some(source) => Ok(Arc::new(crate::token::HfTokenCounter::load(source)?)),
        #[cfg(not(feature = "hf-tokenizer"))]
        Some(source) => Err(ProviderError::NotConfigured(format!(
            "provider.tokenizer = '{source}' requires building with the 'hf-tokenizer' feature"
        ))),
    }
}

fn requires_api_key(kind: &str) -> bool {
    matches!(kind, "openai" | "openrouter" | "together" | "fireworks")
}

/// Get the default base URL for well-known providers.
fn default_base_url(kind: &str) -> Option<String> {
    let url = match kind {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "ollama" => "http://localhost:11434/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}
