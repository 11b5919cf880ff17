//! Token counters.
//!
//! [`HeuristicTokenCounter`] uses a character-based heuristic, ~4 characters
//! per token, which is accurate within ~10% for BPE tokenizers on English
//! text. With the `hf-tokenizer` feature, [`HfTokenCounter`] counts exactly
//! with the model's own Hugging Face tokenizer.

use sera_core::error::ProviderError;
use sera_core::provider::TokenCounter;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Counts tokens with [`estimate_tokens`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn count_tokens(&self, text: &str) -> Result<usize, ProviderError> {
        Ok(estimate_tokens(text))
    }
}

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfTokenCounter;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use super::*;
    use std::path::Path;
    use tokenizers::Tokenizer;
    use tracing::info;

    /// Counts tokens with a Hugging Face `tokenizer.json`.
    pub struct HfTokenCounter {
        name: String,
        tokenizer: Tokenizer,
    }

    impl HfTokenCounter {
        /// Load from a local `tokenizer.json`, or download it from a hub repo
        /// such as `allenai/cosmo-xl` (cached by `hf-hub`).
        pub fn load(source: &str) -> Result<Self, ProviderError> {
            let path = if Path::new(source).exists() {
                Path::new(source).to_path_buf()
            } else {
                info!(repo = source, "Fetching tokenizer from Hugging Face Hub");
                let api = hf_hub::api::sync::Api::new().map_err(|e| {
                    ProviderError::Network(format!(
                        "Failed to initialize HuggingFace Hub API: {e}"
                    ))
                })?;
                api.model(source.to_string())
                    .get("tokenizer.json")
                    .map_err(|e| {
                        ProviderError::Network(format!(
                            "Failed to download tokenizer from '{source}': {e}"
                        ))
                    })?
            };

            let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to load tokenizer: {e}"))
            })?;

            Ok(Self {
                name: format!("hf:{source}"),
                tokenizer,
            })
        }
    }

    impl TokenCounter for HfTokenCounter {
        fn name(&self) -> &str {
            &self.name
        }

        fn count_tokens(&self, text: &str) -> Result<usize, ProviderError> {
            // No truncation: the budget guard needs the real length.
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| ProviderError::Tokenization(e.to_string()))?;
            Ok(encoding.len())
        }
    }
}
