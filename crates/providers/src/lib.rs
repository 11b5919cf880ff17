//! Text-generation backends for Sera.
//!
//! All providers implement the `sera_core::Provider` trait and all token
//! counters implement `sera_core::TokenCounter`. The router builds both
//! from configuration.

pub mod openai_compat;
pub mod router;
pub mod token;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, build_token_counter};
#[cfg(feature = "hf-tokenizer")]
pub use token::HfTokenCounter;
pub use token::{HeuristicTokenCounter, estimate_tokens};
