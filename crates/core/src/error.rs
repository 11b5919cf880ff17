//! Error types for the Sera domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all Sera operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Conversation errors ---
    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    // --- Generation backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Session store errors ---
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("No input text supplied")]
    MissingInput,

    #[error("Refusing to store an empty {speaker} turn")]
    InvalidTurn { speaker: String },

    #[error("Exchange limit of {limit} reached for this session, please restart the conversation")]
    QuotaExceeded { limit: usize },
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Token counting failed: {0}")]
    Tokenization(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted session {session_id}: {reason}")]
    Corrupted { session_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "Service unavailable".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service unavailable"));
    }

    #[test]
    fn quota_error_mentions_limit() {
        let err = Error::from(ConversationError::QuotaExceeded { limit: 10 });
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("restart"));
    }

    #[test]
    fn invalid_turn_names_speaker() {
        let err = ConversationError::InvalidTurn {
            speaker: "assistant".into(),
        };
        assert!(err.to_string().contains("assistant"));
    }

    #[test]
    fn every_error_belongs_to_a_bounded_context() {
        fn context(err: &Error) -> &'static str {
            match err {
                Error::Conversation(_) => "conversation",
                Error::Provider(_) => "provider",
                Error::Store(_) => "store",
            }
        }
        assert_eq!(
            context(&ConversationError::MissingInput.into()),
            "conversation"
        );
        assert_eq!(
            context(&ProviderError::Network("refused".into()).into()),
            "provider"
        );
        assert_eq!(
            context(&StoreError::Storage("disk full".into()).into()),
            "store"
        );
    }
}
