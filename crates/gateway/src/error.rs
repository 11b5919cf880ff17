//! Mapping of pipeline errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sera_core::error::{ConversationError, Error, ProviderError};
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request that never reached the pipeline.
    BadRequest(String),
    /// Failure inside the conversation pipeline.
    Pipeline(Error),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Pipeline(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(Error::Conversation(ConversationError::MissingInput)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Pipeline(Error::Conversation(ConversationError::QuotaExceeded { .. })) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Pipeline(Error::Provider(ProviderError::Timeout(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Pipeline(Error::Provider(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Pipeline(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Pipeline(Error::Conversation(e @ ConversationError::MissingInput))
            | ApiError::Pipeline(Error::Conversation(e @ ConversationError::QuotaExceeded { .. })) => {
                e.to_string()
            }
            ApiError::Pipeline(Error::Provider(e)) => {
                error!(error = %e, "Generation backend failed");
                format!("Generation backend error: {e}")
            }
            ApiError::Pipeline(e) => {
                error!(error = %e, "Request failed");
                "Internal server error".into()
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                "Internal server error".into()
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                Error::from(ConversationError::MissingInput).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::from(ConversationError::QuotaExceeded { limit: 3 }).into(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                Error::from(ConversationError::InvalidTurn {
                    speaker: "assistant".into(),
                })
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::from(ProviderError::Timeout("slow".into())).into(),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                Error::from(ProviderError::Network("refused".into())).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::BadRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err:?}");
        }
    }

    #[test]
    fn internal_error_is_500() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
