//! `/chat` and `/reset` handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SharedState;
use crate::error::ApiError;
use crate::identity::{resolve_existing, resolve_or_mint};

pub const RESET_ACK: &str = "Conversation history has been reset.";

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "message")]
    pub input: Option<String>,

    /// Explicit session id; overrides the cookie.
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_history: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
}

/// Parse a JSON body; an empty body is the default request.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

pub(crate) async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ChatRequest = parse_body(&body)?;
    let session = resolve_or_mint(&headers, request.user_id.as_deref(), &state.cookie)?;
    debug!(
        session = %session.id,
        minted = session.set_cookie.is_some(),
        input_len = request.input.as_deref().map_or(0, str::len),
        "Chat request"
    );

    let outcome = state
        .orchestrator
        .exchange(&session.id, request.input.as_deref())
        .await?;

    let mut response = Json(ChatResponse {
        response: outcome.response,
        conversation_history: outcome.conversation_history,
    })
    .into_response();
    if let Some(cookie) = session.set_cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

pub(crate) async fn reset_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ResetResponse>, ApiError> {
    let request: ResetRequest = parse_body(&body)?;
    match resolve_existing(&headers, request.user_id.as_deref(), &state.cookie)? {
        Some(id) => state.orchestrator.reset(&id).await?,
        None => debug!("Reset without a session, nothing to clear"),
    }
    Ok(Json(ResetResponse {
        message: RESET_ACK.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_aliases() {
        let a: ChatRequest = serde_json::from_str(r#"{"input":"hi","user_id":"u1"}"#).unwrap();
        let b: ChatRequest = serde_json::from_str(r#"{"message":"hi","userId":"u1"}"#).unwrap();
        assert_eq!(a.input, b.input);
        assert_eq!(a.user_id, b.user_id);
    }

    #[test]
    fn empty_body_is_default() {
        let request: ChatRequest = parse_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(request.input.is_none());
    }

    #[test]
    fn garbage_body_is_bad_request() {
        let err = parse_body::<ChatRequest>(&Bytes::from_static(b"{input")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
