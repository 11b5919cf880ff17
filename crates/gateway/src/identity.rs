//! Session identity for HTTP requests.
//!
//! A request is tied to a session by, in order of precedence:
//!
//! 1. an explicit `user_id` in the request body
//! 2. the session cookie
//! 3. a freshly minted id, announced back to the client with `Set-Cookie`

use axum::http::{HeaderMap, HeaderValue, header};
use sera_core::session::SessionId;

use crate::error::ApiError;

/// How the session cookie is named and flagged.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

impl CookieSettings {
    /// Render the `Set-Cookie` value for `id`.
    pub fn set_cookie(&self, id: &SessionId) -> Result<HeaderValue, ApiError> {
        let mut value = format!("{}={}; Path=/; HttpOnly", self.name, id.as_str());
        if self.secure {
            value.push_str("; SameSite=None; Secure");
        } else {
            value.push_str("; SameSite=Lax");
        }
        HeaderValue::from_str(&value)
            .map_err(|e| ApiError::Internal(format!("Unrepresentable session cookie: {e}")))
    }
}

/// The session a request resolved to.
#[derive(Debug)]
pub struct ResolvedSession {
    pub id: SessionId,
    /// Set when the id was minted for this request.
    pub set_cookie: Option<HeaderValue>,
}

/// Read the session id from the `Cookie` headers, ignoring malformed values.
pub fn session_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| SessionId::parse(value.trim_matches('"')))
}

/// Explicit id from the request body. An invalid one is a client error.
fn explicit_session(user_id: Option<&str>) -> Result<Option<SessionId>, ApiError> {
    match user_id {
        None => Ok(None),
        Some(raw) => SessionId::parse(raw)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest("user_id must be 1-128 characters of [A-Za-z0-9_-]".into())),
    }
}

/// Resolve the session for an exchange, minting one if needed.
pub fn resolve_or_mint(
    headers: &HeaderMap,
    user_id: Option<&str>,
    cookie: &CookieSettings,
) -> Result<ResolvedSession, ApiError> {
    if let Some(id) = explicit_session(user_id)? {
        return Ok(ResolvedSession {
            id,
            set_cookie: None,
        });
    }
    if let Some(id) = session_from_cookie(headers, &cookie.name) {
        return Ok(ResolvedSession {
            id,
            set_cookie: None,
        });
    }
    let id = SessionId::new();
    let set_cookie = Some(cookie.set_cookie(&id)?);
    Ok(ResolvedSession { id, set_cookie })
}

/// Resolve the session for a reset. Never mints: no identity, nothing to clear.
pub fn resolve_existing(
    headers: &HeaderMap,
    user_id: Option<&str>,
    cookie: &CookieSettings,
) -> Result<Option<SessionId>, ApiError> {
    if let Some(id) = explicit_session(user_id)? {
        return Ok(Some(id));
    }
    Ok(session_from_cookie(headers, &cookie.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CookieSettings {
        CookieSettings {
            name: "sera_session".into(),
            secure: false,
        }
    }

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn cookie_found_among_others() {
        let headers = headers_with_cookie("theme=dark; sera_session=abc-123; lang=en");
        assert_eq!(
            session_from_cookie(&headers, "sera_session").unwrap().as_str(),
            "abc-123"
        );
    }

    #[test]
    fn malformed_cookie_ignored() {
        let headers = headers_with_cookie("sera_session=../../etc/passwd");
        assert!(session_from_cookie(&headers, "sera_session").is_none());
    }

    #[test]
    fn missing_cookie_mints_new_session() {
        let resolved = resolve_or_mint(&HeaderMap::new(), None, &settings()).unwrap();
        let cookie = resolved.set_cookie.unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("sera_session={}", resolved.id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn existing_cookie_is_reused() {
        let headers = headers_with_cookie("sera_session=known");
        let resolved = resolve_or_mint(&headers, None, &settings()).unwrap();
        assert_eq!(resolved.id.as_str(), "known");
        assert!(resolved.set_cookie.is_none());
    }

    #[test]
    fn user_id_takes_precedence() {
        let headers = headers_with_cookie("sera_session=from-cookie");
        let resolved = resolve_or_mint(&headers, Some("from-body"), &settings()).unwrap();
        assert_eq!(resolved.id.as_str(), "from-body");
        assert!(resolved.set_cookie.is_none());
    }

    #[test]
    fn invalid_user_id_rejected() {
        let err = resolve_or_mint(&HeaderMap::new(), Some("no spaces"), &settings()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn secure_cookie_flags() {
        let settings = CookieSettings {
            name: "s".into(),
            secure: true,
        };
        let value = settings.set_cookie(&SessionId::parse("x").unwrap()).unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "s=x; Path=/; HttpOnly; SameSite=None; Secure"
        );
    }

    #[test]
    fn reset_without_identity_resolves_nothing() {
        assert!(
            resolve_existing(&HeaderMap::new(), None, &settings())
                .unwrap()
                .is_none()
        );
    }
}
