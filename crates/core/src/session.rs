//! Session and Turn domain types.
//!
//! These are the value objects that flow through the whole pipeline:
//! the store loads a [`Session`], the orchestrator appends two [`Turn`]s to
//! its private copy, and the store saves it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConversationError;

/// Longest accepted session identifier.
const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque identifier for a session.
///
/// Restricted to `[A-Za-z0-9_-]` so it can travel in a cookie and name a
/// file without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate an identifier received from outside.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty()
            && s.len() <= MAX_SESSION_ID_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid session id '{value}'"))
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The end user
    User,
    /// The assistant persona
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One utterance in a session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTurn")]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    /// Create a turn, rejecting empty or whitespace-only text.
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Result<Self, ConversationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ConversationError::InvalidTurn {
                speaker: speaker.as_str().into(),
            });
        }
        Ok(Self { speaker, text })
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render as a transcript line, e.g. `User: hi` or `Sera: hello`.
    pub fn render(&self, assistant_name: &str) -> String {
        match self.speaker {
            Speaker::User => format!("User: {}", self.text),
            Speaker::Assistant => format!("{}: {}", assistant_name, self.text),
        }
    }
}

/// Unvalidated wire form; persisted turns go through [`Turn::new`] again.
#[derive(Deserialize)]
struct RawTurn {
    speaker: Speaker,
    text: String,
}

impl TryFrom<RawTurn> for Turn {
    type Error = ConversationError;

    fn try_from(raw: RawTurn) -> Result<Self, Self::Error> {
        Turn::new(raw.speaker, raw.text)
    }
}

/// A session is the ordered dialogue history behind one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,

    /// Turns in insertion order
    #[serde(default)]
    turns: Vec<Turn>,

    /// When this session was first created
    pub created_at: DateTime<Utc>,

    /// When the last turn was added
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append one turn at the end of the history.
    ///
    /// Alternation is not enforced here; callers append a user/assistant
    /// pair per exchange.
    pub fn append(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
    ) -> Result<(), ConversationError> {
        let turn = Turn::new(speaker, text)?;
        self.updated_at = Utc::now();
        self.turns.push(turn);
        Ok(())
    }

    /// Copy of the history, detached from this session.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of completed user turns.
    pub fn exchanges(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .count()
    }

    /// Render the history as `"User: ..."` / `"<assistant>: ..."` lines.
    pub fn render(&self, assistant_name: &str) -> Vec<String> {
        self.turns.iter().map(|t| t.render(assistant_name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_turn_rejected() {
        let err = Turn::new(Speaker::User, "   ").unwrap_err();
        assert_eq!(
            err,
            ConversationError::InvalidTurn {
                speaker: "user".into()
            }
        );
    }

    #[test]
    fn append_preserves_order() {
        let mut session = Session::new(SessionId::new());
        session.append(Speaker::User, "first").unwrap();
        session.append(Speaker::Assistant, "second").unwrap();
        session.append(Speaker::User, "third").unwrap();

        let texts: Vec<&str> = session.turns().iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(session.exchanges(), 2);
    }

    #[test]
    fn failed_append_leaves_history_untouched() {
        let mut session = Session::new(SessionId::new());
        session.append(Speaker::User, "hello").unwrap();
        let before = session.snapshot();

        assert!(session.append(Speaker::Assistant, "").is_err());
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut session = Session::new(SessionId::new());
        session.append(Speaker::User, "hello").unwrap();
        let snapshot = session.snapshot();

        session.append(Speaker::Assistant, "hi there").unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn render_uses_assistant_name() {
        let mut session = Session::new(SessionId::new());
        session.append(Speaker::User, "I had a rough day").unwrap();
        session.append(Speaker::Assistant, "I'm here for you.").unwrap();

        assert_eq!(
            session.render("Sera"),
            vec!["User: I had a rough day", "Sera: I'm here for you."]
        );
    }

    #[test]
    fn session_id_validation() {
        assert!(SessionId::parse("abc-123_XYZ").is_some());
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("../etc/passwd").is_none());
        assert!(SessionId::parse(&"a".repeat(129)).is_none());
        assert!(SessionId::parse(SessionId::new().as_str()).is_some());
    }

    #[test]
    fn persisted_empty_turn_fails_to_load() {
        let json = r#"{"speaker":"user","text":""}"#;
        assert!(serde_json::from_str::<Turn>(json).is_err());
    }

    #[test]
    fn session_serialization_roundtrip() {
        let mut session = Session::new(SessionId::parse("s1").unwrap());
        session.append(Speaker::User, "hello").unwrap();
        session.append(Speaker::Assistant, "hi").unwrap();

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains(r#""id":"s1""#));
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.snapshot(), session.snapshot());
    }
}
