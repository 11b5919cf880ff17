//! # Sera Core
//!
//! Domain types, traits, and error definitions for the Sera conversation
//! service. This crate has **no framework dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here:
//! - [`Provider`] generates text from an assembled prompt
//! - [`TokenCounter`] measures a prompt in backend tokens
//! - [`SessionStore`] owns persisted dialogue history
//!
//! Implementations live in their respective crates, so the conversation
//! pipeline can be tested against scripted stand-ins.

pub mod error;
pub mod provider;
pub mod session;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{ConversationError, Error, ProviderError, Result, StoreError};
pub use provider::{GenerationParams, GenerationRequest, GenerationResponse, Provider, TokenCounter};
pub use session::{Session, SessionId, Speaker, Turn};
pub use store::SessionStore;
