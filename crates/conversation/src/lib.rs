//! # Sera Conversation
//!
//! The turn-taking pipeline behind every chat request:
//!
//! - [`assembler`] builds the generation prompt from the persona
//!   instruction, stored turns, and the new input
//! - [`budget`] admits or rejects a prompt against the token limit
//! - [`orchestrator`] runs one exchange end to end under a per-session lock
//!
//! Everything that talks to the outside world (backend, tokenizer, store) is
//! injected as a trait object from `sera-core`.

pub mod assembler;
pub mod budget;
pub mod locks;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::{PromptAssembler, SEPARATOR, TURN_DELIMITER, assemble};
pub use budget::{RejectReason, TokenBudgetGuard, Verdict};
pub use locks::SessionLocks;
pub use orchestrator::{
    ConversationOrchestrator, ExchangeOutcome, ExchangeStage, ExchangeStatus,
};
