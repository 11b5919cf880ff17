//! Token budget enforcement.
//!
//! Every assembled prompt is measured before it reaches the backend.
//! Prompts strictly larger than the limit are refused; a prompt exactly at
//! the limit is admitted.

use sera_core::error::ProviderError;
use sera_core::provider::TokenCounter;
use serde::Serialize;

/// Why a prompt was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The prompt needs more tokens than the configured limit.
    LimitExceeded { tokens: usize, limit: usize },
}

impl RejectReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::LimitExceeded { .. } => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::LimitExceeded { tokens, limit } => {
                write!(f, "prompt needs {tokens} tokens, limit is {limit}")
            }
        }
    }
}

/// Outcome of a budget check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Admit { tokens: usize },
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Verdict::Admit { .. })
    }
}

/// Admits or rejects prompts against a fixed token limit.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudgetGuard {
    max_tokens: usize,
}

impl TokenBudgetGuard {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Count `prompt` with `counter` and compare against the limit.
    ///
    /// A counter failure is returned as an error, never as an admit.
    pub fn check(
        &self,
        prompt: &str,
        counter: &dyn TokenCounter,
    ) -> Result<Verdict, ProviderError> {
        let tokens = counter.count_tokens(prompt)?;
        if tokens > self.max_tokens {
            return Ok(Verdict::Reject(RejectReason::LimitExceeded {
                tokens,
                limit: self.max_tokens,
            }));
        }
        Ok(Verdict::Admit { tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingTokenCounter, WordCounter};

    #[test]
    fn at_limit_is_admitted() {
        let guard = TokenBudgetGuard::new(3);
        assert_eq!(
            guard.check("one two three", &WordCounter).unwrap(),
            Verdict::Admit { tokens: 3 }
        );
    }

    #[test]
    fn one_over_is_rejected() {
        let guard = TokenBudgetGuard::new(3);
        let verdict = guard.check("one two three four", &WordCounter).unwrap();
        assert_eq!(
            verdict,
            Verdict::Reject(RejectReason::LimitExceeded {
                tokens: 4,
                limit: 3
            })
        );
        assert!(!verdict.is_admitted());
    }

    #[test]
    fn reason_code_is_stable() {
        let reason = RejectReason::LimitExceeded {
            tokens: 10,
            limit: 5,
        };
        assert_eq!(reason.code(), "limit_exceeded");
        assert!(reason.to_string().contains("10"));
    }

    #[test]
    fn counter_failure_is_not_an_admit() {
        let guard = TokenBudgetGuard::new(100);
        assert!(matches!(
            guard.check("anything", &FailingTokenCounter),
            Err(ProviderError::Tokenization(_))
        ));
    }
}
