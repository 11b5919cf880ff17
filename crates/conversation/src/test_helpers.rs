//! Shared scripted collaborators for orchestrator and guard tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sera_core::error::ProviderError;
use sera_core::provider::{GenerationRequest, GenerationResponse, Provider, TokenCounter};

/// A provider that plays back scripted replies in order.
///
/// Once the script runs out it answers `reply <n>` where `n` counts calls
/// from 1. Every request is recorded for later inspection.
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Duration,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        let provider = Self::new();
        provider
            .script
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| Ok(r.to_string())));
        provider
    }

    pub fn failing(error: ProviderError) -> Self {
        let provider = Self::new();
        provider.script.lock().unwrap().push_back(Err(error));
        provider
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        let text = match next {
            Some(reply) => reply?,
            None => format!("reply {call}"),
        };
        Ok(GenerationResponse {
            text,
            model: "scripted".into(),
            usage: None,
        })
    }
}

/// Counts whitespace-separated words. Easy to reason about in assertions.
pub(crate) struct WordCounter;

impl TokenCounter for WordCounter {
    fn name(&self) -> &str {
        "words"
    }

    fn count_tokens(&self, text: &str) -> Result<usize, ProviderError> {
        Ok(text.split_whitespace().count())
    }
}

/// Reports the same count for every input.
pub(crate) struct FixedTokenCounter(pub usize);

impl TokenCounter for FixedTokenCounter {
    fn name(&self) -> &str {
        "fixed"
    }

    fn count_tokens(&self, _text: &str) -> Result<usize, ProviderError> {
        Ok(self.0)
    }
}

/// Always fails.
pub(crate) struct FailingTokenCounter;

impl TokenCounter for FailingTokenCounter {
    fn name(&self) -> &str {
        "failing"
    }

    fn count_tokens(&self, _text: &str) -> Result<usize, ProviderError> {
        Err(ProviderError::Tokenization("tokenizer unavailable".into()))
    }
}
