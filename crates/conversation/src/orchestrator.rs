//! The conversation orchestrator: one exchange, start to finish.
//!
//! An exchange walks through these stages:
//!
//! ```text
//! Start -> Loaded -> Assembled -> Checked -> Generated -> Appended -> Done
//!                                    |
//!                                    +-> Rejected (advisory, nothing saved)
//! ```
//!
//! The per-session lock is taken before `Loaded` and held until the
//! exchange ends, so two requests on one session always see each other's
//! turns. The store only ever sees complete user/assistant pairs.

use std::sync::Arc;
use std::time::Duration;

use sera_config::AppConfig;
use sera_core::error::{ConversationError, ProviderError, Result};
use sera_core::provider::{GenerationParams, GenerationRequest, Provider, TokenCounter};
use sera_core::session::{Session, SessionId, Speaker, Turn};
use sera_core::store::SessionStore;
use tracing::{debug, error, info, warn};

use crate::assembler::PromptAssembler;
use crate::budget::{RejectReason, TokenBudgetGuard, Verdict};
use crate::locks::SessionLocks;

/// Where an exchange currently is. Used for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    Start,
    Loaded,
    Assembled,
    Checked,
    Generated,
    Appended,
    Done,
    Rejected,
}

impl ExchangeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStage::Start => "start",
            ExchangeStage::Loaded => "loaded",
            ExchangeStage::Assembled => "assembled",
            ExchangeStage::Checked => "checked",
            ExchangeStage::Generated => "generated",
            ExchangeStage::Appended => "appended",
            ExchangeStage::Done => "done",
            ExchangeStage::Rejected => "rejected",
        }
    }
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeStatus {
    /// A user/assistant pair was generated and stored.
    Completed,
    /// The prompt was refused; the response is the advisory message.
    Rejected(RejectReason),
}

/// Result of one exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    /// Generated reply, or the advisory message on rejection
    pub response: String,

    /// Session history after the exchange, rendered as transcript lines
    pub conversation_history: Vec<String>,

    /// The same history as typed turns
    pub turns: Vec<Turn>,

    pub status: ExchangeStatus,
}

impl ExchangeOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self.status, ExchangeStatus::Rejected(_))
    }
}

/// Composes the store, assembler, budget guard, and backend per request.
pub struct ConversationOrchestrator {
    provider: Arc<dyn Provider>,
    token_counter: Arc<dyn TokenCounter>,
    store: Arc<dyn SessionStore>,
    assembler: PromptAssembler,
    guard: TokenBudgetGuard,
    params: GenerationParams,
    assistant_name: String,
    advisory_message: String,
    generation_timeout: Duration,
    max_exchanges: usize,
    locks: SessionLocks,
}

impl ConversationOrchestrator {
    /// Create an orchestrator with default settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        token_counter: Arc<dyn TokenCounter>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::from_config(&AppConfig::default(), provider, token_counter, store)
    }

    /// Create an orchestrator from loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        token_counter: Arc<dyn TokenCounter>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            provider,
            token_counter,
            store,
            assembler: PromptAssembler::new(config.persona.instruction.clone()),
            guard: TokenBudgetGuard::new(config.max_tokens_limit),
            params: config.generation.params(),
            assistant_name: config.persona.assistant_name.clone(),
            advisory_message: config.persona.advisory_message.clone(),
            generation_timeout: Duration::from_secs(config.generation.timeout_secs),
            max_exchanges: config.sessions.max_exchanges,
            locks: SessionLocks::new(),
        }
    }

    pub fn with_persona_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.assembler = PromptAssembler::new(instruction);
        self
    }

    pub fn with_max_tokens_limit(mut self, limit: usize) -> Self {
        self.guard = TokenBudgetGuard::new(limit);
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    pub fn with_advisory_message(mut self, message: impl Into<String>) -> Self {
        self.advisory_message = message.into();
        self
    }

    pub fn with_generation_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Cap exchanges per session. Zero disables the cap.
    pub fn with_max_exchanges(mut self, max: usize) -> Self {
        self.max_exchanges = max;
        self
    }

    pub fn max_tokens_limit(&self) -> usize {
        self.guard.max_tokens()
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Run one exchange for `session_id`.
    ///
    /// Absent or whitespace-only input fails with
    /// [`ConversationError::MissingInput`] before anything is loaded. An
    /// over-budget prompt returns the advisory message with the history
    /// untouched. Backend failures and timeouts leave the history untouched
    /// and are never retried.
    pub async fn exchange(
        &self,
        session_id: &SessionId,
        input: Option<&str>,
    ) -> Result<ExchangeOutcome> {
        let input = match input {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Err(ConversationError::MissingInput.into()),
        };
        self.stage(session_id, ExchangeStage::Start);

        let _guard = self.locks.acquire(session_id).await;

        let mut session = self.store.load(session_id).await?;
        self.stage(session_id, ExchangeStage::Loaded);

        if self.max_exchanges > 0 && session.exchanges() >= self.max_exchanges {
            warn!(
                session = %session_id,
                limit = self.max_exchanges,
                "Session exchange quota reached"
            );
            return Err(ConversationError::QuotaExceeded {
                limit: self.max_exchanges,
            }
            .into());
        }

        let prompt = self.assembler.assemble(session.turns(), input);
        self.stage(session_id, ExchangeStage::Assembled);

        let tokens = match self.guard.check(&prompt, self.token_counter.as_ref())? {
            Verdict::Admit { tokens } => tokens,
            Verdict::Reject(reason) => {
                warn!(
                    session = %session_id,
                    reason = reason.code(),
                    detail = %reason,
                    "Prompt rejected by token budget"
                );
                self.stage(session_id, ExchangeStage::Rejected);
                return Ok(self.outcome(
                    self.advisory_message.clone(),
                    &session,
                    ExchangeStatus::Rejected(reason),
                ));
            }
        };
        self.stage(session_id, ExchangeStage::Checked);

        let request = GenerationRequest {
            prompt,
            params: self.params.clone(),
        };
        let generated =
            match tokio::time::timeout(self.generation_timeout, self.provider.generate(request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "{} gave no response within {}s",
                    self.provider.name(),
                    self.generation_timeout.as_secs()
                ))),
            };
        let response = generated.inspect_err(|e| {
            warn!(
                session = %session_id,
                provider = self.provider.name(),
                error = %e,
                "Generation failed"
            );
        })?;
        self.stage(session_id, ExchangeStage::Generated);

        session.append(Speaker::User, input)?;
        if let Err(e) = session.append(Speaker::Assistant, response.text.as_str()) {
            error!(session = %session_id, error = %e, "Backend returned an unusable reply");
            return Err(e.into());
        }
        self.store.save(&session).await?;
        self.stage(session_id, ExchangeStage::Appended);

        info!(
            session = %session_id,
            input_len = input.len(),
            prompt_tokens = tokens,
            turns = session.len(),
            model = %response.model,
            "Exchange completed"
        );
        self.stage(session_id, ExchangeStage::Done);

        Ok(self.outcome(response.text, &session, ExchangeStatus::Completed))
    }

    /// Clear the stored history of `session_id`. Idempotent.
    pub async fn reset(&self, session_id: &SessionId) -> Result<()> {
        let _guard = self.locks.acquire(session_id).await;
        self.store.save(&Session::new(session_id.clone())).await?;
        info!(session = %session_id, "Conversation reset");
        Ok(())
    }

    /// Current stored history of `session_id`.
    pub async fn snapshot(&self, session_id: &SessionId) -> Result<Vec<Turn>> {
        let _guard = self.locks.acquire(session_id).await;
        Ok(self.store.load(session_id).await?.snapshot())
    }

    /// Render turns as transcript lines with the configured assistant name.
    pub fn render(&self, turns: &[Turn]) -> Vec<String> {
        turns
            .iter()
            .map(|t| t.render(&self.assistant_name))
            .collect()
    }

    fn outcome(&self, response: String, session: &Session, status: ExchangeStatus) -> ExchangeOutcome {
        ExchangeOutcome {
            response,
            conversation_history: session.render(&self.assistant_name),
            turns: session.snapshot(),
            status,
        }
    }

    fn stage(&self, session_id: &SessionId, stage: ExchangeStage) {
        debug!(session = %session_id, stage = stage.as_str(), "Exchange stage");
    }
}
