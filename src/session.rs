//! Session state and the two flows that mutate it: ledger/filter changes
//! driving statement regeneration, and questions driving the chat.

use crate::config::WorkbenchConfig;
use crate::conversation::{
    ChatContext, ContextDecision, ConversationContextBuilder, ConversationLog, Message,
};
use crate::error::{OrchestrationError, Result, WorkbenchError};
use crate::filter::{FilterCriteria, FilterEngine};
use crate::intent::{IntentRouter, KpiOperation, RoutingDefaults};
use crate::kpi::{KpiDispatcher, KpiEvidence};
use crate::orchestrator::{StatementNotice, StatementOrchestrator, Ticket};
use crate::services::Backend;
use crate::statements::{KpiTargets, StatementTriple};
use crate::transaction::{Transaction, TransactionStore, TransactionSummary};
use log::{debug, info, warn};
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

pub const EMPTY_REPLY_MESSAGE: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// Per-session state. The ledger flow is the only writer of the store and
/// criteria; the chat flow is the only writer of the log.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    store: TransactionStore,
    criteria: FilterCriteria,
    entities: Vec<String>,
    log: ConversationLog,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_greeting() -> Self {
        Self {
            log: ConversationLog::with_greeting(),
            ..Self::default()
        }
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Sorted entity names of the whole ledger, independent of the filter.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary::from_transactions(self.store.all())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub rows: usize,
    pub statements: std::result::Result<StatementTriple, OrchestrationError>,
}

/// How a question was resolved. Every variant has already been appended to
/// the conversation log as an assistant message, except `Ignored`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Answered {
        text: String,
        operation: KpiOperation,
        kpi_included: bool,
    },
    /// Answered locally; the reasoning service was not called.
    Clarified(String),
    Failed(String),
    /// Blank input; nothing happened.
    Ignored,
}

impl ChatOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            ChatOutcome::Answered { text, .. } => Some(text.as_str()),
            ChatOutcome::Clarified(text) | ChatOutcome::Failed(text) => Some(text.as_str()),
            ChatOutcome::Ignored => None,
        }
    }
}

pub struct Workbench<B: ?Sized> {
    backend: Arc<B>,
    orchestrator: StatementOrchestrator<B>,
    dispatcher: KpiDispatcher<B>,
    router: IntentRouter,
    context: ConversationContextBuilder,
}

impl<B> Workbench<B>
where
    B: Backend + ?Sized,
{
    pub fn new(backend: Arc<B>, config: &WorkbenchConfig) -> Self {
        Self {
            orchestrator: StatementOrchestrator::new(backend.clone()),
            dispatcher: KpiDispatcher::new(backend.clone()),
            router: IntentRouter::new(RoutingDefaults::from(config)),
            context: ConversationContextBuilder::new(config.history_window),
            backend,
        }
    }

    pub fn orchestrator(&self) -> &StatementOrchestrator<B> {
        &self.orchestrator
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub fn statements(&self) -> Option<StatementTriple> {
        self.orchestrator.current()
    }

    pub fn notice(&self) -> Option<StatementNotice> {
        self.orchestrator.notice()
    }

    /// Uploads a ledger file and regenerates statements over all of it. A
    /// failed upload leaves the session untouched.
    pub async fn upload(&self, session: &mut SessionState, path: &Path) -> Result<UploadOutcome> {
        let transactions = self.backend.upload(path).await?;
        let rows = transactions.len();
        info!("Uploaded {} transactions from {}", rows, path.display());

        let statements = self.load_transactions(session, transactions).await;
        Ok(UploadOutcome { rows, statements })
    }

    /// Replaces the ledger wholesale, clears the filter and starts a
    /// regeneration over the full set. The store is updated before this
    /// returns; the future only drives the statement call.
    pub fn load_transactions(
        &self,
        session: &mut SessionState,
        transactions: Vec<Transaction>,
    ) -> impl Future<Output = std::result::Result<StatementTriple, OrchestrationError>> + '_ {
        session.entities = FilterEngine::entities(&transactions);
        session.store.replace(transactions.clone());
        session.criteria = FilterCriteria::open();

        let ticket = self.orchestrator.issue(FilterCriteria::open());
        self.orchestrator.complete(ticket, transactions)
    }

    /// Applies new criteria to the display immediately and starts the
    /// matching regeneration. Several of these may be in flight at once; only
    /// the most recently issued one can commit.
    pub fn change_filter(
        &self,
        session: &mut SessionState,
        criteria: FilterCriteria,
    ) -> impl Future<Output = std::result::Result<StatementTriple, OrchestrationError>> + '_ {
        session.criteria = criteria.clone();
        let pending = if session.store.is_empty() {
            debug!("No ledger loaded; filter stored without regeneration");
            None
        } else {
            Some(self.refilter(session, criteria))
        };

        async move {
            match pending {
                Some((ticket, transactions)) => {
                    self.orchestrator.complete(ticket, transactions).await
                }
                None => Err(OrchestrationError::NoLedger),
            }
        }
    }

    fn refilter(
        &self,
        session: &mut SessionState,
        criteria: FilterCriteria,
    ) -> (Ticket, Vec<Transaction>) {
        let outcome = FilterEngine::apply(session.store.all(), &criteria);
        debug!(
            "Filter {:?} kept {} of {} transactions",
            criteria,
            outcome.transactions.len(),
            session.store.all().len()
        );

        session.store.set_displayed(outcome.transactions.clone());
        session.entities = outcome.entities;

        (self.orchestrator.issue(criteria), outcome.transactions)
    }

    pub async fn ask(&self, session: &mut SessionState, question: &str) -> ChatOutcome {
        let question = question.trim();
        if question.is_empty() {
            return ChatOutcome::Ignored;
        }

        if let Some(text) =
            ConversationContextBuilder::clarification(question, !session.store.is_empty())
        {
            info!("Question needs a ledger; answering locally");
            session.log.append(Message::user(question));
            session.log.append(Message::assistant(text.clone()));
            return ChatOutcome::Clarified(text);
        }

        let operation = self.router.classify(question);
        debug!("Routed question to {}", operation.label());

        let entity = session.criteria.entity.clone();
        let evidence = self
            .dispatcher
            .dispatch(&operation, session.store.all(), entity.as_deref())
            .await;
        if let KpiEvidence::Unavailable(reason) = &evidence {
            debug!("Answering without KPI evidence: {}", reason);
        }

        let decision = self.context.build(ChatContext {
            question,
            kpi: evidence.result(),
            statements: self.orchestrator.current(),
            transactions: session.store.displayed(),
            ledger_loaded: !session.store.is_empty(),
            log: &session.log,
            entity: entity.as_deref(),
        });

        session.log.append(Message::user(question));

        let request = match decision {
            ContextDecision::Clarify(text) => {
                info!("Question needs a ledger; answering locally");
                session.log.append(Message::assistant(text.clone()));
                return ChatOutcome::Clarified(text);
            }
            ContextDecision::Send(request) => request,
        };

        match self.backend.chat(&request).await {
            Ok(reply) => {
                let text = if reply.trim().is_empty() {
                    EMPTY_REPLY_MESSAGE.to_string()
                } else {
                    reply
                };
                session.log.append(Message::assistant(text.clone()));
                ChatOutcome::Answered {
                    text,
                    kpi_included: evidence.result().is_some(),
                    operation,
                }
            }
            Err(e) => {
                warn!("Reasoning call failed: {}", e);
                let reason = self.describe_failure(&e).await;
                let text = format!(
                    "Sorry, I encountered an error: {}\n\nPlease make sure the backend server is running and try again.",
                    reason
                );
                session.log.append(Message::assistant(text.clone()));
                ChatOutcome::Failed(text)
            }
        }
    }

    /// Measures the current statements against `targets`. `None` when no
    /// statements are on display.
    pub async fn analyze_kpi_targets(&self, targets: &KpiTargets) -> Option<Result<Value>> {
        let figures = self.orchestrator.current()?.key_figures();
        Some(self.backend.analyze_targets(&figures, targets).await)
    }

    /// A single reachability probe to tell "service down" apart from "chat
    /// endpoint broken". Never retries the chat call itself.
    async fn describe_failure(&self, error: &WorkbenchError) -> String {
        if !error.is_connectivity() {
            return error.to_string();
        }

        match self.backend.health().await {
            Ok(()) => "Backend is running but chat endpoint failed. Please check backend logs or try again."
                .to_string(),
            Err(WorkbenchError::Status { status, .. }) => format!(
                "Backend health check returned status {}. Please check if backend is running correctly.",
                status
            ),
            Err(_) => "Cannot connect to the backend server. Check that it is running and reachable, then try again."
                .to_string(),
        }
    }
}
