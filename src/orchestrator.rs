//! Keeps the displayed statement triple in step with the active filter.
//!
//! Every regeneration is issued with a monotonically increasing sequence
//! number before any I/O happens. A reply is committed only if its sequence
//! number is still the latest issued one, so the last *issued* request wins
//! no matter in which order replies arrive.

use crate::error::{OrchestrationError, WorkbenchError};
use crate::filter::FilterCriteria;
use crate::services::StatementEngine;
use crate::statements::StatementTriple;
use crate::transaction::Transaction;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifies one issued regeneration and the criteria behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub criteria: FilterCriteria,
}

/// Non-fatal condition shown alongside (or instead of) the statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementNotice {
    /// The filter matched nothing; statements were cleared.
    NoMatchingTransactions,
    /// The engine failed; the previous statements are still shown.
    RegenerationFailed(String),
}

impl StatementNotice {
    pub fn message(&self) -> String {
        match self {
            StatementNotice::NoMatchingTransactions => {
                OrchestrationError::NoMatchingTransactions.to_string()
            }
            StatementNotice::RegenerationFailed(msg) => msg.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedStatements {
    pub triple: StatementTriple,
    pub seq: u64,
    pub criteria: FilterCriteria,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    committed: Option<CommittedStatements>,
    notice: Option<StatementNotice>,
}

pub struct StatementOrchestrator<E: ?Sized> {
    engine: Arc<E>,
    issued: AtomicU64,
    state: Mutex<OrchestratorState>,
}

impl<E> StatementOrchestrator<E>
where
    E: StatementEngine + ?Sized,
{
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            issued: AtomicU64::new(0),
            state: Mutex::new(OrchestratorState::default()),
        }
    }

    /// Reserves the next sequence number. Call this synchronously at the
    /// moment the filter changes; the ticket's place in line is fixed here.
    pub fn issue(&self, criteria: FilterCriteria) -> Ticket {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Issued statement regeneration #{} for {:?}", seq, criteria);
        Ticket { seq, criteria }
    }

    pub fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub async fn regenerate(
        &self,
        transactions: Vec<Transaction>,
        criteria: FilterCriteria,
    ) -> Result<StatementTriple, OrchestrationError> {
        let ticket = self.issue(criteria);
        self.complete(ticket, transactions).await
    }

    /// Runs an issued regeneration to completion and commits its outcome
    /// unless a newer ticket has been issued in the meantime.
    pub async fn complete(
        &self,
        ticket: Ticket,
        transactions: Vec<Transaction>,
    ) -> Result<StatementTriple, OrchestrationError> {
        if transactions.is_empty() {
            let mut state = self.lock_current(&ticket)?;
            info!(
                "Regeneration #{} matched no transactions; clearing statements",
                ticket.seq
            );
            state.committed = None;
            state.notice = Some(StatementNotice::NoMatchingTransactions);
            return Err(OrchestrationError::NoMatchingTransactions);
        }

        debug!(
            "Requesting statements for {} transactions (#{})",
            transactions.len(),
            ticket.seq
        );
        let outcome = self.engine.generate(&transactions).await;

        let mut state = self.lock_current(&ticket)?;
        match outcome {
            Ok(triple) => {
                info!("Committed statements from regeneration #{}", ticket.seq);
                state.committed = Some(CommittedStatements {
                    triple: triple.clone(),
                    seq: ticket.seq,
                    criteria: ticket.criteria,
                });
                state.notice = None;
                Ok(triple)
            }
            Err(e) => {
                let message = failure_message(&e);
                warn!(
                    "Regeneration #{} failed, keeping previous statements: {}",
                    ticket.seq, message
                );
                state.notice = Some(StatementNotice::RegenerationFailed(message.clone()));
                Err(OrchestrationError::Failed(message))
            }
        }
    }

    pub fn current(&self) -> Option<StatementTriple> {
        self.state().committed.as_ref().map(|c| c.triple.clone())
    }

    pub fn committed(&self) -> Option<CommittedStatements> {
        self.state().committed.clone()
    }

    pub fn notice(&self) -> Option<StatementNotice> {
        self.state().notice.clone()
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_current(
        &self,
        ticket: &Ticket,
    ) -> Result<MutexGuard<'_, OrchestratorState>, OrchestrationError> {
        let state = self.state();
        let latest = self.latest_issued();
        if ticket.seq != latest {
            debug!(
                "Discarding stale regeneration #{} (latest is #{})",
                ticket.seq, latest
            );
            return Err(OrchestrationError::Superseded {
                issued: ticket.seq,
                latest,
            });
        }
        Ok(state)
    }
}

fn failure_message(error: &WorkbenchError) -> String {
    match error {
        WorkbenchError::Status { detail, .. } => detail.clone(),
        WorkbenchError::MalformedResponse(msg) => msg.clone(),
        other => other.to_string(),
    }
}
