//! # Ledger Workbench
//!
//! The state-consistency and query-routing core of a financial reporting
//! workbench. A ledger is uploaded, narrowed by entity and date, and turned
//! into a balance sheet, profit & loss and cash flow by an external statement
//! engine. Free-text questions are routed to at most one KPI calculation and
//! forwarded, with context, to an external reasoning service.
//!
//! ## Core Concepts
//!
//! - **Transaction store**: the uploaded ledger (source of truth) plus the
//!   subset currently on display
//! - **Filter criteria**: entity and inclusive ISO-date bounds; absent fields
//!   do not constrain
//! - **Statement triple**: always derived from exactly one transaction subset
//!   and replaced atomically. Replies to superseded filter changes are
//!   discarded; a failed regeneration keeps the previous triple
//! - **Intent routing**: an ordered keyword table picks one KPI operation (or
//!   none) per question
//! - **Conversation log**: append-only; only the last few entries travel as
//!   context
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_workbench::*;
//! use std::sync::Arc;
//!
//! let config = WorkbenchConfig::from_env()?;
//! let workbench = Workbench::new(Arc::new(ApiClient::from_config(&config)), &config);
//! let mut session = SessionState::with_greeting();
//!
//! workbench.upload(&mut session, "ledger.csv".as_ref()).await?;
//! let _ = workbench
//!     .change_filter(&mut session, FilterCriteria::from_inputs("Acme Pty Ltd", "2024-01-01", ""))
//!     .await;
//!
//! let outcome = workbench.ask(&mut session, "What's the revenue YTD?").await;
//! println!("{}", outcome.text().unwrap_or_default());
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod filter;
pub mod intent;
pub mod kpi;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod statements;
pub mod transaction;

#[cfg(feature = "http")]
pub mod client;

#[cfg(feature = "http")]
pub use client::ApiClient;
pub use config::WorkbenchConfig;
pub use conversation::{
    ChatContext, ChatRequest, ContextDecision, ConversationContextBuilder, ConversationLog,
    HistoryEntry, Message, Role,
};
pub use error::{OrchestrationError, Result, WorkbenchError};
pub use filter::{FilterCriteria, FilterEngine, FilterOutcome};
pub use intent::{IntentRouter, KpiOperation, RoutingDefaults};
pub use kpi::{KpiDispatcher, KpiEvidence, KpiResult};
pub use orchestrator::{CommittedStatements, StatementNotice, StatementOrchestrator, Ticket};
pub use services::*;
pub use session::{ChatOutcome, SessionState, UploadOutcome, Workbench};
pub use statements::{KeyFigures, KpiTargets, StatementTriple};
pub use transaction::{Transaction, TransactionStore, TransactionSummary};
