//! Contracts for the external collaborators the workbench drives.
//!
//! `ApiClient` implements every trait over HTTP; tests substitute in-memory
//! doubles.

use crate::conversation::ChatRequest;
use crate::error::Result;
use crate::intent::KpiOperation;
use crate::statements::{KeyFigures, KpiTargets, StatementTriple};
use crate::transaction::Transaction;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

#[async_trait]
pub trait StatementEngine: Send + Sync {
    /// Derives the three statements from a non-empty transaction set.
    async fn generate(&self, transactions: &[Transaction]) -> Result<StatementTriple>;
}

#[async_trait]
pub trait KpiService: Send + Sync {
    /// Runs one KPI calculation and returns the raw reply body, which carries
    /// its result under `data`.
    async fn calculate(
        &self,
        operation: &KpiOperation,
        transactions: &[Transaction],
        entity: Option<&str>,
    ) -> Result<Value>;

    /// Measures statement key figures against targets.
    async fn analyze_targets(&self, figures: &KeyFigures, targets: &KpiTargets) -> Result<Value>;
}

#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Returns the assistant's reply text, empty when the service produced none.
    async fn chat(&self, request: &ChatRequest) -> Result<String>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn health(&self) -> Result<()>;
}

#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<Vec<Transaction>>;
}

/// Everything a `Workbench` needs from the outside world.
pub trait Backend:
    StatementEngine + KpiService + ReasoningService + HealthProbe + TransactionSource
{
}

impl<T> Backend for T where
    T: StatementEngine + KpiService + ReasoningService + HealthProbe + TransactionSource
{
}
