use crate::filter::{FilterCriteria, FilterEngine};
use crate::intent::KpiOperation;
use crate::services::KpiService;
use crate::transaction::Transaction;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub operation: KpiOperation,
    pub data: Value,
}

impl KpiResult {
    /// Labelled block appended to the outbound question.
    pub fn as_context_block(&self) -> String {
        let pretty =
            serde_json::to_string_pretty(&self.data).unwrap_or_else(|_| self.data.to_string());
        format!("KPI Calculation Result:\n{}", pretty)
    }
}

/// What the KPI stage contributed to an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum KpiEvidence {
    /// The question did not route to any calculation.
    Skipped,
    Found(KpiResult),
    /// The calculation failed or came back empty; the answer proceeds without it.
    Unavailable(String),
}

impl KpiEvidence {
    pub fn result(&self) -> Option<&KpiResult> {
        match self {
            KpiEvidence::Found(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<KpiResult> {
        match self {
            KpiEvidence::Found(result) => Some(result),
            _ => None,
        }
    }
}

pub struct KpiDispatcher<K: ?Sized> {
    service: Arc<K>,
}

impl<K> KpiDispatcher<K>
where
    K: KpiService + ?Sized,
{
    pub fn new(service: Arc<K>) -> Self {
        Self { service }
    }

    /// Runs `operation` against the ledger narrowed to `entity` only. Date
    /// filters never apply here.
    pub async fn dispatch(
        &self,
        operation: &KpiOperation,
        transactions: &[Transaction],
        entity: Option<&str>,
    ) -> KpiEvidence {
        if operation.is_none() {
            return KpiEvidence::Skipped;
        }

        let scope = FilterCriteria {
            entity: entity.map(str::to_string),
            ..FilterCriteria::open()
        };
        let scoped = FilterEngine::filter(transactions, &scope);
        debug!(
            "Dispatching {} over {} transactions (entity: {:?})",
            operation.label(),
            scoped.len(),
            entity
        );

        match self.service.calculate(operation, &scoped, entity).await {
            Ok(body) => match extract_data(body) {
                Some(data) => KpiEvidence::Found(KpiResult {
                    operation: operation.clone(),
                    data,
                }),
                None => {
                    debug!("{} returned no data", operation.label());
                    KpiEvidence::Unavailable(format!("{} returned no data", operation.label()))
                }
            },
            Err(e) => {
                warn!("{} calculation failed: {}", operation.label(), e);
                KpiEvidence::Unavailable(e.to_string())
            }
        }
    }
}

fn extract_data(body: Value) -> Option<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(Value::Object(fields)) if fields.is_empty() => None,
            Some(data) => Some(data),
        },
        _ => None,
    }
}
