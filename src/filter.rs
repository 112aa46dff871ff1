//! Entity and date narrowing of the ledger.
//!
//! Dates are compared as plain strings. That is only correct for zero-padded
//! ISO-8601 values (`YYYY-MM-DD`), which is the sole supported input format;
//! nothing here validates or parses them.

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A complete filter selection. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub entity: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterCriteria {
    /// Criteria that keep every transaction.
    pub fn open() -> Self {
        Self::default()
    }

    /// Builds criteria from raw form values, where an empty string means
    /// "no constraint".
    pub fn from_inputs(entity: &str, start_date: &str, end_date: &str) -> Self {
        fn non_empty(s: &str) -> Option<String> {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }

        Self {
            entity: non_empty(entity),
            start_date: non_empty(start_date),
            end_date: non_empty(end_date),
        }
    }

    /// Same entity constraint, no date window.
    pub fn entity_scope(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.entity.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(wanted) = &self.entity {
            if transaction.entity() != Some(wanted.as_str()) {
                return false;
            }
        }

        // Undated rows are never excluded by a date bound.
        if let Some(date) = transaction.date() {
            if let Some(start) = &self.start_date {
                if date < start.as_str() {
                    return false;
                }
            }
            if let Some(end) = &self.end_date {
                if date > end.as_str() {
                    return false;
                }
            }
        }

        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub transactions: Vec<Transaction>,
    /// Sorted, de-duplicated entities of the unfiltered input.
    pub entities: Vec<String>,
}

pub struct FilterEngine;

impl FilterEngine {
    pub fn apply(transactions: &[Transaction], criteria: &FilterCriteria) -> FilterOutcome {
        FilterOutcome {
            transactions: Self::filter(transactions, criteria),
            entities: Self::entities(transactions),
        }
    }

    pub fn filter(transactions: &[Transaction], criteria: &FilterCriteria) -> Vec<Transaction> {
        if criteria.is_open() {
            return transactions.to_vec();
        }

        transactions
            .iter()
            .filter(|t| criteria.matches(t))
            .cloned()
            .collect()
    }

    pub fn entities(transactions: &[Transaction]) -> Vec<String> {
        transactions
            .iter()
            .filter_map(Transaction::entity)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
