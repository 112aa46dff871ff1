use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Field names that may carry the owning entity, in priority order.
pub const ENTITY_ALIASES: [&str; 3] = ["entity", "subsidiary", "company"];

const ACCOUNT_ALIASES: [&str; 2] = ["account", "Account"];
const SUMMARY_DATE_ALIASES: [&str; 3] = ["date", "Date", "transaction_date"];

/// A ledger row as delivered by the upload endpoint.
///
/// Only `date` and the entity aliases are interpreted; every other column is
/// carried through untouched to the statement engine and KPI services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(Map<String, Value>);

impl Transaction {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// ISO-8601 date string. Compared lexically, never parsed.
    pub fn date(&self) -> Option<&str> {
        self.field_str("date")
    }

    /// First non-empty string among `entity`, `subsidiary`, `company`.
    pub fn entity(&self) -> Option<&str> {
        ENTITY_ALIASES.iter().find_map(|key| self.field_str(key))
    }

    fn first_of<'a>(&'a self, keys: &[&str]) -> Option<&'a str> {
        keys.iter()
            .find_map(|key| self.field_str(key))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl From<Value> for Transaction {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }
}

/// Source-of-truth ledger plus the subset currently on display.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    all: Vec<Transaction>,
    displayed: Vec<Transaction>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly uploaded ledger; the display resets to all of it.
    pub fn replace(&mut self, transactions: Vec<Transaction>) {
        self.displayed = transactions.clone();
        self.all = transactions;
    }

    pub fn set_displayed(&mut self, transactions: Vec<Transaction>) {
        self.displayed = transactions;
    }

    pub fn all(&self) -> &[Transaction] {
        &self.all
    }

    pub fn displayed(&self) -> &[Transaction] {
        &self.displayed
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Headline facts about an uploaded ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_rows: usize,
    pub unique_accounts: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl TransactionSummary {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let accounts: BTreeSet<&str> = transactions
            .iter()
            .filter_map(|t| t.first_of(&ACCOUNT_ALIASES))
            .collect();

        let dates: BTreeSet<NaiveDate> = transactions
            .iter()
            .filter_map(|t| t.first_of(&SUMMARY_DATE_ALIASES))
            .filter_map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            .collect();

        Self {
            total_rows: transactions.len(),
            unique_accounts: accounts.len(),
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
        }
    }

    pub fn date_range_label(&self) -> String {
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) if first == last => first.format("%b %-d, %Y").to_string(),
            (Some(first), Some(last)) => format!(
                "{} - {}",
                first.format("%b %-d, %Y"),
                last.format("%b %-d, %Y")
            ),
            _ => "N/A".to_string(),
        }
    }
}
