use crate::error::{Result, WorkbenchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Balance sheet, profit & loss and cash flow documents derived from one
/// transaction subset. The documents themselves are opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTriple {
    pub balance_sheet: Value,
    pub profit_loss: Value,
    pub cash_flow: Value,
}

impl StatementTriple {
    /// Pulls the three documents out of a statement-engine reply. Any missing
    /// or null document rejects the whole reply.
    pub fn from_response(body: &Value) -> Result<Self> {
        let take = |key: &str| -> Result<Value> {
            match body.get(key) {
                Some(Value::Null) | None => Err(WorkbenchError::MalformedResponse(
                    "Invalid response format from server".to_string(),
                )),
                Some(v) => Ok(v.clone()),
            }
        };

        Ok(Self {
            balance_sheet: take("balance_sheet")?,
            profit_loss: take("profit_loss")?,
            cash_flow: take("cash_flow")?,
        })
    }

    pub fn key_figures(&self) -> KeyFigures {
        KeyFigures {
            net_income: number_at(&self.profit_loss, &["net_income"]),
            total_revenue: number_at(&self.profit_loss, &["revenue", "total"]),
            total_assets: number_at(&self.balance_sheet, &["assets", "total"]),
        }
    }
}

fn number_at(doc: &Value, path: &[&str]) -> Option<f64> {
    path.iter()
        .try_fold(doc, |node, key| node.get(*key))
        .and_then(Value::as_f64)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFigures {
    pub net_income: Option<f64>,
    pub total_revenue: Option<f64>,
    pub total_assets: Option<f64>,
}

impl KeyFigures {
    /// Labelled figures in the shape the KPI-analysis endpoint expects.
    /// Figures the statements do not carry are left out.
    pub fn labelled(&self) -> BTreeMap<String, f64> {
        [
            ("Net Income", self.net_income),
            ("Total Revenue", self.total_revenue),
            ("Total Assets", self.total_assets),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label.to_string(), v)))
        .collect()
    }
}

/// Targets the key figures are measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiTargets(pub BTreeMap<String, f64>);

impl Default for KpiTargets {
    fn default() -> Self {
        Self(
            [
                ("Net Income".to_string(), 100_000.0),
                ("Total Revenue".to_string(), 500_000.0),
                ("Total Assets".to_string(), 1_000_000.0),
            ]
            .into_iter()
            .collect(),
        )
    }
}
