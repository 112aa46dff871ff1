//! Keyword routing from a free-text question to at most one KPI calculation.
//!
//! Rules are evaluated top to bottom and the first match wins. The trailing
//! window rule sits above the variance rule so a question about a rolling
//! three-month window is never swallowed by the broader "variance" keyword.

use crate::config::WorkbenchConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum KpiOperation {
    RevenueYtd,
    RevenueVariance,
    Trailing3M,
    TopN { n: usize },
    UnusualTransactions,
    ArAging { as_of_date: Option<String> },
    Dso { period_days: u32 },
    FxRate {
        base_currency: String,
        date: Option<String>,
    },
    None,
}

impl KpiOperation {
    pub fn label(&self) -> &'static str {
        match self {
            KpiOperation::RevenueYtd => "revenue YTD",
            KpiOperation::RevenueVariance => "revenue variance",
            KpiOperation::Trailing3M => "trailing 3 months",
            KpiOperation::TopN { .. } => "top N revenue",
            KpiOperation::UnusualTransactions => "unusual transactions",
            KpiOperation::ArAging { .. } => "AR aging",
            KpiOperation::Dso { .. } => "DSO",
            KpiOperation::FxRate { .. } => "FX rates",
            KpiOperation::None => "none",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, KpiOperation::None)
    }
}

/// Parameter defaults applied to the operations the router builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDefaults {
    pub top_n: usize,
    pub dso_period_days: u32,
    pub base_currency: String,
}

impl Default for RoutingDefaults {
    fn default() -> Self {
        Self::from(&WorkbenchConfig::default())
    }
}

impl From<&WorkbenchConfig> for RoutingDefaults {
    fn from(config: &WorkbenchConfig) -> Self {
        Self {
            top_n: config.top_n,
            dso_period_days: config.dso_period_days,
            base_currency: config.base_currency.clone(),
        }
    }
}

/// One row of the routing table. Predicates receive the lowercased question.
pub struct IntentRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub build: fn(&str, &RoutingDefaults) -> KpiOperation,
}

pub struct IntentRouter {
    rules: Vec<IntentRule>,
    defaults: RoutingDefaults,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new(RoutingDefaults::default())
    }
}

impl IntentRouter {
    pub fn new(defaults: RoutingDefaults) -> Self {
        Self {
            rules: default_rules(),
            defaults,
        }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn classify(&self, question: &str) -> KpiOperation {
        let lowered = question.to_lowercase();
        self.rules
            .iter()
            .find(|rule| (rule.matches)(&lowered))
            .map(|rule| (rule.build)(&lowered, &self.defaults))
            .unwrap_or(KpiOperation::None)
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

fn date_token(text: &str) -> Option<String> {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid date pattern"))
        .find(text)
        .map(|m| m.as_str().to_string())
}

fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule {
            name: "revenue_ytd",
            matches: |q| {
                contains_any(
                    q,
                    &[
                        "revenue ytd",
                        "ytd revenue",
                        "year to date revenue",
                        "year-to-date revenue",
                    ],
                )
            },
            build: |_, _| KpiOperation::RevenueYtd,
        },
        IntentRule {
            name: "trailing_3m",
            matches: |q| contains_any(q, &["trailing 3", "trailing three", "3 months", "three months"]),
            build: |_, _| KpiOperation::Trailing3M,
        },
        IntentRule {
            name: "revenue_variance",
            matches: |q| q.contains("variance"),
            build: |_, _| KpiOperation::RevenueVariance,
        },
        IntentRule {
            name: "top_n",
            matches: |q| has_word(q, "top") && contains_any(q, &["revenue", "transaction"]),
            build: |_, d| KpiOperation::TopN { n: d.top_n },
        },
        IntentRule {
            name: "unusual_transactions",
            matches: |q| contains_any(q, &["unusual", "weekend"]),
            build: |_, _| KpiOperation::UnusualTransactions,
        },
        IntentRule {
            name: "ar_aging",
            matches: |q| contains_any(q, &["aging", "ageing"]),
            build: |q, _| KpiOperation::ArAging {
                as_of_date: date_token(q),
            },
        },
        IntentRule {
            name: "dso",
            matches: |q| has_word(q, "dso") || q.contains("days sales outstanding"),
            build: |_, d| KpiOperation::Dso {
                period_days: d.dso_period_days,
            },
        },
        IntentRule {
            name: "fx_rate",
            matches: |q| contains_any(q, &["fx rate", "exchange rate", "forex"]),
            build: |q, d| KpiOperation::FxRate {
                base_currency: d.base_currency.clone(),
                date: date_token(q),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> KpiOperation {
        IntentRouter::default().classify(q)
    }

    #[test]
    fn test_documented_examples() {
        assert_eq!(classify("What's the revenue YTD?"), KpiOperation::RevenueYtd);
        assert_eq!(
            classify("Calculate trailing 3 months rolling revenue"),
            KpiOperation::Trailing3M
        );
        assert_eq!(
            classify("Compare revenue across all subsidiaries"),
            KpiOperation::None
        );
    }

    #[test]
    fn test_trailing_window_beats_variance() {
        assert_eq!(
            classify("Show the variance over the trailing 3 months"),
            KpiOperation::Trailing3M
        );
        assert_eq!(
            classify("Explain the revenue variance"),
            KpiOperation::RevenueVariance
        );
    }

    #[test]
    fn test_first_match_wins_for_ytd() {
        assert_eq!(
            classify("YTD revenue variance please"),
            KpiOperation::RevenueYtd
        );
    }

    #[test]
    fn test_top_requires_subject_and_whole_word() {
        assert_eq!(
            classify("Top 10 revenue transactions"),
            KpiOperation::TopN { n: 10 }
        );
        assert_eq!(classify("What are the top customers?"), KpiOperation::None);
        assert_eq!(
            classify("Why did revenue stop growing?"),
            KpiOperation::None
        );
    }

    #[test]
    fn test_remaining_rules() {
        assert_eq!(
            classify("Any weekend postings?"),
            KpiOperation::UnusualTransactions
        );
        assert_eq!(
            classify("Show AR aging"),
            KpiOperation::ArAging { as_of_date: None }
        );
        assert_eq!(
            classify("What's our DSO?"),
            KpiOperation::Dso { period_days: 30 }
        );
        assert_eq!(
            classify("days sales outstanding trend"),
            KpiOperation::Dso { period_days: 30 }
        );
    }

    #[test]
    fn test_fx_extracts_date_token() {
        assert_eq!(
            classify("What was the EUR exchange rate on 2024-03-31?"),
            KpiOperation::FxRate {
                base_currency: "USD".to_string(),
                date: Some("2024-03-31".to_string()),
            }
        );
        assert_eq!(
            classify("Current FX rate"),
            KpiOperation::FxRate {
                base_currency: "USD".to_string(),
                date: None,
            }
        );
    }

    #[test]
    fn test_defaults_flow_into_parameters() {
        let router = IntentRouter::new(RoutingDefaults {
            top_n: 5,
            dso_period_days: 90,
            base_currency: "AUD".to_string(),
        });
        assert_eq!(
            router.classify("top 5 revenue lines"),
            KpiOperation::TopN { n: 5 }
        );
        assert_eq!(
            router.classify("DSO"),
            KpiOperation::Dso { period_days: 90 }
        );
    }

    #[test]
    fn test_rule_order_is_auditable() {
        let router = IntentRouter::default();
        let names: Vec<_> = router.rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "revenue_ytd",
                "trailing_3m",
                "revenue_variance",
                "top_n",
                "unusual_transactions",
                "ar_aging",
                "dso",
                "fx_rate"
            ]
        );
    }
}
