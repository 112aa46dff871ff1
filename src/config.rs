use crate::error::{Result, WorkbenchError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_DSO_PERIOD_DAYS: u32 = 30;
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Root URL of the backend hosting the statement, KPI and chat endpoints.
    pub api_base_url: String,
    /// How many of the most recent log entries are forwarded as history.
    pub history_window: usize,
    pub dso_period_days: u32,
    pub top_n: usize,
    pub base_currency: String,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
            dso_period_days: DEFAULT_DSO_PERIOD_DAYS,
            top_n: DEFAULT_TOP_N,
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
        }
    }
}

impl WorkbenchConfig {
    /// Defaults overridden by any `WORKBENCH_*` variables present in the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("WORKBENCH_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("WORKBENCH_HISTORY_WINDOW") {
            config.history_window = parse_var("WORKBENCH_HISTORY_WINDOW", &raw)?;
        }
        if let Some(raw) = lookup("WORKBENCH_DSO_DAYS") {
            config.dso_period_days = parse_var("WORKBENCH_DSO_DAYS", &raw)?;
        }
        if let Some(raw) = lookup("WORKBENCH_TOP_N") {
            config.top_n = parse_var("WORKBENCH_TOP_N", &raw)?;
        }
        if let Some(currency) = lookup("WORKBENCH_BASE_CURRENCY") {
            config.base_currency = currency.trim().to_uppercase();
        }

        Ok(config)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| WorkbenchError::Config {
        key: key.to_string(),
        details: format!("'{}': {}", raw, e),
    })
}
