use crate::config::WorkbenchConfig;
use crate::conversation::ChatRequest;
use crate::error::{Result, WorkbenchError};
use crate::intent::KpiOperation;
use crate::services::{HealthProbe, KpiService, ReasoningService, StatementEngine, TransactionSource};
use crate::statements::{KeyFigures, KpiTargets, StatementTriple};
use crate::transaction::Transaction;
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const UPLOAD_PATH: &str = "/api/upload-csv";
const STATEMENTS_PATH: &str = "/api/generate-statements";
const CHAT_PATH: &str = "/api/ai/chat";
const KPI_ANALYSIS_PATH: &str = "/api/ai/kpi-analysis";
const FX_RATES_PATH: &str = "/api/fx/rates";
const HEALTH_PATH: &str = "/api/health";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

impl From<reqwest::Error> for WorkbenchError {
    fn from(e: reqwest::Error) -> Self {
        WorkbenchError::Transport {
            connectivity: e.is_connect() || e.is_timeout(),
            message: e.to_string(),
        }
    }
}

/// HTTP binding for every collaborator the workbench talks to.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &WorkbenchConfig) -> Self {
        Self::new(config.api_base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: &Value, fallback: &str) -> Result<Value> {
        debug!("POST {}", path);
        let res = self.client.post(self.url(path)).json(body).send().await?;
        let res = ensure_success(res, fallback).await?;
        Ok(res.json().await?)
    }
}

/// Turns a non-2xx reply into `WorkbenchError::Status`, preferring the
/// service's own `detail`/`message` text.
async fn ensure_success(res: Response, fallback: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<Value>(&text) {
        Ok(body) => body
            .get("detail")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(_) => (!text.trim().is_empty()).then(|| text.clone()),
    }
    .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), fallback));

    Err(WorkbenchError::Status {
        status: status.as_u16(),
        detail,
    })
}

fn kpi_path(operation: &KpiOperation) -> Option<&'static str> {
    match operation {
        KpiOperation::RevenueYtd => Some("/api/kpi/revenue-ytd"),
        KpiOperation::RevenueVariance => Some("/api/kpi/revenue-variance"),
        KpiOperation::Trailing3M => Some("/api/kpi/trailing-3m"),
        KpiOperation::TopN { .. } => Some("/api/kpi/top-n"),
        KpiOperation::UnusualTransactions => Some("/api/kpi/unusual-transactions"),
        KpiOperation::ArAging { .. } => Some("/api/kpi/ar-aging"),
        KpiOperation::Dso { .. } => Some("/api/kpi/dso"),
        KpiOperation::FxRate { .. } | KpiOperation::None => None,
    }
}

fn kpi_body(operation: &KpiOperation, transactions: &[Transaction], entity: Option<&str>) -> Value {
    let mut body = json!({ "transactions": transactions, "entity": entity });
    match operation {
        KpiOperation::TopN { n } => body["n"] = json!(n),
        KpiOperation::ArAging { as_of_date } => body["as_of_date"] = json!(as_of_date),
        KpiOperation::Dso { period_days } => body["period_days"] = json!(period_days),
        _ => {}
    }
    body
}

#[async_trait]
impl StatementEngine for ApiClient {
    async fn generate(&self, transactions: &[Transaction]) -> Result<StatementTriple> {
        let body = json!({ "data": { "transactions": transactions } });
        let reply = self
            .post_json(STATEMENTS_PATH, &body, "Failed to regenerate statements")
            .await?;
        StatementTriple::from_response(&reply)
    }
}

#[async_trait]
impl KpiService for ApiClient {
    async fn calculate(
        &self,
        operation: &KpiOperation,
        transactions: &[Transaction],
        entity: Option<&str>,
    ) -> Result<Value> {
        if let KpiOperation::FxRate {
            base_currency,
            date,
        } = operation
        {
            let mut query = vec![("base_currency", base_currency.as_str())];
            if let Some(date) = date {
                query.push(("date", date.as_str()));
            }
            debug!("GET {} {:?}", FX_RATES_PATH, query);
            let res = self
                .client
                .get(self.url(FX_RATES_PATH))
                .query(&query)
                .send()
                .await?;
            let res = ensure_success(res, "Failed to fetch FX rates").await?;
            return Ok(res.json().await?);
        }

        let path = kpi_path(operation).ok_or_else(|| {
            WorkbenchError::MalformedResponse(format!(
                "No KPI endpoint for operation '{}'",
                operation.label()
            ))
        })?;
        self.post_json(
            path,
            &kpi_body(operation, transactions, entity),
            "KPI calculation failed",
        )
        .await
    }

    async fn analyze_targets(&self, figures: &KeyFigures, targets: &KpiTargets) -> Result<Value> {
        let body = json!({
            "financial_data": figures.labelled(),
            "kpi_targets": targets.0,
        });
        self.post_json(KPI_ANALYSIS_PATH, &body, "Failed to generate KPI analysis")
            .await
    }
}

#[async_trait]
impl ReasoningService for ApiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        debug!(
            "Sending chat request: {} chars, {} transactions, statements: {}, entity: {:?}",
            request.message.len(),
            request.transactions.as_ref().map_or(0, Vec::len),
            request.financial_data.is_some(),
            request.entity
        );
        let res = self.client.post(self.url(CHAT_PATH)).json(request).send().await?;
        let res = ensure_success(res, "Failed to get AI response").await?;
        let body: Value = res.json().await?;

        let text = body
            .get("response")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| body.pointer("/data/response").and_then(Value::as_str))
            .unwrap_or_default();
        Ok(text.to_string())
    }
}

#[async_trait]
impl HealthProbe for ApiClient {
    async fn health(&self) -> Result<()> {
        let res = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        ensure_success(res, "Health check failed").await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionSource for ApiClient {
    async fn upload(&self, path: &Path) -> Result<Vec<Transaction>> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| WorkbenchError::MalformedResponse("Invalid file name".to_string()))?
            .to_string();
        let bytes = fs::read(path).await?;

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let res = self
            .client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        let res = ensure_success(res, "Failed to upload CSV").await?;
        let body: Value = res.json().await?;

        let rows = body
            .get("transactions")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                WorkbenchError::MalformedResponse("Upload response missing 'transactions'".to_string())
            })?;
        Ok(rows.iter().cloned().map(Transaction::from).collect())
    }
}
