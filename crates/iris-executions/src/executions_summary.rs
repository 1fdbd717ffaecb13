//! Client and summary math for the workflow-automation executions API.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use iris_core::parse_started_at;

const DEFAULT_EXECUTIONS_TIMEOUT_MS: u64 = 10_000;
const MAX_ERROR_BODY_CHARS: usize = 512;
const EXECUTIONS_PATH: &str = "/api/v1/executions";
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ExecutionsErrorCode` values.
pub enum ExecutionsErrorCode {
    NotConfigured,
    AuthFailed,
    Timeout,
    BackendUnavailable,
    InvalidResponse,
    Unknown,
}

impl ExecutionsErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionsErrorCode::NotConfigured => "not_configured",
            ExecutionsErrorCode::AuthFailed => "auth_failed",
            ExecutionsErrorCode::Timeout => "timeout",
            ExecutionsErrorCode::BackendUnavailable => "backend_unavailable",
            ExecutionsErrorCode::InvalidResponse => "invalid_response",
            ExecutionsErrorCode::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `ExecutionsError` carried to the gateway error payload.
pub struct ExecutionsError {
    pub code: ExecutionsErrorCode,
    pub retryable: bool,
    pub message: String,
}

impl ExecutionsError {
    fn not_configured(message: impl Into<String>) -> Self {
        Self {
            code: ExecutionsErrorCode::NotConfigured,
            retryable: false,
            message: message.into(),
        }
    }

    fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            code: ExecutionsErrorCode::InvalidResponse,
            retryable: false,
            message: message.into(),
        }
    }

    fn backend_unavailable(message: impl Into<String>) -> Self {
        Self {
            code: ExecutionsErrorCode::BackendUnavailable,
            retryable: true,
            message: message.into(),
        }
    }

    fn timeout(message: impl Into<String>) -> Self {
        Self {
            code: ExecutionsErrorCode::Timeout,
            retryable: true,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExecutionsError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "executions error: code={:?} retryable={} message={}",
            self.code, self.retryable, self.message
        )
    }
}

impl std::error::Error for ExecutionsError {}

pub type ExecutionsResult<T> = Result<T, ExecutionsError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `ExecutionsClientConfig` for the automation-platform API.
pub struct ExecutionsClientConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ExecutionsClientConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: None,
            timeout_ms: DEFAULT_EXECUTIONS_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
/// Public struct `ExecutionsSummary` returned by the executions endpoint.
pub struct ExecutionsSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub running: u64,
    pub success_rate_percent: f64,
    pub average_duration_seconds: f64,
}

#[derive(Debug, Clone)]
/// Public struct `ExecutionsClient` fetching and summarizing executions.
pub struct ExecutionsClient {
    config: ExecutionsClientConfig,
    client: Client,
}

impl ExecutionsClient {
    pub fn new(config: ExecutionsClientConfig) -> ExecutionsResult<Self> {
        if config.api_base.trim().is_empty() {
            return Err(ExecutionsError::not_configured(
                "executions api_base must not be empty",
            ));
        }
        if config
            .api_key
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty()
        {
            return Err(ExecutionsError::not_configured(
                "executions api_key must not be empty",
            ));
        }

        let client = Client::builder().build().map_err(|error| {
            ExecutionsError::backend_unavailable(format!(
                "failed to initialize http client: {error}"
            ))
        })?;

        let mut normalized = config;
        normalized.api_base = normalized.api_base.trim().trim_end_matches('/').to_string();
        normalized.api_key = normalized
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        normalized.timeout_ms = normalized.timeout_ms.max(1);

        Ok(Self {
            config: normalized,
            client,
        })
    }

    fn endpoint_url(&self) -> String {
        format!("{}{}", self.config.api_base, EXECUTIONS_PATH)
    }

    /// Fetches the execution list and reduces it to summary counts.
    pub async fn fetch_execution_summary(&self) -> ExecutionsResult<ExecutionsSummary> {
        let mut builder = self
            .client
            .get(self.endpoint_url())
            .timeout(Duration::from_millis(self.config.timeout_ms));
        if let Some(api_key) = self.config.api_key.as_deref() {
            builder = builder.header(API_KEY_HEADER, api_key);
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                ExecutionsError::timeout("executions request timed out")
            } else {
                ExecutionsError::backend_unavailable(format!(
                    "executions request failed: {error}"
                ))
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(map_http_status_error(status, &body));
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|error| {
            ExecutionsError::invalid_response(format!("invalid json response: {error}"))
        })?;
        let records = parsed
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ExecutionsError::invalid_response("response is missing the data array")
            })?;
        Ok(summarize_executions(records))
    }
}

/// Reduces raw execution records to counts, success rate, and average
/// duration. Records with missing fields are tolerated.
pub fn summarize_executions(records: &[Value]) -> ExecutionsSummary {
    let mut summary = ExecutionsSummary::default();
    let mut completed_duration_total = 0.0_f64;
    let mut completed_duration_count = 0u64;

    for record in records {
        let Some(record) = record.as_object() else {
            continue;
        };
        summary.total = summary.total.saturating_add(1);

        let status = record
            .get("status")
            .and_then(Value::as_str)
            .map(|raw| raw.trim().to_lowercase());
        let finished = record.get("finished").and_then(Value::as_bool);

        let completed = match status.as_deref() {
            Some("success") => {
                summary.succeeded = summary.succeeded.saturating_add(1);
                true
            }
            Some("error") | Some("failed") | Some("crashed") => {
                summary.failed = summary.failed.saturating_add(1);
                true
            }
            Some("running") | Some("waiting") | Some("new") => {
                summary.running = summary.running.saturating_add(1);
                false
            }
            _ => match finished {
                Some(true) => {
                    summary.succeeded = summary.succeeded.saturating_add(1);
                    true
                }
                Some(false) => {
                    summary.running = summary.running.saturating_add(1);
                    false
                }
                None => false,
            },
        };

        if completed {
            if let Some(duration) = execution_duration_seconds(record) {
                completed_duration_total += duration;
                completed_duration_count = completed_duration_count.saturating_add(1);
            }
        }
    }

    let completed = summary.succeeded.saturating_add(summary.failed);
    if completed > 0 {
        summary.success_rate_percent =
            round_1dp(summary.succeeded as f64 * 100.0 / completed as f64);
    }
    if completed_duration_count > 0 {
        summary.average_duration_seconds =
            round_2dp(completed_duration_total / completed_duration_count as f64);
    }
    summary
}

fn execution_duration_seconds(record: &serde_json::Map<String, Value>) -> Option<f64> {
    let started = record
        .get("startedAt")
        .and_then(Value::as_str)
        .and_then(parse_started_at)?;
    let stopped = record
        .get("stoppedAt")
        .and_then(Value::as_str)
        .and_then(parse_started_at)?;
    let millis = stopped.signed_duration_since(started).num_milliseconds();
    if millis < 0 {
        return None;
    }
    Some(millis as f64 / 1_000.0)
}

fn round_1dp(raw: f64) -> f64 {
    (raw * 10.0).round() / 10.0
}

fn round_2dp(raw: f64) -> f64 {
    (raw * 100.0).round() / 100.0
}

fn map_http_status_error(status: StatusCode, body: &str) -> ExecutionsError {
    let message = format!(
        "status={} body={}",
        status.as_u16(),
        truncate_error_body(body)
    );

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ExecutionsError {
            code: ExecutionsErrorCode::AuthFailed,
            retryable: false,
            message,
        };
    }
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        return ExecutionsError {
            code: ExecutionsErrorCode::Timeout,
            retryable: true,
            message,
        };
    }
    if status.is_server_error() {
        return ExecutionsError {
            code: ExecutionsErrorCode::BackendUnavailable,
            retryable: true,
            message,
        };
    }
    ExecutionsError {
        code: ExecutionsErrorCode::Unknown,
        retryable: false,
        message,
    }
}

fn truncate_error_body(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let truncated = trimmed
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect::<String>();
    format!("{truncated}...")
}
