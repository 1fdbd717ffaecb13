//! Dashboard server state, router, and request handlers.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use arc_swap::ArcSwapOption;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use iris_analytics::{assemble_analytics_report, AnalyticsFeedConfig, AnalyticsFeedFetcher};
use iris_core::{current_unix_timestamp, current_unix_timestamp_ms};
use iris_executions::{
    ExecutionsClient, ExecutionsClientConfig, ExecutionsError, ExecutionsErrorCode,
    ExecutionsSummary,
};

pub const DASHBOARD_ANALYTICS_ENDPOINT: &str = "/dashboard/analytics";
pub const DASHBOARD_EXECUTIONS_ENDPOINT: &str = "/dashboard/executions";
pub const DASHBOARD_HEALTH_ENDPOINT: &str = "/dashboard/health";
pub const DASHBOARD_STATUS_ENDPOINT: &str = "/dashboard/status";

const DEFAULT_BIND: &str = "127.0.0.1:8787";
const DEFAULT_EXECUTIONS_CACHE_MS: u64 = 60_000;
const MAX_LAST_REASON_CODES: usize = 16;

#[derive(Debug, Clone)]
/// Public struct `DashboardServerConfig` assembled by the server binary.
pub struct DashboardServerConfig {
    pub bind: String,
    pub feeds: AnalyticsFeedConfig,
    pub executions: Option<ExecutionsClientConfig>,
    pub executions_cache_ms: u64,
}

impl Default for DashboardServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            feeds: AnalyticsFeedConfig::default(),
            executions: None,
            executions_cache_ms: DEFAULT_EXECUTIONS_CACHE_MS,
        }
    }
}

#[derive(Clone)]
/// Public struct `DashboardServerState` shared across request handlers.
pub struct DashboardServerState {
    feeds: AnalyticsFeedConfig,
    fetcher: AnalyticsFeedFetcher,
    executions_client: Option<ExecutionsClient>,
    executions_cache_ms: u64,
    executions_snapshot: Arc<ArcSwapOption<ExecutionsSnapshot>>,
    runtime: Arc<Mutex<DashboardRuntimeState>>,
    started_unix_seconds: u64,
}

#[derive(Debug, Clone, Copy)]
struct ExecutionsSnapshot {
    summary: ExecutionsSummary,
    fetched_unix_ms: u64,
}

#[derive(Debug, Default)]
struct DashboardRuntimeState {
    analytics_requests: u64,
    executions_requests: u64,
    voice_fetch_failures: u64,
    chat_fetch_failures: u64,
    degraded_analytics_responses: u64,
    executions_cache_hits: u64,
    executions_refreshes: u64,
    executions_failures: u64,
    executions_reason_code_counts: BTreeMap<String, u64>,
    last_executions_reason_codes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
/// Public struct `DashboardStatusReport` served by the status endpoint.
pub struct DashboardStatusReport {
    pub uptime_seconds: u64,
    pub analytics_requests: u64,
    pub executions_requests: u64,
    pub voice_fetch_failures: u64,
    pub chat_fetch_failures: u64,
    pub degraded_analytics_responses: u64,
    pub executions_cache_hits: u64,
    pub executions_refreshes: u64,
    pub executions_failures: u64,
    pub executions_reason_code_counts: BTreeMap<String, u64>,
    pub last_executions_reason_codes: Vec<String>,
}

impl DashboardServerState {
    pub fn new(config: DashboardServerConfig) -> anyhow::Result<Self> {
        let fetcher = AnalyticsFeedFetcher::new(config.feeds.clone())
            .context("failed to construct analytics feed fetcher")?;
        let executions_client = match config.executions {
            Some(executions_config) => Some(
                ExecutionsClient::new(executions_config)
                    .map_err(|error| anyhow::anyhow!("invalid executions config: {error}"))?,
            ),
            None => None,
        };
        Ok(Self {
            feeds: config.feeds,
            fetcher,
            executions_client,
            executions_cache_ms: config.executions_cache_ms.max(1),
            executions_snapshot: Arc::new(ArcSwapOption::from(None)),
            runtime: Arc::new(Mutex::new(DashboardRuntimeState::default())),
            started_unix_seconds: current_unix_timestamp(),
        })
    }

    fn record_analytics_request(&self, voice_failed: bool, chat_failed: bool, degraded: bool) {
        if let Ok(mut runtime) = self.runtime.lock() {
            runtime.analytics_requests = runtime.analytics_requests.saturating_add(1);
            if voice_failed {
                runtime.voice_fetch_failures = runtime.voice_fetch_failures.saturating_add(1);
            }
            if chat_failed {
                runtime.chat_fetch_failures = runtime.chat_fetch_failures.saturating_add(1);
            }
            if degraded {
                runtime.degraded_analytics_responses =
                    runtime.degraded_analytics_responses.saturating_add(1);
            }
        }
    }

    fn record_executions_request(&self) {
        if let Ok(mut runtime) = self.runtime.lock() {
            runtime.executions_requests = runtime.executions_requests.saturating_add(1);
        }
    }

    fn record_executions_cache_hit(&self) {
        if let Ok(mut runtime) = self.runtime.lock() {
            runtime.executions_cache_hits = runtime.executions_cache_hits.saturating_add(1);
        }
    }

    fn record_executions_refresh(&self) {
        if let Ok(mut runtime) = self.runtime.lock() {
            runtime.executions_refreshes = runtime.executions_refreshes.saturating_add(1);
        }
    }

    fn record_executions_failure(&self, reason_code: &str) {
        if let Ok(mut runtime) = self.runtime.lock() {
            runtime.executions_failures = runtime.executions_failures.saturating_add(1);
            *runtime
                .executions_reason_code_counts
                .entry(reason_code.to_string())
                .or_default() += 1;
            runtime
                .last_executions_reason_codes
                .push(reason_code.to_string());
            if runtime.last_executions_reason_codes.len() > MAX_LAST_REASON_CODES {
                let drop_count = runtime
                    .last_executions_reason_codes
                    .len()
                    .saturating_sub(MAX_LAST_REASON_CODES);
                runtime.last_executions_reason_codes.drain(0..drop_count);
            }
        }
    }

    pub fn collect_dashboard_status_report(&self) -> DashboardStatusReport {
        let uptime_seconds = current_unix_timestamp().saturating_sub(self.started_unix_seconds);
        if let Ok(runtime) = self.runtime.lock() {
            return DashboardStatusReport {
                uptime_seconds,
                analytics_requests: runtime.analytics_requests,
                executions_requests: runtime.executions_requests,
                voice_fetch_failures: runtime.voice_fetch_failures,
                chat_fetch_failures: runtime.chat_fetch_failures,
                degraded_analytics_responses: runtime.degraded_analytics_responses,
                executions_cache_hits: runtime.executions_cache_hits,
                executions_refreshes: runtime.executions_refreshes,
                executions_failures: runtime.executions_failures,
                executions_reason_code_counts: runtime.executions_reason_code_counts.clone(),
                last_executions_reason_codes: runtime.last_executions_reason_codes.clone(),
            };
        }

        DashboardStatusReport {
            uptime_seconds,
            ..DashboardStatusReport::default()
        }
    }
}

/// Binds the configured address and serves the dashboard router until
/// interrupted.
pub async fn run_dashboard_server(config: DashboardServerConfig) -> anyhow::Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;

    let state = Arc::new(DashboardServerState::new(config)?);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind dashboard server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound dashboard server address")?;

    println!(
        "dashboard server listening: endpoint={} addr={}",
        DASHBOARD_ANALYTICS_ENDPOINT, local_addr
    );

    let app = build_dashboard_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("dashboard server exited unexpectedly")
}

pub fn build_dashboard_router(state: Arc<DashboardServerState>) -> Router {
    Router::new()
        .route(DASHBOARD_ANALYTICS_ENDPOINT, get(handle_dashboard_analytics))
        .route(
            DASHBOARD_EXECUTIONS_ENDPOINT,
            get(handle_dashboard_executions),
        )
        .route(DASHBOARD_HEALTH_ENDPOINT, get(handle_dashboard_health))
        .route(DASHBOARD_STATUS_ENDPOINT, get(handle_dashboard_status))
        .with_state(state)
}

async fn handle_dashboard_analytics(State(state): State<Arc<DashboardServerState>>) -> Response {
    let (voice, chat) = state.fetcher.fetch_envelopes().await;
    let voice_configured = state
        .feeds
        .voice_feed_url
        .as_deref()
        .is_some_and(|url| !url.trim().is_empty());
    let chat_configured = state
        .feeds
        .chat_feed_url
        .as_deref()
        .is_some_and(|url| !url.trim().is_empty());
    let voice_failed = voice_configured && voice.is_none();
    let chat_failed = chat_configured && chat.is_none();
    let degraded = voice.is_none() && chat.is_none();
    state.record_analytics_request(voice_failed, chat_failed, degraded);

    let report = assemble_analytics_report(voice.as_ref(), chat.as_ref());
    (StatusCode::OK, Json(report)).into_response()
}

async fn handle_dashboard_executions(State(state): State<Arc<DashboardServerState>>) -> Response {
    state.record_executions_request();

    let Some(client) = state.executions_client.as_ref() else {
        let error = ExecutionsError {
            code: ExecutionsErrorCode::NotConfigured,
            retryable: false,
            message: "executions api is not configured".to_string(),
        };
        state.record_executions_failure(error.code.as_str());
        return executions_error_response(&error);
    };

    if let Some(snapshot) = state.executions_snapshot.load_full() {
        let age_ms = current_unix_timestamp_ms().saturating_sub(snapshot.fetched_unix_ms);
        if age_ms < state.executions_cache_ms {
            state.record_executions_cache_hit();
            return (StatusCode::OK, Json(snapshot.summary)).into_response();
        }
    }

    match client.fetch_execution_summary().await {
        Ok(summary) => {
            state.executions_snapshot.store(Some(Arc::new(
                ExecutionsSnapshot {
                    summary,
                    fetched_unix_ms: current_unix_timestamp_ms(),
                },
            )));
            state.record_executions_refresh();
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(error) => {
            tracing::warn!(
                code = error.code.as_str(),
                message = %error.message,
                "executions summary fetch failed"
            );
            state.record_executions_failure(error.code.as_str());
            executions_error_response(&error)
        }
    }
}

async fn handle_dashboard_health(State(state): State<Arc<DashboardServerState>>) -> Response {
    let uptime_seconds = current_unix_timestamp().saturating_sub(state.started_unix_seconds);
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "uptime_seconds": uptime_seconds,
            "generated_unix_ms": current_unix_timestamp_ms(),
        })),
    )
        .into_response()
}

async fn handle_dashboard_status(State(state): State<Arc<DashboardServerState>>) -> Response {
    (StatusCode::OK, Json(state.collect_dashboard_status_report())).into_response()
}

fn executions_http_status(code: ExecutionsErrorCode) -> StatusCode {
    match code {
        ExecutionsErrorCode::AuthFailed => StatusCode::UNAUTHORIZED,
        ExecutionsErrorCode::BackendUnavailable => StatusCode::BAD_GATEWAY,
        ExecutionsErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ExecutionsErrorCode::NotConfigured
        | ExecutionsErrorCode::InvalidResponse
        | ExecutionsErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn executions_error_response(error: &ExecutionsError) -> Response {
    (
        executions_http_status(error.code),
        Json(json!({
            "error": {
                "code": error.code.as_str(),
                "message": error.message,
                "retryable": error.retryable,
            }
        })),
    )
        .into_response()
}
