use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use iris_analytics::AnalyticsFeedConfig;
use iris_executions::ExecutionsClientConfig;
use iris_gateway::{
    build_dashboard_router, DashboardServerConfig, DashboardServerState,
    DASHBOARD_ANALYTICS_ENDPOINT, DASHBOARD_EXECUTIONS_ENDPOINT, DASHBOARD_HEALTH_ENDPOINT,
    DASHBOARD_STATUS_ENDPOINT,
};

async fn spawn_router(app: Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("resolve stub addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, handle)
}

async fn spawn_dashboard(
    config: DashboardServerConfig,
) -> (
    SocketAddr,
    Arc<DashboardServerState>,
    tokio::task::JoinHandle<()>,
) {
    let state = Arc::new(DashboardServerState::new(config).expect("build dashboard state"));
    let app = build_dashboard_router(Arc::clone(&state));
    let (addr, handle) = spawn_router(app).await;
    (addr, state, handle)
}

async fn get_json(url: &str) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.expect("request dashboard");
    let status = StatusCode::from_u16(response.status().as_u16()).expect("map status");
    let body = response.text().await.expect("read body");
    let value = serde_json::from_str::<Value>(&body).expect("parse body json");
    (status, value)
}

fn feed_config(voice_url: Option<String>, chat_url: Option<String>) -> AnalyticsFeedConfig {
    AnalyticsFeedConfig {
        voice_feed_url: voice_url,
        chat_feed_url: chat_url,
        timeout_ms: 2_000,
    }
}

#[tokio::test]
async fn integration_report_is_assembled_from_wrapped_webhook_envelopes() {
    let string_encoded = serde_json::to_string(&json!({
        "voice_analytics": {
            "summary": {"total_calls": 0, "total_cost": 0},
            "recent_calls": [
                {"id": "call-1", "started_at": "2024-01-01T09:00:00Z",
                 "duration": 60, "price": "1.25", "transcript": "caller: hi"},
            ]
        }
    }))
    .expect("encode voice element");
    let voice_body = json!([
        string_encoded,
        {"json": {
            "voice_analytics": {
                "summary": {"average_duration_seconds": 90.0},
                "recent_calls": [
                    {"id": "call-2", "started_at": "2024-01-02T09:00:00Z",
                     "duration": 120, "price": 2.75},
                ]
            }
        }},
    ]);
    let chat_body = json!({
        "chat_analytics": {
            "summary": {},
            "recent_sessions": [
                {"id": "sess-1", "started_at": "2024-01-03T08:00:00Z",
                 "duration_seconds": 30,
                 "dialogue": "User: Hello\nBot: Hi there"},
            ]
        }
    });
    let upstream = Router::new()
        .route("/voice", get(move || async move { axum::Json(voice_body) }))
        .route("/chat", get(move || async move { axum::Json(chat_body) }));
    let (upstream_addr, upstream_handle) = spawn_router(upstream).await;

    let config = DashboardServerConfig {
        feeds: feed_config(
            Some(format!("http://{upstream_addr}/voice")),
            Some(format!("http://{upstream_addr}/chat")),
        ),
        ..DashboardServerConfig::default()
    };
    let (addr, state, handle) = spawn_dashboard(config).await;

    let (status, body) = get_json(&format!("http://{addr}{DASHBOARD_ANALYTICS_ENDPOINT}")).await;
    assert_eq!(status, StatusCode::OK);

    let voice_summary = &body["voice_analytics"]["summary"];
    assert_eq!(voice_summary["total_calls"], json!(2));
    assert_eq!(voice_summary["total_duration_seconds"], json!(180));
    assert_eq!(voice_summary["average_duration_seconds"], json!(90.0));
    assert_eq!(voice_summary["total_cost"], json!(4));
    assert_eq!(voice_summary["average_cost"], json!(2));

    let calls = body["voice_analytics"]["recent_calls"]
        .as_array()
        .expect("recent_calls array");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["id"], json!("call-2"), "newest record first");

    let chat_summary = &body["chat_analytics"]["summary"];
    assert_eq!(chat_summary["total_sessions"], json!(1));
    assert_eq!(chat_summary["average_duration_seconds"], json!(30));

    let sessions = body["chat_analytics"]["recent_sessions"]
        .as_array()
        .expect("recent_sessions array");
    assert_eq!(sessions[0]["duration"], json!(30));
    assert_eq!(
        sessions[0]["dialogue"],
        json!([
            {"sender": "user", "text": "Hello"},
            {"sender": "assistant", "text": "Hi there"},
        ])
    );

    assert_eq!(
        body["voiceChartData"],
        json!([
            {"date": "Jan 1", "calls": 1},
            {"date": "Jan 2", "calls": 1},
        ])
    );
    assert_eq!(body["chatChartData"], json!([{"date": "Jan 3", "sessions": 1}]));

    let report = state.collect_dashboard_status_report();
    assert_eq!(report.degraded_analytics_responses, 0);
    assert_eq!(report.voice_fetch_failures, 0);
    assert_eq!(report.chat_fetch_failures, 0);
    upstream_handle.abort();
    handle.abort();
}

#[tokio::test]
async fn regression_display_truncation_leaves_summary_and_chart_on_the_full_set() {
    let records: Vec<Value> = (0..12)
        .map(|index| {
            json!({
                "id": format!("call-{index}"),
                "started_at": format!("2024-02-{:02}T12:00:00Z", index + 1),
                "duration": 10,
                "price": 1.0,
            })
        })
        .collect();
    let voice_body = json!({
        "voice_analytics": {"summary": {}, "recent_calls": records}
    });
    let upstream =
        Router::new().route("/voice", get(move || async move { axum::Json(voice_body) }));
    let (upstream_addr, upstream_handle) = spawn_router(upstream).await;

    let config = DashboardServerConfig {
        feeds: feed_config(Some(format!("http://{upstream_addr}/voice")), None),
        ..DashboardServerConfig::default()
    };
    let (addr, _state, handle) = spawn_dashboard(config).await;

    let (status, body) = get_json(&format!("http://{addr}{DASHBOARD_ANALYTICS_ENDPOINT}")).await;
    assert_eq!(status, StatusCode::OK);

    let calls = body["voice_analytics"]["recent_calls"]
        .as_array()
        .expect("recent_calls array");
    assert_eq!(calls.len(), 10, "display list is capped");
    assert_eq!(body["voice_analytics"]["summary"]["total_calls"], json!(12));
    assert_eq!(body["voice_analytics"]["summary"]["total_cost"], json!(12));

    let chart = body["voiceChartData"].as_array().expect("chart array");
    let charted: u64 = chart
        .iter()
        .map(|point| point["calls"].as_u64().unwrap_or_default())
        .sum();
    assert_eq!(charted, 12, "chart covers records past the display cap");
    upstream_handle.abort();
    handle.abort();
}

#[tokio::test]
async fn integration_executions_summary_round_trips_with_the_api_key() {
    let executions = Router::new().route(
        "/api/v1/executions",
        get(|request: Request| async move {
            let authorized = request
                .headers()
                .get("x-api-key")
                .and_then(|value| value.to_str().ok())
                == Some("integration-key");
            if !authorized {
                return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "denied"})));
            }
            (
                StatusCode::OK,
                axum::Json(json!({
                    "data": [
                        {"status": "success",
                         "startedAt": "2024-01-01T00:00:00Z",
                         "stoppedAt": "2024-01-01T00:01:00Z"},
                        {"status": "success",
                         "startedAt": "2024-01-01T00:00:00Z",
                         "stoppedAt": "2024-01-01T00:00:30Z"},
                        {"status": "success"},
                        {"status": "failed"},
                        {"status": "running"},
                    ]
                })),
            )
        }),
    );
    let (executions_addr, executions_handle) = spawn_router(executions).await;

    let config = DashboardServerConfig {
        executions: Some(ExecutionsClientConfig {
            api_base: format!("http://{executions_addr}"),
            api_key: Some("integration-key".to_string()),
            timeout_ms: 2_000,
        }),
        ..DashboardServerConfig::default()
    };
    let (addr, state, handle) = spawn_dashboard(config).await;

    let (status, body) = get_json(&format!("http://{addr}{DASHBOARD_EXECUTIONS_ENDPOINT}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(5));
    assert_eq!(body["succeeded"], json!(3));
    assert_eq!(body["failed"], json!(1));
    assert_eq!(body["running"], json!(1));
    assert_eq!(body["success_rate_percent"], json!(75.0));
    assert_eq!(body["average_duration_seconds"], json!(45.0));

    let report = state.collect_dashboard_status_report();
    assert_eq!(report.executions_refreshes, 1);
    assert_eq!(report.executions_failures, 0);
    executions_handle.abort();
    handle.abort();
}

#[tokio::test]
async fn functional_status_counters_track_a_browsing_session() {
    let executions = Router::new().route(
        "/api/v1/executions",
        get(|| async { axum::Json(json!({"data": [{"status": "success"}]})) }),
    );
    let (executions_addr, executions_handle) = spawn_router(executions).await;

    let config = DashboardServerConfig {
        executions: Some(ExecutionsClientConfig {
            api_base: format!("http://{executions_addr}"),
            api_key: Some("integration-key".to_string()),
            timeout_ms: 2_000,
        }),
        executions_cache_ms: 60_000,
        ..DashboardServerConfig::default()
    };
    let (addr, state, handle) = spawn_dashboard(config).await;

    for _ in 0..2 {
        let (status, _body) =
            get_json(&format!("http://{addr}{DASHBOARD_ANALYTICS_ENDPOINT}")).await;
        assert_eq!(status, StatusCode::OK);
    }
    for _ in 0..2 {
        let (status, _body) =
            get_json(&format!("http://{addr}{DASHBOARD_EXECUTIONS_ENDPOINT}")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (health_status, health) =
        get_json(&format!("http://{addr}{DASHBOARD_HEALTH_ENDPOINT}")).await;
    assert_eq!(health_status, StatusCode::OK);
    assert_eq!(health["status"], json!("ok"));

    let (status_code, status_body) =
        get_json(&format!("http://{addr}{DASHBOARD_STATUS_ENDPOINT}")).await;
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(status_body["analytics_requests"], json!(2));
    assert_eq!(status_body["executions_requests"], json!(2));
    assert_eq!(status_body["executions_refreshes"], json!(1));
    assert_eq!(status_body["executions_cache_hits"], json!(1));

    let report = state.collect_dashboard_status_report();
    assert_eq!(report.analytics_requests, 2);
    assert_eq!(report.executions_cache_hits, 1);
    executions_handle.abort();
    handle.abort();
}
