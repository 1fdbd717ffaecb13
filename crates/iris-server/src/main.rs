mod bootstrap_helpers;

use anyhow::Result;
use clap::Parser;
use iris_analytics::AnalyticsFeedConfig;
use iris_executions::ExecutionsClientConfig;
use iris_gateway::{run_dashboard_server, DashboardServerConfig};

use crate::bootstrap_helpers::init_tracing;

/// Command-line interface for the iris dashboard server.
#[derive(Debug, Parser)]
#[command(
    name = "iris-server",
    about = "Dashboard aggregation server for voice/chat analytics and workflow executions",
    version
)]
struct Cli {
    /// Socket address the HTTP server binds to.
    #[arg(long, env = "IRIS_BIND", default_value = "127.0.0.1:8787")]
    bind: String,

    /// Upstream URL serving the voice analytics envelope.
    #[arg(long, env = "IRIS_VOICE_FEED_URL")]
    voice_feed_url: Option<String>,

    /// Upstream URL serving the chat analytics envelope.
    #[arg(long, env = "IRIS_CHAT_FEED_URL")]
    chat_feed_url: Option<String>,

    /// Timeout in milliseconds for each analytics feed request.
    #[arg(long, env = "IRIS_FETCH_TIMEOUT_MS", default_value_t = 10_000)]
    fetch_timeout_ms: u64,

    /// Base URL of the workflow executions API.
    #[arg(long, env = "IRIS_EXECUTIONS_API_BASE")]
    executions_api_base: Option<String>,

    /// API key sent to the workflow executions API.
    #[arg(long, env = "IRIS_EXECUTIONS_API_KEY")]
    executions_api_key: Option<String>,

    /// Serve a cached executions summary for this many milliseconds.
    #[arg(long, env = "IRIS_EXECUTIONS_CACHE_MS", default_value_t = 60_000)]
    executions_cache_ms: u64,

    /// Timeout in milliseconds for executions API requests.
    #[arg(long, env = "IRIS_EXECUTIONS_TIMEOUT_MS", default_value_t = 10_000)]
    executions_timeout_ms: u64,
}

fn executions_config_from_cli(cli: &Cli) -> Option<ExecutionsClientConfig> {
    let api_base = cli.executions_api_base.as_deref()?.trim();
    if api_base.is_empty() {
        return None;
    }
    Some(ExecutionsClientConfig {
        api_base: api_base.to_string(),
        api_key: cli.executions_api_key.clone(),
        timeout_ms: cli.executions_timeout_ms,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let executions = executions_config_from_cli(&cli);
    let config = DashboardServerConfig {
        bind: cli.bind.clone(),
        feeds: AnalyticsFeedConfig {
            voice_feed_url: cli.voice_feed_url.clone(),
            chat_feed_url: cli.chat_feed_url.clone(),
            timeout_ms: cli.fetch_timeout_ms,
        },
        executions,
        executions_cache_ms: cli.executions_cache_ms,
    };

    run_dashboard_server(config).await
}
