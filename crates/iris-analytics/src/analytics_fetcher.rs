//! Concurrent best-effort fetching of the two upstream analytics feeds.

use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde_json::Value;

const DEFAULT_FEED_TIMEOUT_MS: u64 = 10_000;
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Public struct `AnalyticsFeedConfig` for the two webhook feed endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsFeedConfig {
    pub voice_feed_url: Option<String>,
    pub chat_feed_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for AnalyticsFeedConfig {
    fn default() -> Self {
        Self {
            voice_feed_url: None,
            chat_feed_url: None,
            timeout_ms: DEFAULT_FEED_TIMEOUT_MS,
        }
    }
}

/// Public struct `AnalyticsFeedFetcher` issuing live no-store reads against
/// the voice and chat webhook feeds.
#[derive(Debug, Clone)]
pub struct AnalyticsFeedFetcher {
    config: AnalyticsFeedConfig,
    client: Client,
}

impl AnalyticsFeedFetcher {
    pub fn new(config: AnalyticsFeedConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to initialize analytics feed http client")?;
        let mut normalized = config;
        normalized.voice_feed_url = normalize_url(normalized.voice_feed_url);
        normalized.chat_feed_url = normalize_url(normalized.chat_feed_url);
        normalized.timeout_ms = normalized.timeout_ms.max(1);
        Ok(Self {
            config: normalized,
            client,
        })
    }

    /// Fetches both feeds concurrently. A failure on one source never
    /// affects the other; failed or unconfigured sources yield `None`.
    pub async fn fetch_envelopes(&self) -> (Option<Value>, Option<Value>) {
        tokio::join!(
            self.fetch_feed("voice", self.config.voice_feed_url.as_deref()),
            self.fetch_feed("chat", self.config.chat_feed_url.as_deref()),
        )
    }

    async fn fetch_feed(&self, source: &str, url: Option<&str>) -> Option<Value> {
        let url = match url {
            Some(url) => url,
            None => {
                tracing::debug!(source, "analytics feed not configured");
                return None;
            }
        };
        let response = self
            .client
            .get(url)
            .header("cache-control", "no-store")
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(source, error = %error, "analytics feed request failed");
                return None;
            }
        };
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::warn!(
                source,
                status = status.as_u16(),
                body = %truncate_error_body(&body),
                "analytics feed returned non-success status"
            );
            return None;
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                tracing::warn!(source, error = %error, "analytics feed body was not valid JSON");
                None
            }
        }
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    let url = url?;
    let trimmed = url.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
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
