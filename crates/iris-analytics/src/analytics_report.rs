//! Assembly of the outbound analytics document.
//!
//! Runs the normalize, dedupe, derive, and bucketize chain for both domains
//! and produces the single JSON document the dashboard consumes. Total
//! upstream failure degrades to a well-formed zero-valued document.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::analytics_chart::{bucket_records_by_day, render_chart_points};
use crate::analytics_dialogue::parse_dialogue;
use crate::analytics_envelope::{normalize_envelope, AnalyticsDomain};
use crate::analytics_fetcher::AnalyticsFeedFetcher;
use crate::analytics_metrics::{derive_chat_metrics, derive_voice_metrics};
use crate::analytics_records::dedupe_records;

/// Public struct `VoiceAnalytics` holding one domain half of the report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceAnalytics {
    pub summary: Map<String, Value>,
    pub recent_calls: Vec<Value>,
}

/// Public struct `ChatAnalytics` holding one domain half of the report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatAnalytics {
    pub summary: Map<String, Value>,
    pub recent_sessions: Vec<Value>,
}

/// Public struct `AnalyticsReport`, the full dashboard document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyticsReport {
    pub voice_analytics: VoiceAnalytics,
    pub chat_analytics: ChatAnalytics,
    #[serde(rename = "voiceChartData")]
    pub voice_chart_data: Vec<Value>,
    #[serde(rename = "chatChartData")]
    pub chat_chart_data: Vec<Value>,
}

impl AnalyticsReport {
    /// The zero-valued document served when every upstream source fails.
    pub fn zero() -> Self {
        Self {
            voice_analytics: VoiceAnalytics {
                summary: AnalyticsDomain::Voice.zero_summary(),
                recent_calls: Vec::new(),
            },
            chat_analytics: ChatAnalytics {
                summary: AnalyticsDomain::Chat.zero_summary(),
                recent_sessions: Vec::new(),
            },
            voice_chart_data: Vec::new(),
            chat_chart_data: Vec::new(),
        }
    }
}

/// Fetches both feeds and assembles the report. Never fails: unusable
/// sources contribute zero-valued halves.
pub async fn collect_analytics_report(fetcher: &AnalyticsFeedFetcher) -> AnalyticsReport {
    let (voice_envelope, chat_envelope) = fetcher.fetch_envelopes().await;
    assemble_analytics_report(voice_envelope.as_ref(), chat_envelope.as_ref())
}

/// Assembles the report from two already-fetched raw envelopes.
pub fn assemble_analytics_report(
    voice_envelope: Option<&Value>,
    chat_envelope: Option<&Value>,
) -> AnalyticsReport {
    let (voice_summary, voice_records, voice_chart) =
        run_domain_chain(voice_envelope, AnalyticsDomain::Voice);
    let (chat_summary, chat_records, chat_chart) =
        run_domain_chain(chat_envelope, AnalyticsDomain::Chat);

    AnalyticsReport {
        voice_analytics: VoiceAnalytics {
            summary: voice_summary,
            recent_calls: voice_records,
        },
        chat_analytics: ChatAnalytics {
            summary: chat_summary,
            recent_sessions: chat_records,
        },
        voice_chart_data: voice_chart,
        chat_chart_data: chat_chart,
    }
}

fn run_domain_chain(
    envelope: Option<&Value>,
    domain: AnalyticsDomain,
) -> (Map<String, Value>, Vec<Value>, Vec<Value>) {
    let feed = normalize_envelope(envelope, domain);
    if feed.skipped_elements > 0 {
        tracing::debug!(
            domain = domain.as_str(),
            skipped = feed.skipped_elements,
            "envelope elements skipped during normalization"
        );
    }
    let mut summary = feed.summary;
    let deduped = dedupe_records(feed.raw_records, domain);
    if deduped.dropped > 0 {
        tracing::debug!(
            domain = domain.as_str(),
            dropped = deduped.dropped,
            "unidentifiable records dropped during deduplication"
        );
    }

    // Derivation reads the full deduplicated set; only the display list is
    // truncated.
    match domain {
        AnalyticsDomain::Voice => derive_voice_metrics(&mut summary, &deduped.all),
        AnalyticsDomain::Chat => derive_chat_metrics(&mut summary, &deduped.all),
    }
    ensure_summary_defaults(&mut summary, domain);

    let buckets = bucket_records_by_day(&deduped.all);
    let chart = render_chart_points(&buckets, domain.chart_field());

    let records = deduped
        .display
        .into_iter()
        .map(|mut record| {
            if domain == AnalyticsDomain::Chat {
                let raw_dialogue = record
                    .get("dialogue")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let turns = parse_dialogue(raw_dialogue.as_deref());
                let turns = serde_json::to_value(turns).unwrap_or_else(|_| Value::Array(Vec::new()));
                record.insert("dialogue".to_string(), turns);
            }
            Value::Object(record)
        })
        .collect();

    (summary, records, chart)
}

/// Pins every domain summary key to 0 when absent so the outbound document
/// always carries a stable shape. Present values are never overwritten.
fn ensure_summary_defaults(summary: &mut Map<String, Value>, domain: AnalyticsDomain) {
    for key in domain.summary_keys() {
        summary
            .entry((*key).to_string())
            .or_insert_with(|| Value::from(0));
    }
}
