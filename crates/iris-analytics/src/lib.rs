//! Analytics aggregation pipeline for the iris dashboard.
//!
//! Pulls loosely-structured payloads from the voice and chat webhook feeds,
//! normalizes their divergent envelope shapes, deduplicates records, derives
//! summary metrics and per-day chart series, and reconstructs structured
//! dialogue from raw transcripts. Every stage degrades to empty or zeroed
//! output instead of failing the surrounding aggregation pass.

pub mod analytics_chart;
pub mod analytics_dialogue;
pub mod analytics_envelope;
pub mod analytics_fetcher;
pub mod analytics_metrics;
pub mod analytics_records;
pub mod analytics_report;
mod analytics_value;

pub use analytics_chart::{bucket_records_by_day, render_chart_points, ChartBucket};
pub use analytics_dialogue::{parse_dialogue, DialogueSender, DialogueTurn};
pub use analytics_envelope::{normalize_envelope, AnalyticsDomain, NormalizedFeed};
pub use analytics_fetcher::{AnalyticsFeedConfig, AnalyticsFeedFetcher};
pub use analytics_records::{dedupe_records, DedupedRecords};
pub use analytics_report::{
    assemble_analytics_report, collect_analytics_report, AnalyticsReport, ChatAnalytics,
    VoiceAnalytics,
};
