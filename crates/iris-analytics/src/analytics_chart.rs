//! Calendar-day bucketing for the dashboard chart series.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::analytics_value::optional_string_field;
use iris_core::{short_date_label, utc_iso_date};

/// Number of most-recent distinct days kept in a chart series.
pub(crate) const CHART_DAY_LIMIT: usize = 30;

/// Public struct `ChartBucket` counting records on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartBucket {
    /// ISO date (`2024-01-31`); ordering always uses this, never the label.
    pub iso_date: String,
    pub count: u64,
}

/// Groups records by their `started_at` UTC calendar date.
///
/// Returns buckets ascending by ISO date, truncated to the most recent
/// [`CHART_DAY_LIMIT`] distinct days. Records whose timestamp cannot be
/// parsed are excluded from the counts.
pub fn bucket_records_by_day(records: &[Map<String, Value>]) -> Vec<ChartBucket> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        let iso_date = optional_string_field(record, "started_at")
            .and_then(|raw| utc_iso_date(&raw));
        match iso_date {
            Some(date) => {
                let slot = counts.entry(date).or_insert(0);
                *slot = slot.saturating_add(1);
            }
            None => tracing::debug!("excluding record with unparsable started_at from chart"),
        }
    }

    let skip = counts.len().saturating_sub(CHART_DAY_LIMIT);
    counts
        .into_iter()
        .skip(skip)
        .map(|(iso_date, count)| ChartBucket { iso_date, count })
        .collect()
}

/// Renders buckets as chart points `{date: <short label>, <field>: count}`.
pub fn render_chart_points(buckets: &[ChartBucket], field: &str) -> Vec<Value> {
    buckets
        .iter()
        .map(|bucket| {
            let mut point = Map::new();
            point.insert(
                "date".to_string(),
                Value::String(short_date_label(&bucket.iso_date)),
            );
            point.insert(field.to_string(), Value::from(bucket.count));
            Value::Object(point)
        })
        .collect()
}
