//! Summary metric derivation from deduplicated record sets.
//!
//! Upstream summaries are authoritative where present; derivation only fills
//! the gaps. Cost fields are the exception and are always recomputed from
//! records, since upstream cost reporting has been observed stale. All
//! derivation runs on the full deduplicated set, not the display truncation.

use serde_json::{Map, Value};

use crate::analytics_value::{number_value, optional_f64_field, round_2dp};

/// Fills voice summary gaps from the deduplicated call records.
pub fn derive_voice_metrics(summary: &mut Map<String, Value>, records: &[Map<String, Value>]) {
    let reported_calls = optional_f64_field(summary, "total_calls").unwrap_or(0.0);
    let total_calls = if reported_calls > 0.0 {
        reported_calls
    } else {
        let count = records.len() as f64;
        summary.insert("total_calls".to_string(), number_value(count));
        count
    };

    // Absent only: an upstream zero is preserved as reported.
    if !summary.contains_key("total_duration_seconds") {
        summary.insert(
            "total_duration_seconds".to_string(),
            number_value(sum_field(records, "duration")),
        );
    }
    if !summary.contains_key("average_duration_seconds") && total_calls > 0.0 {
        let total_duration = optional_f64_field(summary, "total_duration_seconds").unwrap_or(0.0);
        summary.insert(
            "average_duration_seconds".to_string(),
            number_value(round_2dp(total_duration / total_calls)),
        );
    }

    let total_cost = round_2dp(sum_field(records, "price"));
    let average_cost = if total_calls > 0.0 {
        round_2dp(total_cost / total_calls)
    } else {
        0.0
    };
    summary.insert("total_cost".to_string(), number_value(total_cost));
    summary.insert("average_cost".to_string(), number_value(average_cost));
}

/// Fills chat summary gaps from the deduplicated session records. Chat
/// carries no cost fields; everything else passes through as reported.
pub fn derive_chat_metrics(summary: &mut Map<String, Value>, records: &[Map<String, Value>]) {
    let reported_sessions = optional_f64_field(summary, "total_sessions").unwrap_or(0.0);
    if reported_sessions <= 0.0 {
        summary.insert(
            "total_sessions".to_string(),
            number_value(records.len() as f64),
        );
    }
    if !summary.contains_key("average_duration_seconds") && !records.is_empty() {
        let average = sum_field(records, "duration") / records.len() as f64;
        summary.insert(
            "average_duration_seconds".to_string(),
            number_value(round_2dp(average)),
        );
    }
}

fn sum_field(records: &[Map<String, Value>], field: &str) -> f64 {
    records
        .iter()
        .map(|record| optional_f64_field(record, field).unwrap_or(0.0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{derive_chat_metrics, derive_voice_metrics};
    use serde_json::{json, Map, Value};

    fn records(values: &[Value]) -> Vec<Map<String, Value>> {
        values
            .iter()
            .filter_map(|value| value.as_object().cloned())
            .collect()
    }

    #[test]
    fn functional_cost_totals_accept_numeric_strings() {
        let mut summary = Map::new();
        let records = records(&[
            json!({"started_at": "2024-01-01", "price": "12.50"}),
            json!({"started_at": "2024-01-02", "price": 7.25}),
        ]);
        derive_voice_metrics(&mut summary, &records);
        assert_eq!(summary.get("total_calls"), Some(&json!(2)));
        assert_eq!(summary.get("total_cost"), Some(&json!(19.75)));
        assert_eq!(summary.get("average_cost"), Some(&json!(9.88)));
    }

    #[test]
    fn unit_reported_total_calls_zero_is_backfilled() {
        let mut summary = Map::new();
        summary.insert("total_calls".to_string(), json!(0));
        let records = records(&[
            json!({"started_at": "2024-01-01"}),
            json!({"started_at": "2024-01-02"}),
            json!({"started_at": "2024-01-03"}),
        ]);
        derive_voice_metrics(&mut summary, &records);
        assert_eq!(summary.get("total_calls"), Some(&json!(3)));
    }

    #[test]
    fn unit_reported_total_calls_wins_over_record_count() {
        let mut summary = Map::new();
        summary.insert("total_calls".to_string(), json!(50));
        let records = records(&[json!({"started_at": "2024-01-01", "price": 10})]);
        derive_voice_metrics(&mut summary, &records);
        assert_eq!(summary.get("total_calls"), Some(&json!(50)));
        assert_eq!(summary.get("average_cost"), Some(&json!(0.2)));
    }

    #[test]
    fn unit_total_duration_backfilled_only_when_absent() {
        let mut absent = Map::new();
        let rows = records(&[
            json!({"started_at": "2024-01-01", "duration": 30}),
            json!({"started_at": "2024-01-02", "duration": "45"}),
            json!({"started_at": "2024-01-03"}),
        ]);
        derive_voice_metrics(&mut absent, &rows);
        assert_eq!(absent.get("total_duration_seconds"), Some(&json!(75)));

        let mut zeroed = Map::new();
        zeroed.insert("total_duration_seconds".to_string(), json!(0));
        derive_voice_metrics(&mut zeroed, &rows);
        assert_eq!(zeroed.get("total_duration_seconds"), Some(&json!(0)));
    }

    #[test]
    fn unit_average_duration_respects_reported_value() {
        let mut summary = Map::new();
        summary.insert("average_duration_seconds".to_string(), json!(99));
        let rows = records(&[json!({"started_at": "2024-01-01", "duration": 30})]);
        derive_voice_metrics(&mut summary, &rows);
        assert_eq!(summary.get("average_duration_seconds"), Some(&json!(99)));
    }

    #[test]
    fn unit_empty_record_set_yields_zero_costs() {
        let mut summary = Map::new();
        derive_voice_metrics(&mut summary, &[]);
        assert_eq!(summary.get("total_calls"), Some(&json!(0)));
        assert_eq!(summary.get("total_cost"), Some(&json!(0)));
        assert_eq!(summary.get("average_cost"), Some(&json!(0)));
    }

    #[test]
    fn functional_chat_backfills_sessions_without_cost_fields() {
        let mut summary = Map::new();
        let rows = records(&[
            json!({"started_at": "2024-01-01", "duration": 10}),
            json!({"started_at": "2024-01-02", "duration": 20}),
        ]);
        derive_chat_metrics(&mut summary, &rows);
        assert_eq!(summary.get("total_sessions"), Some(&json!(2)));
        assert_eq!(summary.get("average_duration_seconds"), Some(&json!(15)));
        assert!(summary.get("total_cost").is_none());
    }

    #[test]
    fn unit_chat_reported_sessions_pass_through() {
        let mut summary = Map::new();
        summary.insert("total_sessions".to_string(), json!(7));
        summary.insert("total_duration_seconds".to_string(), json!(600));
        derive_chat_metrics(&mut summary, &[]);
        assert_eq!(summary.get("total_sessions"), Some(&json!(7)));
        assert_eq!(summary.get("total_duration_seconds"), Some(&json!(600)));
    }
}
