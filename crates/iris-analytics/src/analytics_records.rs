//! Record validation, deduplication, and ordering for one analytics domain.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::analytics_envelope::AnalyticsDomain;
use crate::analytics_value::optional_string_field;
use iris_core::parse_started_at;

/// Number of records surfaced in the response's recent-activity list. The
/// full deduplicated set is still used for metrics and charting.
pub(crate) const DISPLAY_RECORD_LIMIT: usize = 10;

/// Public struct `DedupedRecords` produced by [`dedupe_records`].
#[derive(Debug, Default)]
pub struct DedupedRecords {
    /// Full deduplicated set, sorted descending by `started_at`.
    pub all: Vec<Map<String, Value>>,
    /// The most recent [`DISPLAY_RECORD_LIMIT`] records for display.
    pub display: Vec<Map<String, Value>>,
    /// Raw elements dropped because they were not objects or carried no
    /// usable `started_at`.
    pub dropped: u64,
}

/// Collapses raw records into a unique, ordered set.
///
/// Unidentifiable elements are dropped without aborting the batch. Duplicate
/// identity keys resolve last-seen-wins over arrival order, with the later
/// instance replacing the earlier one entirely rather than merging fields.
/// Unparsable timestamps sort as earliest.
pub fn dedupe_records(raw_records: Vec<Value>, domain: AnalyticsDomain) -> DedupedRecords {
    let mut deduped: Vec<Map<String, Value>> = Vec::new();
    let mut slot_by_identity: HashMap<String, usize> = HashMap::new();
    let mut dropped: u64 = 0;

    for raw in raw_records {
        let Value::Object(mut record) = raw else {
            dropped = dropped.saturating_add(1);
            continue;
        };
        let Some(started_at) = optional_string_field(&record, "started_at") else {
            dropped = dropped.saturating_add(1);
            continue;
        };
        hoist_wrapped_field(&mut record, domain);
        if domain == AnalyticsDomain::Chat {
            if let Some(duration_seconds) = record.get("duration_seconds").cloned() {
                record.insert("duration".to_string(), duration_seconds);
            }
        }

        let identity = optional_string_field(&record, "id").unwrap_or(started_at);
        match slot_by_identity.get(&identity) {
            Some(&slot) => deduped[slot] = record,
            None => {
                slot_by_identity.insert(identity, deduped.len());
                deduped.push(record);
            }
        }
    }

    deduped.sort_by_key(|record| {
        let millis = optional_string_field(record, "started_at")
            .and_then(|raw| parse_started_at(&raw))
            .map(|parsed| parsed.timestamp_millis())
            .unwrap_or(i64::MIN);
        std::cmp::Reverse(millis)
    });

    let display = deduped.iter().take(DISPLAY_RECORD_LIMIT).cloned().collect();
    DedupedRecords {
        all: deduped,
        display,
        dropped,
    }
}

/// Hoists the domain's nested `json.<field>` to the top level when the
/// top-level field is absent (`transcript` for voice, `dialogue` for chat).
fn hoist_wrapped_field(record: &mut Map<String, Value>, domain: AnalyticsDomain) {
    let field = match domain {
        AnalyticsDomain::Voice => "transcript",
        AnalyticsDomain::Chat => "dialogue",
    };
    if record.contains_key(field) {
        return;
    }
    let wrapped = record
        .get("json")
        .and_then(Value::as_object)
        .and_then(|inner| inner.get(field))
        .cloned();
    if let Some(value) = wrapped {
        record.insert(field.to_string(), value);
    }
}
