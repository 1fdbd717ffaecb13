//! Envelope normalization for the two webhook analytics feeds.
//!
//! Upstream payloads arrive as a single object, an array of objects, a
//! stringified JSON document, or any of those wrapped under a `json` field.
//! Normalization resolves every shape into one summary accumulator plus a
//! flat list of raw records for the requested domain.

use serde_json::{Map, Value};

/// Maximum number of wrapper layers (`json` field or string re-parse)
/// resolved per envelope element before the element is skipped.
pub(crate) const MAX_ENVELOPE_UNWRAP_DEPTH: usize = 4;

/// Public enum `AnalyticsDomain` selecting which feed a pipeline pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsDomain {
    Voice,
    Chat,
}

impl AnalyticsDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyticsDomain::Voice => "voice",
            AnalyticsDomain::Chat => "chat",
        }
    }

    /// Key under which an envelope element carries this domain's payload.
    pub(crate) fn envelope_key(self) -> &'static str {
        match self {
            AnalyticsDomain::Voice => "voice_analytics",
            AnalyticsDomain::Chat => "chat_analytics",
        }
    }

    /// Preferred record-list key inside a domain payload.
    pub(crate) fn records_key(self) -> &'static str {
        match self {
            AnalyticsDomain::Voice => "recent_calls",
            AnalyticsDomain::Chat => "recent_sessions",
        }
    }

    /// The other domain's record-list key, accepted as a fallback because
    /// upstream deliveries have been observed to mix the two.
    pub(crate) fn alternate_records_key(self) -> &'static str {
        match self {
            AnalyticsDomain::Voice => "recent_sessions",
            AnalyticsDomain::Chat => "recent_calls",
        }
    }

    pub(crate) fn chart_field(self) -> &'static str {
        match self {
            AnalyticsDomain::Voice => "calls",
            AnalyticsDomain::Chat => "sessions",
        }
    }

    /// Summary keys that must always be present in an outbound document.
    pub(crate) fn summary_keys(self) -> &'static [&'static str] {
        match self {
            AnalyticsDomain::Voice => &[
                "total_calls",
                "total_duration_seconds",
                "average_duration_seconds",
                "total_cost",
                "average_cost",
            ],
            AnalyticsDomain::Chat => &[
                "total_sessions",
                "total_duration_seconds",
                "average_duration_seconds",
            ],
        }
    }

    /// Builds the all-zero summary served when a feed is absent or unusable.
    pub fn zero_summary(self) -> Map<String, Value> {
        let mut summary = Map::new();
        for key in self.summary_keys() {
            summary.insert((*key).to_string(), Value::from(0));
        }
        summary
    }
}

/// Public struct `NormalizedFeed` produced by [`normalize_envelope`].
#[derive(Debug, Default)]
pub struct NormalizedFeed {
    /// Merged upstream summary fields, last write wins. Empty when no
    /// envelope element carried a summary.
    pub summary: Map<String, Value>,
    /// Raw record values in arrival order, not yet validated.
    pub raw_records: Vec<Value>,
    /// Elements dropped because they could not be unwrapped.
    pub skipped_elements: u64,
}

impl NormalizedFeed {
    fn zeroed(domain: AnalyticsDomain) -> Self {
        NormalizedFeed {
            summary: domain.zero_summary(),
            raw_records: Vec::new(),
            skipped_elements: 0,
        }
    }
}

/// Normalizes one raw webhook envelope into the domain's summary and record
/// list. Never fails: an absent or unusable envelope yields the zero-valued
/// summary and an empty record list.
pub fn normalize_envelope(envelope: Option<&Value>, domain: AnalyticsDomain) -> NormalizedFeed {
    let Some(envelope) = envelope else {
        return NormalizedFeed::zeroed(domain);
    };
    if envelope.is_null() {
        return NormalizedFeed::zeroed(domain);
    }

    let parsed_top_level;
    let envelope = match envelope {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => {
                parsed_top_level = parsed;
                &parsed_top_level
            }
            Err(error) => {
                tracing::warn!(
                    domain = domain.as_str(),
                    error = %error,
                    "analytics envelope was a string but not valid JSON"
                );
                return NormalizedFeed::zeroed(domain);
            }
        },
        other => other,
    };

    let elements: Vec<&Value> = match envelope {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut feed = NormalizedFeed::default();
    for element in elements {
        let Some(unwrapped) = unwrap_element(element, domain) else {
            feed.skipped_elements = feed.skipped_elements.saturating_add(1);
            continue;
        };
        let Some(object) = unwrapped.as_object() else {
            continue;
        };
        let Some(payload) = object.get(domain.envelope_key()).and_then(Value::as_object) else {
            continue;
        };
        if let Some(summary) = payload.get("summary").and_then(Value::as_object) {
            for (key, value) in summary {
                feed.summary.insert(key.clone(), value.clone());
            }
        }
        let records = payload
            .get(domain.records_key())
            .or_else(|| payload.get(domain.alternate_records_key()))
            .and_then(Value::as_array);
        if let Some(records) = records {
            feed.raw_records.extend(records.iter().cloned());
        }
    }
    feed
}

/// Resolves `json` wrappers and stringified layers for one envelope element.
/// Returns `None` when a layer fails to parse or the depth cap is reached.
fn unwrap_element(element: &Value, domain: AnalyticsDomain) -> Option<Value> {
    let mut current = element.clone();
    for _ in 0..=MAX_ENVELOPE_UNWRAP_DEPTH {
        match current {
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(parsed) => current = parsed,
                Err(error) => {
                    tracing::warn!(
                        domain = domain.as_str(),
                        error = %error,
                        "skipping envelope element with unparsable embedded JSON"
                    );
                    return None;
                }
            },
            Value::Object(ref map) if map.contains_key("json") => {
                current = map.get("json").cloned().unwrap_or(Value::Null);
            }
            resolved => return Some(resolved),
        }
    }
    tracing::warn!(
        domain = domain.as_str(),
        depth = MAX_ENVELOPE_UNWRAP_DEPTH,
        "skipping envelope element nested beyond the unwrap depth cap"
    );
    None
}
