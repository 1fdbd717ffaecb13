use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns the current Unix timestamp in seconds.
pub fn current_unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Parses an upstream `started_at` value leniently.
///
/// Accepts RFC3339 with an offset, a naive datetime with optional fractional
/// seconds (`T` or space separated), or a bare calendar date. Naive inputs are
/// interpreted as UTC. Returns `None` for anything else.
pub fn parse_started_at(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Returns the UTC calendar date of `raw` in ISO form (`2024-01-31`), or
/// `None` when the timestamp cannot be parsed.
pub fn utc_iso_date(raw: &str) -> Option<String> {
    parse_started_at(raw).map(|parsed| parsed.date_naive().format("%Y-%m-%d").to_string())
}

/// Renders an ISO calendar date as a short display label (`Jan 1`).
///
/// Unparsable input is returned unchanged so presentation never drops a
/// bucket that sorting already accepted.
pub fn short_date_label(iso_date: &str) -> String {
    match NaiveDate::parse_from_str(iso_date.trim(), "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%b %-d").to_string(),
        Err(_) => iso_date.trim().to_string(),
    }
}
