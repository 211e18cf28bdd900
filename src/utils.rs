//! Input helpers shared by the commands

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static PAGERDUTY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9]{7,}$").unwrap_or_else(|e| panic!("invalid ID pattern: {}", e))
});

static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:in\s+(?P<ahead>\d+)\s+(?P<ahead_unit>[a-z]+?)s?|(?P<ago>\d+)\s+(?P<ago_unit>[a-z]+?)s?\s+ago)$")
        .unwrap_or_else(|e| panic!("invalid relative time pattern: {}", e))
});

/// IDs that cannot be PagerDuty object IDs
pub fn invalid_pagerduty_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter()
        .map(AsRef::as_ref)
        .filter(|id| !PAGERDUTY_ID.is_match(id))
        .map(str::to_string)
        .collect()
}

/// Split each value on commas and whitespace, dropping empties and repeats.
///
/// `["a,b", "b c"]` becomes `["a", "b", "c"]`.
pub fn split_dedup_and_flatten<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .flat_map(|value| {
            value
                .as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|part| !part.is_empty())
        .filter(|part| seen.insert(part.clone()))
        .collect()
}

/// Parse a point in time relative to `now`.
///
/// Accepts `now`, `in 2 hours`, `3 days ago`, RFC 3339 timestamps and
/// `YYYY-MM-DD[ HH:MM]` (UTC).
pub fn parse_time(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    let lowered = input.to_lowercase();
    if lowered == "now" {
        return Some(now);
    }

    if let Some(caps) = RELATIVE_TIME.captures(&lowered) {
        let (amount, unit, sign) = match (caps.name("ahead"), caps.name("ago")) {
            (Some(n), _) => (n.as_str(), caps.name("ahead_unit")?.as_str(), 1),
            (None, Some(n)) => (n.as_str(), caps.name("ago_unit")?.as_str(), -1),
            (None, None) => return None,
        };
        let amount: i64 = amount.parse().ok()?;
        let step = match unit {
            "minute" | "min" => Duration::try_minutes(amount)?,
            "hour" => Duration::try_hours(amount)?,
            "day" => Duration::try_days(amount)?,
            "week" => Duration::try_weeks(amount)?,
            _ => return None,
        };
        return if sign > 0 {
            now.checked_add_signed(step)
        } else {
            now.checked_sub_signed(step)
        };
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}
