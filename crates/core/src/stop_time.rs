//! Stop-time resolution and other date helpers used by frontmatter fields.

use crate::time_delta::{parse_stop_after_delta, parse_time_delta};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Format of resolved stop times embedded in the workflow.
pub const STOP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Environment key carrying the stop time in emitted workflows.
pub const STOP_TIME_ENV: &str = "GH_AW_STOP_TIME";

#[allow(clippy::expect_used)]
static ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("ordinal regex is valid")
});

#[allow(clippy::expect_used)]
static RELATIVE_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([hdwmy])$").expect("relative spec regex is valid"));

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%B %d, %Y %H:%M",
    "%B %d %Y %H:%M",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%B %d %Y", "%d %B %Y"];

/// Whether a `stop-after` value is relative (`+25h`) rather than absolute.
#[must_use]
pub fn is_relative_stop_time(value: &str) -> bool {
    value.starts_with('+')
}

/// Normalize an absolute date-time into `YYYY-MM-DD HH:MM:SS`.
///
/// Accepts ISO 8601 and RFC 3339 timestamps, `YYYY-MM-DD`, US `MM/DD/YYYY`
/// with optional time, and readable forms such as `January 1, 2025`,
/// `15 June 2025 14:30` or `1st June 2025`. Date-only inputs resolve to
/// midnight UTC.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] when no supported format matches.
pub fn parse_absolute_date_time(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_date(input));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).format(STOP_TIME_FORMAT).to_string());
    }

    let normalized = ORDINAL.replace_all(trimmed, "$1");
    let normalized = normalized.as_ref();

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(normalized, format) {
            return Ok(dt.format(STOP_TIME_FORMAT).to_string());
        }
    }
    for format in DATE_FORMATS {
        if let Some(midnight) = NaiveDate::parse_from_str(normalized, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(midnight.format(STOP_TIME_FORMAT).to_string());
        }
    }

    Err(Error::invalid_date(input))
}

/// Resolve a `stop-after` value against the compile time.
///
/// Relative values are added to `compile_time`; absolute values are
/// normalized. An empty value resolves to an empty string.
///
/// # Errors
///
/// Propagates delta and date parse errors.
pub fn resolve_stop_time(value: &str, compile_time: DateTime<Utc>) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    if is_relative_stop_time(value) {
        let delta = parse_stop_after_delta(value)?;
        let resolved = delta
            .add_to(compile_time)
            .ok_or_else(|| Error::invalid_time_delta(format!("time delta {value} is out of range")))?;
        debug!(stop_after = value, resolved = %resolved, "resolved relative stop time");
        return Ok(resolved.format(STOP_TIME_FORMAT).to_string());
    }
    parse_absolute_date_time(value)
}

/// Resolve a relative date such as `-1d` or `-1mo2w` to an RFC 3339
/// timestamp. `+` deltas move forward. Anything else is returned unchanged.
///
/// # Errors
///
/// Returns a delta parse error for malformed relative input.
pub fn resolve_relative_date(input: &str, base: DateTime<Utc>) -> Result<String> {
    let input = input.trim();
    let (delta_text, backwards) = if let Some(rest) = input.strip_prefix('-') {
        (format!("+{rest}"), true)
    } else if input.starts_with('+') {
        (input.to_string(), false)
    } else {
        return Ok(input.to_string());
    };

    let delta = parse_time_delta(&delta_text)?;
    let resolved = if backwards {
        delta.subtract_from(base)
    } else {
        delta.add_to(base)
    }
    .ok_or_else(|| Error::invalid_time_delta(format!("time delta {input} is out of range")))?;

    Ok(resolved.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Convert a relative time spec (`7d`, `2w`, `24h`, `1m`, `1y`) into hours.
///
/// Units are case-insensitive; `m` is a 30-day month and `y` a 365-day year.
/// Returns 0 for invalid, zero or sub-two-hour specs.
#[must_use]
pub fn parse_relative_time_spec(spec: &str) -> i64 {
    let spec = spec.trim().to_lowercase();
    let Some(caps) = RELATIVE_SPEC.captures(&spec) else {
        return 0;
    };
    let Ok(value) = caps[1].parse::<i64>() else {
        return 0;
    };
    if value <= 0 {
        return 0;
    }
    let hours = match &caps[2] {
        "h" => value,
        "d" => value.saturating_mul(24),
        "w" => value.saturating_mul(24 * 7),
        "m" => value.saturating_mul(24 * 30),
        "y" => value.saturating_mul(24 * 365),
        _ => 0,
    };
    if hours < 2 { 0 } else { hours }
}

/// Interpret an `expires` frontmatter value as hours.
///
/// Integers are days; strings use [`parse_relative_time_spec`]. `false`
/// explicitly disables expiration (-1); `true` and unknown shapes yield 0.
#[must_use]
pub fn parse_expires(value: &serde_yaml::Value) -> i64 {
    match value {
        serde_yaml::Value::Number(n) => n
            .as_i64()
            .filter(|days| *days > 0)
            .map_or(0, |days| days.saturating_mul(24)),
        serde_yaml::Value::String(s) => parse_relative_time_spec(s),
        serde_yaml::Value::Bool(false) => -1,
        _ => 0,
    }
}

/// Read the stop time previously embedded in a compiled workflow.
#[must_use]
pub fn extract_stop_time_from_lock(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (_, rest) = line.split_once(&format!("{STOP_TIME_ENV}:"))?;
        let value = rest.trim().trim_matches('"').trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}
