//! Bounded time deltas such as `+25h` or `+1mo2w`.
//!
//! A delta is a `+` followed by one or more `<number><unit>` groups in any
//! order. Every unit may appear at most once and every component is capped at
//! roughly one year.

use crate::{Error, Result};
use chrono::{DateTime, Months, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Ceiling for the months component.
pub const MAX_MONTHS: u64 = 12;
/// Ceiling for the weeks component.
pub const MAX_WEEKS: u64 = 52;
/// Ceiling for the days component.
pub const MAX_DAYS: u64 = 365;
/// Ceiling for the hours component.
pub const MAX_HOURS: u64 = 8_760;
/// Ceiling for the minutes component.
pub const MAX_MINUTES: u64 = 525_600;

// `mo` must be tried before `m`.
#[allow(clippy::expect_used)]
static COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(mo|w|d|h|m)").expect("time delta regex is valid"));

/// A unit of a [`TimeDelta`] component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Calendar months (`mo`)
    Months,
    /// Weeks (`w`)
    Weeks,
    /// Days (`d`)
    Days,
    /// Hours (`h`)
    Hours,
    /// Minutes (`m`)
    Minutes,
}

impl TimeUnit {
    /// All units, largest first.
    pub const ALL: [Self; 5] = [
        Self::Months,
        Self::Weeks,
        Self::Days,
        Self::Hours,
        Self::Minutes,
    ];

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "mo" => Some(Self::Months),
            "w" => Some(Self::Weeks),
            "d" => Some(Self::Days),
            "h" => Some(Self::Hours),
            "m" => Some(Self::Minutes),
            _ => None,
        }
    }

    /// The suffix used in delta expressions.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Months => "mo",
            Self::Weeks => "w",
            Self::Days => "d",
            Self::Hours => "h",
            Self::Minutes => "m",
        }
    }

    /// Plural unit name for messages.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Months => "months",
            Self::Weeks => "weeks",
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
        }
    }

    /// Maximum allowed value for this unit.
    #[must_use]
    pub const fn ceiling(self) -> u64 {
        match self {
            Self::Months => MAX_MONTHS,
            Self::Weeks => MAX_WEEKS,
            Self::Days => MAX_DAYS,
            Self::Hours => MAX_HOURS,
            Self::Minutes => MAX_MINUTES,
        }
    }
}

/// A duration made of calendar and clock components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeDelta {
    /// Calendar months
    pub months: u64,
    /// Weeks
    pub weeks: u64,
    /// Days
    pub days: u64,
    /// Hours
    pub hours: u64,
    /// Minutes
    pub minutes: u64,
}

impl TimeDelta {
    /// Value of a single component.
    #[must_use]
    pub const fn get(&self, unit: TimeUnit) -> u64 {
        match unit {
            TimeUnit::Months => self.months,
            TimeUnit::Weeks => self.weeks,
            TimeUnit::Days => self.days,
            TimeUnit::Hours => self.hours,
            TimeUnit::Minutes => self.minutes,
        }
    }

    fn set(&mut self, unit: TimeUnit, value: u64) {
        match unit {
            TimeUnit::Months => self.months = value,
            TimeUnit::Weeks => self.weeks = value,
            TimeUnit::Days => self.days = value,
            TimeUnit::Hours => self.hours = value,
            TimeUnit::Minutes => self.minutes = value,
        }
    }

    /// Whether every component is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        TimeUnit::ALL.iter().all(|u| self.get(*u) == 0)
    }

    /// Add this delta to `base`. Months are applied first as calendar months.
    ///
    /// Returns `None` when the result falls outside the representable range.
    #[must_use]
    pub fn add_to(&self, base: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = u32::try_from(self.months).ok()?;
        base.checked_add_months(Months::new(months))?
            .checked_add_signed(self.clock_duration()?)
    }

    /// Subtract this delta from `base`. Months are applied first.
    #[must_use]
    pub fn subtract_from(&self, base: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = u32::try_from(self.months).ok()?;
        base.checked_sub_months(Months::new(months))?
            .checked_sub_signed(self.clock_duration()?)
    }

    fn clock_duration(&self) -> Option<chrono::Duration> {
        let minutes = self
            .weeks
            .checked_mul(7 * 24 * 60)?
            .checked_add(self.days.checked_mul(24 * 60)?)?
            .checked_add(self.hours.checked_mul(60)?)?
            .checked_add(self.minutes)?;
        chrono::Duration::try_minutes(i64::try_from(minutes).ok()?)
    }
}

impl fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0m");
        }
        f.write_str("+")?;
        for unit in TimeUnit::ALL {
            let value = self.get(unit);
            if value > 0 {
                write!(f, "{value}{}", unit.suffix())?;
            }
        }
        Ok(())
    }
}

/// Check every component of `delta` against its ceiling.
///
/// # Errors
///
/// Returns [`Error::TimeDeltaOverflow`] naming the first (largest) unit that
/// exceeds its ceiling.
pub fn validate_time_delta(delta: &TimeDelta) -> Result<()> {
    for unit in TimeUnit::ALL {
        let value = delta.get(unit);
        if value > unit.ceiling() {
            return Err(Error::TimeDeltaOverflow {
                unit: unit.plural().to_string(),
                value,
                max: unit.ceiling(),
            });
        }
    }
    Ok(())
}

/// Parse a delta such as `+2d5h30m`. All units are accepted.
///
/// # Errors
///
/// Returns [`Error::InvalidTimeDelta`] for malformed input and
/// [`Error::TimeDeltaOverflow`] when a component is above its ceiling.
pub fn parse_time_delta(input: &str) -> Result<TimeDelta> {
    parse_components(input).map(|(delta, _)| delta)
}

/// Parse a `stop-after` delta. Same grammar as [`parse_time_delta`] but the
/// minute unit is rejected: stop times are resolved to whole hours or more.
///
/// # Errors
///
/// Returns [`Error::InvalidTimeDelta`] when minutes are used or the input is
/// malformed, and [`Error::TimeDeltaOverflow`] for oversized components.
pub fn parse_stop_after_delta(input: &str) -> Result<TimeDelta> {
    let (delta, units) = parse_components(input)?;
    if units.contains(&TimeUnit::Minutes) {
        return Err(Error::invalid_time_delta(format!(
            "minute unit 'm' is not allowed for stop-after: {}. Minimum unit is hours (h)",
            input.trim()
        )));
    }
    Ok(delta)
}

fn parse_components(input: &str) -> Result<(TimeDelta, Vec<TimeUnit>)> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::invalid_time_delta("empty time delta"));
    }
    let Some(body) = input.strip_prefix('+') else {
        return Err(Error::invalid_time_delta(format!(
            "time delta must start with '+': {input}"
        )));
    };
    if body.is_empty() {
        return Err(Error::invalid_time_delta("empty time delta after '+'"));
    }

    let mut delta = TimeDelta::default();
    let mut seen: Vec<TimeUnit> = Vec::new();
    let mut remaining = body;

    while !remaining.is_empty() {
        let Some(caps) = COMPONENT.captures(remaining) else {
            if seen.is_empty() {
                return Err(Error::invalid_time_delta(format!(
                    "invalid time delta format: +{body}. Expected format like +25h, +3d, +1w, +1mo, +1d12h"
                )));
            }
            return Err(Error::invalid_time_delta(format!(
                "invalid time delta format: +{body}. Extra characters detected: '{remaining}'"
            )));
        };

        let whole = &caps[0];
        let unit = TimeUnit::from_suffix(&caps[2])
            .ok_or_else(|| Error::invalid_time_delta(format!("invalid time delta format: +{body}")))?;
        let value: u64 = caps[1].parse().map_err(|_| {
            Error::invalid_time_delta(format!("invalid time delta format: +{body}"))
        })?;

        if seen.contains(&unit) {
            return Err(Error::invalid_time_delta(format!(
                "duplicate unit '{}' in time delta: +{body}",
                unit.suffix()
            )));
        }
        seen.push(unit);
        delta.set(unit, value);
        remaining = &remaining[whole.len()..];
    }

    validate_time_delta(&delta)?;
    Ok((delta, seen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(
            parse_time_delta("+25h").unwrap(),
            TimeDelta {
                hours: 25,
                ..Default::default()
            }
        );
        assert_eq!(parse_time_delta("+3d").unwrap().days, 3);
        assert_eq!(parse_time_delta("+30m").unwrap().minutes, 30);
        assert_eq!(parse_time_delta("+1w").unwrap().weeks, 1);
        assert_eq!(parse_time_delta("+1mo").unwrap().months, 1);
    }

    #[test]
    fn test_parse_any_order() {
        let a = parse_time_delta("+2d5h30m").unwrap();
        let b = parse_time_delta("+5h2d30m").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.days, 2);
        assert_eq!(a.hours, 5);
        assert_eq!(a.minutes, 30);
    }

    #[test]
    fn test_zero_component_allowed() {
        let d = parse_time_delta("+0d5h").unwrap();
        assert_eq!(d.days, 0);
        assert_eq!(d.hours, 5);
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("", "empty time delta"),
            ("25h", "time delta must start with '+'"),
            ("+", "empty time delta after '+'"),
            ("+25", "invalid time delta format"),
            ("+25x", "invalid time delta format"),
            ("+25h5h", "duplicate unit 'h'"),
            ("+25h5x", "invalid time delta format"),
            ("+-5h", "invalid time delta format"),
            ("+400d", "time delta too large: 400 days exceeds maximum"),
            ("+9000h", "time delta too large: 9000 hours exceeds maximum"),
            ("+5h extra", "Extra characters detected"),
        ];
        for (input, expected) in cases {
            let err = parse_time_delta(input).unwrap_err().to_string();
            assert!(
                err.contains(expected),
                "input {input:?}: expected {expected:?} in {err:?}"
            );
        }
    }

    #[test]
    fn test_stop_after_rejects_minutes() {
        for input in ["+30m", "+2d5h30m", "+1d12h30m", "+1d5m"] {
            let err = parse_stop_after_delta(input).unwrap_err().to_string();
            assert!(err.contains("minute unit 'm' is not allowed for stop-after"));
        }
        let d = parse_stop_after_delta("+1mo2w3d5h").unwrap();
        assert_eq!(
            d,
            TimeDelta {
                months: 1,
                weeks: 2,
                days: 3,
                hours: 5,
                minutes: 0
            }
        );
    }

    #[test]
    fn test_ceilings() {
        assert!(parse_time_delta("+12mo").is_ok());
        assert!(parse_time_delta("+13mo").is_err());
        assert!(parse_time_delta("+52w").is_ok());
        assert!(parse_time_delta("+53w").is_err());
        assert!(parse_time_delta("+365d").is_ok());
        assert!(parse_time_delta("+8760h").is_ok());
        assert!(parse_time_delta("+525600m").is_ok());
        assert!(parse_time_delta("+525601m").is_err());
    }

    #[test]
    fn test_display() {
        let cases = [
            (
                TimeDelta {
                    hours: 25,
                    ..Default::default()
                },
                "+25h",
            ),
            (
                TimeDelta {
                    days: 2,
                    hours: 5,
                    minutes: 30,
                    ..Default::default()
                },
                "+2d5h30m",
            ),
            (TimeDelta::default(), "0m"),
            (
                TimeDelta {
                    days: 1,
                    minutes: 30,
                    ..Default::default()
                },
                "+1d30m",
            ),
        ];
        for (delta, expected) in cases {
            assert_eq!(delta.to_string(), expected);
        }
    }

    #[test]
    fn test_add_to_applies_months_first() {
        let base = Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0).unwrap();
        let delta = parse_stop_after_delta("+1mo1w2d5h").unwrap();
        let result = delta.add_to(base).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2025, 9, 24, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_subtract_from() {
        let base = Utc.with_ymd_and_hms(2024, 8, 15, 12, 0, 0).unwrap();
        let delta = parse_time_delta("+1mo2w3d").unwrap();
        let result = delta.subtract_from(base).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2024, 6, 28, 12, 0, 0).unwrap());
    }
}
