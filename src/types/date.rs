use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::Write;
use std::sync::LazyLock;

use super::{DataType, DataTypeSpec, RatioScale};
use crate::error::{SpecificationError, ValueError};

pub(crate) const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Detects offset specifiers (`%z`, `%:z`, `%::z`, `%#z`) in a chrono format.
static OFFSET_SPECIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[:#]*z").unwrap());

/// `UTC`, `Z`, `+02:00`, `UTC-05:30`, `GMT+1`, `+0530`
static TIME_ZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:utc|gmt|z)?(?:([+-])(\d{1,2})(?::?(\d{2}))?)?$").unwrap()
});

/// Dates and timestamps parsed with a chrono format string.
///
/// Formats without a time component parse to midnight. Formats carrying an
/// offset are normalized to UTC unless parsed through [`DateType::parse_in_zone`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateType {
    format: String,
    zoned: bool,
}

impl DateType {
    pub fn new(format: impl Into<String>) -> Self {
        let format = format.into();
        let zoned = OFFSET_SPECIFIER.is_match(&format);
        Self { format, zoned }
    }

    /// The chrono format used for parsing and formatting.
    pub fn format_string(&self) -> &str {
        &self.format
    }

    /// Parse a raw value as local time of `zone`.
    pub fn parse_in_zone(&self, raw: &str, zone: &FixedOffset) -> Result<NaiveDateTime, ValueError> {
        let raw = raw.trim();
        if self.zoned {
            return DateTime::parse_from_str(raw, &self.format)
                .map(|dt| dt.with_timezone(zone).naive_local())
                .map_err(|e| ValueError::new(raw, self.spec().to_string(), e.to_string()));
        }
        match NaiveDateTime::parse_from_str(raw, &self.format) {
            Ok(value) => Ok(value),
            Err(first) => NaiveDate::parse_from_str(raw, &self.format)
                .map(|date| date.and_time(NaiveTime::MIN))
                .map_err(|_| ValueError::new(raw, self.spec().to_string(), first.to_string())),
        }
    }
}

impl DateType {
    /// Format local time of `zone`, the inverse of [`DateType::parse_in_zone`].
    pub fn format_in_zone(&self, value: &NaiveDateTime, zone: &FixedOffset) -> String {
        if !self.zoned {
            return self.format(value);
        }
        let mut out = String::new();
        match value.and_local_timezone(*zone).single() {
            Some(local) if write!(out, "{}", local.format(&self.format)).is_ok() => out,
            _ => self.format(value),
        }
    }
}

impl Default for DateType {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

/// Format a timestamp, or `None` if the pattern is malformed.
pub(crate) fn format_timestamp(value: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", value.and_utc().format(pattern)).ok()?;
    Some(out)
}

impl DataType for DateType {
    type Value = NaiveDateTime;

    fn spec(&self) -> DataTypeSpec {
        DataTypeSpec::Date {
            format: self.format.clone(),
        }
    }

    fn parse(&self, raw: &str) -> Result<NaiveDateTime, ValueError> {
        self.parse_in_zone(raw, &utc())
    }

    fn format(&self, value: &NaiveDateTime) -> String {
        format_timestamp(value, &self.format).unwrap_or_else(|| value.to_string())
    }

    fn compare(&self, a: &NaiveDateTime, b: &NaiveDateTime) -> Ordering {
        a.cmp(b)
    }

    fn mean(&self, values: &[NaiveDateTime]) -> Option<NaiveDateTime> {
        if values.is_empty() {
            return None;
        }
        let sum: i128 = values
            .iter()
            .map(|v| v.and_utc().timestamp_millis() as i128)
            .sum();
        let mean = (sum as f64 / values.len() as f64).round() as i64;
        DateTime::from_timestamp_millis(mean).map(|dt| dt.naive_utc())
    }
}

impl RatioScale for DateType {
    type Delta = TimeDelta;

    fn add(&self, value: &NaiveDateTime, delta: &TimeDelta) -> NaiveDateTime {
        value.checked_add_signed(*delta).unwrap_or(if *delta < TimeDelta::zero() {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
    }

    fn subtract(&self, a: &NaiveDateTime, b: &NaiveDateTime) -> TimeDelta {
        a.signed_duration_since(*b)
    }

    fn multiply(&self, delta: &TimeDelta, factor: i64) -> TimeDelta {
        let millis = delta.num_milliseconds().saturating_mul(factor);
        TimeDelta::try_milliseconds(millis).unwrap_or(if millis < 0 {
            TimeDelta::MIN
        } else {
            TimeDelta::MAX
        })
    }

    fn ratio(&self, a: &TimeDelta, b: &TimeDelta) -> f64 {
        a.num_milliseconds() as f64 / b.num_milliseconds() as f64
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse a fixed-offset time zone such as `UTC`, `+02:00` or `UTC-05:30`.
pub fn parse_time_zone(s: &str) -> Result<FixedOffset, SpecificationError> {
    let trimmed = s.trim();
    let invalid = || SpecificationError::InvalidTimeZone(s.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let captures = TIME_ZONE.captures(trimmed).ok_or_else(invalid)?;
    let seconds = match captures.get(1) {
        None => 0,
        Some(sign) => {
            let hours: i32 = captures[2].parse().map_err(|_| invalid())?;
            let minutes: i32 = captures
                .get(3)
                .map(|m| m.as_str().parse())
                .transpose()
                .map_err(|_| invalid())?
                .unwrap_or(0);
            if hours > 18 || minutes > 59 {
                return Err(invalid());
            }
            let total = hours * 3600 + minutes * 60;
            if sign.as_str() == "-" {
                -total
            } else {
                total
            }
        }
    };
    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}
