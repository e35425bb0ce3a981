//! Date-based hierarchies: one level per calendar granularity.
//!
//! Labels are produced with chrono strftime patterns extended by `%q` for the
//! quarter. Every granularity has a default pattern; a custom pattern is only
//! accepted if each of its specifiers refers to a field that is constant
//! within one granule (a month label may show the quarter, never the day).

use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use chrono::{Datelike, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use tracing::debug;

use super::{Hierarchy, HierarchyBuilder};
use crate::domain::ValueDomain;
use crate::error::{HierarchyResult, SpecResult, SpecificationError};
use crate::types::{format_timestamp, parse_time_zone, DataType, DateType};

/// Calendar granularity of one date level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    SecondMinuteHourDayMonthYear,
    MinuteHourDayMonthYear,
    HourDayMonthYear,
    DayMonthYear,
    WeekYear,
    MonthYear,
    QuarterYear,
    Year,
    Decade,
    Century,
    Millennium,
    HourOfDay,
    DayOfWeek,
    DayOfMonth,
    WeekOfYear,
    MonthOfYear,
    QuarterOfYear,
}

/// Calendar field a format specifier prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year,
    IsoYear,
    Quarter,
    Month,
    Week,
    IsoWeek,
    Weekday,
    Day,
    Hour,
    Minute,
    Second,
    Nanosecond,
    Zone,
}

impl Granularity {
    pub const ALL: [Granularity; 17] = [
        Granularity::SecondMinuteHourDayMonthYear,
        Granularity::MinuteHourDayMonthYear,
        Granularity::HourDayMonthYear,
        Granularity::DayMonthYear,
        Granularity::WeekYear,
        Granularity::MonthYear,
        Granularity::QuarterYear,
        Granularity::Year,
        Granularity::Decade,
        Granularity::Century,
        Granularity::Millennium,
        Granularity::HourOfDay,
        Granularity::DayOfWeek,
        Granularity::DayOfMonth,
        Granularity::WeekOfYear,
        Granularity::MonthOfYear,
        Granularity::QuarterOfYear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Granularity::SecondMinuteHourDayMonthYear => "second/minute/hour/day/month/year",
            Granularity::MinuteHourDayMonthYear => "minute/hour/day/month/year",
            Granularity::HourDayMonthYear => "hour/day/month/year",
            Granularity::DayMonthYear => "day/month/year",
            Granularity::WeekYear => "week/year",
            Granularity::MonthYear => "month/year",
            Granularity::QuarterYear => "quarter/year",
            Granularity::Year => "year",
            Granularity::Decade => "decade",
            Granularity::Century => "century",
            Granularity::Millennium => "millennium",
            Granularity::HourOfDay => "hour of day",
            Granularity::DayOfWeek => "day of week",
            Granularity::DayOfMonth => "day of month",
            Granularity::WeekOfYear => "week of year",
            Granularity::MonthOfYear => "month of year",
            Granularity::QuarterOfYear => "quarter of year",
        }
    }

    /// Default label pattern; `None` for the year-range granularities.
    pub fn default_format(&self) -> Option<&'static str> {
        let format = match self {
            Granularity::SecondMinuteHourDayMonthYear => "%Y-%m-%d %H:%M:%S",
            Granularity::MinuteHourDayMonthYear => "%Y-%m-%d %H:%M",
            Granularity::HourDayMonthYear => "%Y-%m-%d %H:00",
            Granularity::DayMonthYear => "%Y-%m-%d",
            Granularity::WeekYear => "%G-W%V",
            Granularity::MonthYear => "%Y-%m",
            Granularity::QuarterYear => "%Y-Q%q",
            Granularity::Year => "%Y",
            Granularity::HourOfDay => "%H",
            Granularity::DayOfWeek => "%A",
            Granularity::DayOfMonth => "%d",
            Granularity::WeekOfYear => "%V",
            Granularity::MonthOfYear => "%B",
            Granularity::QuarterOfYear => "Q%q",
            Granularity::Decade | Granularity::Century | Granularity::Millennium => return None,
        };
        Some(format)
    }

    /// Check if the granularity accepts a custom label pattern.
    pub fn is_format_supported(&self) -> bool {
        self.default_format().is_some()
    }

    /// Width in years of the year-range granularities.
    fn span(&self) -> Option<i32> {
        match self {
            Granularity::Decade => Some(10),
            Granularity::Century => Some(100),
            Granularity::Millennium => Some(1000),
            _ => None,
        }
    }

    fn allows(&self, field: Field) -> bool {
        match self {
            Granularity::SecondMinuteHourDayMonthYear => field != Field::Nanosecond,
            Granularity::MinuteHourDayMonthYear => {
                !matches!(field, Field::Second | Field::Nanosecond)
            }
            Granularity::HourDayMonthYear => {
                !matches!(field, Field::Minute | Field::Second | Field::Nanosecond)
            }
            Granularity::DayMonthYear => matches!(
                field,
                Field::Year
                    | Field::IsoYear
                    | Field::Quarter
                    | Field::Month
                    | Field::Week
                    | Field::IsoWeek
                    | Field::Weekday
                    | Field::Day
                    | Field::Zone
            ),
            Granularity::WeekYear => matches!(field, Field::IsoYear | Field::IsoWeek | Field::Zone),
            Granularity::MonthYear => {
                matches!(field, Field::Year | Field::Quarter | Field::Month | Field::Zone)
            }
            Granularity::QuarterYear => matches!(field, Field::Year | Field::Quarter | Field::Zone),
            Granularity::Year => matches!(field, Field::Year | Field::Zone),
            Granularity::HourOfDay => field == Field::Hour,
            Granularity::DayOfWeek => field == Field::Weekday,
            Granularity::DayOfMonth => field == Field::Day,
            Granularity::WeekOfYear => field == Field::IsoWeek,
            Granularity::MonthOfYear => matches!(field, Field::Month | Field::Quarter),
            Granularity::QuarterOfYear => field == Field::Quarter,
            Granularity::Decade | Granularity::Century | Granularity::Millennium => false,
        }
    }

    /// Check a custom label pattern against this granularity.
    pub fn check_format(&self, format: &str) -> SpecResult<()> {
        if !self.is_format_supported() {
            return Err(SpecificationError::FormatNotSupported(self.name().to_string()));
        }
        let invalid = |reason: String| SpecificationError::InvalidFormat {
            format: format.to_string(),
            granularity: self.name().to_string(),
            reason,
        };

        let (expanded, quarter) = expand_quarter(format, 1);
        if quarter && !self.allows(Field::Quarter) {
            return Err(invalid("the quarter is not constant within one granule".to_string()));
        }
        for item in StrftimeItems::new(&expanded) {
            let field = match item {
                Item::Error => return Err(invalid("unknown format specifier".to_string())),
                Item::Numeric(numeric, _) => numeric_field(&numeric),
                Item::Fixed(fixed) => fixed_field(&fixed),
                _ => None,
            };
            if let Some(field) = field {
                if !self.allows(field) {
                    return Err(invalid(format!(
                        "{:?} is not constant within one granule",
                        field
                    )));
                }
            }
        }
        Ok(())
    }

    /// Label `value` with `format`, or the default pattern.
    fn label(&self, value: &NaiveDateTime, format: Option<&str>) -> SpecResult<String> {
        if let Some(span) = self.span() {
            let start = value.year().div_euclid(span) * span;
            return Ok(format!("[{},{})", start, start + span));
        }
        let pattern = format.or(self.default_format()).unwrap_or_default();
        let (expanded, _) = expand_quarter(pattern, value.month0() / 3 + 1);
        format_timestamp(value, &expanded).ok_or_else(|| SpecificationError::InvalidFormat {
            format: pattern.to_string(),
            granularity: self.name().to_string(),
            reason: "pattern cannot be rendered".to_string(),
        })
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn numeric_field(numeric: &Numeric) -> Option<Field> {
    let field = match numeric {
        Numeric::Year | Numeric::YearDiv100 | Numeric::YearMod100 => Field::Year,
        Numeric::IsoYear | Numeric::IsoYearDiv100 | Numeric::IsoYearMod100 => Field::IsoYear,
        Numeric::Month => Field::Month,
        Numeric::Day | Numeric::Ordinal => Field::Day,
        Numeric::WeekFromSun | Numeric::WeekFromMon => Field::Week,
        Numeric::IsoWeek => Field::IsoWeek,
        Numeric::NumDaysFromSun | Numeric::WeekdayFromMon => Field::Weekday,
        Numeric::Hour | Numeric::Hour12 => Field::Hour,
        Numeric::Minute => Field::Minute,
        Numeric::Second | Numeric::Timestamp => Field::Second,
        Numeric::Nanosecond => Field::Nanosecond,
        _ => Field::Nanosecond,
    };
    Some(field)
}

fn fixed_field(fixed: &Fixed) -> Option<Field> {
    let field = match fixed {
        Fixed::ShortMonthName | Fixed::LongMonthName => Field::Month,
        Fixed::ShortWeekdayName | Fixed::LongWeekdayName => Field::Weekday,
        Fixed::LowerAmPm | Fixed::UpperAmPm => Field::Hour,
        Fixed::TimezoneName
        | Fixed::TimezoneOffset
        | Fixed::TimezoneOffsetColon
        | Fixed::TimezoneOffsetDoubleColon
        | Fixed::TimezoneOffsetTripleColon
        | Fixed::TimezoneOffsetColonZ
        | Fixed::TimezoneOffsetZ => Field::Zone,
        Fixed::RFC2822 | Fixed::RFC3339 => Field::Second,
        _ => Field::Nanosecond,
    };
    Some(field)
}

/// Replace unescaped `%q` with `quarter`; reports whether any was found.
fn expand_quarter(format: &str, quarter: u32) -> (String, bool) {
    let mut out = String::with_capacity(format.len());
    let mut found = false;
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('q') => {
                found = true;
                out.push_str(&quarter.to_string());
            }
            Some(next) => {
                out.push('%');
                out.push(next);
            }
            None => out.push('%'),
        }
    }
    (out, found)
}

/// One date level: a granularity and an optional custom pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateLevel {
    pub granularity: Granularity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl DateLevel {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            format: None,
        }
    }

    pub fn with_format(granularity: Granularity, format: impl Into<String>) -> Self {
        Self {
            granularity,
            format: Some(format.into()),
        }
    }

    pub fn check(&self) -> SpecResult<()> {
        match &self.format {
            Some(format) => self.granularity.check_format(format),
            None => Ok(()),
        }
    }
}

/// Builds hierarchies from calendar granularities.
#[derive(Debug, Clone)]
pub struct DateBuilder {
    data_type: DateType,
    time_zone: FixedOffset,
    bottom: Option<NaiveDateTime>,
    top: Option<NaiveDateTime>,
    levels: Vec<DateLevel>,
}

impl DateBuilder {
    pub fn new(data_type: DateType) -> Self {
        Self {
            data_type,
            time_zone: Utc.fix(),
            bottom: None,
            top: None,
            levels: Vec::new(),
        }
    }

    pub fn data_type(&self) -> &DateType {
        &self.data_type
    }

    pub fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    pub fn bottom_coding(&self) -> Option<NaiveDateTime> {
        self.bottom
    }

    pub fn top_coding(&self) -> Option<NaiveDateTime> {
        self.top
    }

    pub fn levels(&self) -> &[DateLevel] {
        &self.levels
    }

    pub fn set_time_zone(&mut self, zone: &str) -> SpecResult<&mut Self> {
        self.time_zone = parse_time_zone(zone)?;
        Ok(self)
    }

    pub fn set_bottom_coding(&mut self, bound: Option<NaiveDateTime>) -> &mut Self {
        self.bottom = bound;
        self
    }

    pub fn set_top_coding(&mut self, bound: Option<NaiveDateTime>) -> &mut Self {
        self.top = bound;
        self
    }

    /// Parse a coding bound in the builder's date format and zone.
    pub fn parse_bound(&self, raw: &str) -> SpecResult<NaiveDateTime> {
        self.data_type
            .parse_in_zone(raw, &self.time_zone)
            .map_err(|e| SpecificationError::MalformedBound {
                value: raw.to_string(),
                reason: e.reason,
            })
    }

    /// Format a coding bound so that [`DateBuilder::parse_bound`] reads it back.
    pub fn format_bound(&self, bound: &NaiveDateTime) -> String {
        self.data_type.format_in_zone(bound, &self.time_zone)
    }

    /// Append a level after checking its pattern.
    pub fn add_level(&mut self, level: DateLevel) -> SpecResult<&mut Self> {
        level.check()?;
        self.levels.push(level);
        Ok(self)
    }

    pub fn add_granularity(&mut self, granularity: Granularity) -> &mut Self {
        self.levels.push(DateLevel::new(granularity));
        self
    }

    pub fn remove_level(&mut self, index: usize) -> SpecResult<DateLevel> {
        if index >= self.levels.len() {
            return Err(SpecificationError::IndexOutOfBounds {
                index,
                len: self.levels.len(),
            });
        }
        Ok(self.levels.remove(index))
    }

    fn clip(&self, value: NaiveDateTime) -> NaiveDateTime {
        match (self.bottom, self.top) {
            (Some(bottom), _) if value < bottom => bottom,
            (_, Some(top)) if value > top => top,
            _ => value,
        }
    }
}

impl HierarchyBuilder for DateBuilder {
    fn validate(&self) -> SpecResult<()> {
        if self.levels.is_empty() {
            return Err(SpecificationError::NoGranularities);
        }
        self.levels.iter().try_for_each(DateLevel::check)?;
        if let (Some(bottom), Some(top)) = (self.bottom, self.top) {
            if bottom > top {
                return Err(SpecificationError::InvalidRange(format!(
                    "bottom coding bound {} is after top coding bound {}",
                    self.data_type.format(&bottom),
                    self.data_type.format(&top)
                )));
            }
        }
        Ok(())
    }

    fn build<S: AsRef<str>>(&self, values: &[S]) -> HierarchyResult<Hierarchy> {
        self.validate()?;
        let domain = ValueDomain::new(self.data_type.clone(), values)?;

        debug!(
            values = domain.len(),
            levels = self.levels.len(),
            time_zone = %self.time_zone,
            "building date hierarchy"
        );

        let mut rows = Vec::with_capacity(domain.len());
        for raw in domain.raw_values() {
            let local = self.data_type.parse_in_zone(raw, &self.time_zone)?;
            let value = self.clip(local);
            let mut row = Vec::with_capacity(self.levels.len() + 2);
            row.push(raw.to_string());
            for level in &self.levels {
                row.push(level.granularity.label(&value, level.format.as_deref())?);
            }
            rows.push(row);
        }

        Ok(Hierarchy::new(rows).with_suppression_level())
    }
}
