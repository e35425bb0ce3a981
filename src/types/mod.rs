//! Data types the hierarchy builders are generic over.
//!
//! A [`DataType`] knows how to parse, format and compare the raw strings of an
//! attribute. Types with a ratio scale additionally implement [`RatioScale`],
//! which gives the interval builder the arithmetic it needs to repeat an
//! interval pattern across an arbitrarily wide domain.

mod date;
mod numeric;
mod string;

pub use date::{parse_time_zone, DateType};
pub(crate) use date::format_timestamp;
pub use numeric::{DecimalType, IntegerType};
pub use string::{OrderedStringType, StringType};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::ValueError;

/// Parsing, formatting and ordering of attribute values.
pub trait DataType: fmt::Debug + Clone {
    /// The parsed representation of a raw value.
    type Value: Clone + fmt::Debug + PartialEq;

    /// The serializable tag describing this type.
    fn spec(&self) -> DataTypeSpec;

    /// Parse a raw value.
    fn parse(&self, raw: &str) -> Result<Self::Value, ValueError>;

    /// Format a value back to its textual representation.
    fn format(&self, value: &Self::Value) -> String;

    /// Format a value so that parsing the result gives it back unchanged.
    ///
    /// Used when persisting values; [`DataType::format`] may round for display.
    fn encode(&self, value: &Self::Value) -> String {
        self.format(value)
    }

    /// Strict total order consistent with parsing.
    fn compare(&self, a: &Self::Value, b: &Self::Value) -> Ordering;

    /// Check if a raw value parses.
    fn is_valid(&self, raw: &str) -> bool {
        self.parse(raw).is_ok()
    }

    /// Arithmetic mean, if the type supports it.
    fn mean(&self, _values: &[Self::Value]) -> Option<Self::Value> {
        None
    }

    /// Geometric mean, if the type supports it.
    fn geometric_mean(&self, _values: &[Self::Value]) -> Option<Self::Value> {
        None
    }
}

/// Arithmetic on values of a ratio-scale type.
///
/// Differences between two values are a separate [`RatioScale::Delta`] type so
/// that dates can use durations while numbers use themselves.
pub trait RatioScale: DataType {
    type Delta: Clone + fmt::Debug + PartialEq;

    /// `value + delta`
    fn add(&self, value: &Self::Value, delta: &Self::Delta) -> Self::Value;

    /// `a - b`
    fn subtract(&self, a: &Self::Value, b: &Self::Value) -> Self::Delta;

    /// `delta * factor`
    fn multiply(&self, delta: &Self::Delta, factor: i64) -> Self::Delta;

    /// `a / b` as a float.
    fn ratio(&self, a: &Self::Delta, b: &Self::Delta) -> f64;
}

/// Serializable description of a data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataTypeSpec {
    String,
    OrderedString {
        order: Vec<String>,
    },
    Integer,
    Decimal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<usize>,
    },
    Date {
        format: String,
    },
}

impl DataTypeSpec {
    /// Short name of the type family.
    pub fn family(&self) -> &'static str {
        match self {
            DataTypeSpec::String => "string",
            DataTypeSpec::OrderedString { .. } => "ordered string",
            DataTypeSpec::Integer => "integer",
            DataTypeSpec::Decimal { .. } => "decimal",
            DataTypeSpec::Date { .. } => "date",
        }
    }

    /// Check if values of this type support interval arithmetic.
    pub fn is_ratio_scale(&self) -> bool {
        matches!(
            self,
            DataTypeSpec::Integer | DataTypeSpec::Decimal { .. } | DataTypeSpec::Date { .. }
        )
    }

    /// Check if this is a date type.
    pub fn is_date(&self) -> bool {
        matches!(self, DataTypeSpec::Date { .. })
    }

    /// Check if this is a plain number type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataTypeSpec::Integer | DataTypeSpec::Decimal { .. })
    }

    /// Parse a type description as written on the command line.
    ///
    /// Accepts `string`, `integer`, `decimal`, `decimal:<precision>` and
    /// `date:<chrono format>`.
    pub fn from_str(s: &str) -> Option<Self> {
        let (head, tail) = match s.split_once(':') {
            Some((head, tail)) => (head, Some(tail)),
            None => (s, None),
        };
        match (head.to_lowercase().as_str(), tail) {
            ("string", None) => Some(DataTypeSpec::String),
            ("integer" | "int", None) => Some(DataTypeSpec::Integer),
            ("decimal", None) => Some(DataTypeSpec::Decimal { precision: None }),
            ("decimal", Some(p)) => p
                .parse()
                .ok()
                .map(|precision| DataTypeSpec::Decimal {
                    precision: Some(precision),
                }),
            ("date", Some(format)) if !format.is_empty() => Some(DataTypeSpec::Date {
                format: format.to_string(),
            }),
            ("date", None) => Some(DataTypeSpec::Date {
                format: date::DEFAULT_DATE_FORMAT.to_string(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for DataTypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataTypeSpec::Decimal {
                precision: Some(p),
            } => write!(f, "decimal({})", p),
            DataTypeSpec::Date { format } => write!(f, "date({})", format),
            DataTypeSpec::OrderedString { order } => {
                write!(f, "ordered string ({} values)", order.len())
            }
            other => write!(f, "{}", other.family()),
        }
    }
}

/// Run `$body` with `$ty` bound to the concrete ratio-scale type of `$spec`.
///
/// Evaluates to `$otherwise` for types without a ratio scale.
#[macro_export]
macro_rules! with_ratio_type {
    ($spec:expr, |$ty:ident| $body:expr, $otherwise:expr) => {
        match $spec {
            $crate::types::DataTypeSpec::Integer => {
                let $ty = $crate::types::IntegerType;
                $body
            }
            $crate::types::DataTypeSpec::Decimal { precision } => {
                let $ty = $crate::types::DecimalType::new(*precision);
                $body
            }
            $crate::types::DataTypeSpec::Date { format } => {
                let $ty = $crate::types::DateType::new(format.clone());
                $body
            }
            _ => $otherwise,
        }
    };
}

/// Run `$body` with `$ty` bound to the concrete type of `$spec`.
#[macro_export]
macro_rules! with_data_type {
    ($spec:expr, |$ty:ident| $body:expr) => {
        match $spec {
            $crate::types::DataTypeSpec::String => {
                let $ty = $crate::types::StringType;
                $body
            }
            $crate::types::DataTypeSpec::OrderedString { order } => {
                let $ty = $crate::types::OrderedStringType::new(order.clone());
                $body
            }
            $crate::types::DataTypeSpec::Integer => {
                let $ty = $crate::types::IntegerType;
                $body
            }
            $crate::types::DataTypeSpec::Decimal { precision } => {
                let $ty = $crate::types::DecimalType::new(*precision);
                $body
            }
            $crate::types::DataTypeSpec::Date { format } => {
                let $ty = $crate::types::DateType::new(format.clone());
                $body
            }
        }
    };
}
