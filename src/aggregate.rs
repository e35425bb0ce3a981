//! Aggregate functions turning a covered sub-range into a label.
//!
//! Interval-based builders hand a function the two boundary values of the
//! covered range; order-based builders hand it every covered member in order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SpecResult, SpecificationError};
use crate::types::{DataType, DataTypeSpec};

fn included() -> bool {
    true
}

/// Maps a contiguous sub-range of values to a single label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateFunction {
    /// Always the same label.
    Constant { value: String },

    /// Interval notation over the first and last value, e.g. `[0,50)`.
    Interval {
        #[serde(default = "included")]
        lower_included: bool,
        #[serde(default)]
        upper_included: bool,
    },

    /// Set notation over all values, e.g. `{a, b, c}`.
    Set,

    /// The lower bound, the upper bound, or both as `lower - upper`.
    Bounds { lower: bool, upper: bool },

    /// Longest common prefix, optionally padded with a redaction character.
    CommonPrefix {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        redaction: Option<char>,
    },

    ArithmeticMean,

    GeometricMean,
}

impl Default for AggregateFunction {
    fn default() -> Self {
        Self::interval()
    }
}

impl AggregateFunction {
    /// Half-open interval notation `[min,max)`.
    pub fn interval() -> Self {
        AggregateFunction::Interval {
            lower_included: true,
            upper_included: false,
        }
    }

    /// Closed interval notation `[min,max]`.
    pub fn closed_interval() -> Self {
        AggregateFunction::Interval {
            lower_included: true,
            upper_included: true,
        }
    }

    pub fn constant(value: impl Into<String>) -> Self {
        AggregateFunction::Constant {
            value: value.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Constant { .. } => "constant",
            AggregateFunction::Interval { .. } => "interval",
            AggregateFunction::Set => "set",
            AggregateFunction::Bounds { .. } => "bounds",
            AggregateFunction::CommonPrefix { .. } => "common prefix",
            AggregateFunction::ArithmeticMean => "arithmetic mean",
            AggregateFunction::GeometricMean => "geometric mean",
        }
    }

    /// Check if the function can be evaluated for values of `data_type`.
    pub fn is_supported_by(&self, data_type: &DataTypeSpec) -> bool {
        match self {
            AggregateFunction::ArithmeticMean => data_type.is_ratio_scale(),
            AggregateFunction::GeometricMean => data_type.is_numeric(),
            _ => true,
        }
    }

    /// Check support and turn a mismatch into a specification error.
    pub fn check(&self, data_type: &DataTypeSpec) -> SpecResult<()> {
        if self.is_supported_by(data_type) {
            Ok(())
        } else {
            Err(self.unsupported(data_type))
        }
    }

    fn unsupported(&self, data_type: &DataTypeSpec) -> SpecificationError {
        SpecificationError::UnsupportedFunction {
            function: self.name().to_string(),
            data_type: data_type.to_string(),
        }
    }

    /// Compute the label for `values`, which must be in ascending order.
    pub fn aggregate<T: DataType>(&self, data_type: &T, values: &[T::Value]) -> SpecResult<String> {
        let formatted = || values.iter().map(|v| data_type.format(v));
        let first = values.first().map(|v| data_type.format(v)).unwrap_or_default();
        let last = values.last().map(|v| data_type.format(v)).unwrap_or_default();

        let label = match self {
            AggregateFunction::Constant { value } => value.clone(),
            AggregateFunction::Interval {
                lower_included,
                upper_included,
            } => format!(
                "{}{},{}{}",
                if *lower_included { '[' } else { '(' },
                first,
                last,
                if *upper_included { ']' } else { ')' }
            ),
            AggregateFunction::Set => format!("{{{}}}", formatted().collect::<Vec<_>>().join(", ")),
            AggregateFunction::Bounds { lower, upper } => match (lower, upper) {
                (true, false) => first,
                (false, true) => last,
                (true, true) => format!("{} - {}", first, last),
                (false, false) => "*".to_string(),
            },
            AggregateFunction::CommonPrefix { redaction } => {
                common_prefix(formatted().collect(), *redaction)
            }
            AggregateFunction::ArithmeticMean => data_type
                .mean(values)
                .map(|m| data_type.format(&m))
                .ok_or_else(|| self.unsupported(&data_type.spec()))?,
            AggregateFunction::GeometricMean => data_type
                .geometric_mean(values)
                .map(|m| data_type.format(&m))
                .ok_or_else(|| self.unsupported(&data_type.spec()))?,
        };
        Ok(label)
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Constant { value } => write!(f, "constant({})", value),
            other => write!(f, "{}", other.name()),
        }
    }
}

fn common_prefix(values: Vec<String>, redaction: Option<char>) -> String {
    let Some((head, rest)) = values.split_first() else {
        return String::new();
    };
    let mut prefix: Vec<char> = head.chars().collect();
    for value in rest {
        let shared = prefix
            .iter()
            .zip(value.chars())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }

    let mut label: String = prefix.iter().collect();
    if let Some(ch) = redaction {
        let width = values.iter().map(|v| v.chars().count()).max().unwrap_or(0);
        label.extend(std::iter::repeat(ch).take(width - prefix.len()));
    }
    label
}
