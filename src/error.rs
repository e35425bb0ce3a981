//! Error types shared by the builders, the layout engine and the model.
//!
//! Three families are kept apart because callers treat them differently:
//! specification problems are surfaced as messages on the model, value
//! problems abort a single build, and configuration problems reject a saved
//! specification before it is ever parsed into a builder.

use std::io;
use thiserror::Error;

/// Result type for specification checks.
pub type SpecResult<T> = Result<T, SpecificationError>;

/// Result type for anything that builds a hierarchy.
pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// A builder specification that cannot produce a hierarchy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecificationError {
    #[error("No interval specified")]
    NoIntervals,

    #[error("Gap between {left} and {right}")]
    Gap { left: String, right: String },

    #[error("Overlap between {left} and {right}")]
    Overlap { left: String, right: String },

    #[error("Interval {interval} is empty")]
    EmptyInterval { interval: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("No groups specified on level {level}")]
    EmptyLevel { level: usize },

    #[error("Group with size 0 on level {level}")]
    ZeroSizeGroup { level: usize },

    #[error("Groups on level {level} cover {covered} elements, but the level below has only {available}")]
    GroupSizeMismatch {
        level: usize,
        covered: usize,
        available: usize,
    },

    #[error("Cannot parse bound '{value}': {reason}")]
    MalformedBound { value: String, reason: String },

    #[error("Function '{function}' requires a ratio-scale type, but the attribute is {data_type}")]
    UnsupportedFunction { function: String, data_type: String },

    #[error("Format '{format}' is not valid for granularity {granularity}: {reason}")]
    InvalidFormat {
        format: String,
        granularity: String,
        reason: String,
    },

    #[error("Granularity {0} does not support custom formats")]
    FormatNotSupported(String),

    #[error("Invalid time zone '{0}'")]
    InvalidTimeZone(String),

    #[error("No granularity specified")]
    NoGranularities,

    #[error("Value order does not match the domain: {0}")]
    OrderMismatch(String),

    #[error("Index {index} is out of bounds for {len} elements")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot remove the last {0}")]
    LastElement(&'static str),

    #[error("Invalid domain metrics: {0}")]
    InvalidMetrics(String),
}

/// A raw value that does not parse under the declared data type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("'{value}' is not a valid {data_type}: {reason}")]
pub struct ValueError {
    pub value: String,
    pub data_type: String,
    pub reason: String,
}

impl ValueError {
    pub fn new(
        value: impl Into<String>,
        data_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            data_type: data_type.into(),
            reason: reason.into(),
        }
    }
}

/// A saved specification that does not fit the attribute it is applied to.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// The builder needs arithmetic on values, the attribute has none.
    #[error("The {builder} builder requires a ratio-scale data type, but the attribute is {data_type}")]
    WrongScale { builder: String, data_type: String },

    /// The builder only works for a different family of types.
    #[error("The {builder} builder requires a {expected} attribute, but the attribute is {actual}")]
    WrongType {
        builder: String,
        expected: String,
        actual: String,
    },

    /// Same family, different parameters (e.g. another date format).
    #[error("Specification was created for {expected}, but the attribute is {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Failed to access specification file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse specification file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Umbrella error for operations that build hierarchies end to end.
#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("Invalid specification: {0}")]
    Specification(#[from] SpecificationError),

    #[error("Invalid value: {0}")]
    Value(#[from] ValueError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl HierarchyError {
    /// Check if the error stems from the specification rather than the data.
    pub fn is_specification(&self) -> bool {
        matches!(self, Self::Specification(_))
    }
}
