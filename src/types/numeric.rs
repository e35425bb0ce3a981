use std::cmp::Ordering;

use super::{DataType, DataTypeSpec, RatioScale};
use crate::error::ValueError;

/// Whole numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegerType;

impl DataType for IntegerType {
    type Value = i64;

    fn spec(&self) -> DataTypeSpec {
        DataTypeSpec::Integer
    }

    fn parse(&self, raw: &str) -> Result<i64, ValueError> {
        raw.trim()
            .parse::<i64>()
            .map_err(|e| ValueError::new(raw, "integer", e.to_string()))
    }

    fn format(&self, value: &i64) -> String {
        value.to_string()
    }

    fn compare(&self, a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }

    fn mean(&self, values: &[i64]) -> Option<i64> {
        if values.is_empty() {
            return None;
        }
        let sum: i128 = values.iter().map(|v| *v as i128).sum();
        Some((sum as f64 / values.len() as f64).round() as i64)
    }

    fn geometric_mean(&self, values: &[i64]) -> Option<i64> {
        let floats: Vec<f64> = values.iter().map(|v| *v as f64).collect();
        geometric_mean(&floats).map(|m| m.round() as i64)
    }
}

impl RatioScale for IntegerType {
    type Delta = i64;

    fn add(&self, value: &i64, delta: &i64) -> i64 {
        value.saturating_add(*delta)
    }

    fn subtract(&self, a: &i64, b: &i64) -> i64 {
        a.saturating_sub(*b)
    }

    fn multiply(&self, delta: &i64, factor: i64) -> i64 {
        delta.saturating_mul(factor)
    }

    fn ratio(&self, a: &i64, b: &i64) -> f64 {
        *a as f64 / *b as f64
    }
}

/// Floating point numbers, optionally formatted with a fixed precision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecimalType {
    precision: Option<usize>,
}

impl DecimalType {
    pub fn new(precision: Option<usize>) -> Self {
        Self { precision }
    }
}

impl DataType for DecimalType {
    type Value = f64;

    fn spec(&self) -> DataTypeSpec {
        DataTypeSpec::Decimal {
            precision: self.precision,
        }
    }

    fn parse(&self, raw: &str) -> Result<f64, ValueError> {
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| ValueError::new(raw, "decimal", e.to_string()))?;
        if !value.is_finite() {
            return Err(ValueError::new(raw, "decimal", "value is not finite"));
        }
        Ok(value)
    }

    fn format(&self, value: &f64) -> String {
        match self.precision {
            Some(precision) => format!("{:.*}", precision, value),
            None => self.encode(value),
        }
    }

    fn encode(&self, value: &f64) -> String {
        // Use ryu for short, round-trippable output
        let mut buffer = ryu::Buffer::new();
        buffer.format(*value).to_string()
    }

    fn compare(&self, a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }

    fn mean(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    fn geometric_mean(&self, values: &[f64]) -> Option<f64> {
        geometric_mean(values)
    }
}

impl RatioScale for DecimalType {
    type Delta = f64;

    fn add(&self, value: &f64, delta: &f64) -> f64 {
        value + delta
    }

    fn subtract(&self, a: &f64, b: &f64) -> f64 {
        a - b
    }

    fn multiply(&self, delta: &f64, factor: i64) -> f64 {
        delta * factor as f64
    }

    fn ratio(&self, a: &f64, b: &f64) -> f64 {
        a / b
    }
}

/// Geometric mean of strictly positive values.
fn geometric_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| *v <= 0.0) {
        return None;
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    Some((log_sum / values.len() as f64).exp())
}
