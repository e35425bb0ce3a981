use std::cmp::Ordering;
use std::collections::HashMap;

use super::{DataType, DataTypeSpec};
use crate::error::ValueError;

/// Plain strings ordered lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringType;

impl DataType for StringType {
    type Value = String;

    fn spec(&self) -> DataTypeSpec {
        DataTypeSpec::String
    }

    fn parse(&self, raw: &str) -> Result<String, ValueError> {
        Ok(raw.to_string())
    }

    fn format(&self, value: &String) -> String {
        value.clone()
    }

    fn compare(&self, a: &String, b: &String) -> Ordering {
        a.cmp(b)
    }
}

/// Strings with an explicit, user-defined order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedStringType {
    order: Vec<String>,
    positions: HashMap<String, usize>,
}

impl OrderedStringType {
    pub fn new(order: Vec<String>) -> Self {
        let positions = order
            .iter()
            .enumerate()
            .map(|(i, value)| (value.clone(), i))
            .collect();
        Self { order, positions }
    }

    /// The declared order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    fn position(&self, value: &str) -> usize {
        self.positions.get(value).copied().unwrap_or(usize::MAX)
    }
}

impl DataType for OrderedStringType {
    type Value = String;

    fn spec(&self) -> DataTypeSpec {
        DataTypeSpec::OrderedString {
            order: self.order.clone(),
        }
    }

    fn parse(&self, raw: &str) -> Result<String, ValueError> {
        if self.positions.contains_key(raw) {
            Ok(raw.to_string())
        } else {
            Err(ValueError::new(
                raw,
                "ordered string",
                "value is not part of the declared order",
            ))
        }
    }

    fn format(&self, value: &String) -> String {
        value.clone()
    }

    fn compare(&self, a: &String, b: &String) -> Ordering {
        self.position(a)
            .cmp(&self.position(b))
            .then_with(|| a.cmp(b))
    }
}
