//! Hierarchy builders and their result type.
//!
//! ```text
//!   raw values ──► ValueDomain ──► builder ──► Hierarchy
//!                                   │
//!            interval / order / redaction / date
//! ```
//!
//! Every builder is rebuilt wholesale on each specification change; there is
//! no incremental update.

mod date;
mod grouping;
mod interval;
mod order;
mod redaction;

pub use date::{DateBuilder, DateLevel, Granularity};
pub use grouping::{check_functions, validate_levels, Group, GroupEdit, Level};
pub use interval::{Interval, IntervalBuilder, IntervalEdit, Range};
pub use order::{Collation, OrderBuilder, OrderEdit};
pub use redaction::{DomainMetrics, RedactionBuilder, RedactionOrder};

pub(crate) use grouping::base_range;
pub(crate) use interval::IntervalPattern;

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::{HierarchyResult, SpecResult};

/// Label of the fully suppressed top level.
pub const SUPPRESSED: &str = "*";

/// Push `labels` once per spelling, each row led by its spelling.
pub(crate) fn push_rows<'a>(
    rows: &mut Vec<Vec<String>>,
    spellings: impl Iterator<Item = &'a str>,
    labels: Vec<String>,
) {
    for raw in spellings {
        let mut row = Vec::with_capacity(labels.len() + 1);
        row.push(raw.to_string());
        row.extend(labels.iter().cloned());
        rows.push(row);
    }
}

/// Common surface of all hierarchy builders.
pub trait HierarchyBuilder {
    /// Check the specification without touching any data.
    fn validate(&self) -> SpecResult<()>;

    /// Descriptive message for an invalid specification, `None` when valid.
    fn is_valid(&self) -> Option<String> {
        self.validate().err().map(|e| e.to_string())
    }

    /// Build the hierarchy for the given raw values.
    fn build<S: AsRef<str>>(&self, values: &[S]) -> HierarchyResult<Hierarchy>;
}

/// A generalization hierarchy: one row per distinct raw value.
///
/// Column 0 holds the raw value; every further column is one level of
/// increasingly generalized labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hierarchy {
    rows: Vec<Vec<String>>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Hierarchy {
    /// Create a hierarchy from rows of equal length.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.first().map(|raw| (raw.clone(), i)))
            .collect();
        Self { rows, index }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of levels, including the identity level.
    pub fn depth(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// The full label sequence of a raw value.
    pub fn row(&self, value: &str) -> Option<&[String]> {
        self.index.get(value).map(|i| self.rows[*i].as_slice())
    }

    /// The label of `value` on `level`.
    pub fn generalize(&self, value: &str, level: usize) -> Option<&str> {
        self.row(value)
            .and_then(|row| row.get(level))
            .map(|s| s.as_str())
    }

    /// All labels of one level, in row order.
    pub fn level(&self, level: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(level).map(|s| s.as_str()))
    }

    /// Number of distinct labels on every level.
    pub fn group_counts(&self) -> Vec<usize> {
        (0..self.depth())
            .map(|level| self.level(level).collect::<HashSet<_>>().len())
            .collect()
    }

    /// Check that rows are rectangular and every label has exactly one parent.
    pub fn check_consistency(&self) -> Result<(), String> {
        let depth = self.depth();
        if let Some(row) = self.rows.iter().find(|r| r.len() != depth) {
            return Err(format!(
                "Row for '{}' has {} levels, expected {}",
                row.first().map(|s| s.as_str()).unwrap_or(""),
                row.len(),
                depth
            ));
        }
        for level in 0..depth.saturating_sub(1) {
            let mut parents: HashMap<&str, &str> = HashMap::new();
            for row in &self.rows {
                let parent = parents
                    .entry(row[level].as_str())
                    .or_insert(row[level + 1].as_str());
                if *parent != row[level + 1] {
                    return Err(format!(
                        "Label '{}' on level {} generalizes to both '{}' and '{}'",
                        row[level],
                        level,
                        parent,
                        row[level + 1]
                    ));
                }
            }
        }
        Ok(())
    }

    /// Render as separated text, one row per line.
    pub fn to_csv(&self, separator: char) -> String {
        let sep = separator.to_string();
        self.rows
            .iter()
            .map(|row| row.join(&sep))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Append a fully suppressed level unless the top level already is one.
    pub(crate) fn with_suppression_level(mut self) -> Self {
        let top = self.depth().saturating_sub(1);
        let distinct = self.level(top).collect::<HashSet<_>>().len();
        if distinct > 1 || self.depth() <= 1 {
            for row in &mut self.rows {
                row.push(SUPPRESSED.to_string());
            }
        }
        self
    }
}
