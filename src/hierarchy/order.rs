//! Order-based hierarchies: group runs of adjacent values in a total order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::grouping::{ascend, base_range, check_functions, validate_levels, Level};
use super::{push_rows, Hierarchy, HierarchyBuilder};
use crate::domain::ValueDomain;
use crate::error::{HierarchyResult, SpecResult, SpecificationError};
use crate::types::DataType;

/// Where the value order comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    /// The data type's own comparator.
    #[default]
    DataType,
    Lexicographic,
    CaseInsensitive,
    /// An explicit permutation of the domain.
    Custom,
}

impl Collation {
    fn compare<T: DataType>(
        &self,
        data_type: &T,
        (raw_a, a): (&str, &T::Value),
        (raw_b, b): (&str, &T::Value),
    ) -> Ordering {
        match self {
            Collation::DataType | Collation::Custom => data_type.compare(a, b),
            Collation::Lexicographic => raw_a.cmp(raw_b),
            Collation::CaseInsensitive => raw_a
                .to_lowercase()
                .cmp(&raw_b.to_lowercase())
                .then_with(|| raw_a.cmp(raw_b)),
        }
    }
}

/// An edit of the value order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEdit {
    MoveUp(usize),
    MoveDown(usize),
    /// Re-sort the whole order with a collation.
    Sort(Collation),
}

/// Builds hierarchies by tiling an ordered list of values with groups.
#[derive(Debug, Clone)]
pub struct OrderBuilder<T: DataType> {
    data_type: T,
    collation: Collation,
    order: Vec<String>,
    levels: Vec<Level>,
}

impl<T: DataType> OrderBuilder<T> {
    pub fn new(data_type: T) -> Self {
        Self {
            data_type,
            collation: Collation::DataType,
            order: Vec::new(),
            levels: Vec::new(),
        }
    }

    pub fn data_type(&self) -> &T {
        &self.data_type
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }

    /// The explicit order; empty unless the collation is custom.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut Vec<Level> {
        &mut self.levels
    }

    /// The level at `index`, creating empty levels up to it.
    pub fn level(&mut self, index: usize) -> &mut Level {
        if self.levels.len() <= index {
            self.levels.resize_with(index + 1, Level::new);
        }
        &mut self.levels[index]
    }

    pub fn set_collation(&mut self, collation: Collation) -> &mut Self {
        self.collation = collation;
        if collation != Collation::Custom {
            self.order.clear();
        }
        self
    }

    /// Use an explicit order. It must be a permutation of the domain.
    pub fn set_order<I, S>(&mut self, order: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = order.into_iter().map(Into::into).collect();
        self.collation = Collation::Custom;
        self
    }

    /// Domain indices in hierarchy order.
    pub fn resolve_order(&self, domain: &ValueDomain<T>) -> SpecResult<Vec<usize>> {
        let entries = domain.entries();
        if self.collation != Collation::Custom {
            let mut indices: Vec<usize> = (0..entries.len()).collect();
            indices.sort_by(|a, b| {
                let (a, b) = (&entries[*a], &entries[*b]);
                self.collation.compare(
                    &self.data_type,
                    (a.raw.as_str(), &a.value),
                    (b.raw.as_str(), &b.value),
                )
            });
            return Ok(indices);
        }

        let positions: HashMap<&str, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.raw.as_str(), i))
            .collect();
        let mut seen = vec![false; entries.len()];
        let mut indices = Vec::with_capacity(entries.len());
        for raw in &self.order {
            let index = match positions.get(raw.as_str()) {
                Some(index) => *index,
                None => domain
                    .find(raw)
                    .and_then(|entry| positions.get(entry.raw.as_str()).copied())
                    .ok_or_else(|| {
                        SpecificationError::OrderMismatch(format!("'{}' is not in the domain", raw))
                    })?,
            };
            if std::mem::replace(&mut seen[index], true) {
                return Err(SpecificationError::OrderMismatch(format!(
                    "'{}' appears more than once",
                    raw
                )));
            }
            indices.push(index);
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(SpecificationError::OrderMismatch(format!(
                "'{}' is missing from the order",
                entries[missing].raw
            )));
        }
        Ok(indices)
    }

    /// Turn the current collation into an explicit order over `domain`.
    pub fn materialize(&mut self, domain: &ValueDomain<T>) -> SpecResult<()> {
        let indices = self.resolve_order(domain)?;
        self.order = indices
            .into_iter()
            .map(|i| domain.entries()[i].raw.clone())
            .collect();
        self.collation = Collation::Custom;
        Ok(())
    }

    pub fn apply(&mut self, edit: &OrderEdit, domain: &ValueDomain<T>) -> SpecResult<()> {
        if let OrderEdit::Sort(collation) = edit {
            self.set_collation(*collation);
            return self.materialize(domain);
        }

        self.materialize(domain)?;
        let len = self.order.len();
        match edit {
            OrderEdit::MoveUp(index) => {
                if *index == 0 || *index >= len {
                    return Err(SpecificationError::IndexOutOfBounds { index: *index, len });
                }
                self.order.swap(*index - 1, *index);
            }
            OrderEdit::MoveDown(index) => {
                if *index + 1 >= len {
                    return Err(SpecificationError::IndexOutOfBounds { index: *index, len });
                }
                self.order.swap(*index, *index + 1);
            }
            OrderEdit::Sort(_) => {}
        }
        Ok(())
    }

    /// Check that no level covers more elements than the level below holds.
    pub fn validate_sizes(&self, count: usize) -> SpecResult<()> {
        if count == 0 {
            return Ok(());
        }
        let mut available = count;
        for (i, level) in self.levels.iter().enumerate() {
            let covered = level.pattern_size();
            if covered > available {
                return Err(SpecificationError::GroupSizeMismatch {
                    level: i,
                    covered,
                    available,
                });
            }
            available = (ascend(&self.levels, i + 1, count as i64 - 1) + 1) as usize;
        }
        Ok(())
    }

    /// Build the hierarchy for an already parsed domain.
    pub fn build_domain(&self, domain: &ValueDomain<T>) -> HierarchyResult<Hierarchy> {
        self.validate()?;
        self.validate_sizes(domain.len())?;
        let order = self.resolve_order(domain)?;
        let n = order.len() as i64;
        let entries = domain.entries();

        debug!(
            values = order.len(),
            levels = self.levels.len(),
            collation = ?self.collation,
            "building order hierarchy"
        );

        let mut labels: Vec<HashMap<i64, String>> = vec![HashMap::new(); self.levels.len()];
        let mut rows = Vec::with_capacity(order.len());
        for (position, index) in order.iter().enumerate() {
            let mut row = Vec::with_capacity(self.levels.len() + 1);
            for depth in 1..=self.levels.len() {
                let group = ascend(&self.levels, depth, position as i64);
                let cache = &mut labels[depth - 1];
                let label = match cache.get(&group) {
                    Some(label) => label.clone(),
                    None => {
                        let (start, end) = base_range(&self.levels, depth, group);
                        let members: Vec<T::Value> = order[start.max(0) as usize..end.min(n) as usize]
                            .iter()
                            .map(|i| entries[*i].value.clone())
                            .collect();
                        let level = &self.levels[depth - 1];
                        let function = &level.groups[level.tile(group).position].function;
                        let label = function.aggregate(&self.data_type, &members)?;
                        cache.insert(group, label.clone());
                        label
                    }
                };
                row.push(label);
            }
            push_rows(&mut rows, entries[*index].spellings(), row);
        }

        Ok(Hierarchy::new(rows).with_suppression_level())
    }
}

impl<T: DataType> HierarchyBuilder for OrderBuilder<T> {
    fn validate(&self) -> SpecResult<()> {
        validate_levels(&self.levels)?;
        check_functions(&self.levels, &self.data_type.spec())?;
        if self.collation == Collation::Custom {
            self.validate_sizes(self.order.len())?;
        }
        Ok(())
    }

    fn build<S: AsRef<str>>(&self, values: &[S]) -> HierarchyResult<Hierarchy> {
        let domain = ValueDomain::new(self.data_type.clone(), values)?;
        self.build_domain(&domain)
    }
}
