//! Interval-based hierarchies over ratio-scale attributes.
//!
//! A short list of contiguous intervals is repeated across the domain: a value
//! `k` pattern widths above the first interval falls into the interval that
//! contains `value - k * width`, with both bounds shifted back by `k * width`.
//! Values outside the repeat bounds are snapped into the boundary intervals,
//! values outside the snap bounds land in open-ended out-of-range elements.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::grouping::{ascend, base_range, check_functions, validate_levels, Level};
use super::{push_rows, Hierarchy, HierarchyBuilder};
use crate::aggregate::AggregateFunction;
use crate::domain::ValueDomain;
use crate::error::{HierarchyResult, SpecResult, SpecificationError};
use crate::types::{DataType, RatioScale};

/// Half-open interval `[min, max)` labelled by `function`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval<V> {
    pub min: V,
    pub max: V,
    pub function: AggregateFunction,
}

/// Top- or bottom-coding parameters for one side of the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Range<V> {
    /// The interval pattern repeats up to this bound.
    pub repeat_bound: V,
    /// Values between the repeat and the snap bound join the boundary interval.
    pub snap_bound: V,
    /// Rendered as the open end of the out-of-range interval.
    pub label_bound: V,
}

impl<V: Clone> Range<V> {
    pub fn new(repeat_bound: V, snap_bound: V, label_bound: V) -> Self {
        Self {
            repeat_bound,
            snap_bound,
            label_bound,
        }
    }

    /// All three bounds at the same value.
    pub fn at(bound: V) -> Self {
        Self::new(bound.clone(), bound.clone(), bound)
    }
}

/// A splice operation on the interval list. Bounds are raw strings.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalEdit {
    /// Insert an interval of the same width before `index`.
    AddBefore(usize),
    /// Insert an interval of the same width after `index`.
    AddAfter(usize),
    /// Merge the interval into its predecessor.
    MergeUp(usize),
    /// Merge the interval with its successor.
    MergeDown(usize),
    /// Remove the interval; its predecessor absorbs the range.
    Remove(usize),
    SetBounds {
        index: usize,
        min: String,
        max: String,
    },
    SetFunction {
        index: usize,
        function: AggregateFunction,
    },
}

/// Builds hierarchies from repeated intervals and grouping levels.
#[derive(Debug, Clone)]
pub struct IntervalBuilder<T: RatioScale> {
    data_type: T,
    intervals: Vec<Interval<T::Value>>,
    lower: Option<Range<T::Value>>,
    upper: Option<Range<T::Value>>,
    levels: Vec<Level>,
}

impl<T: RatioScale> IntervalBuilder<T> {
    pub fn new(data_type: T) -> Self {
        Self {
            data_type,
            intervals: Vec::new(),
            lower: None,
            upper: None,
            levels: Vec::new(),
        }
    }

    pub fn data_type(&self) -> &T {
        &self.data_type
    }

    pub fn intervals(&self) -> &[Interval<T::Value>] {
        &self.intervals
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut Vec<Level> {
        &mut self.levels
    }

    pub fn lower_range(&self) -> Option<&Range<T::Value>> {
        self.lower.as_ref()
    }

    pub fn upper_range(&self) -> Option<&Range<T::Value>> {
        self.upper.as_ref()
    }

    pub fn add_interval(
        &mut self,
        min: T::Value,
        max: T::Value,
        function: AggregateFunction,
    ) -> &mut Self {
        self.intervals.push(Interval { min, max, function });
        self
    }

    /// Parse both bounds and append the interval.
    pub fn parse_interval(
        &mut self,
        min: &str,
        max: &str,
        function: AggregateFunction,
    ) -> SpecResult<&mut Self> {
        let min = self.parse_bound(min)?;
        let max = self.parse_bound(max)?;
        Ok(self.add_interval(min, max, function))
    }

    pub fn parse_bound(&self, raw: &str) -> SpecResult<T::Value> {
        self.data_type
            .parse(raw)
            .map_err(|e| SpecificationError::MalformedBound {
                value: raw.to_string(),
                reason: e.reason,
            })
    }

    pub fn set_lower_range(&mut self, range: Range<T::Value>) -> &mut Self {
        self.lower = Some(range);
        self
    }

    pub fn set_upper_range(&mut self, range: Range<T::Value>) -> &mut Self {
        self.upper = Some(range);
        self
    }

    /// The level at `index`, creating empty levels up to it.
    pub fn level(&mut self, index: usize) -> &mut Level {
        if self.levels.len() <= index {
            self.levels.resize_with(index + 1, Level::new);
        }
        &mut self.levels[index]
    }

    /// Reset both ranges to the observed extent of `domain`.
    ///
    /// Repeat and snap bounds move together; the upper bounds land on the end
    /// of the interval covering the domain maximum.
    pub fn update_ranges_from_domain(&mut self, domain: &ValueDomain<T>) {
        let (Some(min), Some(max)) = (domain.min(), domain.max()) else {
            return;
        };
        let Some(pattern) = self.pattern() else {
            return;
        };
        let upper = pattern.bounds(pattern.element_of(max)).1;
        self.lower = Some(Range::at(min.clone()));
        self.upper = Some(Range::at(upper));
    }

    pub(crate) fn pattern(&self) -> Option<IntervalPattern<'_, T>> {
        IntervalPattern::new(&self.data_type, &self.intervals)
    }

    /// Apply a splice edit, keeping the list contiguous.
    pub fn apply(&mut self, edit: &IntervalEdit) -> SpecResult<()> {
        let len = self.intervals.len();
        let check = |index: usize| {
            if index < len {
                Ok(())
            } else {
                Err(SpecificationError::IndexOutOfBounds { index, len })
            }
        };
        let ty = self.data_type.clone();

        match edit {
            IntervalEdit::AddAfter(index) => {
                check(*index)?;
                let current = &self.intervals[*index];
                let width = ty.subtract(&current.max, &current.min);
                let inserted = Interval {
                    min: current.max.clone(),
                    max: ty.add(&current.max, &width),
                    function: current.function.clone(),
                };
                for interval in &mut self.intervals[*index + 1..] {
                    interval.min = ty.add(&interval.min, &width);
                    interval.max = ty.add(&interval.max, &width);
                }
                self.intervals.insert(*index + 1, inserted);
            }
            IntervalEdit::AddBefore(index) => {
                check(*index)?;
                let current = &self.intervals[*index];
                let back = ty.multiply(&ty.subtract(&current.max, &current.min), -1);
                let inserted = Interval {
                    min: ty.add(&current.min, &back),
                    max: current.min.clone(),
                    function: current.function.clone(),
                };
                for interval in &mut self.intervals[..*index] {
                    interval.min = ty.add(&interval.min, &back);
                    interval.max = ty.add(&interval.max, &back);
                }
                self.intervals.insert(*index, inserted);
            }
            IntervalEdit::MergeUp(index) => {
                check(*index)?;
                if *index == 0 {
                    return Err(SpecificationError::IndexOutOfBounds { index: 0, len });
                }
                let removed = self.intervals.remove(*index);
                self.intervals[*index - 1].max = removed.max;
            }
            IntervalEdit::MergeDown(index) => {
                check(*index + 1)?;
                let removed = self.intervals.remove(*index + 1);
                self.intervals[*index].max = removed.max;
            }
            IntervalEdit::Remove(index) => {
                check(*index)?;
                if len == 1 {
                    return Err(SpecificationError::LastElement("interval"));
                }
                let removed = self.intervals.remove(*index);
                if *index > 0 {
                    self.intervals[*index - 1].max = removed.max;
                }
            }
            IntervalEdit::SetBounds { index, min, max } => {
                check(*index)?;
                let min = self.parse_bound(min)?;
                let max = self.parse_bound(max)?;
                let mut updated = self.intervals.clone();
                if *index > 0 {
                    updated[*index - 1].max = min.clone();
                }
                if *index + 1 < len {
                    updated[*index + 1].min = max.clone();
                }
                updated[*index].min = min;
                updated[*index].max = max;

                let lo = index.saturating_sub(1);
                let hi = (*index + 1).min(len - 1);
                if let Some(empty) = updated[lo..=hi]
                    .iter()
                    .find(|iv| ty.compare(&iv.min, &iv.max) != Ordering::Less)
                {
                    return Err(SpecificationError::EmptyInterval {
                        interval: self.describe(empty),
                    });
                }
                self.intervals = updated;
            }
            IntervalEdit::SetFunction { index, function } => {
                check(*index)?;
                self.intervals[*index].function = function.clone();
            }
        }
        Ok(())
    }

    fn describe(&self, interval: &Interval<T::Value>) -> String {
        format!(
            "[{}, {})",
            self.data_type.format(&interval.min),
            self.data_type.format(&interval.max)
        )
    }

    fn validate_range(&self, lower: &Range<T::Value>, upper: &Range<T::Value>) -> SpecResult<()> {
        let ty = &self.data_type;
        let le = |a: &T::Value, b: &T::Value| ty.compare(a, b) != Ordering::Greater;
        if !le(&lower.label_bound, &lower.snap_bound) || !le(&lower.snap_bound, &lower.repeat_bound) {
            return Err(SpecificationError::InvalidRange(
                "lower bounds must satisfy label <= snap <= repeat".to_string(),
            ));
        }
        if !le(&upper.repeat_bound, &upper.snap_bound) || !le(&upper.snap_bound, &upper.label_bound) {
            return Err(SpecificationError::InvalidRange(
                "upper bounds must satisfy repeat <= snap <= label".to_string(),
            ));
        }
        if ty.compare(&lower.repeat_bound, &upper.repeat_bound) != Ordering::Less {
            return Err(SpecificationError::InvalidRange(format!(
                "lower repeat bound {} must be below upper repeat bound {}",
                ty.format(&lower.repeat_bound),
                ty.format(&upper.repeat_bound)
            )));
        }
        Ok(())
    }

    /// Build the hierarchy for an already parsed domain.
    pub fn build_domain(&self, domain: &ValueDomain<T>) -> HierarchyResult<Hierarchy> {
        self.validate()?;
        let pattern = self.pattern().ok_or(SpecificationError::NoIntervals)?;
        let (Some(min), Some(max)) = (domain.min(), domain.max()) else {
            return Ok(Hierarchy::new(Vec::new()));
        };

        let lower = self.lower.clone().unwrap_or_else(|| Range::at(min.clone()));
        let upper = self
            .upper
            .clone()
            .unwrap_or_else(|| Range::at(pattern.bounds(pattern.element_of(max)).1));
        self.validate_range(&lower, &upper)?;
        let zones = Zones::new(&pattern, lower, upper);

        debug!(
            intervals = self.intervals.len(),
            levels = self.levels.len(),
            values = domain.len(),
            first_element = zones.first,
            last_element = zones.last,
            "building interval hierarchy"
        );

        let mut slot_labels: HashMap<Slot, String> = HashMap::new();
        let mut group_labels: Vec<HashMap<i64, String>> = vec![HashMap::new(); self.levels.len()];
        let mut rows = Vec::with_capacity(domain.len());

        for entry in domain.entries() {
            let slot = zones.classify(&pattern, &entry.value);
            let mut row = Vec::with_capacity(self.levels.len() + 2);

            let label = match slot_labels.get(&slot) {
                Some(label) => label.clone(),
                None => {
                    let label = self.slot_label(&pattern, &zones, slot)?;
                    slot_labels.insert(slot, label.clone());
                    label
                }
            };
            row.push(label);

            let base = match slot {
                Slot::Below => zones.first,
                Slot::Element(element) => element,
                Slot::Above => zones.last,
            };
            for depth in 1..=self.levels.len() {
                let index = ascend(&self.levels, depth, base);
                let cache = &mut group_labels[depth - 1];
                let label = match cache.get(&index) {
                    Some(label) => label.clone(),
                    None => {
                        let label = self.group_label(&pattern, Some(&zones), depth, index)?;
                        cache.insert(index, label.clone());
                        label
                    }
                };
                row.push(label);
            }
            push_rows(&mut rows, entry.spellings(), row);
        }

        Ok(Hierarchy::new(rows).with_suppression_level())
    }

    fn slot_label(
        &self,
        pattern: &IntervalPattern<'_, T>,
        zones: &Zones<T::Value>,
        slot: Slot,
    ) -> SpecResult<String> {
        let ty = &self.data_type;
        match slot {
            Slot::Below => pattern.function(zones.first).aggregate(
                ty,
                &[zones.lower.label_bound.clone(), zones.lower.snap_bound.clone()],
            ),
            Slot::Above => pattern.function(zones.last).aggregate(
                ty,
                &[zones.upper.snap_bound.clone(), zones.upper.label_bound.clone()],
            ),
            Slot::Element(element) => {
                let (mut min, mut max) = pattern.bounds(element);
                if element == zones.first {
                    min = minimum(ty, min, &zones.lower.snap_bound);
                }
                if element == zones.last {
                    max = maximum(ty, max, &zones.upper.snap_bound);
                }
                pattern.function(element).aggregate(ty, &[min, max])
            }
        }
    }

    /// Label of group `index` on grouping level `depth` (1-based).
    pub(crate) fn group_label(
        &self,
        pattern: &IntervalPattern<'_, T>,
        zones: Option<&Zones<T::Value>>,
        depth: usize,
        index: i64,
    ) -> SpecResult<String> {
        let ty = &self.data_type;
        let (min, max) = self.group_bounds(pattern, zones, depth, index);
        let level = &self.levels[depth - 1];
        let tile = level.tile(index);
        level.groups[tile.position]
            .function
            .aggregate(ty, &[min, max])
    }

    pub(crate) fn group_bounds(
        &self,
        pattern: &IntervalPattern<'_, T>,
        zones: Option<&Zones<T::Value>>,
        depth: usize,
        index: i64,
    ) -> (T::Value, T::Value) {
        let ty = &self.data_type;
        let (start, end) = base_range(&self.levels, depth, index);
        let (mut min, _) = pattern.bounds(start);
        let (_, mut max) = pattern.bounds(end - 1);
        if let Some(zones) = zones {
            if start <= zones.first && zones.first < end {
                min = minimum(ty, min, &zones.lower.label_bound);
            }
            if start <= zones.last && zones.last < end {
                max = maximum(ty, max, &zones.upper.label_bound);
            }
        }
        (min, max)
    }
}

impl<T: RatioScale> HierarchyBuilder for IntervalBuilder<T> {
    fn validate(&self) -> SpecResult<()> {
        let ty = &self.data_type;
        if self.intervals.is_empty() {
            return Err(SpecificationError::NoIntervals);
        }
        for interval in &self.intervals {
            if ty.compare(&interval.min, &interval.max) != Ordering::Less {
                return Err(SpecificationError::EmptyInterval {
                    interval: self.describe(interval),
                });
            }
        }
        for pair in self.intervals.windows(2) {
            match ty.compare(&pair[0].max, &pair[1].min) {
                Ordering::Equal => {}
                Ordering::Less => {
                    return Err(SpecificationError::Gap {
                        left: self.describe(&pair[0]),
                        right: self.describe(&pair[1]),
                    })
                }
                Ordering::Greater => {
                    return Err(SpecificationError::Overlap {
                        left: self.describe(&pair[0]),
                        right: self.describe(&pair[1]),
                    })
                }
            }
        }
        if let (Some(lower), Some(upper)) = (&self.lower, &self.upper) {
            self.validate_range(lower, upper)?;
        }

        let spec = ty.spec();
        for interval in &self.intervals {
            interval.function.check(&spec)?;
        }
        validate_levels(&self.levels)?;
        check_functions(&self.levels, &spec)
    }

    fn build<S: AsRef<str>>(&self, values: &[S]) -> HierarchyResult<Hierarchy> {
        let domain = ValueDomain::new(self.data_type.clone(), values)?;
        self.build_domain(&domain)
    }
}

/// Where a value lands relative to the ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Below,
    Element(i64),
    Above,
}

/// Resolved ranges plus the boundary elements they snap into.
pub(crate) struct Zones<V> {
    lower: Range<V>,
    upper: Range<V>,
    first: i64,
    last: i64,
}

impl<V: Clone + PartialEq + std::fmt::Debug> Zones<V> {
    fn new<T>(pattern: &IntervalPattern<'_, T>, lower: Range<V>, upper: Range<V>) -> Self
    where
        T: RatioScale<Value = V>,
    {
        let first = pattern.element_of(&lower.repeat_bound);
        let candidate = pattern.element_of(&upper.repeat_bound);
        let on_boundary = pattern
            .data_type
            .compare(&pattern.bounds(candidate).0, &upper.repeat_bound)
            == Ordering::Equal;
        let last = if on_boundary { candidate - 1 } else { candidate };
        Self {
            lower,
            upper,
            first,
            last: last.max(first),
        }
    }

    fn classify<T>(&self, pattern: &IntervalPattern<'_, T>, value: &V) -> Slot
    where
        T: RatioScale<Value = V>,
    {
        let below = |bound: &V| pattern.data_type.compare(value, bound) == Ordering::Less;
        if below(&self.lower.snap_bound) {
            Slot::Below
        } else if below(&self.lower.repeat_bound) {
            Slot::Element(self.first)
        } else if below(&self.upper.repeat_bound) {
            Slot::Element(pattern.element_of(value).clamp(self.first, self.last))
        } else if below(&self.upper.snap_bound) {
            Slot::Element(self.last)
        } else {
            Slot::Above
        }
    }
}

/// The interval list seen as an infinitely repeating pattern.
pub(crate) struct IntervalPattern<'a, T: RatioScale> {
    data_type: &'a T,
    intervals: &'a [Interval<T::Value>],
    width: T::Delta,
}

impl<'a, T: RatioScale> IntervalPattern<'a, T> {
    pub(crate) fn new(data_type: &'a T, intervals: &'a [Interval<T::Value>]) -> Option<Self> {
        let first = intervals.first()?;
        let last = intervals.last()?;
        let width = data_type.subtract(&last.max, &first.min);
        Some(Self {
            data_type,
            intervals,
            width,
        })
    }

    fn len(&self) -> i64 {
        self.intervals.len() as i64
    }

    /// Global index of the repeated interval containing `value`.
    pub(crate) fn element_of(&self, value: &T::Value) -> i64 {
        let ty = self.data_type;
        let start = &self.intervals[0].min;
        let end = &self.intervals[self.intervals.len() - 1].max;

        let ratio = ty.ratio(&ty.subtract(value, start), &self.width);
        let mut cycle = if ratio.is_finite() {
            ratio.floor() as i64
        } else {
            0
        };
        let normalize = |cycle: i64| ty.add(value, &ty.multiply(&self.width, cycle.saturating_neg()));

        // Correct floating point error at cycle boundaries
        for _ in 0..3 {
            let normalized = normalize(cycle);
            if ty.compare(&normalized, start) == Ordering::Less {
                cycle -= 1;
            } else if ty.compare(&normalized, end) != Ordering::Less {
                cycle += 1;
            } else {
                break;
            }
        }

        let normalized = normalize(cycle);
        let position = self
            .intervals
            .partition_point(|iv| ty.compare(&iv.max, &normalized) != Ordering::Greater);
        cycle * self.len() + (position as i64).min(self.len() - 1)
    }

    /// Bounds of the repeated interval with global index `element`.
    pub(crate) fn bounds(&self, element: i64) -> (T::Value, T::Value) {
        let ty = self.data_type;
        let cycle = element.div_euclid(self.len());
        let interval = &self.intervals[element.rem_euclid(self.len()) as usize];
        let shift = ty.multiply(&self.width, cycle);
        (ty.add(&interval.min, &shift), ty.add(&interval.max, &shift))
    }

    pub(crate) fn function(&self, element: i64) -> &'a AggregateFunction {
        &self.intervals[element.rem_euclid(self.len()) as usize].function
    }

    /// Label of repeated interval `element` without any range adjustment.
    pub(crate) fn label(&self, element: i64) -> SpecResult<String> {
        let (min, max) = self.bounds(element);
        self.function(element).aggregate(self.data_type, &[min, max])
    }
}

fn minimum<T: DataType>(ty: &T, value: T::Value, bound: &T::Value) -> T::Value {
    if ty.compare(bound, &value) == Ordering::Less {
        bound.clone()
    } else {
        value
    }
}

fn maximum<T: DataType>(ty: &T, value: T::Value, bound: &T::Value) -> T::Value {
    if ty.compare(bound, &value) == Ordering::Greater {
        bound.clone()
    } else {
        value
    }
}
