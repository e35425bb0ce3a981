//! Persisted hierarchy specifications (`*.ahs` files).
//!
//! A specification is the serializable form of a builder: bounds are kept as
//! raw strings so that one file format covers every data type. Files are JSON
//! with a `type` tag naming the builder kind:
//!
//! ```text
//! {
//!   "type": "interval",
//!   "data_type": { "kind": "integer" },
//!   "intervals": [ { "min": "0", "max": "50", "function": { "kind": "interval" } } ],
//!   "levels": [ { "groups": [ { "size": 2 } ] } ]
//! }
//! ```
//!
//! Loading checks the specification against the attribute it will be applied
//! to before any builder is constructed.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::aggregate::AggregateFunction;
use crate::domain::ValueDomain;
use crate::error::{ConfigurationError, HierarchyResult, SpecResult};
use crate::hierarchy::{
    Collation, DateBuilder, DateLevel, DomainMetrics, Granularity, GroupEdit, Hierarchy,
    HierarchyBuilder, IntervalBuilder, IntervalEdit, Level, OrderBuilder, OrderEdit, Range,
    RedactionBuilder, RedactionOrder,
};
use crate::layout::{Layout, LayoutEngine};
use crate::types::{DataType, DataTypeSpec, DateType, DecimalType, RatioScale};
use crate::{with_data_type, with_ratio_type};

/// File extension of saved specifications.
pub const EXTENSION: &str = "ahs";

/// One interval with raw bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalEntry {
    pub min: String,
    pub max: String,
    #[serde(default)]
    pub function: AggregateFunction,
}

/// Raw bounds of a [`Range`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub repeat: String,
    pub snap: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSpec {
    pub data_type: DataTypeSpec,
    pub intervals: Vec<IntervalEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<RangeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<RangeSpec>,
    #[serde(default)]
    pub levels: Vec<Level>,
}

impl IntervalSpec {
    pub fn to_builder<T: RatioScale>(&self, data_type: T) -> SpecResult<IntervalBuilder<T>> {
        let mut builder = IntervalBuilder::new(data_type);
        for entry in &self.intervals {
            builder.parse_interval(&entry.min, &entry.max, entry.function.clone())?;
        }
        if let Some(lower) = &self.lower {
            let range = parse_range(&builder, lower)?;
            builder.set_lower_range(range);
        }
        if let Some(upper) = &self.upper {
            let range = parse_range(&builder, upper)?;
            builder.set_upper_range(range);
        }
        *builder.levels_mut() = self.levels.clone();
        Ok(builder)
    }

    pub fn from_builder<T: RatioScale>(builder: &IntervalBuilder<T>) -> Self {
        let ty = builder.data_type();
        let range = |range: &Range<T::Value>| RangeSpec {
            repeat: ty.encode(&range.repeat_bound),
            snap: ty.encode(&range.snap_bound),
            label: ty.encode(&range.label_bound),
        };
        Self {
            data_type: ty.spec(),
            intervals: builder
                .intervals()
                .iter()
                .map(|iv| IntervalEntry {
                    min: ty.encode(&iv.min),
                    max: ty.encode(&iv.max),
                    function: iv.function.clone(),
                })
                .collect(),
            lower: builder.lower_range().map(range),
            upper: builder.upper_range().map(range),
            levels: builder.levels().to_vec(),
        }
    }
}

fn parse_range<T: RatioScale>(
    builder: &IntervalBuilder<T>,
    range: &RangeSpec,
) -> SpecResult<Range<T::Value>> {
    Ok(Range::new(
        builder.parse_bound(&range.repeat)?,
        builder.parse_bound(&range.snap)?,
        builder.parse_bound(&range.label)?,
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub data_type: DataTypeSpec,
    #[serde(default)]
    pub collation: Collation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(default)]
    pub levels: Vec<Level>,
}

impl OrderSpec {
    pub fn to_builder<T: DataType>(&self, data_type: T) -> OrderBuilder<T> {
        let mut builder = OrderBuilder::new(data_type);
        if self.collation == Collation::Custom {
            builder.set_order(self.order.iter().cloned());
        } else {
            builder.set_collation(self.collation);
        }
        *builder.levels_mut() = self.levels.clone();
        builder
    }

    pub fn from_builder<T: DataType>(builder: &OrderBuilder<T>) -> Self {
        Self {
            data_type: builder.data_type().spec(),
            collation: builder.collation(),
            order: builder.order().to_vec(),
            levels: builder.levels().to_vec(),
        }
    }
}

fn right_to_left() -> RedactionOrder {
    RedactionOrder::RightToLeft
}

fn padding() -> char {
    ' '
}

fn mask() -> char {
    '*'
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionSpec {
    #[serde(default)]
    pub alignment: RedactionOrder,
    #[serde(default = "right_to_left")]
    pub redaction: RedactionOrder,
    #[serde(default = "padding")]
    pub padding_char: char,
    #[serde(default = "mask")]
    pub redaction_char: char,
    #[serde(default)]
    pub metrics: DomainMetrics,
}

impl RedactionSpec {
    pub fn to_builder(&self) -> RedactionBuilder {
        RedactionBuilder::new(self.alignment, self.redaction)
            .with_characters(self.padding_char, self.redaction_char)
            .with_metrics(self.metrics)
    }

    pub fn from_builder(builder: &RedactionBuilder) -> Self {
        Self {
            alignment: builder.alignment(),
            redaction: builder.redaction(),
            padding_char: builder.padding_char(),
            redaction_char: builder.redaction_char(),
            metrics: *builder.metrics(),
        }
    }
}

fn utc() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateSpec {
    /// chrono format of the attribute's values.
    pub format: String,
    #[serde(default = "utc")]
    pub time_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    pub granularities: Vec<DateLevel>,
}

impl DateSpec {
    pub fn to_builder(&self) -> SpecResult<DateBuilder> {
        let mut builder = DateBuilder::new(DateType::new(self.format.clone()));
        builder.set_time_zone(&self.time_zone)?;
        let bottom = self.bottom.as_deref().map(|b| builder.parse_bound(b)).transpose()?;
        let top = self.top.as_deref().map(|t| builder.parse_bound(t)).transpose()?;
        builder.set_bottom_coding(bottom).set_top_coding(top);
        for level in &self.granularities {
            builder.add_level(level.clone())?;
        }
        Ok(builder)
    }

    pub fn from_builder(builder: &DateBuilder) -> Self {
        let ty = builder.data_type();
        Self {
            format: ty.format_string().to_string(),
            time_zone: builder.time_zone().to_string(),
            bottom: builder.bottom_coding().map(|b| builder.format_bound(&b)),
            top: builder.top_coding().map(|t| builder.format_bound(&t)),
            granularities: builder.levels().to_vec(),
        }
    }
}

/// The builder kinds, without their configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    Interval,
    Order,
    Redaction,
    Date,
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpecKind::Interval => "interval",
            SpecKind::Order => "order",
            SpecKind::Redaction => "redaction",
            SpecKind::Date => "date",
        };
        write!(f, "{}", name)
    }
}

/// A saved builder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HierarchySpec {
    Interval(IntervalSpec),
    Order(OrderSpec),
    Redaction(RedactionSpec),
    Date(DateSpec),
}

impl HierarchySpec {
    /// Builder kind, as written in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            HierarchySpec::Interval(_) => "interval",
            HierarchySpec::Order(_) => "order",
            HierarchySpec::Redaction(_) => "redaction",
            HierarchySpec::Date(_) => "date",
        }
    }

    /// A small valid starting point of `kind` for an attribute of type `attribute`.
    ///
    /// Interval templates hold one interval of width 10 (integers), 1
    /// (decimals) or one week (dates); order templates pair adjacent values;
    /// date templates go from day over month to year.
    pub fn template(kind: SpecKind, attribute: &DataTypeSpec) -> Result<Self, ConfigurationError> {
        let spec = match kind {
            SpecKind::Interval => {
                let (min, max) = match attribute {
                    DataTypeSpec::Integer => ("0".to_string(), "10".to_string()),
                    DataTypeSpec::Decimal { precision } => {
                        let ty = DecimalType::new(*precision);
                        (ty.encode(&0.0), ty.encode(&1.0))
                    }
                    DataTypeSpec::Date { format } => {
                        let ty = DateType::new(format.clone());
                        let start = NaiveDateTime::default();
                        (ty.encode(&start), ty.encode(&ty.add(&start, &TimeDelta::days(7))))
                    }
                    other => {
                        return Err(ConfigurationError::WrongScale {
                            builder: kind.to_string(),
                            data_type: other.to_string(),
                        })
                    }
                };
                HierarchySpec::Interval(IntervalSpec {
                    data_type: attribute.clone(),
                    intervals: vec![IntervalEntry {
                        min,
                        max,
                        function: AggregateFunction::interval(),
                    }],
                    lower: None,
                    upper: None,
                    levels: Vec::new(),
                })
            }
            SpecKind::Order => HierarchySpec::Order(OrderSpec {
                data_type: attribute.clone(),
                collation: Collation::DataType,
                order: Vec::new(),
                levels: vec![Level::new().with_group(2, AggregateFunction::Set)],
            }),
            SpecKind::Redaction => {
                HierarchySpec::Redaction(RedactionSpec::from_builder(&RedactionBuilder::default()))
            }
            SpecKind::Date => {
                let DataTypeSpec::Date { format } = attribute else {
                    return Err(ConfigurationError::WrongType {
                        builder: kind.to_string(),
                        expected: "date".to_string(),
                        actual: attribute.family().to_string(),
                    });
                };
                HierarchySpec::Date(DateSpec {
                    format: format.clone(),
                    time_zone: utc(),
                    bottom: None,
                    top: None,
                    granularities: vec![
                        DateLevel::new(Granularity::DayMonthYear),
                        DateLevel::new(Granularity::MonthYear),
                        DateLevel::new(Granularity::Year),
                    ],
                })
            }
        };
        Ok(spec)
    }

    /// The data type the specification was created for.
    pub fn data_type(&self) -> DataTypeSpec {
        match self {
            HierarchySpec::Interval(spec) => spec.data_type.clone(),
            HierarchySpec::Order(spec) => spec.data_type.clone(),
            HierarchySpec::Redaction(_) => DataTypeSpec::String,
            HierarchySpec::Date(spec) => DataTypeSpec::Date {
                format: spec.format.clone(),
            },
        }
    }

    /// Grouping levels, for the kinds that have them.
    pub fn levels(&self) -> Option<&[Level]> {
        match self {
            HierarchySpec::Interval(spec) => Some(&spec.levels),
            HierarchySpec::Order(spec) => Some(&spec.levels),
            _ => None,
        }
    }

    /// Declared group sizes per level.
    pub fn group_sizes(&self) -> Vec<Vec<usize>> {
        self.levels()
            .unwrap_or_default()
            .iter()
            .map(|l| l.groups.iter().map(|g| g.size).collect())
            .collect()
    }

    /// Check if this specification may be applied to an attribute of type `attribute`.
    pub fn check_compatible(&self, attribute: &DataTypeSpec) -> Result<(), ConfigurationError> {
        let stored = self.data_type();
        match self {
            HierarchySpec::Redaction(_) => return Ok(()),
            HierarchySpec::Interval(_) if !attribute.is_ratio_scale() => {
                return Err(ConfigurationError::WrongScale {
                    builder: self.kind().to_string(),
                    data_type: attribute.to_string(),
                })
            }
            HierarchySpec::Date(_) if !attribute.is_date() => {
                return Err(ConfigurationError::WrongType {
                    builder: self.kind().to_string(),
                    expected: stored.family().to_string(),
                    actual: attribute.family().to_string(),
                })
            }
            HierarchySpec::Interval(_) | HierarchySpec::Order(_)
                if stored.family() != attribute.family() =>
            {
                return Err(ConfigurationError::WrongType {
                    builder: self.kind().to_string(),
                    expected: stored.family().to_string(),
                    actual: attribute.family().to_string(),
                })
            }
            _ => {}
        }
        if &stored != attribute {
            return Err(ConfigurationError::TypeMismatch {
                expected: stored.to_string(),
                actual: attribute.to_string(),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigurationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigurationError> {
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), kind = self.kind(), "saved specification");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path)?;
        let spec = Self::from_json(&content)?;
        debug!(path = %path.display(), kind = spec.kind(), "loaded specification");
        Ok(spec)
    }

    /// Load a specification and reject it unless it fits `attribute`.
    pub fn load_for(path: &Path, attribute: &DataTypeSpec) -> Result<Self, ConfigurationError> {
        let spec = Self::load(path)?;
        spec.check_compatible(attribute)?;
        Ok(spec)
    }

    /// Check the specification without any data.
    pub fn validate(&self) -> HierarchyResult<()> {
        match self {
            HierarchySpec::Interval(spec) => with_ratio_type!(
                &spec.data_type,
                |ty| Ok(spec.to_builder(ty)?.validate()?),
                Err(self.wrong_scale().into())
            ),
            HierarchySpec::Order(spec) => {
                with_data_type!(&spec.data_type, |ty| Ok(spec.to_builder(ty).validate()?))
            }
            HierarchySpec::Redaction(spec) => Ok(spec.to_builder().validate()?),
            HierarchySpec::Date(spec) => Ok(spec.to_builder()?.validate()?),
        }
    }

    /// Build the hierarchy for `values`.
    pub fn build<S: AsRef<str>>(&self, values: &[S]) -> HierarchyResult<Hierarchy> {
        match self {
            HierarchySpec::Interval(spec) => with_ratio_type!(
                &spec.data_type,
                |ty| spec.to_builder(ty)?.build(values),
                Err(self.wrong_scale().into())
            ),
            HierarchySpec::Order(spec) => {
                with_data_type!(&spec.data_type, |ty| spec.to_builder(ty).build(values))
            }
            HierarchySpec::Redaction(spec) => spec.to_builder().build(values),
            HierarchySpec::Date(spec) => spec.to_builder()?.build(values),
        }
    }

    /// Lay out the grouping levels; `None` for kinds without groups.
    pub fn layout<S: AsRef<str>>(
        &self,
        engine: &LayoutEngine,
        values: &[S],
    ) -> HierarchyResult<Option<Layout>> {
        match self {
            HierarchySpec::Interval(spec) => with_ratio_type!(
                &spec.data_type,
                |ty| Ok(Some(engine.layout_intervals(&spec.to_builder(ty)?)?)),
                Err(self.wrong_scale().into())
            ),
            HierarchySpec::Order(spec) => with_data_type!(&spec.data_type, |ty| {
                let domain = ValueDomain::new(ty.clone(), values)?;
                Ok(Some(engine.layout_order(&spec.to_builder(ty), &domain)?))
            }),
            HierarchySpec::Redaction(_) | HierarchySpec::Date(_) => Ok(None),
        }
    }

    fn wrong_scale(&self) -> ConfigurationError {
        let data_type = self.data_type();
        ConfigurationError::WrongScale {
            builder: self.kind().to_string(),
            data_type: data_type.to_string(),
        }
    }

    /// Apply an interval edit. No-op error for other kinds.
    pub fn edit_intervals(&mut self, edit: &IntervalEdit) -> HierarchyResult<()> {
        let wrong_scale = self.wrong_scale();
        let kind = self.kind();
        let HierarchySpec::Interval(spec) = self else {
            return Err(ConfigurationError::WrongType {
                builder: kind.to_string(),
                expected: "interval".to_string(),
                actual: kind.to_string(),
            }
            .into());
        };
        let updated = with_ratio_type!(
            &spec.data_type,
            |ty| {
                let mut builder = spec.to_builder(ty)?;
                builder.apply(edit)?;
                IntervalSpec::from_builder(&builder)
            },
            return Err(wrong_scale.into())
        );
        *spec = updated;
        Ok(())
    }

    /// Apply a group edit to the levels of an interval or order specification.
    pub fn edit_groups(&mut self, edit: &GroupEdit) -> HierarchyResult<()> {
        let levels = match self {
            HierarchySpec::Interval(spec) => &mut spec.levels,
            HierarchySpec::Order(spec) => &mut spec.levels,
            other => {
                return Err(ConfigurationError::WrongType {
                    builder: other.kind().to_string(),
                    expected: "interval or order".to_string(),
                    actual: other.kind().to_string(),
                }
                .into())
            }
        };
        Ok(edit.apply(levels)?)
    }

    /// Apply an edit of the value order, materializing it over `values`.
    pub fn edit_order<S: AsRef<str>>(&mut self, edit: &OrderEdit, values: &[S]) -> HierarchyResult<()> {
        let kind = self.kind();
        let HierarchySpec::Order(spec) = self else {
            return Err(ConfigurationError::WrongType {
                builder: kind.to_string(),
                expected: "order".to_string(),
                actual: kind.to_string(),
            }
            .into());
        };
        let updated = with_data_type!(&spec.data_type, |ty| {
            let domain = ValueDomain::new(ty.clone(), values)?;
            let mut builder = spec.to_builder(ty);
            builder.apply(edit, &domain)?;
            OrderSpec::from_builder(&builder)
        });
        *spec = updated;
        Ok(())
    }

    /// Reset interval ranges to the extent of `values`.
    pub fn update_ranges<S: AsRef<str>>(&mut self, values: &[S]) -> HierarchyResult<()> {
        let wrong_scale = self.wrong_scale();
        let HierarchySpec::Interval(spec) = self else {
            return Ok(());
        };
        let updated = with_ratio_type!(
            &spec.data_type,
            |ty| {
                let domain = ValueDomain::new(ty.clone(), values)?;
                let mut builder = spec.to_builder(ty)?;
                builder.update_ranges_from_domain(&domain);
                IntervalSpec::from_builder(&builder)
            },
            return Err(wrong_scale.into())
        );
        *spec = updated;
        Ok(())
    }
}

impl From<IntervalSpec> for HierarchySpec {
    fn from(spec: IntervalSpec) -> Self {
        HierarchySpec::Interval(spec)
    }
}

impl From<OrderSpec> for HierarchySpec {
    fn from(spec: OrderSpec) -> Self {
        HierarchySpec::Order(spec)
    }
}

impl From<RedactionSpec> for HierarchySpec {
    fn from(spec: RedactionSpec) -> Self {
        HierarchySpec::Redaction(spec)
    }
}

impl From<DateSpec> for HierarchySpec {
    fn from(spec: DateSpec) -> Self {
        HierarchySpec::Date(spec)
    }
}
