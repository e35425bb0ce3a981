//! Layout of grouping hierarchies for the editor view.
//!
//! Levels are declared independently: three intervals can sit below a level
//! with a single group of five. To draw them as aligned columns every level is
//! expanded by cycling its pattern until all neighbours cover each other
//! exactly.
//!
//! ```text
//!   declared            balanced
//!   [0,10) ─┐           [0,10)  ─┐
//!   [10,20) ├─ {5}      [10,20)  │
//!   [20,30)─┘           [20,30)  ├─ {5}
//!                       [30,40)  │
//!                       [40,50) ─┘
//! ```
//!
//! Expansion is abandoned once any level exceeds the pretty threshold; the
//! layout then shows every level with its declared element count.

mod render;

pub use render::{Geometry, Layout, Rect, RenderedComponent};

use tracing::{debug, warn};

use crate::domain::ValueDomain;
use crate::error::{SpecResult, SpecificationError};
use crate::hierarchy::{
    base_range, validate_levels, HierarchyBuilder, IntervalBuilder, IntervalPattern, Level,
    OrderBuilder,
};
use crate::types::{DataType, RatioScale};

/// Level sizes above which balancing gives up.
pub const DEFAULT_PRETTY_THRESHOLD: usize = 100;

/// Outcome of balancing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cardinalities {
    /// Element count per level, level 0 first.
    pub levels: Vec<usize>,
    /// False when balancing was abandoned and `levels` are the declared counts.
    pub pretty: bool,
}

/// Balances level cardinalities and renders components.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    threshold: usize,
    geometry: Geometry,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PRETTY_THRESHOLD, Geometry::default())
    }
}

impl LayoutEngine {
    pub fn new(threshold: usize, geometry: Geometry) -> Self {
        Self {
            threshold,
            geometry,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Expand cyclic level patterns until neighbouring levels cover each other.
    ///
    /// `patterns[0]` lists the sizes of the bottom elements (all 1 for
    /// intervals or values); each further entry lists the group sizes of one
    /// level. Every pass only ever grows cardinalities and the loop stops as
    /// soon as one passes the threshold, so it always terminates.
    pub fn balance(&self, patterns: &[Vec<usize>]) -> Cardinalities {
        let base: Vec<usize> = patterns.iter().map(|p| p.len()).collect();
        let declared = Cardinalities {
            levels: base.clone(),
            pretty: false,
        };
        if patterns.iter().any(|p| p.is_empty() || p.contains(&0)) {
            return declared;
        }
        if base.iter().any(|c| *c > self.threshold) {
            warn!(threshold = self.threshold, "declared levels exceed pretty threshold");
            return declared;
        }

        let mut cards = base.clone();
        let mut sums: Vec<usize> = patterns
            .iter()
            .map(|p| p.iter().sum())
            .collect();

        for pass in 0.. {
            let mut changed = false;

            // Bottom up: consume pattern elements until the level below is covered
            for i in 1..patterns.len() {
                while sums[i] < cards[i - 1] {
                    let pattern = &patterns[i];
                    sums[i] += pattern[cards[i] % pattern.len()];
                    cards[i] += 1;
                    changed = true;
                    if cards[i] > self.threshold {
                        return self.abandon(declared);
                    }
                }
            }

            // Top down: a level covering more than exists below widens that level
            for i in (1..patterns.len()).rev() {
                while cards[i - 1] < sums[i] {
                    let pattern = &patterns[i - 1];
                    sums[i - 1] += pattern[cards[i - 1] % pattern.len()];
                    cards[i - 1] += 1;
                    changed = true;
                    if cards[i - 1] > self.threshold {
                        return self.abandon(declared);
                    }
                }
            }

            if !changed {
                debug!(passes = pass + 1, cardinalities = ?cards, "balanced layout");
                break;
            }
        }

        Cardinalities {
            levels: cards,
            pretty: true,
        }
    }

    fn abandon(&self, declared: Cardinalities) -> Cardinalities {
        warn!(
            threshold = self.threshold,
            declared = ?declared.levels,
            "layout exceeds pretty threshold, falling back to declared cardinalities"
        );
        declared
    }

    /// Lay out an interval builder: intervals on column 0, groups to the right.
    pub fn layout_intervals<T: RatioScale>(&self, builder: &IntervalBuilder<T>) -> SpecResult<Layout> {
        builder.validate()?;
        let pattern = builder
            .pattern()
            .ok_or(SpecificationError::NoIntervals)?;
        let source = IntervalSource { builder, pattern };
        self.render(&source)
    }

    /// Lay out an order builder: values on column 0, groups to the right.
    pub fn layout_order<T: DataType>(
        &self,
        builder: &OrderBuilder<T>,
        domain: &ValueDomain<T>,
    ) -> SpecResult<Layout> {
        builder.validate()?;
        builder.validate_sizes(domain.len())?;
        let order = builder.resolve_order(domain)?;
        if order.is_empty() {
            return Ok(Layout {
                cardinalities: Vec::new(),
                pretty: false,
                components: Vec::new(),
            });
        }
        let source = OrderSource {
            builder,
            domain,
            order,
        };
        self.render(&source)
    }

    fn render<S: LayoutSource>(&self, source: &S) -> SpecResult<Layout> {
        let levels = source.levels();
        validate_levels(levels)?;

        let mut patterns = vec![vec![1; source.base_count()]];
        patterns.extend(
            levels
                .iter()
                .map(|l| l.groups.iter().map(|g| g.size).collect::<Vec<_>>()),
        );
        let balanced = self.balance(&patterns);
        let declared: Vec<usize> = patterns.iter().map(|p| p.len()).collect();

        let mut components = Vec::new();
        for (depth, count) in balanced.levels.iter().enumerate() {
            for k in 0..*count as i64 {
                let covered = base_range(levels, depth, k);
                let rows = if balanced.pretty { covered } else { (k, k + 1) };
                let (rectangle1, rectangle2) = render::place(&self.geometry, depth, rows);
                let element = source.element(depth, k, covered)?;
                components.push(RenderedComponent {
                    rectangle1,
                    rectangle2,
                    depth,
                    index: k,
                    enabled: (k as usize) < declared[depth],
                    label: element.label,
                    bounds: element.bounds,
                    min: element.min,
                    max: element.max,
                });
            }
        }

        debug!(
            components = components.len(),
            pretty = balanced.pretty,
            "rendered layout"
        );

        Ok(Layout {
            cardinalities: balanced.levels,
            pretty: balanced.pretty,
            components,
        })
    }
}

/// Label and range of one element.
struct Element {
    label: String,
    bounds: String,
    min: String,
    max: String,
}

/// What the renderer needs from a builder.
trait LayoutSource {
    fn base_count(&self) -> usize;
    fn levels(&self) -> &[Level];
    /// Describe element `index` at `depth`, covering base elements `covered`.
    fn element(&self, depth: usize, index: i64, covered: (i64, i64)) -> SpecResult<Element>;
}

struct IntervalSource<'a, T: RatioScale> {
    builder: &'a IntervalBuilder<T>,
    pattern: IntervalPattern<'a, T>,
}

impl<T: RatioScale> LayoutSource for IntervalSource<'_, T> {
    fn base_count(&self) -> usize {
        self.builder.intervals().len()
    }

    fn levels(&self) -> &[Level] {
        self.builder.levels()
    }

    fn element(&self, depth: usize, index: i64, _covered: (i64, i64)) -> SpecResult<Element> {
        let ty = self.builder.data_type();
        let ((min, max), label) = if depth == 0 {
            (self.pattern.bounds(index), self.pattern.label(index)?)
        } else {
            (
                self.builder.group_bounds(&self.pattern, None, depth, index),
                self.builder.group_label(&self.pattern, None, depth, index)?,
            )
        };
        let (min, max) = (ty.format(&min), ty.format(&max));
        Ok(Element {
            label,
            bounds: format!("[{}, {})", min, max),
            min,
            max,
        })
    }
}

struct OrderSource<'a, T: DataType> {
    builder: &'a OrderBuilder<T>,
    domain: &'a ValueDomain<T>,
    order: Vec<usize>,
}

impl<T: DataType> OrderSource<'_, T> {
    fn entry(&self, position: i64) -> &crate::domain::DomainValue<T::Value> {
        let n = self.order.len() as i64;
        &self.domain.entries()[self.order[position.rem_euclid(n) as usize]]
    }
}

impl<T: DataType> LayoutSource for OrderSource<'_, T> {
    fn base_count(&self) -> usize {
        self.order.len()
    }

    fn levels(&self) -> &[Level] {
        self.builder.levels()
    }

    fn element(&self, depth: usize, index: i64, covered: (i64, i64)) -> SpecResult<Element> {
        let (start, end) = covered;
        let min = self.entry(start).raw.clone();
        let max = self.entry(end - 1).raw.clone();
        let label = if depth == 0 {
            min.clone()
        } else {
            let members: Vec<T::Value> = (start..end).map(|p| self.entry(p).value.clone()).collect();
            let level = &self.builder.levels()[depth - 1];
            let function = &level.groups[level.tile(index).position].function;
            function.aggregate(self.builder.data_type(), &members)?
        };
        Ok(Element {
            label,
            bounds: format!("[{}, {}]", min, max),
            min,
            max,
        })
    }
}
