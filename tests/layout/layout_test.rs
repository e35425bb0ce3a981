//! Integration tests for the layout engine.

use strata::aggregate::AggregateFunction;
use strata::domain::ValueDomain;
use strata::hierarchy::{IntervalBuilder, OrderBuilder};
use strata::layout::{Geometry, LayoutEngine, Rect};
use strata::types::{IntegerType, StringType};

fn three_intervals(groups: &[usize]) -> IntervalBuilder<IntegerType> {
    let mut builder = IntervalBuilder::new(IntegerType);
    builder
        .add_interval(0, 10, AggregateFunction::interval())
        .add_interval(10, 20, AggregateFunction::interval())
        .add_interval(20, 30, AggregateFunction::interval());
    let level = builder.level(0);
    for size in groups {
        level.add_group(*size, AggregateFunction::interval());
    }
    builder
}

#[test]
fn test_matching_levels_need_no_repetition() {
    let layout = LayoutEngine::default()
        .layout_intervals(&three_intervals(&[2, 1]))
        .unwrap();
    assert!(layout.pretty);
    assert_eq!(layout.cardinalities, vec![3, 2]);
    assert!(layout.components.iter().all(|c| c.enabled));

    let groups: Vec<&str> = layout.column(1).map(|c| c.label.as_str()).collect();
    assert_eq!(groups, vec!["[0,20)", "[20,30)"]);
}

#[test]
fn test_wide_group_repeats_intervals() {
    let layout = LayoutEngine::default()
        .layout_intervals(&three_intervals(&[5]))
        .unwrap();
    assert!(layout.pretty);
    assert_eq!(layout.cardinalities, vec![5, 1]);

    let intervals: Vec<(&str, bool)> = layout
        .column(0)
        .map(|c| (c.label.as_str(), c.enabled))
        .collect();
    assert_eq!(
        intervals,
        vec![
            ("[0,10)", true),
            ("[10,20)", true),
            ("[20,30)", true),
            ("[30,40)", false),
            ("[40,50)", false),
        ]
    );

    let group = layout.column(1).next().unwrap();
    assert_eq!(group.label, "[0,50)");
    assert_eq!(group.bounds, "[0, 50)");
    assert_eq!((group.min.as_str(), group.max.as_str()), ("0", "50"));
}

#[test]
fn test_group_spans_covered_rows() {
    let layout = LayoutEngine::default()
        .layout_intervals(&three_intervals(&[5]))
        .unwrap();
    let group = layout.column(1).next().unwrap();
    assert_eq!(group.rectangle1, Rect::new(124, 0, 120, 116));
    assert!(group.rectangle1.contains(&group.rectangle2));
    for interval in layout.column(0) {
        assert!(group.rectangle1.y <= interval.rectangle1.y);
        assert!(interval.rectangle1.bottom() <= group.rectangle1.bottom());
    }
    assert_eq!(layout.extent(), (244, 116));
}

#[test]
fn test_fallback_layout_has_no_empty_rectangles() {
    let engine = LayoutEngine::new(2, Geometry::default());
    let layout = engine.layout_intervals(&three_intervals(&[5])).unwrap();
    assert!(!layout.pretty);
    assert_eq!(layout.cardinalities, vec![3, 1]);
    assert_eq!(layout.components.len(), 4);
    for component in &layout.components {
        assert!(component.enabled);
        assert!(component.rectangle1.width > 0 && component.rectangle1.height > 0);
        assert!(component.rectangle2.width > 0 && component.rectangle2.height > 0);
    }
}

#[test]
fn test_custom_geometry() {
    let geometry = Geometry {
        column_width: 80,
        row_height: 10,
        spacing: 0,
        padding: 2,
        label_height: 6,
    };
    let layout = LayoutEngine::new(100, geometry)
        .layout_intervals(&three_intervals(&[3]))
        .unwrap();
    let rows: Vec<Rect> = layout.column(0).map(|c| c.rectangle1).collect();
    assert_eq!(
        rows,
        vec![
            Rect::new(0, 0, 80, 10),
            Rect::new(0, 10, 80, 10),
            Rect::new(0, 20, 80, 10),
        ]
    );
    let group = layout.column(1).next().unwrap();
    assert_eq!(group.rectangle2, Rect::new(82, 12, 76, 6));
}

#[test]
fn test_order_layout_cycles_values() {
    let domain = ValueDomain::new(StringType, ["a", "b", "c", "d", "e"]).unwrap();
    let mut builder = OrderBuilder::new(StringType);
    builder.level(0).add_group(2, AggregateFunction::Set);

    let layout = LayoutEngine::default().layout_order(&builder, &domain).unwrap();
    assert!(layout.pretty);
    assert_eq!(layout.cardinalities, vec![6, 3]);

    let values: Vec<(&str, bool)> = layout
        .column(0)
        .map(|c| (c.label.as_str(), c.enabled))
        .collect();
    assert_eq!(values[4], ("e", true));
    assert_eq!(values[5], ("a", false));

    let first = layout.column(1).next().unwrap();
    assert_eq!(first.label, "{a, b}");
    assert_eq!(first.bounds, "[a, b]");
}

#[test]
fn test_invalid_levels_are_reported() {
    let builder = three_intervals(&[0]);
    assert!(LayoutEngine::default().layout_intervals(&builder).is_err());
}

#[test]
fn test_empty_order_layout() {
    let domain = ValueDomain::new(StringType, Vec::<String>::new()).unwrap();
    let builder = OrderBuilder::new(StringType);
    let layout = LayoutEngine::default().layout_order(&builder, &domain).unwrap();
    assert!(layout.components.is_empty());
}
