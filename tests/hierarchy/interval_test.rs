//! Integration tests for interval-based hierarchies.
//!
//! These tests cover repetition, snapping, ragged groups and interval edits.

use insta::assert_snapshot;
use strata::aggregate::AggregateFunction;
use strata::error::{HierarchyError, SpecificationError};
use strata::hierarchy::{HierarchyBuilder, IntervalBuilder, IntervalEdit, Range};
use strata::types::{DateType, DecimalType, IntegerType};

fn integer_builder(bounds: &[i64]) -> IntervalBuilder<IntegerType> {
    let mut builder = IntervalBuilder::new(IntegerType);
    for pair in bounds.windows(2) {
        builder.add_interval(pair[0], pair[1], AggregateFunction::interval());
    }
    builder
}

fn range(from: i64, to: i64) -> Vec<String> {
    (from..to).map(|v| v.to_string()).collect()
}

#[test]
fn test_two_intervals_over_full_domain() {
    let mut builder = integer_builder(&[0, 50, 100]);
    builder
        .level(0)
        .add_group(1, AggregateFunction::interval())
        .add_group(1, AggregateFunction::interval());

    let hierarchy = builder.build(&range(0, 100)).unwrap();
    assert_eq!(hierarchy.len(), 100);
    for v in 0..50 {
        assert_eq!(hierarchy.generalize(&v.to_string(), 1), Some("[0,50)"));
    }
    for v in 50..100 {
        assert_eq!(hierarchy.generalize(&v.to_string(), 1), Some("[50,100)"));
    }
    assert_eq!(hierarchy.generalize("99", 2), Some("[50,100)"));
    assert_eq!(hierarchy.generalize("99", 3), Some("*"));
}

#[test]
fn test_csv_rendering() {
    let mut builder = integer_builder(&[0, 50, 100]);
    builder.level(0).add_group(2, AggregateFunction::interval());
    let hierarchy = builder.build(&["99", "3", "50", "49"]).unwrap();
    assert_snapshot!(hierarchy.to_csv(';'), @r"
    3;[0,50);[0,100)
    49;[0,50);[0,100)
    50;[50,100);[0,100)
    99;[50,100);[0,100)
    ");
}

#[test]
fn test_repetition_shifts_bounds() {
    let mut builder = integer_builder(&[0, 10, 20]);
    builder.set_lower_range(Range::at(0));
    builder.set_upper_range(Range::at(100));
    let hierarchy = builder.build(&range(0, 100)).unwrap();

    for offset in 0..20 {
        let lo = offset / 10 * 10;
        for k in 0..5 {
            let value = (offset + 20 * k).to_string();
            let expected = format!("[{},{})", lo + 20 * k, lo + 10 + 20 * k);
            assert_eq!(hierarchy.generalize(&value, 1), Some(expected.as_str()));
        }
    }
}

#[test]
fn test_repetition_below_first_interval() {
    let builder = integer_builder(&[0, 10, 20]);
    let hierarchy = builder.build(&["-25", "-3", "14"]).unwrap();
    assert_eq!(hierarchy.generalize("-25", 1), Some("[-30,-20)"));
    assert_eq!(hierarchy.generalize("-3", 1), Some("[-10,0)"));
    assert_eq!(hierarchy.generalize("14", 1), Some("[10,20)"));
}

#[test]
fn test_ragged_groups_tile_cyclically() {
    let mut builder = integer_builder(&[0, 10, 20, 30]);
    builder
        .level(0)
        .add_group(2, AggregateFunction::interval())
        .add_group(1, AggregateFunction::interval());
    let hierarchy = builder.build(&["5", "15", "25", "35", "45", "55"]).unwrap();

    let level: Vec<&str> = hierarchy.level(2).collect();
    assert_eq!(
        level,
        vec!["[0,20)", "[0,20)", "[20,30)", "[30,50)", "[30,50)", "[50,60)"]
    );
    assert!(hierarchy.check_consistency().is_ok());
}

#[test]
fn test_out_of_range_values_join_boundary_groups() {
    let mut builder = integer_builder(&[0, 10, 20]);
    builder.set_lower_range(Range::new(0, -10, -20));
    builder.set_upper_range(Range::new(40, 50, 60));
    builder.level(0).add_group(2, AggregateFunction::interval());

    let hierarchy = builder.build(&["-15", "5", "25", "100"]).unwrap();
    assert_eq!(hierarchy.generalize("-15", 1), Some("[-20,-10)"));
    assert_eq!(hierarchy.generalize("-15", 2), Some("[-20,20)"));
    assert_eq!(hierarchy.generalize("5", 2), Some("[-20,20)"));
    assert_eq!(hierarchy.generalize("25", 2), Some("[20,60)"));
    assert_eq!(hierarchy.generalize("100", 2), Some("[20,60)"));
    assert!(hierarchy.check_consistency().is_ok());
}

#[test]
fn test_invalid_range_order() {
    let mut builder = integer_builder(&[0, 10]);
    builder.set_lower_range(Range::new(0, 5, -5));
    assert!(builder.validate().is_ok());
    builder.set_upper_range(Range::at(20));
    assert!(matches!(
        builder.validate(),
        Err(SpecificationError::InvalidRange(_))
    ));
}

#[test]
fn test_unparseable_value_aborts_build() {
    let builder = integer_builder(&[0, 10]);
    let err = builder.build(&["1", "two"]).unwrap_err();
    match err {
        HierarchyError::Value(e) => assert_eq!(e.value, "two"),
        other => panic!("expected value error, got {other}"),
    }
}

#[test]
fn test_function_per_interval() {
    let mut builder = IntervalBuilder::new(IntegerType);
    builder
        .add_interval(0, 18, AggregateFunction::constant("minor"))
        .add_interval(18, 100, AggregateFunction::constant("adult"));
    builder.set_lower_range(Range::at(0));
    builder.set_upper_range(Range::at(100));
    let hierarchy = builder.build(&["4", "17", "18", "64"]).unwrap();
    assert_eq!(hierarchy.generalize("17", 1), Some("minor"));
    assert_eq!(hierarchy.generalize("64", 1), Some("adult"));
}

#[test]
fn test_decimal_intervals() {
    let mut builder = IntervalBuilder::new(DecimalType::new(Some(1)));
    builder
        .parse_interval("0", "0.5", AggregateFunction::interval())
        .unwrap()
        .parse_interval("0.5", "1", AggregateFunction::interval())
        .unwrap();
    let hierarchy = builder.build(&["0.1", "2.3"]).unwrap();
    assert_eq!(hierarchy.generalize("0.1", 1), Some("[0.0,0.5)"));
    assert_eq!(hierarchy.generalize("2.3", 1), Some("[2.0,2.5)"));
}

#[test]
fn test_date_intervals_repeat_weekly() {
    let mut builder = IntervalBuilder::new(DateType::default());
    builder
        .parse_interval("2024-01-01", "2024-01-08", AggregateFunction::interval())
        .unwrap();
    let hierarchy = builder.build(&["2024-01-02", "2024-01-20"]).unwrap();
    assert_eq!(
        hierarchy.generalize("2024-01-20", 1),
        Some("[2024-01-15,2024-01-22)")
    );
    assert_eq!(
        hierarchy.generalize("2024-01-02", 1),
        Some("[2024-01-01,2024-01-08)")
    );
}

#[test]
fn test_malformed_bound() {
    let mut builder = IntervalBuilder::new(IntegerType);
    let err = builder
        .parse_interval("0", "ten", AggregateFunction::interval())
        .unwrap_err();
    assert!(matches!(err, SpecificationError::MalformedBound { ref value, .. } if value == "ten"));
}

#[test]
fn test_edits_keep_list_contiguous() {
    let mut builder = integer_builder(&[0, 10, 20]);
    builder.apply(&IntervalEdit::AddAfter(1)).unwrap();
    builder.apply(&IntervalEdit::MergeUp(1)).unwrap();
    builder
        .apply(&IntervalEdit::SetFunction {
            index: 0,
            function: AggregateFunction::Set,
        })
        .unwrap();

    let bounds: Vec<(i64, i64)> = builder.intervals().iter().map(|iv| (iv.min, iv.max)).collect();
    assert_eq!(bounds, vec![(0, 20), (20, 30)]);
    assert_eq!(builder.intervals()[0].function, AggregateFunction::Set);
    assert!(builder.validate().is_ok());
    assert!(builder.apply(&IntervalEdit::MergeDown(1)).is_err());
}

#[test]
fn test_every_spelling_gets_a_row() {
    let builder = integer_builder(&[0, 10]);
    let hierarchy = builder.build(&["7", "07", " 7", "3"]).unwrap();
    assert_eq!(hierarchy.len(), 4);
    for raw in ["7", "07", " 7", "3"] {
        assert_eq!(hierarchy.generalize(raw, 1), Some("[0,10)"), "{raw:?}");
    }
    assert_eq!(hierarchy.row("07").unwrap()[0], "07");
}
