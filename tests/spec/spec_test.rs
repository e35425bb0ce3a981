//! Integration tests for persisted hierarchy specifications.

use insta::assert_snapshot;
use strata::aggregate::AggregateFunction;
use strata::error::ConfigurationError;
use strata::hierarchy::{
    Collation, DateBuilder, DateLevel, DomainMetrics, Granularity, GroupEdit, IntervalBuilder,
    IntervalEdit, Level, OrderBuilder, OrderEdit, Range, RedactionBuilder, RedactionOrder,
};
use strata::layout::LayoutEngine;
use strata::spec::{
    DateSpec, HierarchySpec, IntervalEntry, IntervalSpec, OrderSpec, RangeSpec, RedactionSpec,
    SpecKind, EXTENSION,
};
use strata::types::{DataTypeSpec, DateType, DecimalType, StringType};
use tempfile::TempDir;

fn entry(min: &str, max: &str) -> IntervalEntry {
    IntervalEntry {
        min: min.to_string(),
        max: max.to_string(),
        function: AggregateFunction::interval(),
    }
}

fn interval_spec() -> HierarchySpec {
    HierarchySpec::from(IntervalSpec {
        data_type: DataTypeSpec::Integer,
        intervals: vec![entry("0", "50"), entry("50", "100")],
        lower: Some(RangeSpec {
            repeat: "0".to_string(),
            snap: "0".to_string(),
            label: "-10".to_string(),
        }),
        upper: None,
        levels: vec![Level::new().with_group(2, AggregateFunction::Set)],
    })
}

fn order_spec() -> HierarchySpec {
    HierarchySpec::from(OrderSpec {
        data_type: DataTypeSpec::String,
        collation: Collation::Custom,
        order: vec!["b".to_string(), "a".to_string(), "c".to_string()],
        levels: vec![Level::new()
            .with_group(2, AggregateFunction::Set)
            .with_group(1, AggregateFunction::constant("rest"))],
    })
}

fn redaction_spec() -> HierarchySpec {
    HierarchySpec::from(RedactionSpec {
        alignment: RedactionOrder::RightToLeft,
        redaction: RedactionOrder::LeftToRight,
        padding_char: '0',
        redaction_char: '#',
        metrics: DomainMetrics::new(Some(1000), Some(10), None),
    })
}

fn date_spec() -> HierarchySpec {
    HierarchySpec::from(DateSpec {
        format: "%d.%m.%Y".to_string(),
        time_zone: "+01:00".to_string(),
        bottom: Some("01.01.2000".to_string()),
        top: None,
        granularities: vec![
            DateLevel::with_format(Granularity::MonthYear, "%m/%Y"),
            DateLevel::new(Granularity::Decade),
        ],
    })
}

#[test]
fn test_json_round_trip_for_every_kind() {
    for spec in [interval_spec(), order_spec(), redaction_spec(), date_spec()] {
        let json = spec.to_json().unwrap();
        let parsed = HierarchySpec::from_json(&json).unwrap();
        assert_eq!(parsed, spec, "round trip of {} specification", spec.kind());
    }
}

#[test]
fn test_redaction_json_layout() {
    let spec = HierarchySpec::from(RedactionSpec::from_builder(&RedactionBuilder::default()));
    assert_snapshot!(spec.to_json().unwrap(), @r#"
    {
      "type": "redaction",
      "alignment": "left_to_right",
      "redaction": "right_to_left",
      "padding_char": " ",
      "redaction_char": "*",
      "metrics": {}
    }
    "#);
}

#[test]
fn test_handwritten_file_uses_defaults() {
    let json = r#"{
        "type": "interval",
        "data_type": { "kind": "integer" },
        "intervals": [ { "min": "0", "max": "50" }, { "min": "50", "max": "100" } ],
        "levels": [ { "groups": [ { "size": 1 }, { "size": 1 } ] } ]
    }"#;
    let spec = HierarchySpec::from_json(json).unwrap();
    let values: Vec<String> = (0..100).map(|v| v.to_string()).collect();
    let hierarchy = spec.build(&values).unwrap();
    assert_eq!(hierarchy.generalize("49", 1), Some("[0,50)"));
    assert_eq!(hierarchy.generalize("50", 2), Some("[50,100)"));
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(format!("age.{}", EXTENSION));
    let spec = interval_spec();
    spec.save(&path).unwrap();

    let loaded = HierarchySpec::load_for(&path, &DataTypeSpec::Integer).unwrap();
    assert_eq!(loaded, spec);
}

#[test]
fn test_load_rejects_incompatible_attribute() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("age.ahs");
    interval_spec().save(&path).unwrap();

    let scale = HierarchySpec::load_for(&path, &DataTypeSpec::String).unwrap_err();
    assert!(matches!(scale, ConfigurationError::WrongScale { .. }));

    let date = DataTypeSpec::Date {
        format: "%Y".to_string(),
    };
    let family = HierarchySpec::load_for(&path, &date).unwrap_err();
    assert!(matches!(family, ConfigurationError::WrongType { .. }));
}

#[test]
fn test_type_mismatch_on_parameters() {
    let spec = date_spec();
    let other_format = DataTypeSpec::Date {
        format: "%Y-%m-%d".to_string(),
    };
    assert!(matches!(
        spec.check_compatible(&other_format),
        Err(ConfigurationError::TypeMismatch { .. })
    ));
    assert!(matches!(
        spec.check_compatible(&DataTypeSpec::Integer),
        Err(ConfigurationError::WrongType { .. })
    ));
    assert!(redaction_spec().check_compatible(&DataTypeSpec::Integer).is_ok());
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = HierarchySpec::load(&dir.path().join("missing.ahs")).unwrap_err();
    assert!(matches!(err, ConfigurationError::Io(_)));
}

#[test]
fn test_malformed_file() {
    let err = HierarchySpec::from_json(r#"{ "type": "histogram" }"#).unwrap_err();
    assert!(matches!(err, ConfigurationError::Parse(_)));
}

#[test]
fn test_build_every_kind() {
    let order = order_spec().build(&["a", "b", "c"]).unwrap();
    assert_eq!(order.generalize("a", 1), Some("{b, a}"));
    assert_eq!(order.generalize("c", 1), Some("rest"));

    let redaction = redaction_spec().build(&["7"]).unwrap();
    assert_eq!(redaction.row("7").unwrap(), ["7", "#07", "##7", "###"]);

    let date = date_spec().build(&["15.08.1995", "03.02.2014"]).unwrap();
    assert_eq!(date.generalize("15.08.1995", 1), Some("01/2000"));
    assert_eq!(date.generalize("03.02.2014", 2), Some("[2010,2020)"));
}

#[test]
fn test_layout_only_for_grouping_kinds() {
    let engine = LayoutEngine::default();
    let layout = interval_spec().layout(&engine, &[] as &[&str]).unwrap().unwrap();
    assert_eq!(layout.cardinalities, vec![2, 1]);
    assert!(redaction_spec().layout(&engine, &["x"]).unwrap().is_none());
    assert!(date_spec().layout(&engine, &["01.01.2001"]).unwrap().is_none());
}

#[test]
fn test_edits_through_spec() {
    let mut spec = interval_spec();
    spec.edit_intervals(&IntervalEdit::AddAfter(1)).unwrap();
    spec.edit_groups(&GroupEdit::AddLevel).unwrap();
    assert_eq!(spec.group_sizes(), vec![vec![2], vec![1]]);
    let HierarchySpec::Interval(interval) = &spec else {
        panic!("expected interval specification");
    };
    assert_eq!(interval.intervals.last().unwrap().max, "150");

    let mut order = order_spec();
    order.edit_order(&OrderEdit::MoveUp(1), &["a", "b", "c"]).unwrap();
    let HierarchySpec::Order(inner) = &order else {
        panic!("expected order specification");
    };
    assert_eq!(inner.order, vec!["a", "b", "c"]);
    assert!(order.edit_intervals(&IntervalEdit::Remove(0)).is_err());
}

#[test]
fn test_update_ranges_fits_values() {
    let mut spec = interval_spec();
    spec.update_ranges(&["-5", "130"]).unwrap();
    let HierarchySpec::Interval(interval) = &spec else {
        panic!("expected interval specification");
    };
    let lower = interval.lower.as_ref().unwrap();
    let upper = interval.upper.as_ref().unwrap();
    assert_eq!((lower.repeat.as_str(), lower.label.as_str()), ("-5", "-5"));
    assert_eq!(upper.repeat, "150");
}

#[test]
fn test_templates_are_valid() {
    let date = DataTypeSpec::Date {
        format: "%Y-%m-%d".to_string(),
    };
    let cases = [
        (SpecKind::Interval, DataTypeSpec::Integer),
        (SpecKind::Interval, DataTypeSpec::Decimal { precision: Some(2) }),
        (SpecKind::Interval, date.clone()),
        (SpecKind::Order, DataTypeSpec::String),
        (SpecKind::Redaction, DataTypeSpec::String),
        (SpecKind::Date, date.clone()),
    ];
    for (kind, attribute) in cases {
        let spec = HierarchySpec::template(kind, &attribute).unwrap();
        assert_eq!(spec.kind(), kind.to_string());
        assert!(spec.validate().is_ok(), "{kind} template for {attribute}");
        assert!(spec.check_compatible(&attribute).is_ok());
    }

    let HierarchySpec::Interval(weekly) = HierarchySpec::template(SpecKind::Interval, &date).unwrap()
    else {
        panic!("expected interval specification");
    };
    assert_eq!(weekly.intervals[0].min, "1970-01-01");
    assert_eq!(weekly.intervals[0].max, "1970-01-08");
}

#[test]
fn test_template_rejects_unsuitable_attribute() {
    assert!(matches!(
        HierarchySpec::template(SpecKind::Interval, &DataTypeSpec::String),
        Err(ConfigurationError::WrongScale { .. })
    ));
    assert!(matches!(
        HierarchySpec::template(SpecKind::Date, &DataTypeSpec::Integer),
        Err(ConfigurationError::WrongType { .. })
    ));
}

#[test]
fn test_decimal_interval_builder_round_trip() {
    let ty = DecimalType::new(Some(0));
    let mut builder = IntervalBuilder::new(ty);
    builder
        .add_interval(0.0, 0.5, AggregateFunction::interval())
        .add_interval(0.5, 1.0, AggregateFunction::interval());
    builder.set_lower_range(Range::new(0.25, 0.125, -0.5));
    builder.level(0).add_group(2, AggregateFunction::interval());

    let spec = IntervalSpec::from_builder(&builder);
    assert_eq!(spec.intervals[0].max, "0.5");
    let restored = spec.to_builder(ty).unwrap();
    assert_eq!(restored.intervals(), builder.intervals());
    assert_eq!(restored.lower_range(), builder.lower_range());
    assert_eq!(restored.levels(), builder.levels());
    assert_eq!(IntervalSpec::from_builder(&restored), spec);
}

#[test]
fn test_interval_edit_keeps_decimal_bounds() {
    let mut spec = HierarchySpec::from(IntervalSpec {
        data_type: DataTypeSpec::Decimal { precision: Some(0) },
        intervals: vec![entry("0", "0.5"), entry("0.5", "1")],
        lower: None,
        upper: None,
        levels: Vec::new(),
    });
    assert!(spec.validate().is_ok());
    spec.edit_intervals(&IntervalEdit::SetFunction {
        index: 1,
        function: AggregateFunction::closed_interval(),
    })
    .unwrap();
    assert!(spec.validate().is_ok());

    let HierarchySpec::Interval(interval) = &spec else {
        panic!("expected interval specification");
    };
    let bounds: Vec<(&str, &str)> = interval
        .intervals
        .iter()
        .map(|iv| (iv.min.as_str(), iv.max.as_str()))
        .collect();
    assert_eq!(bounds, vec![("0.0", "0.5"), ("0.5", "1.0")]);
}

#[test]
fn test_order_builder_round_trip() {
    let mut builder = OrderBuilder::new(StringType);
    builder.set_order(["c", "a", "b"]);
    builder.level(0).add_group(2, AggregateFunction::Set);

    let restored = OrderSpec::from_builder(&builder).to_builder(StringType);
    assert_eq!(restored.collation(), Collation::Custom);
    assert_eq!(restored.order(), builder.order());
    assert_eq!(restored.levels(), builder.levels());
}

#[test]
fn test_redaction_builder_round_trip() {
    let builder = RedactionBuilder::new(RedactionOrder::RightToLeft, RedactionOrder::LeftToRight)
        .with_characters('0', 'x')
        .with_metrics(DomainMetrics::new(Some(1000), Some(10), Some(3)));
    assert_eq!(RedactionSpec::from_builder(&builder).to_builder(), builder);
}

#[test]
fn test_zoned_date_builder_round_trip() {
    let mut builder = DateBuilder::new(DateType::new("%Y-%m-%d %H:%M %z"));
    builder.set_time_zone("+02:00").unwrap();
    let bottom = builder.parse_bound("2000-01-01 00:00 +0000").unwrap();
    builder.set_bottom_coding(Some(bottom));
    builder
        .add_level(DateLevel::with_format(Granularity::MonthYear, "%m/%Y"))
        .unwrap();
    assert_eq!(bottom.to_string(), "2000-01-01 02:00:00");

    let spec = DateSpec::from_builder(&builder);
    assert_eq!(spec.bottom.as_deref(), Some("2000-01-01 02:00 +0200"));
    let restored = spec.to_builder().unwrap();
    assert_eq!(restored.bottom_coding(), Some(bottom));
    assert_eq!(restored.top_coding(), None);
    assert_eq!(restored.time_zone(), builder.time_zone());
    assert_eq!(restored.levels(), builder.levels());
}
