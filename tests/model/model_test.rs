//! Integration tests for the editable hierarchy model.
//!
//! These tests verify rebuilds, view notification and the visibility guard.

use std::cell::RefCell;
use std::rc::Rc;

use strata::aggregate::AggregateFunction;
use strata::error::ConfigurationError;
use strata::hierarchy::{GroupEdit, IntervalEdit, Level};
use strata::layout::{Geometry, LayoutEngine};
use strata::model::{HierarchyModel, ModelState};
use strata::spec::{DateSpec, HierarchySpec, IntervalEntry, IntervalSpec, OrderSpec};
use strata::types::DataTypeSpec;
use tempfile::TempDir;

fn halves() -> HierarchySpec {
    let entry = |min: &str, max: &str| IntervalEntry {
        min: min.to_string(),
        max: max.to_string(),
        function: AggregateFunction::interval(),
    };
    HierarchySpec::from(IntervalSpec {
        data_type: DataTypeSpec::Integer,
        intervals: vec![entry("0", "50"), entry("50", "100")],
        lower: None,
        upper: None,
        levels: vec![Level::new()
            .with_group(1, AggregateFunction::interval())
            .with_group(1, AggregateFunction::interval())],
    })
}

fn ages() -> Vec<String> {
    (0..100).map(|v| v.to_string()).collect()
}

fn visible_model() -> HierarchyModel {
    let mut model = HierarchyModel::new(DataTypeSpec::Integer, ages(), halves()).unwrap();
    model.set_visible(true);
    model
}

#[test]
fn test_edit_triggers_full_rebuild() {
    let mut model = visible_model();
    assert_eq!(model.groups(), [100, 2, 2, 1]);
    assert_eq!(model.layout().unwrap().cardinalities, vec![2, 2]);

    model.edit_intervals(&IntervalEdit::MergeDown(0), None).unwrap();
    assert_eq!(model.groups(), [100, 1, 1]);
    assert_eq!(model.hierarchy().unwrap().generalize("73", 1), Some("[0,100)"));
    assert_eq!(model.layout().unwrap().cardinalities, vec![2, 2]);
}

#[test]
fn test_views_receive_error_state() {
    let spec = HierarchySpec::from(OrderSpec {
        data_type: DataTypeSpec::Integer,
        collation: Default::default(),
        order: Vec::new(),
        levels: vec![Level::new().with_group(5, AggregateFunction::Set)],
    });
    let mut model = HierarchyModel::new(DataTypeSpec::Integer, ["1", "2", "3"], spec).unwrap();

    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    model.register(move |state: &ModelState| sink.borrow_mut().push(state.error.clone()));
    model.set_visible(true);

    assert!(model.hierarchy().is_none());
    let received = errors.borrow();
    assert_eq!(received.len(), 1);
    let message = received[0].as_deref().unwrap();
    assert!(message.contains("cover 5 elements"), "{message}");
}

#[test]
fn test_sender_excluded_and_unregister() {
    let mut model = visible_model();
    let calls = Rc::new(RefCell::new(Vec::new()));

    let log = calls.clone();
    let editor = model.register(move |_: &ModelState| log.borrow_mut().push("editor"));
    let log = calls.clone();
    let preview = model.register(move |_: &ModelState| log.borrow_mut().push("preview"));

    model.edit_groups(&GroupEdit::AddLevel, Some(editor)).unwrap();
    assert_eq!(*calls.borrow(), vec!["preview"]);

    assert!(model.unregister(preview));
    assert!(!model.unregister(preview));
    model.edit_groups(&GroupEdit::RemoveLevel { level: 1 }, Some(preview)).unwrap();
    assert_eq!(*calls.borrow(), vec!["preview", "editor"]);
}

#[test]
fn test_hidden_model_skips_notifications() {
    let mut model = HierarchyModel::new(DataTypeSpec::Integer, ages(), halves()).unwrap();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    model.register(move |_: &ModelState| *counter.borrow_mut() += 1);

    model.edit_groups(&GroupEdit::AddLevel, None).unwrap();
    model.edit_groups(&GroupEdit::AddLevel, None).unwrap();
    assert_eq!(*calls.borrow(), 0);
    assert!(model.hierarchy().is_none());

    model.set_visible(true);
    assert_eq!(*calls.borrow(), 1);
    model.set_visible(false);
    model.set_visible(true);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_set_spec_checks_attribute() {
    let mut model = visible_model();
    let date = HierarchySpec::from(DateSpec {
        format: "%Y".to_string(),
        time_zone: "UTC".to_string(),
        bottom: None,
        top: None,
        granularities: Vec::new(),
    });
    let err = model.set_spec(date, None).unwrap_err();
    assert!(matches!(err, ConfigurationError::WrongType { .. }));
    assert_eq!(model.spec().kind(), "interval");
}

#[test]
fn test_set_values_and_fit_ranges() {
    let mut model = visible_model();
    model.set_values(["-20", "5", "180"], None);
    assert_eq!(model.hierarchy().unwrap().generalize("180", 1), Some("[150,200)"));

    model.update_ranges(None).unwrap();
    let HierarchySpec::Interval(spec) = model.spec() else {
        panic!("expected interval specification");
    };
    assert_eq!(spec.lower.as_ref().unwrap().snap, "-20");
    assert_eq!(spec.upper.as_ref().unwrap().snap, "200");
    assert!(model.error().is_none());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("age.ahs");

    let mut model = visible_model();
    model.edit_groups(&GroupEdit::AddLevel, None).unwrap();
    model.save(&path).unwrap();

    let mut other = HierarchyModel::new(DataTypeSpec::Integer, ages(), halves())
        .unwrap()
        .with_engine(LayoutEngine::new(10, Geometry::default()));
    other.set_visible(true);
    other.load(&path, None).unwrap();
    assert_eq!(other.spec(), model.spec());
    assert_eq!(other.groups(), model.groups());

    let mut strings = HierarchyModel::new(
        DataTypeSpec::String,
        ["a"],
        HierarchySpec::from(strata::spec::RedactionSpec::from_builder(&Default::default())),
    )
    .unwrap();
    assert!(matches!(
        strings.load(&path, None),
        Err(ConfigurationError::WrongScale { .. })
    ));
}
