//! Integration tests for date-based hierarchies.
//!
//! These tests cover granularity labels, custom formats, time zones and coding bounds.

use insta::assert_snapshot;
use strata::error::SpecificationError;
use strata::hierarchy::{DateBuilder, DateLevel, Granularity, HierarchyBuilder};
use strata::types::DateType;

fn builder(format: &str, granularities: &[Granularity]) -> DateBuilder {
    let mut builder = DateBuilder::new(DateType::new(format));
    for granularity in granularities {
        builder.add_granularity(*granularity);
    }
    builder
}

#[test]
fn test_month_and_year() {
    let builder = builder("%Y-%m-%d", &[Granularity::MonthYear, Granularity::Year]);
    let hierarchy = builder.build(&["2024-05-17", "2023-12-31"]).unwrap();
    assert_snapshot!(hierarchy.to_csv(';'), @r"
    2023-12-31;2023-12;2023;*
    2024-05-17;2024-05;2024;*
    ");
}

#[test]
fn test_non_hierarchical_granularities() {
    let builder = builder(
        "%Y-%m-%d",
        &[
            Granularity::DayOfWeek,
            Granularity::WeekYear,
            Granularity::QuarterOfYear,
        ],
    );
    let hierarchy = builder.build(&["2024-05-17"]).unwrap();
    assert_eq!(
        hierarchy.row("2024-05-17").unwrap(),
        ["2024-05-17", "Friday", "2024-W20", "Q2"]
    );
}

#[test]
fn test_year_ranges() {
    let builder = builder(
        "%Y-%m-%d",
        &[Granularity::Decade, Granularity::Century, Granularity::Millennium],
    );
    let hierarchy = builder.build(&["1999-07-04"]).unwrap();
    assert_eq!(
        hierarchy.row("1999-07-04").unwrap(),
        ["1999-07-04", "[1990,2000)", "[1900,2000)", "[1000,2000)"]
    );
}

#[test]
fn test_custom_formats() {
    let mut builder = DateBuilder::new(DateType::new("%Y-%m-%d %H:%M"));
    builder
        .add_level(DateLevel::with_format(Granularity::HourDayMonthYear, "%d.%m.%Y %Hh"))
        .unwrap()
        .add_level(DateLevel::with_format(Granularity::QuarterYear, "Q%q/%Y"))
        .unwrap();
    let hierarchy = builder.build(&["2024-11-03 08:15"]).unwrap();
    assert_eq!(hierarchy.generalize("2024-11-03 08:15", 1), Some("03.11.2024 08h"));
    assert_eq!(hierarchy.generalize("2024-11-03 08:15", 2), Some("Q4/2024"));
}

#[test]
fn test_format_finer_than_granularity_rejected() {
    let mut builder = DateBuilder::new(DateType::default());
    let err = builder
        .add_level(DateLevel::with_format(Granularity::Year, "%Y-%m"))
        .unwrap_err();
    assert!(matches!(err, SpecificationError::InvalidFormat { .. }));
    assert!(builder.levels().is_empty());
}

#[test]
fn test_top_coding() {
    let mut builder = builder("%Y-%m-%d", &[Granularity::Year]);
    let top = builder.parse_bound("2024-01-01").unwrap();
    builder.set_top_coding(Some(top));
    let hierarchy = builder.build(&["2030-06-01", "2020-06-01"]).unwrap();
    assert_eq!(hierarchy.generalize("2030-06-01", 1), Some("2024"));
    assert_eq!(hierarchy.generalize("2020-06-01", 1), Some("2020"));
}

#[test]
fn test_inverted_coding_bounds() {
    let mut builder = builder("%Y-%m-%d", &[Granularity::Year]);
    let bottom = builder.parse_bound("2024-01-01").unwrap();
    let top = builder.parse_bound("2020-01-01").unwrap();
    builder.set_bottom_coding(Some(bottom)).set_top_coding(Some(top));
    assert!(matches!(
        builder.validate(),
        Err(SpecificationError::InvalidRange(_))
    ));
}

#[test]
fn test_time_zone_shifts_day() {
    let mut builder = builder("%Y-%m-%d %H:%M %z", &[Granularity::DayMonthYear]);
    builder.set_time_zone("UTC-05:00").unwrap();
    let hierarchy = builder.build(&["2024-03-01 02:00 +0000"]).unwrap();
    assert_eq!(
        hierarchy.generalize("2024-03-01 02:00 +0000", 1),
        Some("2024-02-29")
    );
    assert!(builder.set_time_zone("Europe/Nowhere").is_err());
}

#[test]
fn test_remove_level() {
    let mut builder = builder("%Y-%m-%d", &[Granularity::MonthYear, Granularity::Year]);
    assert_eq!(
        builder.remove_level(0).unwrap().granularity,
        Granularity::MonthYear
    );
    assert!(builder.remove_level(5).is_err());
    assert_eq!(builder.levels().len(), 1);
}

#[test]
fn test_same_instant_in_two_zones() {
    let builder = builder("%Y-%m-%d %H:%M %z", &[Granularity::DayMonthYear]);
    let values = ["2024-01-01 23:30 +0000", "2024-01-02 01:30 +0200"];
    let hierarchy = builder.build(&values).unwrap();
    assert_eq!(hierarchy.len(), 2);
    for raw in values {
        assert_eq!(hierarchy.generalize(raw, 1), Some("2024-01-01"));
    }
}
