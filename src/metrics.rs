//! # Metric Model
//!
//! The fixed set of tracked leaderboard metrics plus the row types flowing
//! through the pipeline:
//!
//! - **`Metric`**: the tracked quantities, with their Garmin wire identifiers
//! - **`SnapshotRow`**: one wide-format `(date, metric)` record of per-person values
//! - **`CumulativeRow`**: one long-format output record `(person, day, value, color)`

use chrono::NaiveDate;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// Per-person daily values as reported by the service. Persons with no data
/// that day are simply absent.
pub type PersonValues = BTreeMap<String, f64>;

/// The tracked metrics, in collection order. Each name doubles as the
/// disambiguating `metric` key in the snapshot, so names must stay distinct.
#[derive(
    Debug, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Metric {
    Steps,
    Cycling,
    Running,
    Swimming,
    Walking,
}

impl Metric {
    /// Garmin activity type id for the distance metrics; `None` for the
    /// plain wellness metric.
    pub fn activity_type(&self) -> Option<u32> {
        match self {
            Metric::Steps => None,
            Metric::Cycling => Some(2),
            Metric::Running => Some(1),
            Metric::Swimming => Some(26),
            Metric::Walking => Some(9),
        }
    }

    /// `metricId` request parameter of the leaderboard endpoint.
    pub fn metric_id(&self) -> u32 {
        match self {
            Metric::Steps => 29,
            // Total distance, parameterized by activity_type().
            _ => 23,
        }
    }

    /// Key under `allMetrics.metricsMap` in the leaderboard response.
    pub fn metrics_map_key(&self) -> &'static str {
        match self {
            Metric::Steps => "WELLNESS_TOTAL_STEPS",
            _ => "ACTIVITY_TOTAL_DISTANCE",
        }
    }

    /// Header of the value column in this metric's cumulative output file.
    pub fn value_column(&self) -> &'static str {
        match self {
            Metric::Steps => "Steps",
            Metric::Cycling => "Cycling",
            Metric::Running => "Running",
            Metric::Swimming => "Swimming",
            Metric::Walking => "Walking",
        }
    }

    /// File name of this metric's cumulative output artifact.
    pub fn output_file_name(&self) -> String {
        format!("gapminder_{}.csv", self.to_string().to_lowercase())
    }
}

/// One wide-format snapshot record: the values fetched for a single
/// `(date, metric)` pair. An absent person means "no value recorded",
/// which is not the same as a recorded 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub date: NaiveDate,
    pub metric: Metric,
    pub values: PersonValues,
}

/// One record of a cumulative output file. `person` keeps the full name;
/// the first-name reduction happens when the file is written.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeRow {
    pub person: String,
    /// 8-digit `YYYYMMDD` day string, the format the visualization expects.
    pub day: String,
    /// Running total of the metric for this person up to `day`.
    pub value: f64,
    /// Positive color index, stable per person within one output file.
    pub color: u32,
}

/// First whitespace-delimited token of a full name.
pub fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or(full_name)
}

/// Values are kept as `f64` so step counts and fractional distances share
/// one schema-less snapshot; whole numbers are written without the
/// trailing `.0` so a steps snapshot reads naturally.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn metric_names_roundtrip_through_the_snapshot_column() {
        for metric in Metric::iter() {
            assert_eq!(Metric::from_str(&metric.to_string()).unwrap(), metric);
        }
    }

    #[test]
    fn collection_order_is_fixed() {
        let order: Vec<Metric> = Metric::iter().collect();
        assert_eq!(
            order,
            vec![
                Metric::Steps,
                Metric::Cycling,
                Metric::Running,
                Metric::Swimming,
                Metric::Walking
            ]
        );
    }

    #[test]
    fn output_file_names_are_distinct_per_metric() {
        let names: std::collections::BTreeSet<String> = Metric::iter().map(|m| m.output_file_name()).collect();
        assert_eq!(names.len(), Metric::iter().count());
        assert_eq!(Metric::Steps.output_file_name(), "gapminder_steps.csv");
    }

    #[test]
    fn only_activity_metrics_carry_an_activity_type() {
        assert_eq!(Metric::Steps.activity_type(), None);
        for metric in Metric::iter().filter(|m| *m != Metric::Steps) {
            assert!(metric.activity_type().is_some());
        }
    }

    #[test]
    fn first_name_takes_the_leading_token() {
        assert_eq!(first_name("Alice Cooper"), "Alice");
        assert_eq!(first_name("Bob"), "Bob");
        assert_eq!(first_name("  Carol  de Vries "), "Carol");
    }

    #[test]
    fn whole_values_are_formatted_without_fraction() {
        assert_eq!(format_value(5000.0), "5000");
        assert_eq!(format_value(12.5), "12.5");
    }
}
