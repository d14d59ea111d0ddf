//! # Aggregator
//!
//! Turns the wide snapshot into one cumulative long-format table per metric,
//! the shape the animated visualization consumes. Outputs are derived in
//! full on every run, never patched incrementally.
//!
//! The reshape is a sequence of explicit passes over the in-memory rows:
//! melt wide to long, drop zero-valued ranking artifacts, per-person prefix
//! sums in day order, then a stable day sort and first-seen color
//! assignment.

use crate::{
    error::Result,
    metrics::{
        first_name,
        format_value,
        CumulativeRow,
        Metric,
        SnapshotRow,
    },
};
use chrono::Datelike;
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    path::{
        Path,
        PathBuf,
    },
};
use strum::IntoEnumIterator;

/// Build the cumulative table for every tracked metric from the snapshot
/// rows of `target_year`. Metrics without any activity that year map to an
/// empty table, not an error.
pub fn aggregate(rows: &[SnapshotRow], target_year: i32) -> BTreeMap<Metric, Vec<CumulativeRow>> {
    Metric::iter()
        .map(|metric| (metric, aggregate_metric(rows, metric, target_year)))
        .collect()
}

fn aggregate_metric(rows: &[SnapshotRow], metric: Metric, target_year: i32) -> Vec<CumulativeRow> {
    // Melt: one (person, day, value) entry per recorded daily value. Absent
    // persons contribute nothing, and zero values are dropped here as well:
    // the service reports 0 for people who have not started this metric yet,
    // and those must not become premature data points.
    let mut long: Vec<(String, String, f64)> = rows
        .iter()
        .filter(|row| row.metric == metric && row.date.year() == target_year)
        .flat_map(|row| {
            let day = row.date.format("%Y%m%d").to_string();
            row.values
                .iter()
                .filter(|(_, value)| **value != 0.0)
                .map(move |(person, value)| (person.clone(), day.clone(), *value))
        })
        .collect();

    // Prefix sums per person, in day order.
    long.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    let mut totals: HashMap<String, f64> = HashMap::new();
    let mut cumulative: Vec<CumulativeRow> = long
        .into_iter()
        .map(|(person, day, value)| {
            let total = totals.entry(person.clone()).or_insert(0.0);
            *total += value;
            CumulativeRow {
                person,
                day,
                value: *total,
                color: 0,
            }
        })
        .collect();

    // Day-major output order; the sort is stable, so within a day persons
    // stay in ascending order. Colors go to persons in first-seen order of
    // this final scan and never change within the file.
    cumulative.sort_by(|a, b| a.day.cmp(&b.day));
    let mut colors: HashMap<String, u32> = HashMap::new();
    for row in &mut cumulative {
        let next_color = colors.len() as u32 + 1;
        row.color = *colors.entry(row.person.clone()).or_insert(next_color);
    }

    cumulative
}

/// Write one CSV artifact per metric into `output_dir`, named after the
/// metric. An empty table still produces a file with just the header.
pub fn write_outputs(outputs: &BTreeMap<Metric, Vec<CumulativeRow>>, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut paths = Vec::new();
    for (metric, rows) in outputs {
        let path = output_dir.join(metric.output_file_name());
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["Person", "day", metric.value_column(), "Color"])?;
        for row in rows {
            let value = format_value(row.value);
            let color = row.color.to_string();
            writer.write_record([first_name(&row.person), row.day.as_str(), value.as_str(), color.as_str()])?;
        }
        writer.flush()?;
        debug!(file = %path.display(), rows = rows.len(), "wrote cumulative output");
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PersonValues;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn row(date: (i32, u32, u32), metric: Metric, values: &[(&str, f64)]) -> SnapshotRow {
        SnapshotRow {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            metric,
            values: values
                .iter()
                .map(|(name, v)| (name.to_string(), *v))
                .collect::<PersonValues>(),
        }
    }

    #[test]
    fn cumulates_per_person_and_skips_days_without_data() {
        // Alice has two days of steps; Bob only appears on the second day.
        let rows = vec![
            row((2023, 1, 1), Metric::Steps, &[("Alice Cooper", 5000.0)]),
            row((2023, 1, 2), Metric::Steps, &[("Alice Cooper", 3000.0), ("Bob Marley", 7000.0)]),
        ];

        let steps = &aggregate(&rows, 2023)[&Metric::Steps];
        assert_eq!(
            steps
                .iter()
                .map(|r| (r.person.as_str(), r.day.as_str(), r.value))
                .collect::<Vec<_>>(),
            vec![
                ("Alice Cooper", "20230101", 5000.0),
                ("Alice Cooper", "20230102", 8000.0),
                ("Bob Marley", "20230102", 7000.0),
            ]
        );
    }

    #[test]
    fn zero_valued_days_are_dropped_before_cumulation() {
        let rows = vec![
            row((2023, 3, 1), Metric::Cycling, &[("Alice Cooper", 10.0)]),
            row((2023, 3, 2), Metric::Cycling, &[("Alice Cooper", 0.0)]),
            row((2023, 3, 3), Metric::Cycling, &[("Alice Cooper", 5.0)]),
        ];

        let cycling = &aggregate(&rows, 2023)[&Metric::Cycling];
        assert_eq!(
            cycling
                .iter()
                .map(|r| (r.day.as_str(), r.value))
                .collect::<Vec<_>>(),
            vec![("20230301", 10.0), ("20230303", 15.0)]
        );
    }

    #[test]
    fn a_person_with_only_zero_values_produces_no_rows() {
        let rows = vec![
            row((2023, 1, 1), Metric::Steps, &[("Alice Cooper", 5000.0), ("Bob Marley", 0.0)]),
            row((2023, 1, 2), Metric::Steps, &[("Alice Cooper", 3000.0), ("Bob Marley", 0.0)]),
        ];

        let steps = &aggregate(&rows, 2023)[&Metric::Steps];
        assert!(steps.iter().all(|r| r.person == "Alice Cooper"));
    }

    #[test]
    fn cumulative_values_are_non_decreasing_per_person() {
        let rows = vec![
            row((2023, 1, 1), Metric::Steps, &[("Alice Cooper", 2.0), ("Bob Marley", 9.0)]),
            row((2023, 1, 2), Metric::Steps, &[("Alice Cooper", 7.0), ("Bob Marley", 1.0)]),
            row((2023, 1, 3), Metric::Steps, &[("Alice Cooper", 4.0), ("Bob Marley", 3.0)]),
        ];

        let steps = &aggregate(&rows, 2023)[&Metric::Steps];
        let mut last_seen: HashMap<&str, f64> = HashMap::new();
        for r in steps {
            let previous = last_seen.insert(r.person.as_str(), r.value).unwrap_or(0.0);
            assert!(r.value >= previous, "{} decreased at {}", r.person, r.day);
        }
    }

    #[test]
    fn colors_are_stable_and_assigned_in_scan_order() {
        let rows = vec![
            row((2023, 1, 1), Metric::Steps, &[("Bob Marley", 100.0)]),
            row((2023, 1, 2), Metric::Steps, &[("Alice Cooper", 50.0), ("Bob Marley", 100.0)]),
            row((2023, 1, 3), Metric::Steps, &[("Alice Cooper", 50.0)]),
        ];

        let steps = &aggregate(&rows, 2023)[&Metric::Steps];
        // Bob appears on the earliest day, so Bob gets color 1.
        let mut colors: HashMap<&str, u32> = HashMap::new();
        for r in steps {
            let color = *colors.entry(r.person.as_str()).or_insert(r.color);
            assert_eq!(color, r.color, "{} changed color", r.person);
        }
        assert_eq!(colors["Bob Marley"], 1);
        assert_eq!(colors["Alice Cooper"], 2);
    }

    #[test]
    fn rows_outside_the_target_year_are_ignored() {
        let rows = vec![
            row((2022, 12, 31), Metric::Steps, &[("Alice Cooper", 9999.0)]),
            row((2023, 1, 1), Metric::Steps, &[("Alice Cooper", 5000.0)]),
        ];

        let steps = &aggregate(&rows, 2023)[&Metric::Steps];
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].value, 5000.0);
    }

    #[test]
    fn output_files_use_first_names_and_carry_headers_when_empty() {
        let dir = TempDir::new().unwrap();
        let rows = vec![row((2023, 1, 1), Metric::Steps, &[("Alice Cooper", 5000.0)])];

        let outputs = aggregate(&rows, 2023);
        let paths = write_outputs(&outputs, dir.path()).unwrap();
        assert_eq!(paths.len(), Metric::iter().count());

        let steps = std::fs::read_to_string(dir.path().join("gapminder_steps.csv")).unwrap();
        assert_eq!(steps, "Person,day,Steps,Color\nAlice,20230101,5000,1\n");

        // No cycling data at all: header-only artifact, not a failure.
        let cycling = std::fs::read_to_string(dir.path().join("gapminder_cycling.csv")).unwrap();
        assert_eq!(cycling, "Person,day,Cycling,Color\n");
    }
}
