//! # Snapshot Store
//!
//! The durable wide-format snapshot: one CSV row per `(date, metric)`, one
//! column per person encountered so far. The file is loaded once at startup,
//! appended to in memory day by day, and rewritten as a whole on persist.
//!
//! The person columns grow over time; instead of a fixed schema the store
//! keeps an explicit column registry in first-seen order, and empty cells
//! mean "no value recorded" rather than zero.

use crate::{
    error::{
        Error,
        Result,
    },
    metrics::{
        format_value,
        Metric,
        PersonValues,
        SnapshotRow,
    },
};
use chrono::{
    Duration,
    NaiveDate,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    rows: Vec<SnapshotRow>,
    /// Person columns in first-seen order across all rows.
    persons: Vec<String>,
    last_date: Option<NaiveDate>,
}

impl SnapshotStore {
    /// Load the persisted snapshot. A missing file is an empty store; a file
    /// that exists but cannot be parsed is `Error::StoreCorruption`, because
    /// silently starting over would re-fetch and duplicate history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            return Ok(Self {
                path,
                rows: Vec::new(),
                persons: Vec::new(),
                last_date: None,
            });
        }

        let corrupt = |reason: String| Error::StoreCorruption {
            path: path.clone(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| corrupt(e.to_string()))?;

        let headers = reader.headers().map_err(|e| corrupt(e.to_string()))?.clone();
        if headers.get(0) != Some("date") || headers.get(1) != Some("metric") {
            return Err(corrupt(format!(
                "expected leading `date,metric` columns, found {:?}",
                headers.iter().take(2).collect::<Vec<_>>()
            )));
        }
        let persons: Vec<String> = headers.iter().skip(2).map(str::to_string).collect();

        let mut rows = Vec::new();
        let mut last_date = None;
        for record in reader.records() {
            let record = record.map_err(|e| corrupt(e.to_string()))?;
            let date_str = record.get(0).unwrap_or_default();
            let date =
                NaiveDate::from_str(date_str).map_err(|e| corrupt(format!("bad date {date_str:?}: {e}")))?;
            let metric_str = record.get(1).unwrap_or_default();
            let metric =
                Metric::from_str(metric_str).map_err(|_| corrupt(format!("unknown metric {metric_str:?}")))?;

            let mut values = PersonValues::new();
            for (idx, person) in persons.iter().enumerate() {
                // Ragged rows are fine: columns added later are simply
                // missing (= absent) in older rows.
                let cell = record.get(idx + 2).unwrap_or_default();
                if cell.is_empty() {
                    continue;
                }
                let value = cell
                    .parse::<f64>()
                    .map_err(|e| corrupt(format!("bad value {cell:?} for {person}: {e}")))?;
                values.insert(person.clone(), value);
            }

            last_date = last_date.max(Some(date));
            rows.push(SnapshotRow { date, metric, values });
        }

        if rows.is_empty() {
            // An existing file without a single data row is indistinguishable
            // from a truncated write; treat it as corruption, not as empty.
            return Err(corrupt("file exists but contains no rows".to_string()));
        }

        debug!(path = %path.display(), rows = rows.len(), "loaded snapshot");
        Ok(Self {
            path,
            rows,
            persons,
            last_date,
        })
    }

    /// Append one row per metric for a freshly completed date. The caller
    /// only hands over dates after `last_date()`, keeping `(date, metric)`
    /// pairs unique and the snapshot append-only.
    pub fn append_day(&mut self, date: NaiveDate, metric_rows: Vec<(Metric, PersonValues)>) {
        if self.last_date.is_some_and(|last| date <= last) {
            warn!(%date, "refusing to append an already recorded date");
            return;
        }

        for (metric, values) in metric_rows {
            for person in values.keys() {
                if !self.persons.iter().any(|p| p == person) {
                    self.persons.push(person.clone());
                }
            }
            self.rows.push(SnapshotRow { date, metric, values });
        }
        self.last_date = Some(date);
    }

    /// Rewrite the snapshot file: canonical ISO dates and a stable column
    /// order (`date`, `metric`, then persons in first-seen order).
    pub fn persist(&self) -> Result<()> {
        if self.rows.is_empty() {
            // A header-only file would read back as corruption; an empty
            // store simply has nothing to persist yet.
            debug!(path = %self.path.display(), "nothing to persist");
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        let mut header = vec!["date".to_string(), "metric".to_string()];
        header.extend(self.persons.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.date.format("%Y-%m-%d").to_string(), row.metric.to_string()];
            for person in &self.persons {
                record.push(row.values.get(person).map(|v| format_value(*v)).unwrap_or_default());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), rows = self.rows.len(), "persisted snapshot");
        Ok(())
    }

    /// The date collection resumes from: the day after the last recorded
    /// date, or the configured start date for an empty store.
    pub fn next_date(&self, start_date: NaiveDate) -> NaiveDate {
        match self.last_date {
            Some(last) => last + Duration::days(1),
            None => start_date,
        }
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    pub fn persons(&self) -> &[String] {
        &self.persons
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
