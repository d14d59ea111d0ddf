//! # Collector
//!
//! Drives the day-by-day fetch loop: from the snapshot's resumption point
//! through yesterday, every tracked metric is fetched for every date, in a
//! fixed order. A date's rows enter the store only once all of its metrics
//! succeeded, so the process can die between dates without corrupting the
//! snapshot.

use crate::{
    error::Result,
    metrics::{
        Metric,
        PersonValues,
    },
    source::MetricSource,
    store::SnapshotStore,
};
use chrono::{
    Duration,
    Local,
    NaiveDate,
};
use strum::IntoEnumIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Running,
    Done,
    Failed,
}

pub struct Collector<S> {
    source: S,
    store: SnapshotStore,
    state: CollectorState,
}

impl<S: MetricSource> Collector<S> {
    pub fn new(source: S, store: SnapshotStore) -> Self {
        Self {
            source,
            store,
            state: CollectorState::Idle,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Collect everything up to and including yesterday, local time. The
    /// service settles a day's leaderboard at the local day boundary, so
    /// today is never fetched.
    pub async fn run(&mut self, start_date: NaiveDate) -> Result<usize> {
        let yesterday = Local::now().date_naive() - Duration::days(1);
        self.run_until(start_date, yesterday).await
    }

    /// The loop core, with an explicit end date.
    ///
    /// Returns the number of days appended. When the resumption point is
    /// already past `end_date` this is an idempotent no-op. On a fetch
    /// failure the days completed earlier in this run are persisted before
    /// the error surfaces, so a retry resumes from the first unfetched date.
    pub async fn run_until(&mut self, start_date: NaiveDate, end_date: NaiveDate) -> Result<usize> {
        self.state = CollectorState::Running;

        let next_date = self.store.next_date(start_date);
        if next_date > end_date {
            info!(%next_date, %end_date, "snapshot already up to date");
            self.state = CollectorState::Done;
            return Ok(0);
        }

        let mut days_appended = 0;
        let mut date = next_date;
        while date <= end_date {
            match self.collect_day(date).await {
                Ok(rows) => {
                    self.store.append_day(date, rows);
                    days_appended += 1;
                }
                Err(err) => {
                    // Keep what this run already completed; the failed date
                    // itself leaves no trace.
                    error!(%date, days_appended, "fetch failed, persisting completed days");
                    if let Err(persist_err) = self.store.persist() {
                        error!(%persist_err, "could not persist completed days");
                    }
                    self.state = CollectorState::Failed;
                    return Err(err);
                }
            }
            date = date + Duration::days(1);
        }

        self.store.persist()?;
        self.state = CollectorState::Done;
        info!(days_appended, "collection finished");
        Ok(days_appended)
    }

    /// Fetch all tracked metrics for one date. All-or-nothing: the first
    /// failure discards the partially fetched day.
    async fn collect_day(&self, date: NaiveDate) -> Result<Vec<(Metric, PersonValues)>> {
        info!(source = self.source.name(), %date, "fetching leaderboard");
        let mut rows = Vec::new();
        for metric in Metric::iter() {
            let values = self.source.fetch(date, metric).await?;
            debug!(%date, %metric, persons = values.len(), "fetched");
            rows.push((metric, values));
        }
        Ok(rows)
    }
}
