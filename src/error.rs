use crate::metrics::Metric;
use chrono::NaiveDate;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Logging in to Garmin Connect failed. Nothing has been fetched yet when
    /// this is raised.
    #[error("Authentication with Garmin Connect failed: {0}")]
    Auth(eyre::Report),

    /// A single date/metric fetch failed. Fatal for the current run; days
    /// that completed earlier in the same run are persisted first.
    #[error("Fetching {metric} for {date} failed: {reason}")]
    Transport {
        date: NaiveDate,
        metric: Metric,
        reason: eyre::Report,
    },

    /// The snapshot file exists but cannot be parsed. Deliberately distinct
    /// from "no snapshot file": we never silently start over on top of data
    /// we failed to read.
    #[error("Snapshot file {path} is unreadable: {reason}")]
    StoreCorruption { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
