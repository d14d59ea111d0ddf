//! # Metric Sources
//!
//! The boundary to the remote scoring service.
//!
//! - **`MetricSource` trait**: one call per `(date, metric)`, returning the
//!   per-person values reported for that day
//! - **`GarminClient`**: the concrete Garmin Connect client with a persisted
//!   session-token stash
//! - **`RateLimited`**: fixed-interval gate wrapped around any source,
//!   injected at construction time

pub mod garmin;
pub mod rate_limit;

pub use garmin::GarminClient;
pub use rate_limit::RateLimited;

use crate::{
    error::Result,
    metrics::{
        Metric,
        PersonValues,
    },
};
use chrono::NaiveDate;
use std::{
    future::Future,
    pin::Pin,
};

/// A source of daily per-person metric values.
///
/// Implementations may block (network I/O, rate limiting) but are always
/// called one at a time; parallel fetches are not part of the contract.
pub trait MetricSource {
    /// Fetch the values for one date and one metric. Persons without data
    /// that day are absent from the result, never reported as zero.
    fn fetch(&self, date: NaiveDate, metric: Metric) -> Pin<Box<dyn Future<Output = Result<PersonValues>> + Send + '_>>;

    /// Name of this source, for logging.
    fn name(&self) -> &'static str;
}
