//! # Leaderboard Gatherer
//!
//! Incrementally downloads daily per-person leaderboard metrics from Garmin
//! Connect and reshapes them into cumulative long-format CSVs for animated
//! "gapminder"-style visualization.
//!
//! ## Architecture
//!
//! Data flows through four pieces, leaf first:
//!
//! - **`source`**: the `MetricSource` boundary to the remote service — the
//!   concrete `GarminClient` plus the `RateLimited` fixed-interval gate
//!   wrapped around it
//! - **`store`**: the persisted wide-format snapshot, one CSV row per
//!   `(date, metric)` with a person column registry that grows over time
//! - **`collector`**: the day-by-day driver from the snapshot's resumption
//!   point through yesterday, with all-or-nothing days
//! - **`aggregate`**: the wide→long reshape producing one cumulative output
//!   file per metric (running totals plus a stable per-person color index)
//!
//! The snapshot is append-only forward in time; the cumulative outputs are
//! fully regenerated on every run.

#[macro_use]
extern crate tracing;

pub mod aggregate;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod source;
pub mod store;

pub use aggregate::{
    aggregate,
    write_outputs,
};
pub use collector::{
    Collector,
    CollectorState,
};
pub use config::Config;
pub use error::{
    Error,
    Result,
};
pub use metrics::{
    CumulativeRow,
    Metric,
    SnapshotRow,
};
pub use source::{
    GarminClient,
    MetricSource,
    RateLimited,
};
pub use store::SnapshotStore;
