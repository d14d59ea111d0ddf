//! Fixed-interval rate gate.
//!
//! The leaderboard endpoint tolerates at most one call per second, so the
//! gate is an explicit policy object wrapped around the source at
//! construction time rather than something baked into the client. Calls are
//! already serialized by the collector; the gate only enforces the spacing
//! between consecutive calls.

use crate::{
    error::Result,
    metrics::{
        Metric,
        PersonValues,
    },
    source::MetricSource,
};
use chrono::NaiveDate;
use std::{
    future::Future,
    pin::Pin,
    time::Duration,
};
use tokio::{
    sync::Mutex,
    time::Instant,
};

pub struct RateLimited<S> {
    inner: S,
    interval: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

impl<S> RateLimited<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// The spacing the service enforces: one call per second.
    pub fn per_second(inner: S) -> Self {
        Self::new(inner, Duration::from_secs(1))
    }
}

impl<S> MetricSource for RateLimited<S>
where
    S: MetricSource + Send + Sync,
{
    fn fetch(&self, date: NaiveDate, metric: Metric) -> Pin<Box<dyn Future<Output = Result<PersonValues>> + Send + '_>> {
        Box::pin(async move {
            {
                let mut next_allowed = self.next_allowed.lock().await;
                if let Some(at) = *next_allowed {
                    if at > Instant::now() {
                        trace!(%date, %metric, "waiting for the rate gate");
                        tokio::time::sleep_until(at).await;
                    }
                }
                *next_allowed = Some(Instant::now() + self.interval);
            }
            self.inner.fetch(date, metric).await
        })
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
