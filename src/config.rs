//! # Configuration
//!
//! Run configuration assembled from CLI flags and environment fallbacks.
//! Validation happens once, at construction; anything invalid is a fatal
//! `Error::Configuration` before a single request is made.

use crate::error::{
    Error,
    Result,
};
use chrono::{
    Datelike,
    Duration,
    Local,
    NaiveDate,
};
use std::path::PathBuf;

const DEFAULT_TOKENSTORE: &str = "~/.garminconnect";

#[derive(Debug, Clone)]
pub struct Config {
    /// Wide-format snapshot CSV, loaded at startup and rewritten after a run.
    pub snapshot_file: PathBuf,
    /// Directory the per-metric cumulative CSVs are written to.
    pub output_dir: PathBuf,
    /// First date to fetch when no snapshot exists yet.
    pub start_date: NaiveDate,
    /// Calendar year the cumulative outputs are aggregated over.
    pub target_year: i32,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Where the Garmin session token is stashed between runs.
    pub tokenstore: PathBuf,
}

impl Config {
    pub fn new(
        snapshot_file: PathBuf,
        output_dir: PathBuf,
        start_date: Option<NaiveDate>,
        target_year: Option<i32>,
        email: Option<String>,
        password: Option<String>,
        tokenstore: Option<PathBuf>,
    ) -> Result<Self> {
        Self::with_today(
            snapshot_file,
            output_dir,
            start_date,
            target_year,
            email,
            password,
            tokenstore,
            Local::now().date_naive(),
        )
    }

    fn with_today(
        snapshot_file: PathBuf,
        output_dir: PathBuf,
        start_date: Option<NaiveDate>,
        target_year: Option<i32>,
        email: Option<String>,
        password: Option<String>,
        tokenstore: Option<PathBuf>,
        today: NaiveDate,
    ) -> Result<Self> {
        let previous_year = today.year() - 1;
        let target_year = target_year.unwrap_or(previous_year);
        let start_date = start_date
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(previous_year, 1, 1).expect("January 1 is always a valid date"));

        if target_year > today.year() {
            return Err(Error::Configuration(format!(
                "target year {target_year} is in the future"
            )));
        }

        let yesterday = today - Duration::days(1);
        if start_date > yesterday {
            return Err(Error::Configuration(format!(
                "start date {start_date} is after the last collectable day {yesterday}"
            )));
        }

        let tokenstore = tokenstore.unwrap_or_else(|| PathBuf::from(DEFAULT_TOKENSTORE));

        Ok(Self {
            snapshot_file,
            output_dir,
            start_date,
            target_year,
            email,
            password,
            tokenstore: expand_home(tokenstore),
        })
    }
}

/// Expand a leading `~/` against `$HOME`, matching what the original
/// tokenstore convention (`GARMINTOKENS` or `~/.garminconnect`) expects.
fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(stripped) = path.strip_prefix("~") else {
        return path;
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(stripped),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_on(today: NaiveDate, start_date: Option<NaiveDate>, target_year: Option<i32>) -> Result<Config> {
        Config::with_today(
            PathBuf::from("leaderboard.csv"),
            PathBuf::from("."),
            start_date,
            target_year,
            None,
            None,
            None,
            today,
        )
    }

    #[test]
    fn defaults_to_the_previous_calendar_year() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let config = config_on(today, None, None).unwrap();
        assert_eq!(config.target_year, 2023);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn rejects_a_future_target_year() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let err = config_on(today, None, Some(2025)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }

    #[test]
    fn rejects_a_start_date_after_yesterday() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let err = config_on(today, Some(today), None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }

    #[test]
    fn yesterday_is_a_valid_start_date() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let config = config_on(today, Some(yesterday), None).unwrap();
        assert_eq!(config.start_date, yesterday);
    }
}
