//! Garmin Connect client.
//!
//! Sessions are stashed on disk between runs so repeated invocations do not
//! have to log in again; only when no (valid) stashed token exists do we fall
//! back to the email/password login.

use crate::{
    error::{
        Error,
        Result,
    },
    metrics::{
        Metric,
        PersonValues,
    },
    source::MetricSource,
};
use chrono::{
    DateTime,
    NaiveDate,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    future::Future,
    path::{
        Path,
        PathBuf,
    },
    pin::Pin,
};

const GARMIN_CONNECT_BASE_URL: &str = "https://connect.garmin.com";
const LEADERBOARD_PATH: &str = "/userstats-service/leaderboard/wellness/connection";
const LOGIN_PATH: &str = "/auth/login";

/// Client for the Garmin Connect leaderboard endpoint.
pub struct GarminClient {
    http: reqwest::Client,
    base_url: String,
    tokenstore: PathBuf,
    session: Option<SessionToken>,
}

impl GarminClient {
    pub fn new(tokenstore: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GARMIN_CONNECT_BASE_URL.to_string(),
            tokenstore: tokenstore.into(),
            session: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(tokenstore: impl Into<PathBuf>, base_url: impl ToString) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::new(tokenstore)
        }
    }

    /// Establish a session: reuse the stashed token if it is still valid,
    /// otherwise log in with the given credentials and stash the new token.
    pub async fn login(&mut self, email: Option<&str>, password: Option<&str>) -> Result<()> {
        if let Some(token) = SessionToken::load(&self.tokenstore) {
            if !token.is_expired() {
                debug!(tokenstore = %self.tokenstore.display(), "connecting with stashed session token");
                self.session = Some(token);
                return Ok(());
            }
            debug!(tokenstore = %self.tokenstore.display(), "stashed session token is expired");
        }

        let (Some(email), Some(password)) = (email, password) else {
            return Err(Error::Auth(eyre::eyre!(
                "no stashed session token and no credentials given"
            )));
        };

        debug!("connecting with email/password");
        let token = self.fetch_token(email, password).await?;
        token.save(&self.tokenstore)?;
        self.session = Some(token);
        Ok(())
    }

    async fn fetch_token(&self, email: &str, password: &str) -> Result<SessionToken> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .json(&serde_json::json!({
                "username": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| Error::Auth(e.into()))?
            .error_for_status()
            .map_err(|e| Error::Auth(e.into()))?;

        let login: LoginResponse = response.json().await.map_err(|e| Error::Auth(e.into()))?;
        Ok(SessionToken::new(login.access_token, login.expires_in))
    }

    async fn fetch_leaderboard(&self, date: NaiveDate, metric: Metric) -> Result<PersonValues> {
        let transport = |e: eyre::Report| Error::Transport {
            date,
            metric,
            reason: e,
        };

        let session = self
            .session
            .as_ref()
            .ok_or_else(|| Error::Auth(eyre::eyre!("fetch before login")))?;

        let date_str = date.format("%Y-%m-%d").to_string();
        let mut params = vec![
            ("metricId".to_string(), metric.metric_id().to_string()),
            ("startDate".to_string(), date_str.clone()),
            ("endDate".to_string(), date_str),
            ("start".to_string(), "1".to_string()),
            ("limit".to_string(), "999".to_string()),
        ];
        if let Some(activity_type) = metric.activity_type() {
            params.push(("activityType".to_string(), activity_type.to_string()));
        }

        let response = self
            .http
            .get(format!("{}{}", self.base_url, LEADERBOARD_PATH))
            .bearer_auth(&session.token)
            .query(&params)
            .send()
            .await
            .map_err(|e| transport(e.into()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Auth(eyre::eyre!("session rejected by the service")));
        }

        let response: LeaderboardResponse = response
            .error_for_status()
            .map_err(|e| transport(e.into()))?
            .json()
            .await
            .map_err(|e| transport(e.into()))?;

        Ok(person_values(response, metric))
    }
}

impl MetricSource for GarminClient {
    fn fetch(&self, date: NaiveDate, metric: Metric) -> Pin<Box<dyn Future<Output = Result<PersonValues>> + Send + '_>> {
        Box::pin(self.fetch_leaderboard(date, metric))
    }

    fn name(&self) -> &'static str {
        "garmin-connect"
    }
}

/// Pull `(full name, value)` pairs for one metric out of a leaderboard
/// response. Entries without a value are skipped entirely; they must not
/// surface as zeros downstream.
fn person_values(response: LeaderboardResponse, metric: Metric) -> PersonValues {
    response
        .all_metrics
        .metrics_map
        .get(metric.metrics_map_key())
        .into_iter()
        .flatten()
        .filter_map(|entry| Some((entry.user_info.fullname.clone(), entry.value?)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    #[serde(rename = "allMetrics")]
    all_metrics: AllMetrics,
}

#[derive(Debug, Deserialize)]
struct AllMetrics {
    #[serde(rename = "metricsMap")]
    metrics_map: HashMap<String, Vec<MetricEntry>>,
}

#[derive(Debug, Deserialize)]
struct MetricEntry {
    value: Option<f64>,
    #[serde(rename = "userInfo")]
    user_info: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    fullname: String,
}

/// A bearer token for the Garmin Connect API, stashed on disk between runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SessionToken {
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    token: String,
}

impl SessionToken {
    fn new(token: String, expires_in_seconds: i64) -> Self {
        let created_at = Utc::now();
        Self {
            created_at,
            expires_at: created_at + chrono::Duration::seconds(expires_in_seconds),
            token,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Load the stashed token, if any. A missing or unreadable stash just
    /// means we have to log in again.
    fn load(file: impl AsRef<Path>) -> Option<Self> {
        let file = file.as_ref();
        file.exists()
            .then(|| std::fs::File::open(file).ok().and_then(|f| serde_json::from_reader(f).ok()))
            .flatten()
    }

    /// Stash the token so the next run can skip the login.
    fn save(&self, file: impl AsRef<Path>) -> Result<()> {
        let file = file.as_ref();
        if let Some(dir) = file.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let out = std::fs::File::create(file)?;
        serde_json::to_writer_pretty(&out, self).map_err(|e| Error::Auth(e.into()))?;
        debug!(file = %file.display(), "stashed session token");
        Ok(())
    }
}
