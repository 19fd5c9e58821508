use crate::charts::ChartFeed;
use crate::types::{ArenaError, error::Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Authenticated user profile returned by the arena API.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub team_id: Option<i64>,
}

/// One hour of historical submission activity.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyActivity {
    pub hour: u32,
    pub submissions: u64,
}

/// Historical team activity used for the authoritative chart refresh.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamActivity {
    #[serde(default)]
    pub hourly_activity: Vec<HourlyActivity>,
}

/// Bearer-authenticated client for the arena HTTP collaborators.
///
/// Collaborator interface only: the realtime pipeline never depends on these
/// calls succeeding, and failures are logged rather than surfaced.
pub struct ApiClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetches the profile of the session owner (`/api/users/me`).
    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        self.get_json("/api/users/me").await
    }

    /// Fetches the team's historical activity for the chart refresh.
    pub async fn fetch_team_activity(&self) -> Result<TeamActivity> {
        self.get_json("/api/analytics/team/activity").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ArenaError::Auth("session token rejected".to_string()));
        }

        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Spawns the periodic task that replaces chart content with authoritative
/// historical data. Fetch failures are logged and the next tick retries.
pub fn spawn_chart_refresh(
    api: ApiClient,
    charts: Arc<ChartFeed>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match api.fetch_team_activity().await {
                Ok(activity) => charts.apply_history(&activity),
                Err(e) => tracing::warn!("chart history refresh failed: {}", e),
            }
        }
    })
}
