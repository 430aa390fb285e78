use async_trait::async_trait;
use wayfare_game::{
    Leaderboard, LeaderboardEntry, LeaderboardError, LeaderboardMetric, WinSubmission,
};

use crate::config::ClientConfig;
use crate::error::{HttpError, Result};

/// Leaderboard backed by the game API.
pub struct HttpLeaderboard {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpLeaderboard {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub const fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub async fn post_win(&self, submission: &WinSubmission) -> Result<()> {
        let url = self.config.api_url(WinSubmission::path());
        let resp = self.client.post(&url).json(submission).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    pub async fn get_top(&self, metric: LeaderboardMetric) -> Result<Vec<LeaderboardEntry>> {
        let url = self.config.api_url(&metric.path());
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let entries: Vec<LeaderboardEntry> = resp.json().await?;
        log::debug!("fetched {} {metric} entries", entries.len());
        Ok(entries)
    }
}

#[async_trait]
impl Leaderboard for HttpLeaderboard {
    async fn submit_win(
        &self,
        submission: &WinSubmission,
    ) -> std::result::Result<(), LeaderboardError> {
        Ok(self.post_win(submission).await?)
    }

    async fn fetch_top(
        &self,
        metric: LeaderboardMetric,
    ) -> std::result::Result<Vec<LeaderboardEntry>, LeaderboardError> {
        Ok(self.get_top(metric).await?)
    }
}
