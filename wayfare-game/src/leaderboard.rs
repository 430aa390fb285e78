//! Remote leaderboard seam: win submissions and ranked top lists.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{LEADERBOARD_TOP_PATH, LEADERBOARD_WON_PATH, STOP_SEPARATOR};
use crate::place::Place;

/// Body posted to `{api_base}/game/won`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinSubmission {
    pub name: String,
    /// Comma-joined entity ids of every stop, origin through the final one.
    pub stops: String,
}

impl WinSubmission {
    #[must_use]
    pub fn from_itinerary(name: &str, itinerary: &[Place]) -> Self {
        let stops = itinerary
            .iter()
            .map(|place| place.entity_id.as_str())
            .collect::<Vec<_>>()
            .join(STOP_SEPARATOR);
        Self {
            name: name.to_string(),
            stops,
        }
    }

    #[must_use]
    pub const fn path() -> &'static str {
        LEADERBOARD_WON_PATH
    }
}

/// Ranking views offered by the leaderboard service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeaderboardMetric {
    /// Most budget left over.
    AmountLeft,
    /// Spend closest to the limit without going over.
    ClosestToLimit,
}

impl LeaderboardMetric {
    pub const ALL: [Self; 2] = [Self::AmountLeft, Self::ClosestToLimit];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::AmountLeft => "price-left",
            Self::ClosestToLimit => "price-close",
        }
    }

    /// Path relative to the API base, e.g. `game/top/price-left`.
    #[must_use]
    pub fn path(self) -> String {
        format!("{LEADERBOARD_TOP_PATH}/{}", self.slug())
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AmountLeft => "Most money left",
            Self::ClosestToLimit => "Closest to the limit",
        }
    }
}

impl std::fmt::Display for LeaderboardMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Row owned by the leaderboard service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    #[serde(default)]
    pub award: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaderboardError {
    #[error("leaderboard unreachable: {0}")]
    Network(String),
    #[error("leaderboard error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("leaderboard payload error: {0}")]
    Parse(String),
}

/// External leaderboard service. Submissions are best-effort.
#[async_trait]
pub trait Leaderboard: Send + Sync {
    /// Record a won game.
    async fn submit_win(&self, submission: &WinSubmission) -> Result<(), LeaderboardError>;

    /// Fetch the ranked list for `metric`.
    async fn fetch_top(
        &self,
        metric: LeaderboardMetric,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

#[async_trait]
impl<T: Leaderboard + ?Sized> Leaderboard for Arc<T> {
    async fn submit_win(&self, submission: &WinSubmission) -> Result<(), LeaderboardError> {
        (**self).submit_win(submission).await
    }

    async fn fetch_top(
        &self,
        metric: LeaderboardMetric,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        (**self).fetch_top(metric).await
    }
}

/// Leaderboard for offline play: accepts nothing and lists nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLeaderboard;

#[async_trait]
impl Leaderboard for OfflineLeaderboard {
    async fn submit_win(&self, submission: &WinSubmission) -> Result<(), LeaderboardError> {
        log::debug!("offline: dropping win submission for {}", submission.name);
        Ok(())
    }

    async fn fetch_top(
        &self,
        _metric: LeaderboardMetric,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        Ok(Vec::new())
    }
}
