//! Game configuration with defaults, JSON loading, and URL query overrides.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_BUDGET_LIMIT, DEFAULT_MILESTONES, DEFAULT_NOTIFICATION_TTL_MS, DEFAULT_ORIGIN_ZOOM,
    DEFAULT_STALL_AFTER_MS, DEFAULT_WINDOW_MONTHS, QUERY_DATE, QUERY_REGION,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid starting date '{value}': {source}")]
    Date {
        value: String,
        source: chrono::ParseError,
    },
    #[error("budget limit must be positive and finite, got {0}")]
    Budget(f64),
    #[error("date window must span at least one month")]
    Window,
}

/// Rules and inputs for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub budget_limit: f64,
    /// Months covered by each discovery query, starting at the anchor month.
    pub window_months: u32,
    /// Stopover counts that trigger an achievement notification.
    pub milestones: Vec<u32>,
    pub notification_ttl_ms: u64,
    /// How long a discovery round may stay pending before it reports as stalled.
    pub stall_after_ms: u64,
    /// First departure anchor; today when unset.
    pub start_date: Option<NaiveDate>,
    /// Restrict destinations to places under this region id.
    pub region: Option<String>,
    pub origin_zoom: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            budget_limit: DEFAULT_BUDGET_LIMIT,
            window_months: DEFAULT_WINDOW_MONTHS,
            milestones: DEFAULT_MILESTONES.to_vec(),
            notification_ttl_ms: DEFAULT_NOTIFICATION_TTL_MS,
            stall_after_ms: DEFAULT_STALL_AFTER_MS,
            start_date: None,
            region: None,
            origin_zoom: DEFAULT_ORIGIN_ZOOM,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON configuration; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive budget or an empty date window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.budget_limit.is_finite() || self.budget_limit <= 0.0 {
            return Err(ConfigError::Budget(self.budget_limit));
        }
        if self.window_months == 0 {
            return Err(ConfigError::Window);
        }
        Ok(())
    }

    /// Apply `date=YYYY-MM-DD` and `region=<id>` overrides from a URL query.
    ///
    /// A leading `?` is accepted, unknown keys are ignored, and empty values
    /// clear the corresponding override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Date`] if the date does not parse.
    pub fn apply_query(&mut self, query: &str) -> Result<(), ConfigError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                QUERY_DATE if value.is_empty() => self.start_date = None,
                QUERY_DATE => {
                    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| {
                        ConfigError::Date {
                            value: value.to_string(),
                            source,
                        }
                    })?;
                    self.start_date = Some(date);
                }
                QUERY_REGION if value.is_empty() => self.region = None,
                QUERY_REGION => self.region = Some(value.to_string()),
                _ => log::debug!("ignoring unknown query parameter {key}"),
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    #[must_use]
    pub const fn stall_after(&self) -> Duration {
        Duration::from_millis(self.stall_after_ms)
    }
}
