//! Service endpoints, from the environment or set explicitly.
use crate::error::{HttpError, Result};

pub const API_BASE_VAR: &str = "WAYFARE_API_BASE";
pub const SEARCH_BASE_VAR: &str = "WAYFARE_SEARCH_BASE";

/// Base URLs of the leaderboard API and the flight-search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub search_base: String,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>, search_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            search_base: search_base.into(),
        }
    }

    /// Read `WAYFARE_API_BASE` and `WAYFARE_SEARCH_BASE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| HttpError::Config(key.to_string()))
        };
        Ok(Self::new(read(API_BASE_VAR)?, read(SEARCH_BASE_VAR)?))
    }

    pub fn api_url(&self, path: &str) -> String {
        join(&self.api_base, path)
    }

    pub fn search_url(&self, path: &str) -> String {
        join(&self.search_base, path)
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
