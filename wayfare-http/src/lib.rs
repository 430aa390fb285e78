//! HTTP clients for the Wayfare flight-search and leaderboard services.
//!
//! Both clients implement the engine's provider traits, so a
//! [`wayfare_game::GameDriver`] can be wired straight to the live services;
//! the leaderboard goes in behind an `Arc` so wins can be submitted in the
//! background.

pub mod config;
pub mod error;
pub mod leaderboard;
pub mod search;

pub use config::{API_BASE_VAR, ClientConfig, SEARCH_BASE_VAR};
pub use error::{HttpError, Result};
pub use leaderboard::HttpLeaderboard;
pub use search::{HttpFlightSearch, SEARCH_PATH};

/// Both clients, sharing one connection pool.
pub fn clients(config: ClientConfig) -> (HttpFlightSearch, HttpLeaderboard) {
    let client = reqwest::Client::new();
    let search = HttpFlightSearch::with_client(client.clone(), &config);
    (search, HttpLeaderboard::with_client(client, config))
}
