//! Seeded stand-ins for the external services, played over a fixture world.
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use wayfare_game::geo::haversine_km;
use wayfare_game::{
    DataLoader, DiscoveryQuery, FlightSearch, GAME_CONFIG_NAME, GameConfig,
    InMemoryCatalog, Leaderboard, LeaderboardEntry, LeaderboardError, LeaderboardMetric, Place,
    PlaceCatalog, Price, ProviderError, Quote, SearchResponse, WinSubmission,
};

const DEFAULT_WORLD: &str = include_str!("../../data/world.json");

/// London, the default starting city.
pub const DEFAULT_ORIGIN: &str = "27544008";

const BASE_FARE: f64 = 25.0;
const FARE_PER_KM: f64 = 0.045;
/// Share of routes that also list a fare for the month after the anchor.
const LATE_QUOTE_ODDS: f64 = 0.2;

/// World catalog plus the chosen origin.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub catalog: Arc<InMemoryCatalog>,
    pub origin_id: String,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        let catalog = InMemoryCatalog::from_json(DEFAULT_WORLD).unwrap_or_else(|err| {
            log::error!("bundled world failed to parse: {err}");
            InMemoryCatalog::default()
        });
        Self {
            catalog: Arc::new(catalog),
            origin_id: DEFAULT_ORIGIN.to_string(),
        }
    }

    /// Load a world from a JSON file.
    pub fn from_path(path: &Path, origin_id: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = InMemoryCatalog::from_json(&json)?;
        catalog.require(origin_id)?;
        Ok(Self {
            catalog: Arc::new(catalog),
            origin_id: origin_id.to_string(),
        })
    }

    #[must_use]
    pub fn with_origin(mut self, origin_id: &str) -> Self {
        origin_id.clone_into(&mut self.origin_id);
        self
    }

    /// Places flights can land at: cities and airports, not regions.
    pub fn destinations(&self) -> impl Iterator<Item = &Place> {
        self.catalog.iter().filter(|place| is_bookable(place))
    }
}

fn is_bookable(place: &Place) -> bool {
    !place.parent_id.is_empty() && place.entity_id != place.country_entity_id
}

/// How the fixture provider behaves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Open,
    /// No flights out of anywhere but the origin.
    DeadEnds,
    /// Every search fails at the transport level.
    Down,
}

/// Flight search over the fixture world with seeded, distance-based fares.
pub struct FixtureSearch {
    assets: TesterAssets,
    seed: u64,
    mode: SearchMode,
}

impl FixtureSearch {
    #[must_use]
    pub const fn new(assets: TesterAssets, seed: u64, mode: SearchMode) -> Self {
        Self { assets, seed, mode }
    }

    fn quotes_from(&self, origin: &Place, query: &DiscoveryQuery) -> Vec<Quote> {
        let anchor = NaiveDate::from_ymd_opt(query.year, query.month, 1)
            .unwrap_or_else(|| Utc::now().date_naive());
        let mut rng = ChaCha20Rng::seed_from_u64(self.round_seed(origin, anchor));
        let mut quotes = Vec::new();
        for place in self
            .assets
            .destinations()
            .filter(|place| !place.same_city(origin))
        {
            let km = haversine_km(origin.coordinates, place.coordinates);
            let fare = (BASE_FARE + km * FARE_PER_KM) * rng.gen_range(0.8..1.25);
            let fare = (fare * 100.0).round() / 100.0;
            let depart = anchor.with_day(rng.gen_range(1..=28)).unwrap_or(anchor);
            quotes.push(Quote::new(origin.clone(), place.clone(), depart, Price::new(fare)));
            // Some routes also list a cheaper fare a month out.
            if rng.gen_bool(LATE_QUOTE_ODDS) {
                let later = next_month(anchor);
                quotes.push(Quote::new(
                    origin.clone(),
                    place.clone(),
                    later,
                    Price::new((fare * 0.7 * 100.0).round() / 100.0),
                ));
            }
        }
        quotes
    }

    fn round_seed(&self, origin: &Place, anchor: NaiveDate) -> u64 {
        let origin_key = origin.entity_id.parse::<u64>().unwrap_or_default();
        let month_key = u64::try_from(anchor.year() * 12).unwrap_or_default()
            + u64::from(anchor.month());
        self.seed ^ origin_key.rotate_left(17) ^ month_key.rotate_left(41)
    }
}

fn next_month(anchor: NaiveDate) -> NaiveDate {
    let (year, month) = if anchor.month() == 12 {
        (anchor.year() + 1, 1)
    } else {
        (anchor.year(), anchor.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(anchor)
}

#[async_trait]
impl FlightSearch for FixtureSearch {
    async fn search(&self, query: &DiscoveryQuery) -> Result<SearchResponse, ProviderError> {
        if self.mode == SearchMode::Down {
            return Err(ProviderError::new("fixture search is down"));
        }
        let Some(origin) = self.assets.catalog.place(&query.from) else {
            return Ok(SearchResponse::Error {
                error: format!("unknown origin '{}'", query.from),
            });
        };
        if self.mode == SearchMode::DeadEnds && origin.entity_id != self.assets.origin_id {
            return Ok(SearchResponse::Quotes { quotes: Vec::new() });
        }
        Ok(SearchResponse::Quotes {
            quotes: self.quotes_from(origin, query),
        })
    }
}

/// Leaderboard kept in memory. The service ranks by money left, which the
/// submission itself does not carry, so the harness settles it afterwards.
#[derive(Debug, Default)]
pub struct MemoryLeaderboard {
    wins: Mutex<Vec<LeaderboardEntry>>,
}

impl MemoryLeaderboard {
    /// Attach the final remaining budget to `name`'s latest win.
    pub fn settle(&self, name: &str, remaining: f64) {
        let mut wins = self.wins.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = wins.iter_mut().rev().find(|entry| entry.name == name) {
            entry.amount = remaining;
            entry.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl Leaderboard for MemoryLeaderboard {
    async fn submit_win(&self, submission: &WinSubmission) -> Result<(), LeaderboardError> {
        let now = Utc::now();
        self.wins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LeaderboardEntry {
                name: submission.name.clone(),
                award: String::new(),
                amount: 0.0,
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn fetch_top(
        &self,
        metric: LeaderboardMetric,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let mut rows = self
            .wins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match metric {
            LeaderboardMetric::AmountLeft => rows.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
            LeaderboardMetric::ClosestToLimit => {
                rows.sort_by(|a, b| a.amount.total_cmp(&b.amount));
            }
        }
        rows.truncate(10);
        for (rank, row) in rows.iter_mut().enumerate() {
            row.award = match rank {
                0 => "gold",
                1 => "silver",
                2 => "bronze",
                _ => "",
            }
            .to_string();
        }
        Ok(rows)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("config serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown config '{0}'")]
    UnknownConfig(String),
}

/// [`DataLoader`] over in-process assets and a plan's configuration.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    assets: TesterAssets,
    config: GameConfig,
}

impl AssetLoader {
    #[must_use]
    pub const fn new(assets: TesterAssets, config: GameConfig) -> Self {
        Self { assets, config }
    }
}

impl DataLoader for AssetLoader {
    type Error = AssetError;

    fn load_catalog(&self) -> Result<InMemoryCatalog, Self::Error> {
        Ok(self.assets.catalog.as_ref().clone())
    }

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        if config_name != GAME_CONFIG_NAME {
            return Err(AssetError::UnknownConfig(config_name.to_string()));
        }
        Ok(serde_json::from_value(serde_json::to_value(&self.config)?)?)
    }
}

/// Ids of every bookable place, for quick membership checks.
#[must_use]
pub fn bookable_ids(assets: &TesterAssets) -> HashSet<String> {
    assets
        .destinations()
        .map(|place| place.entity_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_from(id: &str) -> DiscoveryQuery {
        let assets = TesterAssets::load_default();
        let origin = assets.catalog.require(id).unwrap().clone();
        let anchor = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        DiscoveryQuery::new(Some(&origin), anchor, 3)
    }

    #[test]
    fn bundled_world_loads() {
        let assets = TesterAssets::load_default();
        assert!(assets.catalog.require(DEFAULT_ORIGIN).is_ok());
        let ids = bookable_ids(&assets);
        assert!(ids.contains("95565050"));
        assert!(!ids.contains("205351567"));
        assert!(!ids.contains("29475437"));
    }

    #[tokio::test]
    async fn fares_are_seeded_and_skip_the_origin_city() {
        let assets = TesterAssets::load_default();
        let first = FixtureSearch::new(assets.clone(), 7, SearchMode::Open);
        let again = FixtureSearch::new(assets.clone(), 7, SearchMode::Open);
        let other = FixtureSearch::new(assets, 8, SearchMode::Open);
        let query = query_from(DEFAULT_ORIGIN);

        let a = first.search(&query).await.unwrap();
        assert_eq!(a, again.search(&query).await.unwrap());
        assert_ne!(a, other.search(&query).await.unwrap());

        let SearchResponse::Quotes { quotes } = a else {
            panic!("expected quotes");
        };
        assert!(!quotes.is_empty());
        assert!(quotes
            .iter()
            .all(|quote| quote.destination().city_id() != DEFAULT_ORIGIN));
        assert!(quotes.iter().all(|quote| quote.price.amount() > 0.0));
    }

    #[tokio::test]
    async fn every_city_keeps_a_biddable_fare() {
        let search = FixtureSearch::new(TesterAssets::load_default(), 7, SearchMode::Open);
        let SearchResponse::Quotes { quotes } =
            search.search(&query_from(DEFAULT_ORIGIN)).await.unwrap()
        else {
            panic!("expected quotes");
        };
        let anchor = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let candidates = wayfare_game::discovery::refine(quotes, anchor, None, None).unwrap();
        // Thirteen cities besides London, each once.
        assert_eq!(candidates.len(), 13);
        assert!(candidates.quotes().iter().all(|quote| quote.depart().month() == 3));
    }

    #[tokio::test]
    async fn dead_end_and_down_modes() {
        let assets = TesterAssets::load_default();
        let dead = FixtureSearch::new(assets.clone(), 1, SearchMode::DeadEnds);
        let SearchResponse::Quotes { quotes } = dead.search(&query_from("27539733")).await.unwrap()
        else {
            panic!("expected quotes");
        };
        assert!(quotes.is_empty());

        let down = FixtureSearch::new(assets, 1, SearchMode::Down);
        assert!(down.search(&query_from(DEFAULT_ORIGIN)).await.is_err());
    }

    #[tokio::test]
    async fn leaderboard_ranks_settled_wins() {
        let board = MemoryLeaderboard::default();
        for (name, remaining) in [("Ada", 120.0), ("Grace", 5.0), ("Linus", 60.0)] {
            board
                .submit_win(&WinSubmission {
                    name: name.to_string(),
                    stops: DEFAULT_ORIGIN.to_string(),
                })
                .await
                .unwrap();
            board.settle(name, remaining);
        }
        let most = board.fetch_top(LeaderboardMetric::AmountLeft).await.unwrap();
        assert_eq!(most[0].name, "Ada");
        assert_eq!(most[0].award, "gold");
        let closest = board
            .fetch_top(LeaderboardMetric::ClosestToLimit)
            .await
            .unwrap();
        assert_eq!(closest[0].name, "Grace");
        assert_eq!(closest.len(), 3);
    }

    #[test]
    fn loader_serves_the_plan_config() {
        let config = GameConfig {
            budget_limit: 42.0,
            ..GameConfig::default()
        };
        let loader = AssetLoader::new(TesterAssets::load_default(), config);
        let loaded: GameConfig = loader.load_config(GAME_CONFIG_NAME).unwrap();
        assert!((loaded.budget_limit - 42.0).abs() < f64::EPSILON);
        assert!(loader.load_config::<GameConfig>("store").is_err());
    }
}
