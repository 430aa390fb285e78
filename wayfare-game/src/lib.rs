//! Wayfare Game Engine
//!
//! Platform-agnostic core of a budget-constrained "travel around the world"
//! flight game. Players hop between cities on real indicative fares, always
//! pushing forward, and win by returning to their origin city without
//! overspending. Flight search, maps, and the leaderboard are reached through
//! traits; this crate holds no I/O of its own.

pub mod achievements;
pub mod budget;
pub mod config;
pub mod constants;
pub mod discovery;
#[cfg(feature = "async")]
pub mod driver;
pub mod events;
pub mod geo;
pub mod leaderboard;
pub mod map;
pub mod numbers;
pub mod place;
pub mod progress;
pub mod quote;
pub mod result;
pub mod session;

// Re-export commonly used types
pub use achievements::Notification;
pub use budget::BudgetTracker;
pub use config::{ConfigError, GameConfig};
pub use discovery::{
    CandidateSet, DestinationDiscovery, DiscoveryError, DiscoveryQuery, FlightSearch,
    ProviderError, SearchResponse,
};
#[cfg(feature = "async")]
pub use driver::GameDriver;
pub use events::{EventId, EventKind, EventSeverity, GameEvent, UiSurfaceHint};
pub use leaderboard::{
    Leaderboard, LeaderboardEntry, LeaderboardError, LeaderboardMetric, OfflineLeaderboard,
    WinSubmission,
};
pub use map::{LineHandle, MapCommand, MapProvider, MarkerHandle, MemoryMap, render};
pub use place::{CatalogError, Coordinates, InMemoryCatalog, Place, PlaceCatalog};
pub use quote::{Price, Quote, QuoteQuery};
pub use result::{LegSummary, ResultSummary, result_summary};
pub use session::{
    Candidate, DiscoveryRequest, DiscoveryStatus, EndReason, GamePhase, GameSession,
    RoundOutcome, RoundToken, SessionError, SessionSnapshot, Transition,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the place catalog used to resolve origins and regions
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<InMemoryCatalog, Self::Error>;

    /// Load configuration data by name
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_session(&self, save_name: &str, snapshot: &SessionSnapshot)
    -> Result<(), Self::Error>;

    /// Load a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    fn load_session(&self, save_name: &str) -> Result<Option<SessionSnapshot>, Self::Error>;

    /// Delete saved session
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Name of the game configuration asset passed to [`DataLoader::load_config`].
pub const GAME_CONFIG_NAME: &str = "game";

/// Main game engine for creating and persisting sessions
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Create a session starting from the catalog place `origin_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if data cannot be loaded, the configuration is
    /// invalid, or the origin is unknown.
    pub fn create_session(&self, origin_id: &str) -> Result<GameSession, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let catalog = self.data_loader.load_catalog().map_err(Into::into)?;
        let config: GameConfig = self
            .data_loader
            .load_config(GAME_CONFIG_NAME)
            .map_err(Into::into)?;
        config.validate()?;
        let origin = catalog.require(origin_id)?.clone();
        log::debug!("new session from {} ({})", origin.name, origin.entity_id);
        Ok(GameSession::new(config, origin))
    }

    /// Save a session
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    pub fn save_session(&self, save_name: &str, session: &GameSession) -> Result<(), S::Error> {
        self.storage.save_session(save_name, &session.snapshot())
    }

    /// Load a session
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded or its origin is no
    /// longer in the catalog.
    pub fn load_session(&self, save_name: &str) -> Result<Option<GameSession>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(mut snapshot) = self.storage.load_session(save_name).map_err(Into::into)? else {
            return Ok(None);
        };
        // Rehydrate the origin with fresh catalog data
        let catalog = self.data_loader.load_catalog().map_err(Into::into)?;
        snapshot.origin = catalog.require(&snapshot.origin.entity_id)?.clone();
        Ok(Some(GameSession::from_snapshot(snapshot)))
    }

    /// Delete a saved session
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_session(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_save(save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::fixtures::{london, paris};
    use serde::de::DeserializeOwned;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<InMemoryCatalog, Self::Error> {
            Ok(InMemoryCatalog::new([london(), paris()]).unwrap())
        }

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            let parsed = serde_json::from_str(r#"{"budget_limit": 500.0}"#).unwrap();
            Ok(parsed)
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, SessionSnapshot>>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn save_session(
            &self,
            save_name: &str,
            snapshot: &SessionSnapshot,
        ) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(save_name.to_string(), snapshot.clone());
            Ok(())
        }

        fn load_session(&self, save_name: &str) -> Result<Option<SessionSnapshot>, Self::Error> {
            Ok(self.saves.borrow().get(save_name).cloned())
        }

        fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_sessions() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut session = engine.create_session("27544008").unwrap();
        assert!((session.budget().limit() - 500.0).abs() < f64::EPSILON);
        session.start("Ada").unwrap();
        engine.save_session("slot-one", &session).unwrap();

        let loaded = engine.load_session("slot-one").unwrap().expect("save exists");
        assert_eq!(loaded.player_name(), "Ada");
        assert_eq!(loaded.phase(), GamePhase::Playing);
        assert_eq!(loaded.origin().name, "London");
        assert!(engine.load_session("missing-slot").unwrap().is_none());

        engine.delete_session("slot-one").unwrap();
        assert!(engine.load_session("slot-one").unwrap().is_none());
    }

    #[test]
    fn unknown_origin_is_rejected() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let err = engine.create_session("nowhere").unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
