use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use wayfare_game::{
    EndReason, EventKind, GameConfig, GameDriver, GameEngine, GamePhase, GameSession,
    LeaderboardEntry, LeaderboardMetric, MemoryMap, Place, PlaceCatalog, ResultSummary,
    result_summary,
};

use crate::common::storage::FileStorage;
use crate::logic::fixture::{AssetLoader, FixtureSearch, MemoryLeaderboard, SearchMode, TesterAssets};
use crate::logic::policy::TravelStrategy;

/// Hop cap for a single run when the plan does not set one.
pub const DEFAULT_MAX_HOPS: usize = 30;

static SAVE_COUNTER: AtomicU64 = AtomicU64::new(0);

type FixtureDriver = GameDriver<FixtureSearch, Arc<MemoryLeaderboard>, MemoryMap>;

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: TravelStrategy,
    pub config: GameConfig,
    pub search: SearchMode,
    pub max_hops: usize,
    /// Restart once after this many hops.
    pub restart_after: Option<usize>,
    /// Save, reload and resume once after this many hops.
    pub save_after: Option<usize>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: TravelStrategy) -> Self {
        Self {
            strategy,
            config: GameConfig {
                start_date: NaiveDate::from_ymd_opt(2025, 3, 1),
                ..GameConfig::default()
            },
            search: SearchMode::Open,
            max_hops: DEFAULT_MAX_HOPS,
            restart_after: None,
            save_after: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_budget(mut self, budget_limit: f64) -> Self {
        self.config.budget_limit = budget_limit;
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub const fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    #[must_use]
    pub const fn with_restart_after(mut self, hops: usize) -> Self {
        self.restart_after = Some(hops);
        self
    }

    #[must_use]
    pub const fn with_save_after(mut self, hops: usize) -> Self {
        self.save_after = Some(hops);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// One pick made by the policy.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub hop: usize,
    pub destination: String,
    pub price: f64,
    pub policy_name: &'static str,
    pub rationale: String,
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: TravelStrategy,
    pub phase: GamePhase,
    pub budget_limit: f64,
    pub origin: Option<Place>,
    pub itinerary: Vec<Place>,
    pub spend: Vec<f64>,
    pub decisions: Vec<DecisionRecord>,
    pub events: Vec<EventKind>,
    pub restarts: usize,
    pub resumed: bool,
    /// Stopped by the hop cap rather than by the game.
    pub halted: bool,
    pub candidate_markers_left: usize,
    pub lines_drawn: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub result: Option<ResultSummary>,
}

impl SimulationSummary {
    fn new(seed: u64, plan: &SimulationPlan) -> Self {
        Self {
            seed,
            strategy: plan.strategy,
            phase: GamePhase::Start,
            budget_limit: plan.config.budget_limit,
            origin: None,
            itinerary: Vec::new(),
            spend: Vec::new(),
            decisions: Vec::new(),
            events: Vec::new(),
            restarts: 0,
            resumed: false,
            halted: false,
            candidate_markers_left: 0,
            lines_drawn: 0,
            leaderboard: Vec::new(),
            result: None,
        }
    }

    #[must_use]
    pub const fn ending(&self) -> Option<EndReason> {
        match self.phase {
            GamePhase::End(reason) => Some(reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn total_spent(&self) -> f64 {
        self.spend.iter().sum()
    }

    #[must_use]
    pub fn saw(&self, kind: EventKind) -> bool {
        self.events.contains(&kind)
    }

    #[must_use]
    pub fn status_label(&self) -> String {
        match self.ending() {
            Some(reason) => reason.to_string(),
            None if self.halted => "halted".to_string(),
            None => self.phase.to_string(),
        }
    }

    fn record(&mut self, driver: &mut FixtureDriver) {
        self.events
            .extend(driver.drain_events().into_iter().map(|event| event.kind));
    }

    fn finish(&mut self, driver: &mut FixtureDriver) {
        self.record(driver);
        let session = driver.session();
        self.phase = session.phase();
        self.origin = Some(session.origin().clone());
        self.itinerary = session.itinerary().to_vec();
        self.spend = session.spend().to_vec();
        self.result = result_summary(session);
        self.candidate_markers_left = driver.map().candidate_markers().count();
        self.lines_drawn = driver.map().lines.len();
    }
}

/// Plays whole games against the fixture world.
#[derive(Clone)]
pub struct GameTester {
    assets: Arc<TesterAssets>,
    storage: FileStorage,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        let dir = std::env::temp_dir().join(format!("wayfare-tester-{}", std::process::id()));
        Self {
            assets,
            storage: FileStorage::new(dir),
            verbose,
        }
    }

    #[must_use]
    pub fn assets(&self) -> &TesterAssets {
        &self.assets
    }

    /// Play `plan` once with `seed` until the game ends or the hop cap hits.
    ///
    /// # Errors
    ///
    /// Fails when the session cannot be created, a transition is rejected or
    /// a save cannot be written and read back.
    pub async fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let engine = GameEngine::new(
            AssetLoader::new(self.assets.as_ref().clone(), plan.config.clone()),
            self.storage.clone(),
        );
        let session = engine.create_session(&self.assets.origin_id)?;
        let board = Arc::new(MemoryLeaderboard::default());
        let mut driver = self.driver(session, plan, seed, &board);
        let mut policy = plan.strategy.create_policy(seed);
        let mut summary = SimulationSummary::new(seed, plan);
        let player = format!("bot-{seed}");

        driver.start(&player).await?;
        summary.record(&mut driver);

        let mut hops = 0;
        while driver.session().phase() == GamePhase::Playing {
            if hops >= plan.max_hops {
                summary.halted = true;
                break;
            }
            let Some(decision) = policy.pick(driver.session()) else {
                summary.halted = true;
                break;
            };
            hops += 1;
            if let Some(candidate) = driver
                .session()
                .candidates()
                .iter()
                .find(|candidate| candidate.marker == decision.marker)
            {
                if self.verbose {
                    println!(
                        "    ✈️  hop {hops}: {} {} ({})",
                        candidate.quote.destination().name.bright_white(),
                        candidate.quote.price.display,
                        decision.rationale
                    );
                }
                summary.decisions.push(DecisionRecord {
                    hop: hops,
                    destination: candidate.quote.destination().name.clone(),
                    price: candidate.quote.price.amount(),
                    policy_name: policy.name(),
                    rationale: decision.rationale.clone(),
                });
            }
            driver.select(decision.marker).await?;
            summary.record(&mut driver);

            let playing = driver.session().phase() == GamePhase::Playing;
            if playing && summary.restarts == 0 && plan.restart_after == Some(hops) {
                driver.restart().await?;
                summary.restarts += 1;
                summary.record(&mut driver);
            }
            if playing && !summary.resumed && plan.save_after == Some(hops) {
                driver = self
                    .reload(&engine, driver, plan, seed, &board)
                    .await?;
                summary.resumed = true;
                summary.record(&mut driver);
            }
        }

        driver.flush_submissions().await;
        summary.finish(&mut driver);
        if summary.ending() == Some(EndReason::Won) {
            board.settle(&player, driver.session().remaining());
            summary.leaderboard = driver.top(LeaderboardMetric::AmountLeft).await?;
        }
        log::debug!(
            "seed {seed} {} finished {} after {hops} hops",
            plan.strategy,
            summary.status_label()
        );
        Ok(summary)
    }

    fn driver(
        &self,
        session: GameSession,
        plan: &SimulationPlan,
        seed: u64,
        board: &Arc<MemoryLeaderboard>,
    ) -> FixtureDriver {
        let catalog: Arc<dyn PlaceCatalog + Send + Sync> = self.assets.catalog.clone();
        let search = FixtureSearch::new(self.assets.as_ref().clone(), seed, plan.search.clone());
        GameDriver::new(session, search, Arc::clone(board), MemoryMap::new())
            .with_catalog(catalog)
    }

    async fn reload(
        &self,
        engine: &GameEngine<AssetLoader, FileStorage>,
        mut driver: FixtureDriver,
        plan: &SimulationPlan,
        seed: u64,
        board: &Arc<MemoryLeaderboard>,
    ) -> Result<FixtureDriver> {
        let save_name = format!(
            "seed-{seed}-{}",
            SAVE_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        // Events raised before the save belong to the old driver.
        drop(driver.drain_events());
        engine.save_session(&save_name, driver.session())?;
        drop(driver);

        let session = engine
            .load_session(&save_name)?
            .with_context(|| format!("save '{save_name}' vanished"))?;
        engine.delete_session(&save_name)?;

        let mut driver = self.driver(session, plan, seed, board);
        driver.resume().await?;
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default()), false)
    }

    #[tokio::test]
    async fn eastbound_circles_the_world_with_room_to_spare() {
        let plan = SimulationPlan::new(TravelStrategy::Eastbound).with_budget(5_000.0);
        let summary = tester().run_plan(&plan, 7).await.unwrap();
        assert_eq!(summary.ending(), Some(EndReason::Won));
        assert!(summary.itinerary.len() > 3);
        assert!(summary.result.as_ref().unwrap().distance_km >= 20_000.0);
        assert_eq!(summary.leaderboard.len(), 1);
        assert_eq!(summary.leaderboard[0].award, "gold");
        assert!((summary.leaderboard[0].amount - (5_000.0 - summary.total_spent())).abs() < 1e-6);
    }

    #[tokio::test]
    async fn outage_ends_the_game_before_any_hop() {
        let plan = SimulationPlan::new(TravelStrategy::Cheapest).with_search(SearchMode::Down);
        let summary = tester().run_plan(&plan, 1).await.unwrap();
        assert_eq!(summary.ending(), Some(EndReason::NoFlights));
        assert_eq!(summary.itinerary.len(), 1);
        assert!(summary.decisions.is_empty());
    }

    #[tokio::test]
    async fn hop_cap_halts_the_run() {
        let plan = SimulationPlan::new(TravelStrategy::Eastbound)
            .with_budget(100_000.0)
            .with_max_hops(1);
        let summary = tester().run_plan(&plan, 3).await.unwrap();
        assert!(summary.halted);
        assert_eq!(summary.phase, GamePhase::Playing);
        assert_eq!(summary.status_label(), "halted");
        assert!(summary.candidate_markers_left > 0);
    }

    #[tokio::test]
    async fn saved_runs_resume_where_they_left_off() {
        let plan = SimulationPlan::new(TravelStrategy::Eastbound)
            .with_budget(5_000.0)
            .with_save_after(2);
        let summary = tester().run_plan(&plan, 11).await.unwrap();
        assert!(summary.resumed);
        assert_eq!(summary.ending(), Some(EndReason::Won));
        assert_eq!(summary.lines_drawn, summary.itinerary.len() - 1);
    }
}
