use anyhow::{Result, ensure};
use std::collections::HashSet;

use wayfare_game::progress::is_forward;
use wayfare_game::{EndReason, EventKind};

use crate::logic::fixture::{SearchMode, bookable_ids};
use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};
use crate::logic::policy::{HOMEWARD_AFTER_KM, TravelStrategy};

/// Budget roomy enough for any eastbound lap of the fixture world.
const LAP_BUDGET: f64 = 5_000.0;

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("budget-boundary", "Budget Boundary"),
        ("dead-end", "Dead End"),
        ("provider-outage", "Provider Outage"),
        ("restart", "Restart Mid-Trip"),
        ("circumnavigation", "Circumnavigation"),
        ("save-resume", "Save and Resume"),
    ]
}

pub fn get_scenario(name: &str, tester: &GameTester) -> Option<TestScenario> {
    let bookable = bookable_ids(tester.assets());
    let sound = move |summary: &SimulationSummary| route_is_sound(summary, &bookable);

    let (label, plan) = match name.to_lowercase().as_str() {
        "smoke" => (
            "Smoke Test",
            SimulationPlan::new(TravelStrategy::Random)
                .with_max_hops(8)
                .with_expectation(smoke_expectation),
        ),
        "budget-boundary" => (
            "Budget Boundary",
            SimulationPlan::new(TravelStrategy::Eastbound)
                .with_expectation(budget_boundary_expectation),
        ),
        "dead-end" => (
            "Dead End",
            SimulationPlan::new(TravelStrategy::Cheapest)
                .with_search(SearchMode::DeadEnds)
                .with_expectation(dead_end_expectation),
        ),
        "provider-outage" => (
            "Provider Outage",
            SimulationPlan::new(TravelStrategy::Cheapest)
                .with_search(SearchMode::Down)
                .with_expectation(outage_expectation),
        ),
        "restart" => (
            "Restart Mid-Trip",
            SimulationPlan::new(TravelStrategy::Eastbound)
                .with_budget(LAP_BUDGET)
                .with_restart_after(2)
                .with_expectation(restart_expectation),
        ),
        "circumnavigation" => (
            "Circumnavigation",
            SimulationPlan::new(TravelStrategy::Eastbound)
                .with_budget(LAP_BUDGET)
                .with_expectation(circumnavigation_expectation),
        ),
        "save-resume" => (
            "Save and Resume",
            SimulationPlan::new(TravelStrategy::Eastbound)
                .with_budget(LAP_BUDGET)
                .with_save_after(3)
                .with_expectation(resume_expectation),
        ),
        _ => return None,
    };
    Some(TestScenario::simulation(label, plan.with_expectation(sound)))
}

/// Checks every run must pass whatever the plan.
fn route_is_sound(summary: &SimulationSummary, bookable: &HashSet<String>) -> Result<()> {
    let origin = summary
        .origin
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("run never produced a session"))?;
    let first = summary.itinerary.first();
    ensure!(
        first.is_some_and(|stop| stop.entity_id == origin.entity_id),
        "itinerary must start at {}",
        origin.name
    );
    ensure!(
        summary.spend.len() + 1 == summary.itinerary.len(),
        "{} legs paid for {} stops",
        summary.spend.len(),
        summary.itinerary.len()
    );
    ensure!(
        summary.spend.iter().all(|price| *price > 0.0),
        "every fare must be positive: {:?}",
        summary.spend
    );
    for stop in summary.itinerary.iter().skip(1) {
        ensure!(
            bookable.contains(&stop.entity_id),
            "{} is not a bookable place",
            stop.name
        );
    }
    for window in summary.itinerary.windows(3) {
        ensure!(
            is_forward(&window[0], &window[2]),
            "{} → {} doubles back from {}",
            window[1].name,
            window[2].name,
            window[0].name
        );
    }

    let total = summary.total_spent();
    if summary.ending() == Some(EndReason::OverBudget) {
        let before_last = total - summary.spend.last().copied().unwrap_or_default();
        ensure!(total > summary.budget_limit, "over budget at {total:.2}");
        ensure!(
            before_last <= summary.budget_limit,
            "game should have ended at {before_last:.2}"
        );
    } else {
        ensure!(
            total <= summary.budget_limit,
            "spent {total:.2} of {:.2} without ending",
            summary.budget_limit
        );
    }
    if summary.ending().is_some() {
        ensure!(
            summary.candidate_markers_left == 0,
            "{} candidate markers left after the game ended",
            summary.candidate_markers_left
        );
        ensure!(summary.saw(EventKind::GameEnded), "no GameEnded event");
    }
    Ok(())
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.saw(EventKind::SessionStarted), "session never started");
    ensure!(
        summary.saw(EventKind::DiscoveryIssued),
        "no discovery round was issued"
    );
    Ok(())
}

fn budget_boundary_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.ending() == Some(EndReason::OverBudget),
        "expected the default budget to run out, got {}",
        summary.status_label()
    );
    Ok(())
}

fn dead_end_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.ending() == Some(EndReason::NoFlights),
        "expected no flights onward, got {}",
        summary.status_label()
    );
    ensure!(
        summary.itinerary.len() == 2,
        "dead end should strike after one hop, itinerary has {} stops",
        summary.itinerary.len()
    );
    ensure!(summary.lines_drawn == 1, "the flown leg should stay drawn");
    Ok(())
}

fn outage_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.ending() == Some(EndReason::NoFlights),
        "expected no flights, got {}",
        summary.status_label()
    );
    ensure!(summary.decisions.is_empty(), "nothing should have been offered");
    Ok(())
}

fn restart_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.restarts == 1, "expected one restart");
    ensure!(
        summary.saw(EventKind::SessionRestarted),
        "no SessionRestarted event"
    );
    ensure!(
        summary.lines_drawn + 1 == summary.itinerary.len(),
        "{} lines drawn for {} stops after restart",
        summary.lines_drawn,
        summary.itinerary.len()
    );
    Ok(())
}

fn circumnavigation_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.ending() == Some(EndReason::Won),
        "expected a win, got {}",
        summary.status_label()
    );
    let result = summary
        .result
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("finished game has no result summary"))?;
    ensure!(
        result.distance_km >= HOMEWARD_AFTER_KM,
        "lap covered only {:.0} km",
        result.distance_km
    );
    ensure!(
        (result.remaining - (summary.budget_limit - summary.total_spent())).abs() < 1e-6,
        "remaining budget does not add up"
    );
    let top = summary
        .leaderboard
        .first()
        .ok_or_else(|| anyhow::anyhow!("win was not recorded on the leaderboard"))?;
    ensure!(
        (top.amount - result.remaining).abs() < 1e-6,
        "leaderboard shows {:.2} left, result shows {:.2}",
        top.amount,
        result.remaining
    );
    Ok(())
}

fn resume_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.resumed, "run was never saved and resumed");
    ensure!(
        summary.lines_drawn + 1 == summary.itinerary.len(),
        "resumed map shows {} legs for {} stops",
        summary.lines_drawn,
        summary.itinerary.len()
    );
    circumnavigation_expectation(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::fixture::TesterAssets;
    use std::sync::Arc;

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default()), false)
    }

    #[test]
    fn every_listed_scenario_resolves() {
        let tester = tester();
        for (key, description) in list_scenarios() {
            let scenario = get_scenario(key, &tester).unwrap();
            assert_eq!(scenario.name, description);
            assert!(scenario.plan.expectations.len() >= 2);
        }
        assert!(get_scenario("nope", &tester).is_none());
    }

    #[tokio::test]
    async fn scenarios_pass_on_the_bundled_world() {
        let tester = tester();
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key, &tester).unwrap();
            for seed in [1, 1337] {
                let summary = tester.run_plan(&scenario.plan, seed).await.unwrap();
                for expectation in &scenario.plan.expectations {
                    expectation
                        .evaluate(&summary)
                        .unwrap_or_else(|err| panic!("{key} seed {seed}: {err}"));
                }
            }
        }
    }
}
