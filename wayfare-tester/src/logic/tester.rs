use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    game_tester: GameTester,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(game_tester: GameTester, verbose: bool) -> Self {
        Self {
            game_tester,
            verbose,
        }
    }

    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            let result = self.run_single_scenario(scenario, seed, iterations).await;
            results.push(result);
        }

        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let (successes, failures, performance_data) = self
            .run_simulation_iterations(&scenario.plan, seed, iterations)
            .await;

        let avg_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration: avg_duration,
            performance_data,
        }
    }

    async fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> (usize, Vec<String>, Vec<Duration>) {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match self.game_tester.run_plan(plan, iteration_seed).await {
                Ok(summary) => summary,
                Err(err) => {
                    failures.push(format!(
                        "Iteration {} (strategy {}, seed {iteration_seed}): run aborted: {err:#}",
                        i + 1,
                        plan.strategy
                    ));
                    continue;
                }
            };

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let context = summarize_decision_path(&summary);
                failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, hops {}, status {}): {} | {} | spent {:.2} of {:.2}",
                    i + 1,
                    summary.strategy.label(),
                    summary.seed,
                    summary.decisions.len(),
                    summary.status_label(),
                    err,
                    context,
                    summary.total_spent(),
                    summary.budget_limit
                ));

                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.clone().red()
                    );
                    println!("     ↳ Seed {} | Route: {}", summary.seed, route(&summary));
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) stops:{} status:{} strategy:{}",
                        i + 1,
                        iterations,
                        summary.itinerary.len(),
                        summary.status_label(),
                        summary.strategy.label()
                    );
                }
            }
        }

        (successes, failures, performance_data)
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn route(summary: &SimulationSummary) -> String {
    summary
        .itinerary
        .iter()
        .map(|stop| stop.name.as_str())
        .collect::<Vec<_>>()
        .join(" → ")
}

fn summarize_decision_path(summary: &SimulationSummary) -> String {
    if summary.decisions.is_empty() {
        return "no decisions recorded".to_string();
    }

    summary
        .decisions
        .iter()
        .rev()
        .take(3)
        .map(|entry| {
            let rationale = Some(entry.rationale.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or("-");
            format!(
                "hop {} -> {} ${:.2} [{}] reason {}",
                entry.hop, entry.destination, entry.price, entry.policy_name, rationale
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|millis| Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
            .collect())
    }
}
