mod common;
mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use common::scenario::{get_scenario, list_scenarios};
use common::split_csv;
use logic::fixture::DEFAULT_ORIGIN;
use logic::{GameTester, LogicTester, TesterAssets, resolve_seed_inputs};

#[derive(Debug, Parser)]
#[command(name = "wayfare-tester", version)]
#[command(about = "Automated play-testing for Wayfare against a seeded fixture world")]
struct Args {
    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers or ranges like 1..10)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Place catalog JSON to play on instead of the bundled world
    #[arg(long)]
    world: Option<PathBuf>,

    /// Entity id of the starting city
    #[arg(long, default_value = DEFAULT_ORIGIN)]
    origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let assets = load_assets(&args)?;
    let game_tester = GameTester::new(Arc::new(assets), args.verbose);

    let results = run_logic_scenarios(&args, &scenarios, &seeds, game_tester).await;

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🌍 Wayfare Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn load_assets(args: &Args) -> Result<TesterAssets> {
    match &args.world {
        Some(path) => TesterAssets::from_path(path, &args.origin)
            .with_context(|| format!("failed to load world from {}", path.display())),
        None => {
            let assets = TesterAssets::load_default().with_origin(&args.origin);
            assets
                .catalog
                .require(&assets.origin_id)
                .context("unknown --origin for the bundled world")?;
            Ok(assets)
        }
    }
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        scenarios.extend(list_scenarios().into_iter().map(|(key, _)| key.to_string()));
    }
    scenarios
}

async fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    game_tester: GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let scenario_list: Vec<_> = scenarios
        .iter()
        .filter_map(|name| {
            let scenario = get_scenario(name, &game_tester);
            if scenario.is_none() {
                eprintln!("⚠️  Unknown scenario: {}", name.yellow());
            }
            scenario
        })
        .collect();

    let logic_tester = LogicTester::new(game_tester, args.verbose);
    for scenario in &scenario_list {
        let scenario_results = logic_tester
            .run_scenario(scenario, seeds, args.iterations)
            .await;
        results.extend(scenario_results);
    }

    results
}

fn write_reports(args: &Args, results: &[logic::ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Wayfare Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => logic::reports::generate_csv_report(&mut output_target, results)?,
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
        }
    }

    if args.report == "console" {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
