use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use wayfare_game::numbers::usize_to_f64;

use super::ScenarioResult;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    (usize_to_f64(passed) / usize_to_f64(results.len())) * 100.0
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Wayfare Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(out, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_csv_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(
        out,
        "scenario,seed,passed,iterations,successful,average_ms,first_failure"
    )?;
    for result in results {
        let failure = result
            .failures
            .first()
            .map(|failure| csv_field(failure))
            .unwrap_or_default();
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            csv_field(&result.scenario_name),
            result.seed,
            result.passed,
            result.iterations_run,
            result.successful_iterations,
            result.average_duration.as_millis(),
            failure
        )?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Dead End".to_string(),
            seed: 42,
            passed,
            iterations_run: 2,
            successful_iterations: usize::from(passed) * 2,
            failures: if passed {
                Vec::new()
            } else {
                vec!["expected no flights, got won".to_string()]
            },
            average_duration: Duration::from_millis(3),
            performance_data: Vec::new(),
        }
    }

    fn render(report: impl Fn(&mut dyn Write) -> Result<()>) -> String {
        let mut buf = Vec::new();
        report(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn console_lists_failures() {
        let results = [sample(true), sample(false)];
        let text = render(|out| generate_console_report(out, &results, Duration::ZERO));
        assert!(text.contains("Total scenarios: 2"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("expected no flights"));
    }

    #[test]
    fn success_rate_counts_passing_runs() {
        assert!(success_rate(&[]).abs() < f64::EPSILON);
        let rate = success_rate(&[sample(true), sample(false), sample(true), sample(true)]);
        assert!((rate - 75.0).abs() < 1e-9);
    }

    #[test]
    fn markdown_has_headings() {
        let text = render(|out| generate_markdown_report(out, &[sample(true)]));
        assert!(text.starts_with("# Wayfare Logic Test Results"));
        assert!(text.contains("### ✅ Dead End (seed 42)"));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let text = render(|out| generate_csv_report(out, &[sample(false)]));
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("scenario,seed,passed,iterations,successful,average_ms,first_failure")
        );
        assert_eq!(
            lines.next(),
            Some("Dead End,42,false,2,0,3,\"expected no flights, got won\"")
        );
    }

    #[test]
    fn json_is_an_array() {
        let text = render(|out| generate_json_report(out, &[sample(true)]));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["scenario_name"], "Dead End");
    }
}
