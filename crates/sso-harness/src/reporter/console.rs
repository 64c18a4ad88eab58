//! Console reporter for suite results
//!
//! Provides human-readable output with status indicators.

use anyhow::Result;
use std::fmt::Write;

use crate::runner::{ScenarioResult, SuiteResults};

/// Console format reporter
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Format suite results for console output
    pub fn format(results: &SuiteResults) -> Result<String> {
        let mut output = String::new();

        // Header
        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                      SSO FLOW RESULTS                        ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;

        writeln!(output, "Base URL:  {}", results.base_url)?;
        writeln!(output, "User:      {}", results.username)?;
        writeln!(output, "Started:   {}", results.started_at)?;
        writeln!(output, "Duration:  {}ms", results.total_duration_ms)?;
        writeln!(output)?;

        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        for scenario in &results.scenario_results {
            Self::format_scenario(&mut output, scenario)?;
        }

        // Summary
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        let status = if results.passed { "PASSED" } else { "FAILED" };
        let status_symbol = if results.passed { "✓" } else { "✗" };
        writeln!(
            output,
            "Overall Status: {} {} ({} of {} scenarios passed)",
            status_symbol,
            status,
            results.scenario_results.len() - results.failed_count(),
            results.scenario_results.len()
        )?;
        writeln!(output)?;
        Ok(output)
    }

    fn format_scenario(output: &mut String, scenario: &ScenarioResult) -> Result<()> {
        let status = if scenario.passed { "✓" } else { "✗" };
        writeln!(
            output,
            "  {} {:<34} {:>8}ms",
            status, scenario.scenario_name, scenario.duration_ms
        )?;

        if let Some(failure) = &scenario.failure {
            if let Some(step) = scenario.failed_step {
                writeln!(output, "      step:   {}", step)?;
            }
            writeln!(output, "      reason: {}", failure)?;
        }
        Ok(())
    }
}
