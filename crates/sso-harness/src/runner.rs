//! Sequential scenario execution
//!
//! Scenarios run one at a time, each in a fresh session from the
//! [`SessionFactory`]. The flows under test pass through a third-party IdP
//! that keeps its own session cookies, so at most one session is live at any
//! moment.
//!
//! ```text
//! for each scenario:
//!     open session ─► run (bounded by timeouts.scenario) ─► close session
//!                                                         (always)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sso_harness::{BrowserHarness, Config, Scenario, SuiteRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::resolve(None)?;
//! let harness = BrowserHarness::launch(&config.browser).await?;
//! let results = SuiteRunner::new(&harness, &config).run(&Scenario::ALL).await;
//!
//! for result in &results.scenario_results {
//!     println!("{}: {}", result.scenario_name, if result.passed { "ok" } else { "FAILED" });
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::{FlowError, FlowStep};
use crate::scenario::Scenario;
use crate::session::{Session, SessionFactory};

/// Results from a complete suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Application base URL that was tested
    pub base_url: String,
    /// Username the flows logged in as
    pub username: String,
    /// Results for each scenario, in execution order
    pub scenario_results: Vec<ScenarioResult>,
    /// Total duration of the run
    pub total_duration_ms: u64,
    /// Whether every scenario passed
    pub passed: bool,
    /// Timestamp when the run started
    pub started_at: String,
}

impl SuiteResults {
    pub fn failed_count(&self) -> usize {
        self.scenario_results.iter().filter(|r| !r.passed).count()
    }
}

/// Result of a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    /// Step the failure occurred in, if it is tied to one
    pub failed_step: Option<FlowStep>,
    pub failure: Option<String>,
    pub duration_ms: u64,
}

/// Runs scenarios sequentially against sessions from `factory`
pub struct SuiteRunner<'a, F: SessionFactory> {
    factory: &'a F,
    config: &'a Config,
}

impl<'a, F: SessionFactory> SuiteRunner<'a, F> {
    pub fn new(factory: &'a F, config: &'a Config) -> Self {
        Self { factory, config }
    }

    /// Run `scenarios` in order
    #[instrument(skip(self, scenarios), fields(base_url = %self.config.app.base_url))]
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteResults {
        let start_time = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();

        info!("Starting {} scenarios", scenarios.len());

        let mut scenario_results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            scenario_results.push(self.run_scenario(*scenario).await);
        }

        let passed = scenario_results.iter().all(|r| r.passed);
        let results = SuiteResults {
            base_url: self.config.app.base_url.clone(),
            username: self.config.credentials.username.clone(),
            scenario_results,
            total_duration_ms: start_time.elapsed().as_millis() as u64,
            passed,
            started_at,
        };

        if passed {
            info!("All scenarios passed in {}ms", results.total_duration_ms);
        } else {
            warn!(
                "{} of {} scenarios failed",
                results.failed_count(),
                results.scenario_results.len()
            );
        }
        results
    }

    /// Run one scenario in its own session, releasing the session on every path
    #[instrument(skip(self), fields(scenario = %scenario))]
    pub async fn run_scenario(&self, scenario: Scenario) -> ScenarioResult {
        let start_time = Instant::now();
        info!("Running scenario: {}", scenario);

        let outcome = match self.factory.open().await {
            Ok(session) => {
                let budget = self.config.timeouts.scenario;
                let outcome =
                    match tokio::time::timeout(budget, scenario.run(&session, self.config)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(FlowError::ScenarioTimeout(budget)),
                    };
                if let Err(e) = session.close().await {
                    warn!("Failed to close session: {}", e);
                }
                outcome
            }
            Err(e) => Err(e),
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => ScenarioResult {
                scenario_name: scenario.name().to_string(),
                passed: true,
                failed_step: None,
                failure: None,
                duration_ms,
            },
            Err(e) => {
                error!("Scenario {} failed: {}", scenario, e);
                ScenarioResult {
                    scenario_name: scenario.name().to_string(),
                    passed: false,
                    failed_step: e.step(),
                    failure: Some(e.to_string()),
                    duration_ms,
                }
            }
        }
    }
}
