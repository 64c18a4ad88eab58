//! Run the SSO scenarios from a TOML config file
//!
//! Usage: cargo run -p sso-harness --example run_suite -- <config.toml>

use anyhow::Result;
use sso_harness::reporter::{OutputFormat, Reporter};
use sso_harness::{BrowserHarness, Config, Scenario, SuiteRunner};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let Some(config_path) = args.get(1) else {
        anyhow::bail!("Usage: run_suite <config.toml>");
    };

    println!("Loading config from: {}", config_path);
    let config = Config::resolve(Some(Path::new(config_path)))?;

    println!("Starting SSO suite against {}", config.app.base_url);
    println!("  Username: {}", config.credentials.username);
    println!("  Scenarios: {}", Scenario::ALL.len());
    println!();

    let harness = BrowserHarness::launch(&config.browser).await?;
    let results = SuiteRunner::new(&harness, &config).run(&Scenario::ALL).await;
    harness.close().await?;

    let reporter = Reporter::new(OutputFormat::Console);
    reporter.report(&results)?;

    Ok(())
}
