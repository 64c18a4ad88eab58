//! SSO Check Binary
//!
//! Runs the SSO login/logout scenarios against a deployment and reports the
//! results. Exits non-zero when any scenario fails.

use anyhow::Context;
use clap::Parser;
use sso_harness::{BrowserHarness, Config, OutputFormat, Reporter, Scenario, SuiteRunner};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sso-check")]
#[command(version, about = "End-to-end checks for browser SSO login and logout")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application base URL (overrides config and BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Scenario to run; repeat for several (default: all)
    #[arg(short, long = "scenario")]
    scenarios: Vec<Scenario>,

    /// Output format: console, json or json-pretty
    #[arg(short, long, default_value = "console")]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Reports go to stdout, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(base_url) = args.base_url {
        config.app.base_url = base_url;
    }
    if args.headed {
        config.browser.headless = false;
    }
    config.validate()?;

    let scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios
    };

    tracing::info!("Starting sso-check v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Target: {} as {}", config.app.base_url, config.credentials.username);

    let harness = BrowserHarness::launch(&config.browser)
        .await
        .context("Failed to launch browser")?;
    let results = SuiteRunner::new(&harness, &config).run(&scenarios).await;
    if let Err(e) = harness.close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }

    let reporter = Reporter::new(args.format);
    match &args.output {
        Some(path) => {
            reporter.write_to_file(&results, path)?;
            eprintln!("Report written to {}", path.display());
        }
        None => reporter.report(&results)?,
    }

    if !results.passed {
        std::process::exit(1);
    }
    Ok(())
}
