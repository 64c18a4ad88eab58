//! End-to-end verification of browser SSO login and logout
//!
//! This crate drives a real browser through an OpenID-Connect-style login
//! (application → identity provider → consent → application), checks that
//! protected and unprotected routes behave correctly with and without a
//! session, and drives the matching logout.
//!
//! # Features
//!
//! - **Version-tolerant lookups**: every UI element is a [`Locator`], an
//!   ordered list of selector strategies resolved to the first that matches
//! - **Optional screens**: consent and logout-consent pages are probed, not
//!   assumed, so already-approved sessions pass through untouched
//! - **Isolated sessions**: each scenario gets its own browser context, closed
//!   on every exit path
//! - **Reports**: console and JSON output
//!
//! # Example
//!
//! ```no_run
//! use sso_harness::{BrowserHarness, Config, OutputFormat, Reporter, Scenario, SuiteRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::resolve(None)?;
//! let harness = BrowserHarness::launch(&config.browser).await?;
//!
//! let results = SuiteRunner::new(&harness, &config).run(&Scenario::ALL).await;
//! Reporter::new(OutputFormat::Console).report(&results)?;
//!
//! harness.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod flow;
pub mod locator;
pub mod navigator;
pub mod pattern;
pub mod reporter;
pub mod runner;
pub mod scenario;
pub mod session;

// Re-export main types for convenience
pub use browser::{BrowserHarness, ChromeSession};
pub use config::Config;
pub use error::{FlowError, FlowStep};
pub use flow::{FlowDriver, FlowReport};
pub use locator::{Locator, NameMatch, Strategy};
pub use navigator::{Navigator, Probe};
pub use pattern::UrlPattern;
pub use reporter::{OutputFormat, Reporter};
pub use runner::{ScenarioResult, SuiteResults, SuiteRunner};
pub use scenario::Scenario;
pub use session::{Session, SessionFactory};
