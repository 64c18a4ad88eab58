//! Browser automation helpers

#![allow(dead_code)]

use sso_harness::config::BrowserOptions;
use sso_harness::BrowserHarness;

/// Check if browser tests should be skipped (when Chrome isn't available)
pub fn should_skip() -> bool {
    std::env::var("SKIP_BROWSER_TESTS").is_ok()
}

/// Macro to skip test if Chrome isn't available
#[macro_export]
macro_rules! skip_if_no_chrome {
    () => {
        if browser::should_skip() {
            eprintln!("Skipping test: SKIP_BROWSER_TESTS is set");
            return;
        }
    };
}

/// Launch a headless harness, or `None` when Chrome cannot be found
pub async fn require_harness() -> Option<BrowserHarness> {
    match BrowserHarness::launch(&BrowserOptions::default()).await {
        Ok(harness) => Some(harness),
        Err(e) => {
            if e.to_string().contains("Could not auto detect") {
                eprintln!("Skipping: Chrome not installed ({})", e);
                None
            } else {
                panic!("Unexpected browser error: {}", e);
            }
        }
    }
}
