//! Live deployment helpers

#![allow(dead_code)]

/// Base URL of a live deployment to run against, from `SSO_BASE_URL`
pub fn live_base_url() -> Option<String> {
    std::env::var("SSO_BASE_URL").ok().filter(|v| !v.is_empty())
}

/// Check if the application answers at `url`
pub async fn is_server_available(url: &str) -> bool {
    match reqwest::get(url).await {
        Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
        Err(_) => false,
    }
}

/// Macro to skip test unless a reachable live deployment is configured
#[macro_export]
macro_rules! require_live_app {
    () => {{
        let Some(url) = server::live_base_url() else {
            eprintln!("Skipping: SSO_BASE_URL is not set");
            eprintln!("  To run these tests, point them at a deployment:");
            eprintln!(
                "    SSO_BASE_URL=https://hrm.example.gov TEST_PASSWORD=... \
                 cargo test -p sso-harness --test browser_sso"
            );
            return;
        };
        if !server::is_server_available(&url).await {
            eprintln!("Skipping: application not reachable at {}", url);
            return;
        }
        url
    }};
}
