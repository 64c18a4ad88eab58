//! Parse and print an SSO harness configuration
//!
//! Usage: cargo run -p sso-harness --example validate_config -- [config.toml]

use sso_harness::config::Config;
use std::env;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("crates/sso-harness/configs/hrm.toml")
    };

    println!("Validating config file: {}", config_path.display());

    let mut config = Config::from_file(&config_path)?;
    config.apply_overrides(|key| env::var(key).ok());
    config.validate()?;

    println!("\n✓ Successfully parsed configuration!");
    println!("\nApplication: {}", config.app.base_url);
    println!("Entry route: {} ({})", config.app.entry_route, config.app.entry_pattern);
    println!("Landing: {}", config.app.landing_pattern);
    println!("Protected route: {}", config.app.protected_route);
    println!("Username: {}", config.credentials.username);

    println!("\nLocators:");
    println!("  Login trigger: {}", config.app.login_trigger);
    println!("  Logout trigger: {}", config.app.logout_trigger);
    println!("  Logout confirm: {}", config.app.logout_confirm);
    println!("  Username: {}", config.idp.username);
    println!("  Password: {}", config.idp.password);

    println!("\nOptional screens:");
    println!("  Consent: {} → {}", config.idp.consent_pattern, config.idp.consent_allow);
    println!(
        "  Logout consent: {} → {}",
        config.idp.logout_consent_pattern, config.idp.logout_consent_confirm
    );

    println!("\nTimeouts:");
    println!("  Redirect: {:?}", config.timeouts.redirect);
    println!("  Element: {:?}", config.timeouts.element);
    println!("  Scenario: {:?}", config.timeouts.scenario);

    println!("\n✓ All validations passed!");

    Ok(())
}
