//! Configuration for SSO flow runs
//!
//! Settings are resolved once at startup in three layers: built-in defaults
//! (matching the reference deployment), an optional TOML file, then the
//! `BASE_URL`, `TEST_USERNAME` and `TEST_PASSWORD` environment variables.
//! The result is read-only for the lifetime of the run.
//!
//! ```toml
//! [app]
//! base_url = "https://hrm.example.gov"
//! logout_trigger = [
//!     { by = "within", region = "aside", inner = { by = "role", role = "button", name = { pattern = "^logout$", ignore_case = true } } },
//! ]
//!
//! [credentials]
//! username = "admin"
//!
//! [timeouts]
//! redirect = 45000
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::locator::{Locator, NameMatch, Strategy};
use crate::pattern::UrlPattern;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Application under test and its UI contract
    #[serde(default)]
    pub app: AppConfig,
    /// Identity provider UI contract
    #[serde(default)]
    pub idp: IdpConfig,
    /// Login credentials
    #[serde(default)]
    pub credentials: Credentials,
    /// Wait budgets
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Browser launch options
    #[serde(default)]
    pub browser: BrowserOptions,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - A locator or URL pattern does not compile
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use sso_harness::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_str(r#"
    ///     [app]
    ///     base_url = "https://hrm.example.gov"
    /// "#)?;
    /// assert_eq!(config.credentials.username, "admin");
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `BASE_URL`, `TEST_USERNAME` and `TEST_PASSWORD` from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BASE_URL").filter(|v| !v.is_empty()) {
            self.app.base_url = url;
        }
        if let Some(username) = lookup("TEST_USERNAME").filter(|v| !v.is_empty()) {
            self.credentials.username = username;
        }
        if let Some(password) = lookup("TEST_PASSWORD").filter(|v| !v.is_empty()) {
            self.credentials.password = password;
        }
    }

    /// Check that URLs parse and locator patterns compile
    pub fn validate(&self) -> anyhow::Result<()> {
        let base = url::Url::parse(&self.app.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.app.base_url))?;
        anyhow::ensure!(
            base.host_str().is_some(),
            "base_url has no host: {}",
            self.app.base_url
        );

        let locators = [
            ("app.login_trigger", &self.app.login_trigger),
            ("app.logout_trigger", &self.app.logout_trigger),
            ("app.logout_confirm", &self.app.logout_confirm),
            ("idp.username", &self.idp.username),
            ("idp.advance", &self.idp.advance),
            ("idp.password", &self.idp.password),
            ("idp.submit", &self.idp.submit),
            ("idp.consent_allow", &self.idp.consent_allow),
            ("idp.logout_consent_confirm", &self.idp.logout_consent_confirm),
            ("idp.banner_dismiss", &self.idp.banner_dismiss),
        ];
        for (name, locator) in locators {
            anyhow::ensure!(
                !locator.candidates().is_empty(),
                "Locator {} has no candidates",
                name
            );
            locator
                .validate()
                .with_context(|| format!("Invalid name pattern in {}", name))?;
        }
        Strategy::text(self.app.welcome_marker.clone())
            .validate()
            .context("Invalid welcome_marker pattern")?;
        Ok(())
    }
}

/// Application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL; its host is the "application origin" for cross-origin checks
    pub base_url: String,
    /// Unauthenticated entry path
    pub entry_route: String,
    /// Pattern the entry route's URL must match
    pub entry_pattern: UrlPattern,
    /// Pattern the authenticated landing URL must match
    pub landing_pattern: UrlPattern,
    /// Route that requires authentication
    pub protected_route: String,
    /// Text shown on the authenticated landing page
    pub welcome_marker: NameMatch,
    /// The entry route's control that starts SSO
    pub login_trigger: Locator,
    /// Logout control, optionally scoped to a layout region
    pub logout_trigger: Locator,
    /// Confirm control in the logout modal
    pub logout_confirm: Locator,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            entry_route: "/login".to_string(),
            entry_pattern: builtin_regex("/login"),
            landing_pattern: builtin_glob("**/dashboard"),
            protected_route: "/dashboard".to_string(),
            welcome_marker: NameMatch::from("Welcome Back,"),
            login_trigger: Locator::one(Strategy::button("Login")),
            logout_trigger: Locator::one(Strategy::button(NameMatch::pattern("^logout$", true))),
            logout_confirm: Locator::one(Strategy::button("Yes, logout")),
        }
    }
}

/// Identity provider pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpConfig {
    pub username: Locator,
    /// Continue/sign-in control pressed after the username
    pub advance: Locator,
    pub password: Locator,
    pub submit: Locator,
    pub consent_pattern: UrlPattern,
    pub consent_allow: Locator,
    pub logout_consent_pattern: UrlPattern,
    pub logout_consent_confirm: Locator,
    /// Overlay banner that may cover the consent buttons
    pub banner_dismiss: Locator,
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            username: Locator::new(vec![
                Strategy::css(r#"input[id="usernameUserInput"]"#),
                Strategy::css(r#"input[name="username"]"#),
            ]),
            advance: Locator::new(vec![
                Strategy::css(r#"button[type="submit"]"#),
                Strategy::has_text("button", "Continue"),
                Strategy::has_text("button", "Sign In"),
            ]),
            password: Locator::new(vec![
                Strategy::css(r#"input[id="password"]"#),
                Strategy::css(r#"input[name="password"]"#),
            ]),
            submit: Locator::new(vec![
                Strategy::css(r#"button[type="submit"]"#),
                Strategy::has_text("button", "Sign In"),
                Strategy::has_text("button", "Continue"),
            ]),
            consent_pattern: builtin_glob("**/oauth2_consent**"),
            consent_allow: Locator::one(Strategy::button("Allow")),
            logout_consent_pattern: builtin_glob("**/oauth2_logout_consent**"),
            logout_consent_confirm: Locator::one(Strategy::button("Yes")),
            banner_dismiss: Locator::one(Strategy::button("Got it")),
        }
    }
}

// Built-in patterns are constants; a failure here is a programming error.
fn builtin_glob(glob: &str) -> UrlPattern {
    UrlPattern::glob(glob).unwrap_or_else(|e| panic!("built-in glob {glob}: {e}"))
}

fn builtin_regex(re: &str) -> UrlPattern {
    UrlPattern::regex(re).unwrap_or_else(|e| panic!("built-in regex {re}: {e}"))
}

/// Login credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Wait budgets, serialized as milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    /// General page expectations (logout trigger, final assertions)
    #[serde(with = "duration_ms")]
    pub page: Duration,
    /// Locating credential fields and app controls
    #[serde(with = "duration_ms")]
    pub element: Duration,
    /// Modal confirm control
    #[serde(with = "duration_ms")]
    pub confirm: Duration,
    /// Cross-origin and completion redirects
    #[serde(with = "duration_ms")]
    pub redirect: Duration,
    /// Detection window for optional consent screens
    #[serde(with = "duration_ms")]
    pub optional_probe: Duration,
    /// Waiting for a dismissed banner to disappear
    #[serde(with = "duration_ms")]
    pub banner_hide: Duration,
    /// Overall budget for one scenario
    #[serde(with = "duration_ms")]
    pub scenario: Duration,
    /// Interval between condition checks
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    /// Quiet period that counts as network idle
    #[serde(with = "duration_ms")]
    pub network_quiet: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page: Duration::from_secs(10),
            element: Duration::from_secs(15),
            confirm: Duration::from_secs(5),
            redirect: Duration::from_secs(30),
            optional_probe: Duration::from_secs(5),
            banner_hide: Duration::from_secs(3),
            scenario: Duration::from_secs(60),
            poll_interval: Duration::from_millis(100),
            network_quiet: Duration::from_millis(500),
        }
    }
}

/// Browser launch options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub ignore_certificate_errors: bool,
    /// Explicit Chrome binary; auto-detected when absent
    pub executable: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            ignore_certificate_errors: true,
            executable: None,
        }
    }
}

/// Serde module for serializing/deserializing Duration as milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
