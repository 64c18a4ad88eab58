//! Scripted application + identity provider
//!
//! Models the pages of the application (`http://app.test`) and the IdP
//! (`https://idp.test`) as plain element lists. Clicks and fills move the
//! state machine the way the real deployment does, with knobs for the
//! version-dependent differences (two-step form, consent screens, overlay
//! banner, region-scoped logout, ...).

#![allow(dead_code)]

use async_trait::async_trait;
use sso_harness::config::Config;
use sso_harness::error::{FlowError, Result};
use sso_harness::locator::{AriaRole, NameMatch, Strategy};
use sso_harness::session::{Session, SessionFactory};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const APP: &str = "http://app.test";
pub const IDP_LOGIN: &str = "https://idp.test/authenticationendpoint/login.do?client_id=hrm";
pub const IDP_PASSWORD: &str = "https://idp.test/authenticationendpoint/login.do?step=password";
pub const IDP_CONSENT: &str = "https://idp.test/authenticationendpoint/oauth2_consent.do?app=hrm";
pub const IDP_LOGOUT_CONSENT: &str = "https://idp.test/oidc/oauth2_logout_consent.do";

/// Deployment differences the flows must tolerate
#[derive(Debug, Clone, Copy)]
pub struct Variant {
    pub two_step: bool,
    pub consent: bool,
    pub logout_consent: bool,
    pub banner: bool,
    /// Clicking the banner's "Got it" fails outright
    pub banner_click_fails: bool,
    /// The banner stays on screen after being clicked
    pub banner_sticks: bool,
    /// The consent page renders its "Allow" control
    pub consent_allow: bool,
    /// Older IdP markup: `name="username"` instead of `id="usernameUserInput"`
    pub legacy_username: bool,
    /// IdP markup none of the default locators know
    pub unknown_markup: bool,
    pub idp_reachable: bool,
    /// Logout control lives in this region, with a decoy "Logout" in `header`
    pub logout_region: Option<&'static str>,
    pub confirm_label: &'static str,
    /// `/dashboard` renders the welcome banner before redirecting
    pub flash_protected: bool,
    /// The tab crashes once credentials are submitted
    pub crash_after_submit: bool,
    /// Network never settles
    pub hang_network: bool,
    /// Navigation never commits
    pub hang_navigation: bool,
    pub password: &'static str,
}

impl Default for Variant {
    fn default() -> Self {
        Self {
            two_step: true,
            consent: true,
            logout_consent: true,
            banner: true,
            banner_click_fails: false,
            banner_sticks: false,
            consent_allow: true,
            legacy_username: false,
            unknown_markup: false,
            idp_reachable: true,
            logout_region: None,
            confirm_label: "Yes, logout",
            flash_protected: false,
            crash_after_submit: false,
            hang_network: false,
            hang_navigation: false,
            password: "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Blank,
    AppLogin,
    Dashboard,
    LogoutModal,
    IdpLogin,
    IdpPassword,
    Consent,
    LogoutConsent,
}

#[derive(Debug, Clone)]
struct El {
    key: &'static str,
    css: Vec<&'static str>,
    role: Option<AriaRole>,
    name: String,
    region: Option<&'static str>,
}

impl El {
    fn button(key: &'static str, name: &str) -> Self {
        Self {
            key,
            css: vec!["button"],
            role: Some(AriaRole::Button),
            name: name.to_string(),
            region: None,
        }
    }

    fn submit(key: &'static str, name: &str) -> Self {
        Self {
            css: vec![r#"button[type="submit"]"#, "button"],
            ..Self::button(key, name)
        }
    }

    fn input(key: &'static str, css: Vec<&'static str>) -> Self {
        Self {
            key,
            css,
            role: Some(AriaRole::Textbox),
            name: String::new(),
            region: None,
        }
    }

    fn text(key: &'static str, text: &str) -> Self {
        Self {
            key,
            css: vec!["h1"],
            role: None,
            name: text.to_string(),
            region: None,
        }
    }

    fn in_region(mut self, region: &'static str) -> Self {
        self.region = Some(region);
        self
    }

    fn matches(&self, strategy: &Strategy) -> bool {
        match strategy {
            Strategy::Css { selector } => self.css.contains(&selector.as_str()),
            Strategy::Role { role, name } => self.role == Some(*role) && name.matches(&self.name),
            Strategy::HasText { selector, text } => {
                self.css.contains(&selector.as_str()) && text.matches(&self.name)
            }
            Strategy::Text { text } => !self.name.is_empty() && text.matches(&self.name),
            Strategy::Within { region, inner } => {
                self.region == Some(region.as_str()) && self.matches(inner)
            }
        }
    }
}

#[derive(Debug)]
pub struct State {
    pub variant: Variant,
    pub page: Page,
    pub url: String,
    pub app_session: bool,
    pub consent_approved: bool,
    pub banner_visible: bool,
    pub username: String,
    pub password: String,
    pub submitted_username: Option<String>,
    pub submitted_password: Option<String>,
    pub credentials_submitted: bool,
    pub watching: Option<NameMatch>,
    pub marker_seen: bool,
    pub clicks: Vec<&'static str>,
    pub closed: bool,
}

impl State {
    fn new(variant: Variant) -> Self {
        Self {
            variant,
            page: Page::Blank,
            url: "about:blank".to_string(),
            app_session: false,
            consent_approved: false,
            banner_visible: variant.banner,
            username: String::new(),
            password: String::new(),
            submitted_username: None,
            submitted_password: None,
            credentials_submitted: false,
            watching: None,
            marker_seen: false,
            clicks: Vec::new(),
            closed: false,
        }
    }

    fn show(&mut self, page: Page, url: impl Into<String>) {
        self.page = page;
        self.url = url.into();
        if matches!(page, Page::Consent | Page::LogoutConsent) {
            self.banner_visible = self.variant.banner;
        }
        let elements = self.elements();
        self.note_rendered(&elements);
    }

    fn note_rendered(&mut self, elements: &[El]) {
        if let Some(watch) = &self.watching {
            if elements.iter().any(|e| e.matches(&Strategy::text(watch.clone()))) {
                self.marker_seen = true;
            }
        }
    }

    fn elements(&self) -> Vec<El> {
        let v = &self.variant;
        match self.page {
            Page::Blank => vec![],
            Page::AppLogin => vec![
                El::text("title", "HRM Portal"),
                El::button("app_login", "Login"),
            ],
            Page::Dashboard | Page::LogoutModal => {
                let mut els = vec![El::text("welcome", "Welcome Back, admin")];
                match v.logout_region {
                    Some(region) => {
                        els.push(El::button("logout_decoy", "Logout").in_region("header"));
                        els.push(El::button("logout", "LOGOUT").in_region(region));
                    }
                    None => els.push(El::button("logout", "LOGOUT").in_region("aside")),
                }
                if self.page == Page::LogoutModal {
                    els.push(El::button("confirm_logout", v.confirm_label));
                    els.push(El::button("cancel_logout", "Cancel"));
                }
                els
            }
            Page::IdpLogin => {
                let username = if v.unknown_markup {
                    El::input("username", vec![r#"input[name="login"]"#])
                } else if v.legacy_username {
                    El::input("username", vec![r#"input[name="username"]"#])
                } else {
                    El::input(
                        "username",
                        vec![r#"input[id="usernameUserInput"]"#, r#"input[name="username"]"#],
                    )
                };
                let mut els = vec![username];
                if v.two_step {
                    els.push(El::submit("continue", "Continue"));
                } else {
                    els.push(password_input());
                    els.push(El::submit("sign_in", "Sign In"));
                }
                els
            }
            Page::IdpPassword => vec![password_input(), El::submit("sign_in", "Sign In")],
            Page::Consent => {
                let mut els = vec![El::button("deny", "Deny")];
                if v.consent_allow {
                    els.insert(0, El::button("allow", "Allow"));
                }
                if self.banner_visible {
                    els.push(El::button("banner", "Got it"));
                }
                els
            }
            Page::LogoutConsent => {
                let mut els = vec![El::button("yes_logout", "Yes"), El::button("no_logout", "No")];
                if self.banner_visible {
                    els.push(El::button("banner", "Got it"));
                }
                els
            }
        }
    }

    fn find(&self, strategy: &Strategy) -> Option<El> {
        self.elements().into_iter().find(|e| e.matches(strategy))
    }

    fn submit_credentials(&mut self) {
        self.submitted_username = Some(self.username.clone());
        self.submitted_password = Some(self.password.clone());
        if self.password.is_empty() {
            // Re-rendered with an error; the username survives
            return;
        }
        self.credentials_submitted = true;
        if self.username != "admin" || self.password != self.variant.password {
            self.password.clear();
            return;
        }
        if self.variant.consent && !self.consent_approved {
            self.show(Page::Consent, IDP_CONSENT);
        } else {
            self.app_session = true;
            self.show(Page::Dashboard, format!("{APP}/dashboard"));
        }
    }

    fn activate(&mut self, key: &'static str, force: bool) -> Result<()> {
        let on_consent = matches!(self.page, Page::Consent | Page::LogoutConsent);
        if !force && self.banner_visible && on_consent && key != "banner" {
            return Err(FlowError::browser(format!(
                "click on {key} intercepted by overlay"
            )));
        }
        if key == "banner" && self.variant.banner_click_fails {
            return Err(FlowError::browser("Node is detached from document"));
        }
        self.clicks.push(key);
        match key {
            "app_login" if self.variant.idp_reachable => self.show(Page::IdpLogin, IDP_LOGIN),
            "continue" if !self.username.is_empty() => self.show(Page::IdpPassword, IDP_PASSWORD),
            "sign_in" => self.submit_credentials(),
            "banner" => self.banner_visible = self.variant.banner_sticks,
            "allow" => {
                self.consent_approved = true;
                self.app_session = true;
                self.show(Page::Dashboard, format!("{APP}/dashboard"));
            }
            "logout" => self.page = Page::LogoutModal,
            "cancel_logout" => self.page = Page::Dashboard,
            "confirm_logout" => {
                self.app_session = false;
                if self.variant.logout_consent {
                    self.show(Page::LogoutConsent, IDP_LOGOUT_CONSENT);
                } else {
                    self.show(Page::AppLogin, format!("{APP}/login"));
                }
            }
            "yes_logout" => self.show(Page::AppLogin, format!("{APP}/login")),
            _ => {}
        }
        Ok(())
    }
}

fn password_input() -> El {
    El::input(
        "password",
        vec![r#"input[id="password"]"#, r#"input[name="password"]"#],
    )
}

/// A session over shared fake state, inspectable after the session closes
#[derive(Clone)]
pub struct FakeSession {
    pub state: Arc<Mutex<State>>,
}

impl FakeSession {
    pub fn new(variant: Variant) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(variant))),
        }
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    pub fn clicks(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        let hang = self.state.lock().unwrap().variant.hang_navigation;
        if hang {
            std::future::pending::<()>().await;
        }
        let mut s = self.state.lock().unwrap();
        let path = url.strip_prefix(APP).unwrap_or(url);
        match path {
            "/" | "/dashboard" if s.app_session => {
                s.show(Page::Dashboard, format!("{APP}/dashboard"))
            }
            "/dashboard" if s.variant.flash_protected => {
                s.show(Page::Dashboard, format!("{APP}/dashboard"));
                s.show(Page::AppLogin, format!("{APP}/login"));
            }
            _ => s.show(Page::AppLogin, format!("{APP}/login")),
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let s = self.state.lock().unwrap();
        if s.variant.crash_after_submit && s.credentials_submitted {
            return Err(FlowError::browser("Target crashed"));
        }
        Ok(s.url.clone())
    }

    async fn wait_for_network_idle(&self, _quiet: Duration) -> Result<()> {
        let hang = self.state.lock().unwrap().variant.hang_network;
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn is_visible(&self, strategy: &Strategy) -> Result<bool> {
        Ok(self.state.lock().unwrap().find(strategy).is_some())
    }

    async fn click(&self, strategy: &Strategy, force: bool) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        let el = s
            .find(strategy)
            .ok_or_else(|| FlowError::browser(format!("{strategy} is gone")))?;
        s.activate(el.key, force)
    }

    async fn fill(&self, strategy: &Strategy, value: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        let el = s
            .find(strategy)
            .ok_or_else(|| FlowError::browser(format!("{strategy} is gone")))?;
        match el.key {
            "username" => s.username = value.to_string(),
            "password" => s.password = value.to_string(),
            other => return Err(FlowError::browser(format!("{other} is not an input"))),
        }
        Ok(())
    }

    async fn watch_text(&self, text: &NameMatch) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.watching = Some(text.clone());
        let elements = s.elements();
        s.note_rendered(&elements);
        Ok(())
    }

    async fn watched_text_seen(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().marker_seen)
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out a fresh [`FakeSession`] per scenario and keeps them for inspection
pub struct FakeFactory {
    pub variant: Variant,
    pub opened: Mutex<Vec<FakeSession>>,
}

impl FakeFactory {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn sessions(&self) -> Vec<FakeSession> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn open(&self) -> Result<FakeSession> {
        let session = FakeSession::new(self.variant);
        self.opened.lock().unwrap().push(session.clone());
        Ok(session)
    }
}

/// Default configuration pointed at the fake app, with short budgets
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.app.base_url = APP.to_string();
    let t = &mut config.timeouts;
    t.page = Duration::from_millis(200);
    t.element = Duration::from_millis(200);
    t.confirm = Duration::from_millis(200);
    t.redirect = Duration::from_millis(300);
    t.optional_probe = Duration::from_millis(100);
    t.banner_hide = Duration::from_millis(100);
    t.scenario = Duration::from_secs(5);
    t.poll_interval = Duration::from_millis(5);
    t.network_quiet = Duration::ZERO;
    config
}
