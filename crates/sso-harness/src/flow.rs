//! SSO login and logout state machines
//!
//! ```text
//! login:
//!   initiate → trigger SSO → cross-origin wait → username → step advance
//!            → password → final submit → [consent?] → completion
//!
//! logout:
//!   trigger → confirm modal → [IdP logout consent?] → completion
//! ```
//!
//! Bracketed steps are optional: they are detected with a short probe and
//! skipped when the IdP does not show them (already-approved sessions). Every
//! other step is mandatory and fails the flow with the step's name.

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{FlowStep, Result};
use crate::locator::{Locator, Strategy};
use crate::navigator::{Navigator, Probe};
use crate::pattern::UrlPattern;
use crate::session::Session;

/// Which optional screens a flow run went through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowReport {
    /// The IdP consent (or logout consent) screen was shown and confirmed
    pub consent_handled: bool,
    /// An overlay banner was dismissed on that screen
    pub banner_dismissed: bool,
}

/// Drives the application and IdP through login and logout
pub struct FlowDriver<'a, S: Session + ?Sized> {
    nav: Navigator<'a, S>,
    config: &'a Config,
}

impl<'a, S: Session + ?Sized> FlowDriver<'a, S> {
    pub fn new(session: &'a S, config: &'a Config) -> Result<Self> {
        let nav = Navigator::new(session, &config.app.base_url, config.timeouts)?;
        Ok(Self { nav, config })
    }

    pub fn navigator(&self) -> &Navigator<'a, S> {
        &self.nav
    }

    /// Run the full SSO login and return once the landing route has loaded
    #[instrument(skip(self), fields(username = %self.config.credentials.username))]
    pub async fn login(&self) -> Result<FlowReport> {
        let app = &self.config.app;
        let idp = &self.config.idp;
        let t = &self.config.timeouts;
        let creds = &self.config.credentials;

        info!("Opening entry route {}", app.entry_route);
        self.nav.goto(FlowStep::Initiate, &app.entry_route).await?;
        self.nav.wait_for_network_idle(FlowStep::Initiate).await?;

        self.nav
            .click(FlowStep::TriggerSso, &app.login_trigger, t.element)
            .await?;

        let idp_url = self
            .nav
            .wait_for_foreign_host(FlowStep::CrossOriginWait, t.redirect)
            .await?;
        info!("Redirected to identity provider at {}", host_of(&idp_url));

        self.nav
            .fill(FlowStep::Username, &idp.username, &creds.username, t.element)
            .await?;

        // Either reveals the password step or submits a single-step form.
        self.nav
            .click(FlowStep::StepAdvance, &idp.advance, t.element)
            .await?;

        self.nav
            .fill(FlowStep::Password, &idp.password, &creds.password, t.element)
            .await?;

        self.nav
            .click(FlowStep::FinalSubmit, &idp.submit, t.element)
            .await?;
        debug!("Credentials submitted");

        let report = self
            .confirm_optional_screen(FlowStep::Consent, &idp.consent_pattern, &idp.consent_allow)
            .await?;

        let landing = self
            .nav
            .wait_for_app_route(FlowStep::Completion, &app.landing_pattern, t.redirect)
            .await?;
        self.nav.wait_for_network_idle(FlowStep::Completion).await?;

        info!("Login complete at {}", landing);
        Ok(report)
    }

    /// Log out from an authenticated page and return once back on the entry route
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<FlowReport> {
        let app = &self.config.app;
        let idp = &self.config.idp;
        let t = &self.config.timeouts;

        self.nav
            .click(FlowStep::LogoutTrigger, &app.logout_trigger, t.page)
            .await?;

        self.nav
            .click(FlowStep::LogoutConfirm, &app.logout_confirm, t.confirm)
            .await?;

        let report = self
            .confirm_optional_screen(
                FlowStep::LogoutConsent,
                &idp.logout_consent_pattern,
                &idp.logout_consent_confirm,
            )
            .await?;

        let entry = self
            .nav
            .wait_for_app_route(FlowStep::LogoutCompletion, &app.entry_pattern, t.redirect)
            .await?;

        info!("Logout complete at {}", entry);
        Ok(report)
    }

    /// Handle an IdP screen that only some sessions see
    ///
    /// Absence of the screen within the probe window selects the skip
    /// branch. Once the screen is detected, confirming it is mandatory.
    async fn confirm_optional_screen(
        &self,
        step: FlowStep,
        pattern: &UrlPattern,
        confirm: &Locator,
    ) -> Result<FlowReport> {
        let t = &self.config.timeouts;

        match self.nav.probe_url(step, pattern, t.optional_probe).await? {
            Probe::Absent => {
                debug!("No {} screen within {:?}; continuing", step, t.optional_probe);
                return Ok(FlowReport::default());
            }
            Probe::Present => info!("Handling {} screen", step),
        }

        let banner_dismissed = self.dismiss_banner(step).await;

        self.nav.force_click(step, confirm, t.element).await?;

        Ok(FlowReport {
            consent_handled: true,
            banner_dismissed,
        })
    }

    /// Best-effort removal of the overlay banner; never fails the flow
    async fn dismiss_banner(&self, step: FlowStep) -> bool {
        let t = &self.config.timeouts;
        let banner = &self.config.idp.banner_dismiss;

        let Some(target) = self.visible_banner(banner).await else {
            return false;
        };

        if let Err(e) = self.nav.session().click(&target, true).await {
            warn!("[{}] Could not dismiss overlay banner: {}", step, e);
            return false;
        }

        match self.nav.probe_hidden(step, &target, t.banner_hide).await {
            Ok(Probe::Present) => {
                debug!("Overlay banner dismissed");
                true
            }
            Ok(Probe::Absent) => {
                warn!(
                    "[{}] Overlay banner still visible after {:?}",
                    step, t.banner_hide
                );
                false
            }
            Err(e) => {
                warn!("[{}] Lost track of overlay banner: {}", step, e);
                false
            }
        }
    }

    async fn visible_banner(&self, banner: &Locator) -> Option<Strategy> {
        for candidate in banner.candidates() {
            match self.nav.session().is_visible(candidate).await {
                Ok(true) => return Some(candidate.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!("Overlay banner check failed: {}", e);
                    return None;
                }
            }
        }
        None
    }
}

fn host_of(url: &Url) -> &str {
    url.host_str().unwrap_or("<no host>")
}
