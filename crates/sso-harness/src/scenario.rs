//! Route-guard and SSO scenarios
//!
//! Each scenario runs against a fresh session and depends on no other
//! scenario's browser state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::config::Config;
use crate::error::{FlowError, FlowStep, Result};
use crate::flow::FlowDriver;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Visiting `/` without a session lands on the entry route
    UnauthenticatedRootRedirect,
    /// A full SSO login shows the welcome marker
    LoginReachesLanding,
    /// Login then logout returns to the entry route
    LoginThenLogout,
    /// The protected route redirects without ever showing the welcome marker
    ProtectedRouteGuard,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::UnauthenticatedRootRedirect,
        Scenario::LoginReachesLanding,
        Scenario::LoginThenLogout,
        Scenario::ProtectedRouteGuard,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::UnauthenticatedRootRedirect => "unauthenticated-root-redirect",
            Scenario::LoginReachesLanding => "login-reaches-landing",
            Scenario::LoginThenLogout => "login-then-logout",
            Scenario::ProtectedRouteGuard => "protected-route-guard",
        }
    }

    /// Execute the scenario's steps and assertions on `session`
    pub async fn run<S: Session + ?Sized>(&self, session: &S, config: &Config) -> Result<()> {
        let driver = FlowDriver::new(session, config)?;
        let nav = driver.navigator();
        let app = &config.app;
        let t = &config.timeouts;

        match self {
            Scenario::UnauthenticatedRootRedirect => {
                nav.goto(FlowStep::Visit, "/").await?;
                nav.wait_for_network_idle(FlowStep::Visit).await?;
                nav.wait_for_app_route(FlowStep::Assert, &app.entry_pattern, t.element)
                    .await?;
            }
            Scenario::LoginReachesLanding => {
                driver.login().await?;
                nav.expect_text(FlowStep::Assert, &app.welcome_marker, t.element)
                    .await?;
            }
            Scenario::LoginThenLogout => {
                driver.login().await?;
                driver.logout().await?;
            }
            Scenario::ProtectedRouteGuard => {
                session
                    .watch_text(&app.welcome_marker)
                    .await
                    .map_err(|e| e.at(FlowStep::Visit))?;
                nav.goto(FlowStep::Visit, &app.protected_route).await?;
                nav.wait_for_network_idle(FlowStep::Visit).await?;
                nav.wait_for_app_route(FlowStep::Assert, &app.entry_pattern, t.element)
                    .await?;
                nav.expect_no_text(FlowStep::Assert, &app.welcome_marker)
                    .await?;
                let flashed = session
                    .watched_text_seen()
                    .await
                    .map_err(|e| e.at(FlowStep::Assert))?;
                if flashed {
                    return Err(FlowError::AssertionFailed {
                        step: FlowStep::Assert,
                        message: format!(
                            "{} rendered {} before redirecting",
                            app.protected_route, app.welcome_marker
                        ),
                    });
                }
            }
        }

        info!("Scenario {} passed", self);
        Ok(())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Scenario::ALL.iter().map(Scenario::name).collect();
                format!("unknown scenario `{}` (expected one of: {})", s, known.join(", "))
            })
    }
}
