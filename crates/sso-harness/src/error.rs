//! Flow failure taxonomy
//!
//! Every fatal condition carries the [`FlowStep`] it occurred in so a failed
//! scenario reports which step and which expected condition was not met.
//! An optional step that simply did not happen is not represented here; see
//! [`crate::navigator::Probe`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Named points of the login/logout state machine and the scenario checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    /// Load the application's login entry route
    Initiate,
    /// Click the application's Login control
    TriggerSso,
    /// Wait for the browser to leave the application host
    CrossOriginWait,
    /// Fill the IdP username field
    Username,
    /// Click continue/sign-in after the username
    StepAdvance,
    /// Fill the IdP password field
    Password,
    /// Submit the credential form
    FinalSubmit,
    /// Optional OAuth2 consent screen
    Consent,
    /// Wait for the authenticated landing route
    Completion,
    /// Click the application's logout control
    LogoutTrigger,
    /// Confirm the logout modal
    LogoutConfirm,
    /// Optional IdP logout consent screen
    LogoutConsent,
    /// Wait for the unauthenticated entry route
    LogoutCompletion,
    /// Direct navigation performed by a scenario
    Visit,
    /// Scenario-level assertion on the final page state
    Assert,
}

impl FlowStep {
    /// Stable identifier used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::Initiate => "initiate",
            FlowStep::TriggerSso => "trigger_sso",
            FlowStep::CrossOriginWait => "cross_origin_wait",
            FlowStep::Username => "username",
            FlowStep::StepAdvance => "step_advance",
            FlowStep::Password => "password",
            FlowStep::FinalSubmit => "final_submit",
            FlowStep::Consent => "consent",
            FlowStep::Completion => "completion",
            FlowStep::LogoutTrigger => "logout_trigger",
            FlowStep::LogoutConfirm => "logout_confirm",
            FlowStep::LogoutConsent => "logout_consent",
            FlowStep::LogoutCompletion => "logout_completion",
            FlowStep::Visit => "visit",
            FlowStep::Assert => "assert",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal conditions raised while driving a flow
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("[{step}] no element matched {candidates} within {timeout:?}")]
    ElementNotFound {
        step: FlowStep,
        candidates: String,
        timeout: Duration,
    },

    #[error("[{step}] URL never matched {expected} within {timeout:?} (last URL: {last_url})")]
    RedirectTimeout {
        step: FlowStep,
        expected: String,
        last_url: String,
        timeout: Duration,
    },

    #[error("[{step}] page did not finish loading within {timeout:?}")]
    LoadTimeout { step: FlowStep, timeout: Duration },

    #[error("[{step}] assertion failed: {message}")]
    AssertionFailed { step: FlowStep, message: String },

    #[error("scenario exceeded its {0:?} budget")]
    ScenarioTimeout(Duration),

    #[error("{}browser error: {message}", step_prefix(.step))]
    Browser {
        step: Option<FlowStep>,
        message: String,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl FlowError {
    /// The step this failure occurred in, when it is tied to one
    pub fn step(&self) -> Option<FlowStep> {
        match self {
            FlowError::ElementNotFound { step, .. }
            | FlowError::RedirectTimeout { step, .. }
            | FlowError::LoadTimeout { step, .. }
            | FlowError::AssertionFailed { step, .. } => Some(*step),
            FlowError::Browser { step, .. } => *step,
            FlowError::ScenarioTimeout(_) | FlowError::InvalidUrl { .. } => None,
        }
    }

    /// A session failure not yet tied to a step
    pub fn browser(message: impl Into<String>) -> Self {
        FlowError::Browser {
            step: None,
            message: message.into(),
        }
    }

    /// Attribute an untagged session failure to `step`
    pub fn at(self, step: FlowStep) -> Self {
        match self {
            FlowError::Browser {
                step: None,
                message,
            } => FlowError::Browser {
                step: Some(step),
                message,
            },
            other => other,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for FlowError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        FlowError::browser(err.to_string())
    }
}

fn step_prefix(step: &Option<FlowStep>) -> String {
    step.map(|s| format!("[{}] ", s)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, FlowError>;
