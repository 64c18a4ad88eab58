//! Timed waits and version-tolerant lookups over a [`Session`]
//!
//! Every wait here has an explicit budget and polls at
//! [`Timeouts::poll_interval`]. Mandatory waits turn an elapsed budget into a
//! [`FlowError`] naming the step. Optional branches use the `probe_*`
//! methods instead, which report [`Probe::Absent`] when (and only when) the
//! awaited condition did not occur in time; session failures still propagate.
//! Every session failure leaves here attributed to the step that hit it.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::config::Timeouts;
use crate::error::{FlowError, FlowStep, Result};
use crate::locator::{Locator, NameMatch, Strategy};
use crate::pattern::UrlPattern;
use crate::session::Session;

/// Outcome of a non-fatal probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Present,
    Absent,
}

impl Probe {
    pub fn is_present(self) -> bool {
        self == Probe::Present
    }
}

pub struct Navigator<'a, S: Session + ?Sized> {
    session: &'a S,
    base: Url,
    timeouts: Timeouts,
}

impl<'a, S: Session + ?Sized> Navigator<'a, S> {
    pub fn new(session: &'a S, base_url: &str, timeouts: Timeouts) -> Result<Self> {
        let base = parse_url(base_url)?;
        Ok(Self {
            session,
            base,
            timeouts,
        })
    }

    pub fn session(&self) -> &'a S {
        self.session
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Host of the application under test
    pub fn app_host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }

    /// Resolve a route against the base URL; absolute URLs pass through
    pub fn url_for(&self, route: &str) -> Result<String> {
        if route.starts_with("http://") || route.starts_with("https://") {
            return Ok(route.to_string());
        }
        self.base
            .join(route)
            .map(String::from)
            .map_err(|source| FlowError::InvalidUrl {
                url: route.to_string(),
                source,
            })
    }

    /// Load `route`, bounded by the redirect timeout
    #[instrument(skip(self))]
    pub async fn goto(&self, step: FlowStep, route: &str) -> Result<()> {
        let url = self.url_for(route)?;
        let timeout = self.timeouts.redirect;
        debug!("Navigating to: {}", url);
        match tokio::time::timeout(timeout, self.session.goto(&url)).await {
            Ok(result) => result.map_err(|e| e.at(step)),
            Err(_) => Err(FlowError::LoadTimeout { step, timeout }),
        }
    }

    /// Block until the page has been network-quiet for the configured window
    pub async fn wait_for_network_idle(&self, step: FlowStep) -> Result<()> {
        let timeout = self.timeouts.redirect;
        match tokio::time::timeout(
            timeout,
            self.session.wait_for_network_idle(self.timeouts.network_quiet),
        )
        .await
        {
            Ok(result) => result.map_err(|e| e.at(step)),
            Err(_) => Err(FlowError::LoadTimeout { step, timeout }),
        }
    }

    /// Block until the URL is on the application host and matches `pattern`
    #[instrument(skip(self, pattern), fields(pattern = %pattern))]
    pub async fn wait_for_app_route(
        &self,
        step: FlowStep,
        pattern: &UrlPattern,
        timeout: Duration,
    ) -> Result<Url> {
        let app_host = self.app_host().to_string();
        self.wait_for_url(step, &format!("{} on {}", pattern, app_host), timeout, |url| {
            url.host_str() == Some(app_host.as_str()) && pattern.is_match(url.as_str())
        })
        .await
    }

    /// Block until the browser is on a host other than the application's
    pub async fn wait_for_foreign_host(&self, step: FlowStep, timeout: Duration) -> Result<Url> {
        let app_host = self.app_host().to_string();
        self.wait_for_url(
            step,
            &format!("a host other than {}", app_host),
            timeout,
            |url| matches!(url.host_str(), Some(host) if host != app_host),
        )
        .await
    }

    /// Block until `predicate` holds for the current URL
    pub async fn wait_for_url<P>(
        &self,
        step: FlowStep,
        expected: &str,
        timeout: Duration,
        predicate: P,
    ) -> Result<Url>
    where
        P: Fn(&Url) -> bool,
    {
        let predicate = &predicate;
        let found = self
            .poll(timeout, move || async move {
                let url = self.current_url().await?;
                Ok(url.filter(|u| predicate(u)))
            })
            .await
            .map_err(|e| e.at(step))?;

        match found {
            Some(url) => {
                debug!("URL reached: {}", url);
                Ok(url)
            }
            None => Err(FlowError::RedirectTimeout {
                step,
                expected: expected.to_string(),
                last_url: self.session.current_url().await.unwrap_or_default(),
                timeout,
            }),
        }
    }

    /// Wait up to `timeout` for a URL matching `pattern`
    ///
    /// `Absent` means the URL never matched; any session failure is an error.
    #[instrument(skip(self, pattern), fields(pattern = %pattern))]
    pub async fn probe_url(
        &self,
        step: FlowStep,
        pattern: &UrlPattern,
        timeout: Duration,
    ) -> Result<Probe> {
        let found = self
            .poll(timeout, move || async move {
                let url = self.current_url().await?;
                Ok(url.filter(|u| pattern.is_match(u.as_str())))
            })
            .await
            .map_err(|e| e.at(step))?;
        Ok(if found.is_some() {
            Probe::Present
        } else {
            Probe::Absent
        })
    }

    /// Resolve `locator` to its first candidate with a visible match
    #[instrument(skip(self, locator), fields(locator = %locator))]
    pub async fn locate(
        &self,
        step: FlowStep,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Strategy> {
        match self
            .first_visible(locator, timeout)
            .await
            .map_err(|e| e.at(step))?
        {
            Some(strategy) => {
                debug!("Resolved {} via {}", step, strategy);
                Ok(strategy)
            }
            None => Err(FlowError::ElementNotFound {
                step,
                candidates: locator.to_string(),
                timeout,
            }),
        }
    }

    /// Like [`Navigator::locate`], but absence is a valid outcome
    pub async fn probe_visible(
        &self,
        step: FlowStep,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Probe> {
        let found = self
            .first_visible(locator, timeout)
            .await
            .map_err(|e| e.at(step))?;
        Ok(match found {
            Some(_) => Probe::Present,
            None => Probe::Absent,
        })
    }

    /// Wait for `strategy` to stop resolving to a visible element
    pub async fn probe_hidden(
        &self,
        step: FlowStep,
        strategy: &Strategy,
        timeout: Duration,
    ) -> Result<Probe> {
        let hidden = self
            .poll(timeout, move || async move {
                let visible = self.session.is_visible(strategy).await?;
                Ok((!visible).then_some(()))
            })
            .await
            .map_err(|e| e.at(step))?;
        Ok(if hidden.is_some() {
            Probe::Present
        } else {
            Probe::Absent
        })
    }

    pub async fn click(&self, step: FlowStep, locator: &Locator, timeout: Duration) -> Result<()> {
        let target = self.locate(step, locator, timeout).await?;
        self.session
            .click(&target, false)
            .await
            .map_err(|e| e.at(step))
    }

    /// Click without regard for overlays covering the element
    pub async fn force_click(
        &self,
        step: FlowStep,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<()> {
        let target = self.locate(step, locator, timeout).await?;
        self.session
            .click(&target, true)
            .await
            .map_err(|e| e.at(step))
    }

    pub async fn fill(
        &self,
        step: FlowStep,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<()> {
        let target = self.locate(step, locator, timeout).await?;
        self.session
            .fill(&target, value)
            .await
            .map_err(|e| e.at(step))
    }

    /// Require `text` to become visible within `timeout`
    pub async fn expect_text(
        &self,
        step: FlowStep,
        text: &NameMatch,
        timeout: Duration,
    ) -> Result<()> {
        self.locate(step, &Locator::one(Strategy::text(text.clone())), timeout)
            .await
            .map(|_| ())
    }

    /// Require `text` to not be visible right now
    pub async fn expect_no_text(&self, step: FlowStep, text: &NameMatch) -> Result<()> {
        let visible = self
            .session
            .is_visible(&Strategy::text(text.clone()))
            .await
            .map_err(|e| e.at(step))?;
        if visible {
            return Err(FlowError::AssertionFailed {
                step,
                message: format!("text {} is visible", text),
            });
        }
        Ok(())
    }

    async fn first_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Strategy>> {
        self.poll(timeout, move || async move {
            for candidate in locator.candidates() {
                if self.session.is_visible(candidate).await? {
                    return Ok(Some(candidate.clone()));
                }
            }
            Ok(None)
        })
        .await
    }

    async fn current_url(&self) -> Result<Option<Url>> {
        let raw = self.session.current_url().await?;
        Ok(Url::parse(&raw).ok())
    }

    /// Run `check` until it yields a value or `timeout` elapses
    ///
    /// `Ok(None)` means the budget ran out; errors from `check` end the wait.
    async fn poll<T, F, Fut>(&self, timeout: Duration, mut check: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let interval = self.timeouts.poll_interval;
        let waited = tokio::time::timeout(timeout, async {
            loop {
                if let Some(value) = check().await? {
                    return Ok::<T, FlowError>(value);
                }
                tokio::time::sleep(interval).await;
            }
        })
        .await;

        match waited {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| FlowError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
