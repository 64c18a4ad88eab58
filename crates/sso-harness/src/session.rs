//! The browser seam
//!
//! A [`Session`] is one isolated tab: its own cookies, history and current
//! URL. Everything above this trait (navigator, flows, scenarios) is written
//! against it, so flows run the same against Chrome
//! ([`crate::browser::ChromeSession`]) and against scripted pages in tests.
//!
//! Session methods are single attempts; waiting and timeouts belong to
//! [`crate::navigator::Navigator`].

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::locator::{NameMatch, Strategy};

#[async_trait]
pub trait Session: Send + Sync {
    /// Start loading an absolute URL
    async fn goto(&self, url: &str) -> Result<()>;

    /// The URL currently committed in the tab
    async fn current_url(&self) -> Result<String>;

    /// Resolve once no network activity has been seen for `quiet`
    ///
    /// May wait indefinitely; callers bound it with a timeout.
    async fn wait_for_network_idle(&self, quiet: Duration) -> Result<()>;

    /// Whether `strategy` currently resolves to a visible element
    async fn is_visible(&self, strategy: &Strategy) -> Result<bool>;

    /// Click the element `strategy` resolves to
    ///
    /// A forced click dispatches the click on the element directly, ignoring
    /// anything rendered on top of it.
    async fn click(&self, strategy: &Strategy, force: bool) -> Result<()>;

    /// Replace the value of the input `strategy` resolves to
    async fn fill(&self, strategy: &Strategy, value: &str) -> Result<()>;

    /// Start recording whether `text` is ever rendered, including in
    /// documents loaded after this call
    async fn watch_text(&self, text: &NameMatch) -> Result<()>;

    /// Whether the watched text has been rendered since [`Session::watch_text`]
    async fn watched_text_seen(&self) -> Result<bool>;

    /// Release the tab and its browser context
    async fn close(&self) -> Result<()>;
}

/// Creates a fresh, isolated [`Session`] per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: Session;

    async fn open(&self) -> Result<Self::Session>;
}
