//! Chrome-backed sessions via the Chrome DevTools Protocol
//!
//! One browser process is launched per run. Every [`ChromeSession`] lives in
//! its own browser context (`Target.createBrowserContext`), so cookies from
//! one scenario's IdP login never leak into the next. Closing a session
//! disposes its context.

use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::BrowserOptions;
use crate::error::{FlowError, Result};
use crate::locator::{NameMatch, Strategy};
use crate::session::{Session, SessionFactory};

const TARGET_ATTR: &str = "data-sso-harness-target";
const SEEN_KEY: &str = "__sso_harness_seen";

static TARGET_SEQ: AtomicU64 = AtomicU64::new(0);

/// Find Chrome for Testing installed by Puppeteer
pub fn find_chrome_for_testing() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let puppeteer_cache = std::path::Path::new(&home).join(".cache/puppeteer/chrome");

    let entries = std::fs::read_dir(&puppeteer_cache).ok()?;
    let mut versions: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    versions.sort_by_key(|v| std::cmp::Reverse(v.path()));

    for version_dir in versions {
        for candidate in [
            "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-linux64/chrome",
        ] {
            let path = version_dir.path().join(candidate);
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Owns the browser process and hands out isolated sessions
pub struct BrowserHarness {
    browser: Arc<Browser>,
    handle: tokio::task::JoinHandle<()>,
    profile_dir: PathBuf,
}

impl BrowserHarness {
    /// Launch Chrome according to `options`
    pub async fn launch(options: &BrowserOptions) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder();

        if !options.headless {
            builder = builder.with_head();
        }
        if options.ignore_certificate_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        if let Some(path) = options.executable.clone().or_else(find_chrome_for_testing) {
            debug!("Using Chrome executable: {}", path.display());
            builder = builder.chrome_executable(path);
        }

        // Unique profile directory so concurrent runs never share a lock
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let user_data_dir = std::env::temp_dir().join(format!(
            "sso-harness-{}-{}",
            std::process::id(),
            stamp
        ));
        builder = builder.user_data_dir(&user_data_dir);

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        info!("Launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        // Spawn handler to process browser events
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        info!("Browser launched successfully");
        Ok(Self {
            browser: Arc::new(browser),
            handle,
            profile_dir: user_data_dir,
        })
    }

    /// Temporary profile directory of this browser; removed by [`BrowserHarness::close`]
    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Shut the browser down and remove its profile directory
    pub async fn close(mut self) -> anyhow::Result<()> {
        info!("Closing browser");
        let closed = match Arc::get_mut(&mut self.browser) {
            Some(browser) => {
                let closed = browser.close().await.context("Failed to close browser");
                if closed.is_ok() {
                    if let Err(e) = browser.wait().await {
                        debug!("Browser process did not report exit: {}", e);
                    }
                }
                closed.map(|_| ())
            }
            None => {
                warn!("Sessions still open at shutdown; leaving browser to be dropped");
                Ok(())
            }
        };
        self.handle.abort();
        remove_profile_dir(&self.profile_dir);
        closed
    }

    async fn new_page_in(&self, context_id: &BrowserContextId) -> Result<Page> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(FlowError::browser)?;
        Ok(self.browser.new_page(target).await?)
    }
}

fn remove_profile_dir(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!("Removed profile directory {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove profile directory {}: {}", dir.display(), e),
    }
}

/// Run `dispose` when `result` failed, keeping the original error
async fn dispose_on_error<T, D>(result: Result<T>, dispose: D) -> Result<T>
where
    D: Future<Output = Result<()>>,
{
    if result.is_err() {
        if let Err(e) = dispose.await {
            warn!("Failed to dispose browser context: {}", e);
        }
    }
    result
}

#[async_trait]
impl SessionFactory for BrowserHarness {
    type Session = ChromeSession;

    #[instrument(skip(self))]
    async fn open(&self) -> Result<ChromeSession> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;

        let page = dispose_on_error(self.new_page_in(&context_id).await, async {
            self.browser
                .execute(DisposeBrowserContextParams::new(context_id.clone()))
                .await?;
            Ok::<(), FlowError>(())
        })
        .await?;

        debug!("Opened session in context {:?}", context_id);
        Ok(ChromeSession {
            page,
            context_id,
            browser: Arc::clone(&self.browser),
        })
    }
}

/// A tab inside its own browser context
pub struct ChromeSession {
    page: Page,
    context_id: BrowserContextId,
    browser: Arc<Browser>,
}

impl ChromeSession {
    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn evaluate_bool(&self, script: String) -> Result<bool> {
        match self.page.evaluate(script).await {
            Ok(result) => Ok(result.into_value::<bool>().unwrap_or(false)),
            // The document was replaced mid-evaluation; nothing is on screen yet.
            Err(e) if is_context_lost(&e.to_string()) => {
                debug!("Evaluation raced a navigation: {}", e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tag the resolved element so the CDP element API can address it
    async fn mark(&self, strategy: &Strategy, prepare: &str) -> Result<String> {
        let token = TARGET_SEQ.fetch_add(1, Ordering::Relaxed).to_string();
        let body = format!(
            "if (!el) return false; el.setAttribute('{TARGET_ATTR}', '{token}'); {prepare} return true;"
        );
        if !self.evaluate_bool(strategy.script(&body)).await? {
            return Err(FlowError::browser(format!(
                "{} no longer resolves to a visible element",
                strategy
            )));
        }
        Ok(format!("[{TARGET_ATTR}=\"{token}\"]"))
    }
}

fn is_context_lost(message: &str) -> bool {
    message.contains("Execution context was destroyed")
        || message.contains("Cannot find context with specified id")
        || message.contains("Inspected target navigated or closed")
}

#[async_trait]
impl Session for ChromeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!("Navigating to: {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn wait_for_network_idle(&self, quiet: Duration) -> Result<()> {
        // Idle: document complete and no new resource entries for `quiet`.
        const PROBE: &str = "document.readyState === 'complete' \
            ? performance.getEntriesByType('resource').length : -1";
        let mut last: Option<i64> = None;
        let mut stable_since = Instant::now();
        loop {
            let count = match self.page.evaluate(PROBE).await {
                Ok(v) => v.into_value::<i64>().unwrap_or(-1),
                Err(e) if is_context_lost(&e.to_string()) => -1,
                Err(e) => return Err(e.into()),
            };
            if count < 0 || last != Some(count) {
                last = Some(count);
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= quiet {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn is_visible(&self, strategy: &Strategy) -> Result<bool> {
        self.evaluate_bool(strategy.script("return el !== null;"))
            .await
    }

    async fn click(&self, strategy: &Strategy, force: bool) -> Result<()> {
        if force {
            let clicked = self
                .evaluate_bool(strategy.script("if (!el) return false; el.click(); return true;"))
                .await?;
            if !clicked {
                return Err(FlowError::browser(format!(
                    "{} vanished before a forced click",
                    strategy
                )));
            }
            return Ok(());
        }
        let selector = self.mark(strategy, "").await?;
        self.page.find_element(selector).await?.click().await?;
        Ok(())
    }

    async fn fill(&self, strategy: &Strategy, value: &str) -> Result<()> {
        let selector = self
            .mark(
                strategy,
                "el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true }));",
            )
            .await?;
        self.page
            .find_element(selector)
            .await?
            .click()
            .await?
            .type_str(value)
            .await?;
        Ok(())
    }

    async fn watch_text(&self, text: &NameMatch) -> Result<()> {
        let body = format!(
            "const seen = () => {{ if (resolve(spec, document)) {{ window.{SEEN_KEY} = true; \
             try {{ sessionStorage.setItem('{SEEN_KEY}', '1'); }} catch (e) {{}} }} }};\n\
             seen();\n\
             new MutationObserver(seen).observe(document, {{ childList: true, subtree: true, characterData: true }});\n\
             return true;"
        );
        let script = Strategy::text(text.clone()).script(&body);
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script.clone()))
            .await?;
        self.evaluate_bool(script).await?;
        Ok(())
    }

    async fn watched_text_seen(&self) -> Result<bool> {
        self.evaluate_bool(format!(
            "(() => {{ try {{ if (sessionStorage.getItem('{SEEN_KEY}') === '1') return true; }} catch (e) {{}} \
             return window.{SEEN_KEY} === true; }})()"
        ))
        .await
    }

    async fn close(&self) -> Result<()> {
        let closed = self.page.clone().close().await;
        let disposed = self
            .browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await;
        closed?;
        disposed?;
        Ok(())
    }
}
