//! Full-render retrieval through a headless browser.
//!
//! A browser session is launched per URL, navigated, given a bounded window to
//! let network activity settle, and then asked for its rendered DOM. Running
//! out of that window is not an error: whatever has loaded is used. The
//! session is always closed, whatever the outcome of the render.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use url::Url;

use heyi_shared::{HeyiError, Result};

/// How long to wait for the network to go quiet after navigation.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay between network-activity probes.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Consecutive unchanged probes that count as "idle" (~500ms of quiet).
const IDLE_QUIET_POLLS: u32 = 2;

/// Returns `[readyState, number of resource entries]`.
const IDLE_PROBE: &str = "[document.readyState, performance.getEntriesByType('resource').length]";

/// Failures inside a browser session, before attribution to a URL.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("network idle probe failed: {0}")]
    Idle(String),
    #[error("could not read rendered page: {0}")]
    Content(String),
    #[error("browser shutdown failed: {0}")]
    Shutdown(String),
}

type RenderResult<T> = std::result::Result<T, RenderError>;

// ---------------------------------------------------------------------------
// Session traits
// ---------------------------------------------------------------------------

/// Starts browser sessions.
#[allow(async_fn_in_trait)]
pub trait BrowserLauncher {
    type Session: RenderSession;

    /// Start a fresh, isolated browser.
    async fn launch(&self) -> RenderResult<Self::Session>;
}

/// One running browser with one page.
#[allow(async_fn_in_trait)]
pub trait RenderSession {
    /// Open `url`. A load that is merely slow is not an error.
    async fn navigate(&mut self, url: &Url) -> RenderResult<()>;

    /// Resolve once network activity has settled. May never resolve;
    /// callers bound it with a timeout.
    async fn wait_for_idle(&mut self) -> RenderResult<()>;

    /// The current serialized DOM.
    async fn content(&mut self) -> RenderResult<String>;

    /// Tear the browser down.
    async fn close(self) -> RenderResult<()>;
}

/// Render `url` in a fresh session and return the resulting markup.
#[instrument(skip_all, fields(url = %url))]
pub async fn render_page<L: BrowserLauncher>(
    launcher: &L,
    url: &Url,
    idle_timeout: Duration,
) -> Result<String> {
    let mut session = launcher
        .launch()
        .await
        .map_err(|e| HeyiError::retrieval(url.as_str(), e))?;

    let outcome = drive(&mut session, url, idle_timeout).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "browser did not shut down cleanly");
    }

    outcome.map_err(|e| HeyiError::retrieval(url.as_str(), e))
}

async fn drive<S: RenderSession>(
    session: &mut S,
    url: &Url,
    idle_timeout: Duration,
) -> RenderResult<String> {
    session.navigate(url).await?;

    match tokio::time::timeout(idle_timeout, session.wait_for_idle()).await {
        Ok(Ok(())) => debug!("network idle"),
        Ok(Err(e)) => warn!(error = %e, "idle wait failed, using current page state"),
        Err(_) => warn!(
            timeout_ms = idle_timeout.as_millis() as u64,
            "network did not settle in time, using partially loaded page"
        ),
    }

    session.content().await
}

// ---------------------------------------------------------------------------
// Chromium
// ---------------------------------------------------------------------------

/// Launches headless Chromium with a throwaway profile.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    load_timeout: Duration,
}

impl ChromiumLauncher {
    /// `executable` overrides browser detection; `load_timeout` bounds each
    /// devtools request, navigation included.
    pub fn new(executable: Option<PathBuf>, load_timeout: Duration) -> Self {
        Self {
            executable,
            load_timeout,
        }
    }
}

impl BrowserLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self) -> RenderResult<ChromiumSession> {
        let profile = tempfile::Builder::new()
            .prefix("heyi-browser-")
            .tempdir()
            .map_err(|e| RenderError::Launch(format!("failed to create profile dir: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .request_timeout(self.load_timeout);
        if let Some(exe) = &self.executable {
            builder = builder.chrome_executable(exe);
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        debug!(executable = ?self.executable, "launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event loop stopped");
                    break;
                }
            }
        });

        Ok(ChromiumSession {
            browser,
            page: None,
            handler,
            _profile: profile,
        })
    }
}

/// A live Chromium process. Dropping it without [`RenderSession::close`]
/// still kills the process.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    _profile: tempfile::TempDir,
}

impl ChromiumSession {
    fn page(&self) -> RenderResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Content("no page has been opened".into()))
    }
}

impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url) -> RenderResult<()> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let loaded = page.goto(url.as_str()).await.map(|_| ());
        self.page = Some(page);

        match loaded {
            Ok(()) => Ok(()),
            Err(CdpError::Timeout) => {
                debug!(%url, "page load timed out, continuing with partial page");
                Ok(())
            }
            Err(e) => Err(RenderError::Navigation(e.to_string())),
        }
    }

    async fn wait_for_idle(&mut self) -> RenderResult<()> {
        let page = self.page()?;
        let mut last_count: Option<u64> = None;
        let mut quiet = 0;

        loop {
            let (state, count): (String, u64) = page
                .evaluate(IDLE_PROBE)
                .await
                .map_err(|e| RenderError::Idle(e.to_string()))?
                .into_value()
                .map_err(|e| RenderError::Idle(e.to_string()))?;

            if state == "complete" && last_count == Some(count) {
                quiet += 1;
                if quiet >= IDLE_QUIET_POLLS {
                    return Ok(());
                }
            } else {
                quiet = 0;
            }
            last_count = Some(count);

            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> RenderResult<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| RenderError::Content(e.to_string()))
    }

    async fn close(mut self) -> RenderResult<()> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "waiting for browser exit failed");
        }
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| RenderError::Shutdown(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    const PAGE: &str = "<html><body><p>Rendered so far</p></body></html>";

    #[derive(Clone, Copy)]
    enum Idle {
        Settles,
        Hangs,
    }

    struct FakeLauncher {
        fail_launch: bool,
        fail_navigation: bool,
        idle: Idle,
        closed: Arc<AtomicBool>,
    }

    impl FakeLauncher {
        fn new(idle: Idle) -> Self {
            Self {
                fail_launch: false,
                fail_navigation: false,
                idle,
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    struct FakeSession {
        fail_navigation: bool,
        idle: Idle,
        closed: Arc<AtomicBool>,
    }

    impl BrowserLauncher for FakeLauncher {
        type Session = FakeSession;

        async fn launch(&self) -> RenderResult<FakeSession> {
            if self.fail_launch {
                return Err(RenderError::Launch("no such file: /nope/chrome".into()));
            }
            Ok(FakeSession {
                fail_navigation: self.fail_navigation,
                idle: self.idle,
                closed: self.closed.clone(),
            })
        }
    }

    impl RenderSession for FakeSession {
        async fn navigate(&mut self, _url: &Url) -> RenderResult<()> {
            if self.fail_navigation {
                return Err(RenderError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()));
            }
            Ok(())
        }

        async fn wait_for_idle(&mut self) -> RenderResult<()> {
            match self.idle {
                Idle::Settles => Ok(()),
                Idle::Hangs => std::future::pending().await,
            }
        }

        async fn content(&mut self) -> RenderResult<String> {
            Ok(PAGE.to_string())
        }

        async fn close(self) -> RenderResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn url() -> Url {
        Url::parse("https://app.example.com/dashboard").unwrap()
    }

    #[tokio::test]
    async fn settled_page_is_returned() {
        let launcher = FakeLauncher::new(Idle::Settles);
        let html = render_page(&launcher, &url(), DEFAULT_IDLE_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(html, PAGE);
        assert!(launcher.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn idle_timeout_degrades_to_partial_content() {
        let launcher = FakeLauncher::new(Idle::Hangs);
        let html = render_page(&launcher, &url(), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(!html.is_empty());
        assert!(html.contains("Rendered so far"));
        assert!(launcher.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn navigation_failure_is_fatal_and_still_closes() {
        let mut launcher = FakeLauncher::new(Idle::Settles);
        launcher.fail_navigation = true;

        let err = render_page(&launcher, &url(), DEFAULT_IDLE_TIMEOUT)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("https://app.example.com/dashboard"));
        assert!(msg.contains("ERR_NAME_NOT_RESOLVED"));
        assert!(launcher.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn launch_failure_names_the_url() {
        let mut launcher = FakeLauncher::new(Idle::Settles);
        launcher.fail_launch = true;

        let err = render_page(&launcher, &url(), DEFAULT_IDLE_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, HeyiError::Retrieval { ref label, .. } if label == "https://app.example.com/dashboard"));
        assert!(err.to_string().contains("failed to launch browser"));
    }
}
