//! Content retrieval for context sources.
//!
//! Files are read as text. URLs go through the lightweight HTTP strategy or
//! the full-render browser strategy, and both end in the same plain-text
//! sanitization. Every failure is attributed to the source that caused it.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use heyi_shared::{ContextSource, HeyiError, Result, RetrievedContent};

use crate::render::{self, ChromiumLauncher, DEFAULT_IDLE_TIMEOUT};
use crate::sanitize::html_to_text;
use crate::strategy::CrawlerStrategy;

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("heyi/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Whole-request timeout for the lightweight strategy.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Retriever
// ---------------------------------------------------------------------------

/// Reads files and URLs into [`RetrievedContent`].
pub struct Retriever {
    client: Client,
    strategy: CrawlerStrategy,
}

impl Retriever {
    /// Create a retriever using `strategy` for URL sources.
    pub fn new(strategy: CrawlerStrategy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| HeyiError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, strategy })
    }

    /// Retrieve any context source.
    pub async fn retrieve(&self, source: &ContextSource) -> Result<RetrievedContent> {
        match source {
            ContextSource::File(path) => self.read_file(path).await,
            ContextSource::Url(url) => self.fetch_url(url).await,
        }
    }

    /// Read a local file as text. Invalid UTF-8 sequences become U+FFFD.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn read_file(&self, path: &Path) -> Result<RetrievedContent> {
        let label = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| HeyiError::retrieval(&label, e))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        debug!(bytes = bytes.len(), "file read");
        Ok(RetrievedContent { label, text })
    }

    /// Fetch a URL with the configured strategy and reduce it to plain text.
    #[instrument(skip(self), fields(strategy = self.strategy.name()))]
    pub async fn fetch_url(&self, raw_url: &str) -> Result<RetrievedContent> {
        let url = parse_http_url(raw_url)?;

        let html = match &self.strategy {
            CrawlerStrategy::Fetch => fetch_html(&self.client, &url).await?,
            CrawlerStrategy::Browser { executable } => {
                let launcher = ChromiumLauncher::new(executable.clone(), DEFAULT_IDLE_TIMEOUT);
                render::render_page(&launcher, &url, DEFAULT_IDLE_TIMEOUT).await?
            }
        };

        let text = html_to_text(&html);
        info!(url = raw_url, chars = text.len(), "url retrieved");

        Ok(RetrievedContent {
            label: raw_url.to_string(),
            text,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a URL and refuse anything that is not http(s).
fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| HeyiError::retrieval(raw, format!("invalid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(HeyiError::UnsupportedScheme {
            scheme: scheme.to_string(),
            url: raw.to_string(),
        }),
    }
}

/// GET a page and return its body, failing on any non-success status.
async fn fetch_html(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| HeyiError::retrieval(url.as_str(), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HeyiError::retrieval(url.as_str(), format!("HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| HeyiError::retrieval(url.as_str(), format!("body read failed: {e}")))
}
