//! Reusable scraper instance: fetch defaults plus fetch-then-extract helpers

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod http_client;
pub mod options;

pub use http_client::{fetch, FetchedPage, HttpClient};
pub use options::{merge_headers, BasicAuth, FetchOptions, DEFAULT_USER_AGENT};

use crate::config::ScrapingConfig;
use crate::error::{FetchError, ScrapeResult};
use crate::extract::{Document, ExtractionMapping, ExtractionResult, ImageRecord, LinkRecord};

/// Main scraping handle.
///
/// Owns the default [`FetchOptions`] used by [`Scraper::fetch_html`]. The
/// mutators only affect later calls; a fetch already in flight keeps the
/// options it started with.
#[derive(Clone)]
pub struct Scraper {
    http_client: HttpClient,
    defaults: FetchOptions,
}

impl Scraper {
    /// Create a scraper with default fetch options
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(FetchOptions::default())
    }

    pub fn with_options(defaults: FetchOptions) -> Result<Self, FetchError> {
        defaults.validate()?;
        Ok(Self {
            http_client: HttpClient::new()?,
            defaults,
        })
    }

    /// Create a scraper from the `[scraping]` section of the app config
    pub fn from_config(config: &ScrapingConfig) -> ScrapeResult<Self> {
        info!("Initializing scraper (timeout {}ms)", config.request_timeout_ms);
        Ok(Self::with_options(config.fetch_options())?)
    }

    pub fn options(&self) -> &FetchOptions {
        &self.defaults
    }

    /// Use basic auth on subsequent fetches
    pub fn set_auth(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.defaults.basic_auth = Some(BasicAuth::new(username, password));
    }

    pub fn clear_auth(&mut self) {
        self.defaults.basic_auth = None;
    }

    /// Send `cookie_header` verbatim as `Cookie` on subsequent fetches
    pub fn set_cookies(&mut self, cookie_header: impl Into<String>) {
        self.defaults.cookie_header = Some(cookie_header.into());
    }

    pub fn clear_cookies(&mut self) {
        self.defaults.cookie_header = None;
    }

    /// Merge `headers` into the default headers; entries with the same name,
    /// compared case-insensitively, are replaced
    pub fn set_headers(&mut self, headers: HashMap<String, String>) {
        merge_headers(&mut self.defaults.headers, headers);
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: u64) -> Result<(), FetchError> {
        let options = self.defaults.clone().with_timeout_ms(timeout_ms);
        options.validate()?;
        self.defaults = options;
        Ok(())
    }

    /// Fetch `url` with the default options
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.http_client.fetch(url, &self.defaults).await
    }

    /// Fetch `url` with explicit options, ignoring the defaults
    pub async fn fetch_html_with(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        self.http_client.fetch(url, options).await
    }

    /// Fetch `url` with the default options, keeping the final URL
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.http_client.fetch_page(url, &self.defaults).await
    }

    pub async fn fetch_html_cancellable(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        self.http_client.fetch_cancellable(url, &self.defaults, cancel).await
    }

    /// Fetch `url` and read the combined text of `selector`
    pub async fn scrape_text(&self, url: &str, selector: &str) -> ScrapeResult<String> {
        let html = self.fetch_html(url).await?;
        Ok(Document::parse(&html).text(selector)?)
    }

    /// Fetch `url` and read images, resolving root-relative sources against
    /// the final URL after redirects
    pub async fn scrape_images(&self, url: &str, selector: &str) -> ScrapeResult<Vec<ImageRecord>> {
        let page = self.fetch_page(url).await?;
        Ok(Document::parse(&page.html).images(selector, &page.url)?)
    }

    /// Fetch `url` and read links, resolving root-relative hrefs against the
    /// final URL after redirects
    pub async fn scrape_links(&self, url: &str, selector: &str) -> ScrapeResult<Vec<LinkRecord>> {
        let page = self.fetch_page(url).await?;
        Ok(Document::parse(&page.html).links(selector, &page.url)?)
    }

    /// Fetch `url` and evaluate `mapping` against it
    pub async fn scrape_structured(
        &self,
        url: &str,
        mapping: &ExtractionMapping,
    ) -> ScrapeResult<ExtractionResult> {
        let html = self.fetch_html(url).await?;
        let result = Document::parse(&html).structured_data(mapping)?;
        debug!("Extracted {} fields from {}", result.len(), url);
        Ok(result)
    }
}
