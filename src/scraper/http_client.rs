use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, COOKIE, USER_AGENT,
};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::options::{FetchOptions, DEFAULT_ACCEPT, DEFAULT_USER_AGENT};
use crate::error::FetchError;

/// A fetched body and the URL it was finally served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub html: String,
}

/// HTTP client wrapper issuing single-shot GET requests.
///
/// Cloning is cheap and clones share one connection pool. No retries are
/// attempted; redirects follow the reqwest default policy.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create new HTTP client with pooled connections
    pub fn new() -> Result<Self, FetchError> {
        // No connect timeout here; the per-request deadline covers connect too.
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .map_err(FetchError::ClientInit)?;

        debug!("HTTP client initialized");
        Ok(Self { client })
    }

    /// GET `url` and return the body as text.
    ///
    /// Non-2xx responses fail with [`FetchError::HttpStatus`]; exceeding
    /// `options.timeout_ms` fails with [`FetchError::Timeout`].
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        self.fetch_page(url, options).await.map(|page| page.html)
    }

    /// [`HttpClient::fetch`], also reporting the URL the body came from after
    /// redirects
    pub async fn fetch_page(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage, FetchError> {
        options.validate()?;
        let target = parse_target(url)?;
        let headers = build_headers(options)?;

        let start_time = Instant::now();
        debug!(url = %target, timeout_ms = options.timeout_ms, "HTTP GET");

        let mut request = self
            .client
            .get(target)
            .timeout(Duration::from_millis(options.timeout_ms))
            .headers(headers);

        if let Some(auth) = &options.basic_auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = FetchError::from_reqwest(url, options.timeout_ms, e);
                warn!("HTTP GET failed for {}: {}", url, err);
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP GET for {} returned status {}", url, status);
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            let err = FetchError::from_reqwest(url, options.timeout_ms, e);
            warn!("Failed to read body from {}: {}", url, err);
            err
        })?;

        info!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            final_url = %final_url,
            "Fetched page"
        );

        Ok(FetchedPage { url: final_url, html: body })
    }

    /// [`HttpClient::fetch`], abandoned with [`FetchError::Cancelled`] as soon
    /// as `cancel` fires
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Fetch of {} cancelled", url);
                Err(FetchError::Cancelled { url: url.to_string() })
            }
            result = self.fetch(url, options) => result,
        }
    }
}

/// One-off GET with a fresh client
pub async fn fetch(url: &str, options: &FetchOptions) -> Result<String, FetchError> {
    HttpClient::new()?.fetch(url, options).await
}

fn parse_target(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Defaults first, then caller headers, then the cookie slot
fn build_headers(options: &FetchOptions) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

    if let Some(language) = &options.accept_language {
        headers.insert(ACCEPT_LANGUAGE, header_value("Accept-Language", language)?);
    }

    let mut custom: Vec<(&String, &String)> = options.headers.iter().collect();
    custom.sort();

    for (name, value) in custom {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeader { name: name.clone() })?;
        headers.insert(header_name, header_value(name, value)?);
    }

    if let Some(cookie) = &options.cookie_header {
        headers.insert(COOKIE, header_value("Cookie", cookie)?);
    }

    // basic_auth owns the Authorization slot when set
    if options.basic_auth.is_some() {
        headers.remove(AUTHORIZATION);
    }

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader { name: name.to_string() })
}
