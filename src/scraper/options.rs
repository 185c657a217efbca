use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FetchError;

/// Desktop Chrome, sent unless the caller supplies its own `User-Agent`
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Credentials for HTTP basic authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

/// Per-request fetch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Hard deadline covering connect, response headers and body
    pub timeout_ms: u64,
    /// Extra request headers keyed by lowercase name; a `user-agent` here
    /// replaces the default
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    /// Sent verbatim as the `Cookie` header
    #[serde(default)]
    pub cookie_header: Option<String>,
    #[serde(default)]
    pub accept_language: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headers: HashMap::new(),
            basic_auth: None,
            cookie_header: None,
            accept_language: None,
        }
    }
}

impl FetchOptions {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        merge_headers(&mut self.headers, [(name.into(), value.into())]);
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn with_cookie_header(mut self, cookie_header: impl Into<String>) -> Self {
        self.cookie_header = Some(cookie_header.into());
        self
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        if self.timeout_ms == 0 {
            return Err(FetchError::InvalidOptions {
                message: "timeout_ms must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Merge `source` into `target` with names lowercased.
///
/// Header names are case-insensitive, so `X-Token` and `x-token` share one
/// entry and the later one wins. Within `source`, names that collide after
/// lowercasing are applied in sorted order so the outcome does not depend on
/// map iteration order.
pub fn merge_headers(
    target: &mut HashMap<String, String>,
    source: impl IntoIterator<Item = (String, String)>,
) {
    let mut entries: Vec<(String, String)> = source.into_iter().collect();
    entries.sort();

    for (name, value) in entries {
        target.insert(name.to_ascii_lowercase(), value);
    }
}
