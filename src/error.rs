use thiserror::Error;

/// Errors raised while fetching a page
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed: {url} - {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header: {name}")]
    InvalidHeader { name: String },

    #[error("Invalid fetch options: {message}")]
    InvalidOptions { message: String },

    #[error("Request cancelled: {url}")]
    Cancelled { url: String },

    #[error("Failed to initialize HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),
}

impl FetchError {
    /// HTTP status code, when the server answered with a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a reqwest failure onto the timeout/network split
    pub(crate) fn from_reqwest(url: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { url: url.to_string(), timeout_ms }
        } else {
            Self::Network { url: url.to_string(), source: err }
        }
    }
}

/// Errors raised while querying a parsed document
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("HTML parsing error: {message}")]
    Parse { message: String },

    #[error("Failed to parse selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Extraction configuration error: {message}")]
    Config { message: String },
}

impl ExtractError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }
}

/// Top-level error type for pagescrape
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Check if the caller may reasonably try the same operation again.
    /// Nothing in this crate retries on its own.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Timeout { .. })
            | Self::Fetch(FetchError::Network { .. }) => true,
            Self::Fetch(FetchError::HttpStatus { status, .. }) => {
                *status == 429 || (500..600).contains(status)
            }
            Self::Fetch(_) | Self::Extract(_) | Self::Configuration { .. } | Self::Io(_) => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::Timeout { .. }) => "timeout",
            Self::Fetch(FetchError::Network { .. }) => "network",
            Self::Fetch(FetchError::HttpStatus { .. }) => "http_status",
            Self::Fetch(FetchError::Cancelled { .. }) => "cancelled",
            Self::Fetch(_) => "request",
            Self::Extract(ExtractError::Parse { .. }) => "parse",
            Self::Extract(_) => "extraction_config",
            Self::Configuration { .. } => "configuration",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias for pagescrape
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ScrapeError::config("timeout must be > 0");
        assert_eq!(error.category(), "configuration");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_recoverable_errors() {
        let timeout: ScrapeError = FetchError::Timeout {
            url: "https://example.com".to_string(),
            timeout_ms: 500,
        }
        .into();
        assert!(timeout.is_recoverable());
        assert_eq!(timeout.category(), "timeout");

        let not_found: ScrapeError = FetchError::HttpStatus {
            url: "https://example.com".to_string(),
            status: 404,
        }
        .into();
        assert!(!not_found.is_recoverable());

        let unavailable: ScrapeError = FetchError::HttpStatus {
            url: "https://example.com".to_string(),
            status: 503,
        }
        .into();
        assert!(unavailable.is_recoverable());
    }

    #[test]
    fn test_extract_error_categories() {
        let parse: ScrapeError = ExtractError::parse("invalid utf-8").into();
        assert_eq!(parse.category(), "parse");

        let missing_attr: ScrapeError = ExtractError::config("attr mode needs attrName").into();
        assert_eq!(missing_attr.category(), "extraction_config");
        assert!(missing_attr.to_string().contains("attrName"));
    }

    #[test]
    fn test_status_accessor() {
        let err = FetchError::HttpStatus { url: "https://h.example".to_string(), status: 404 };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));

        let err = FetchError::Cancelled { url: "https://h.example".to_string() };
        assert_eq!(err.status(), None);
    }
}
