use serde::{Deserialize, Serialize};
use url::Url;

/// One matched image element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub alt: String,
    pub width: Option<String>,
    pub height: Option<String>,
}

/// One matched link element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub text: String,
}

/// Resolve a root-relative URL (`/path`, `//host/path`) against `base_url`.
///
/// Anything else, or any URL when the base is empty or unparseable, is
/// returned unchanged.
pub fn resolve_url(raw: &str, base_url: &str) -> String {
    if base_url.is_empty() || !raw.starts_with('/') {
        return raw.to_string();
    }

    match Url::parse(base_url).and_then(|base| base.join(raw)) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => raw.to_string(),
    }
}
