//! Field mappings for structured extraction
//!
//! A mapping binds field names to a selector plus an extraction mode. Mappings
//! are usually declared in JSON, where a field is either a bare selector
//! string (text mode) or an object:
//!
//! ```json
//! {
//!   "title": "h1",
//!   "tags": { "selector": ".tag", "mode": "list" },
//!   "cover": { "selector": "img.cover", "mode": "attr", "attrName": "src" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ExtractError;

/// How a single field is read out of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeclaredField", into = "DeclaredField")]
pub enum FieldSpec {
    /// Trimmed text of every matched element, concatenated
    Text(String),
    /// Inner markup of the first match
    Html(String),
    /// Attribute value of the first match
    Attr { selector: String, name: String },
    /// Trimmed text of each match
    List(String),
}

impl FieldSpec {
    pub fn text(selector: impl Into<String>) -> Self {
        Self::Text(selector.into())
    }

    pub fn html(selector: impl Into<String>) -> Self {
        Self::Html(selector.into())
    }

    pub fn attr(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Attr { selector: selector.into(), name: name.into() }
    }

    pub fn list(selector: impl Into<String>) -> Self {
        Self::List(selector.into())
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::Text(selector) | Self::Html(selector) | Self::List(selector) => selector,
            Self::Attr { selector, .. } => selector,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Html(_) => "html",
            Self::Attr { .. } => "attr",
            Self::List(_) => "list",
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(selector: &str) -> Self {
        Self::Text(selector.to_string())
    }
}

/// On-the-wire shape of a field declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DeclaredField {
    Selector(String),
    Detailed {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
        #[serde(
            default,
            rename = "attrName",
            alias = "attr_name",
            skip_serializing_if = "Option::is_none"
        )]
        attr_name: Option<String>,
    },
}

impl TryFrom<DeclaredField> for FieldSpec {
    type Error = ExtractError;

    fn try_from(declared: DeclaredField) -> Result<Self, Self::Error> {
        let (selector, mode, attr_name) = match declared {
            DeclaredField::Selector(selector) => return Ok(Self::Text(selector)),
            DeclaredField::Detailed { selector, mode, attr_name } => (selector, mode, attr_name),
        };

        // A declaration without a mode reads text.
        match mode.as_deref().unwrap_or("text") {
            "text" => Ok(Self::Text(selector)),
            "html" => Ok(Self::Html(selector)),
            "list" => Ok(Self::List(selector)),
            "attr" => match attr_name {
                Some(name) if !name.is_empty() => Ok(Self::Attr { selector, name }),
                _ => Err(ExtractError::config(format!(
                    "attr mode requires attrName (selector '{}')",
                    selector
                ))),
            },
            other => Err(ExtractError::config(format!(
                "unknown extraction mode '{}' (selector '{}'); expected text, html, attr or list",
                other, selector
            ))),
        }
    }
}

impl From<FieldSpec> for DeclaredField {
    fn from(spec: FieldSpec) -> Self {
        match spec {
            FieldSpec::Text(selector) => Self::Selector(selector),
            FieldSpec::Html(selector) => Self::Detailed {
                selector,
                mode: Some("html".to_string()),
                attr_name: None,
            },
            FieldSpec::List(selector) => Self::Detailed {
                selector,
                mode: Some("list".to_string()),
                attr_name: None,
            },
            FieldSpec::Attr { selector, name } => Self::Detailed {
                selector,
                mode: Some("attr".to_string()),
                attr_name: Some(name),
            },
        }
    }
}

/// Field name to field spec
pub type ExtractionMapping = BTreeMap<String, FieldSpec>;

/// Field name to extracted value; always has the same keys as its mapping
pub type ExtractionResult = BTreeMap<String, FieldValue>;

/// Value produced for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    /// Attribute not present on the first match, or nothing matched
    Missing,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Parse a JSON object of field declarations
pub fn parse_mapping(json: &str) -> Result<ExtractionMapping, ExtractError> {
    serde_json::from_str(json)
        .map_err(|e| ExtractError::config(format!("invalid extraction mapping: {}", e)))
}
