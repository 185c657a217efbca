//! pagescrape - fetch a page and read data out of it with CSS selectors
//!
//! This library provides:
//! - A single-shot HTTP fetcher with timeout, headers, basic auth and cookies
//! - Selector-based extraction of text, images, links and mapped fields
//! - A reusable [`Scraper`] holding default fetch options
//! - Configuration and logging setup for front ends

pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod scraper;

// Re-export main types for convenience
pub use crate::config::AppConfig;
pub use crate::error::{ExtractError, FetchError, ScrapeError, ScrapeResult};
pub use crate::extract::{
    extract_images, extract_links, extract_structured_data, extract_text, extract_text_list,
    extract_text_map, parse_mapping, Document, ExtractionMapping, ExtractionResult, FieldSpec,
    FieldValue, ImageRecord, LinkRecord,
};
pub use crate::scraper::{fetch, BasicAuth, FetchOptions, FetchedPage, HttpClient, Scraper};
