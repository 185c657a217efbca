//! Selector-based extraction over fetched HTML
//!
//! Everything here is synchronous and side-effect free: a [`Document`] is
//! parsed once and can answer any number of queries without changing. The
//! free functions parse the markup on every call and are convenient for
//! single queries.
//!
//! A selector that matches nothing is not an error. Text queries return an
//! empty string, list queries an empty vector.

use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

pub mod mapping;
pub mod records;

pub use mapping::{parse_mapping, ExtractionMapping, ExtractionResult, FieldSpec, FieldValue};
pub use records::{resolve_url, ImageRecord, LinkRecord};

use crate::error::ExtractError;

/// Default selector for [`Document::images`]
pub const DEFAULT_IMAGE_SELECTOR: &str = "img";

/// Default selector for [`Document::links`]
pub const DEFAULT_LINK_SELECTOR: &str = "a";

/// A parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse markup into a queryable tree. Broken markup yields a best-effort
    /// tree, never an error.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parse raw bytes, which must be UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractError> {
        let html = std::str::from_utf8(bytes)
            .map_err(|e| ExtractError::parse(format!("document is not valid UTF-8: {}", e)))?;
        Ok(Self::parse(html))
    }

    /// Trimmed combined text of every element matching `selector`
    pub fn text(&self, selector: &str) -> Result<String, ExtractError> {
        let selector = compile_selector(selector)?;
        Ok(self.combined_text(&selector))
    }

    /// Trimmed text of each element matching `selector`, in document order
    pub fn text_list(&self, selector: &str) -> Result<Vec<String>, ExtractError> {
        let selector = compile_selector(selector)?;
        Ok(self.html.select(&selector).map(|el| element_text(&el)).collect())
    }

    /// [`Document::text`] for each named selector
    pub fn text_map(
        &self,
        selectors: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, ExtractError> {
        selectors
            .iter()
            .map(|(name, selector)| Ok((name.clone(), self.text(selector)?)))
            .collect()
    }

    /// Image records for elements matching `selector`.
    ///
    /// Reads `src`, falling back to `data-src`; elements with neither are
    /// skipped.
    pub fn images(&self, selector: &str, base_url: &str) -> Result<Vec<ImageRecord>, ExtractError> {
        let compiled = compile_selector(selector)?;

        let images: Vec<ImageRecord> = self
            .html
            .select(&compiled)
            .filter_map(|el| {
                let element = el.value();
                let src = element.attr("src").or_else(|| element.attr("data-src"))?;
                Some(ImageRecord {
                    url: resolve_url(src, base_url),
                    alt: element.attr("alt").unwrap_or_default().to_string(),
                    width: element.attr("width").map(String::from),
                    height: element.attr("height").map(String::from),
                })
            })
            .collect();

        debug!("Extracted {} images with selector '{}'", images.len(), selector);
        Ok(images)
    }

    /// Link records for elements matching `selector`; elements without
    /// `href` are skipped
    pub fn links(&self, selector: &str, base_url: &str) -> Result<Vec<LinkRecord>, ExtractError> {
        let compiled = compile_selector(selector)?;

        let links: Vec<LinkRecord> = self
            .html
            .select(&compiled)
            .filter_map(|el| {
                let href = el.value().attr("href")?;
                Some(LinkRecord {
                    url: resolve_url(href, base_url),
                    text: element_text(&el),
                })
            })
            .collect();

        debug!("Extracted {} links with selector '{}'", links.len(), selector);
        Ok(links)
    }

    /// Evaluate every field of `mapping`. The result always carries exactly
    /// the mapping's keys.
    pub fn structured_data(&self, mapping: &ExtractionMapping) -> Result<ExtractionResult, ExtractError> {
        let mut result = ExtractionResult::new();

        for (name, spec) in mapping {
            let value = self.field_value(spec)?;
            debug!(field = %name, mode = spec.mode(), selector = spec.selector(), "Extracted field");
            result.insert(name.clone(), value);
        }

        Ok(result)
    }

    fn field_value(&self, spec: &FieldSpec) -> Result<FieldValue, ExtractError> {
        let selector = compile_selector(spec.selector())?;

        let value = match spec {
            FieldSpec::Text(_) => FieldValue::Text(self.combined_text(&selector)),
            FieldSpec::Html(_) => FieldValue::Text(
                self.html
                    .select(&selector)
                    .next()
                    .map(|el| el.inner_html())
                    .unwrap_or_default(),
            ),
            FieldSpec::Attr { name, .. } => self
                .html
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr(name))
                .map(|value| FieldValue::Text(value.to_string()))
                .unwrap_or(FieldValue::Missing),
            FieldSpec::List(_) => FieldValue::List(
                self.html.select(&selector).map(|el| element_text(&el)).collect(),
            ),
        };

        Ok(value)
    }

    fn combined_text(&self, selector: &Selector) -> String {
        self.html
            .select(selector)
            .flat_map(|el| el.text())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

fn compile_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed combined text of every element matching `selector`
pub fn extract_text(html: &str, selector: &str) -> Result<String, ExtractError> {
    Document::parse(html).text(selector)
}

/// Trimmed text of each element matching `selector`
pub fn extract_text_list(html: &str, selector: &str) -> Result<Vec<String>, ExtractError> {
    Document::parse(html).text_list(selector)
}

/// Trimmed combined text for each named selector
pub fn extract_text_map(
    html: &str,
    selectors: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ExtractError> {
    Document::parse(html).text_map(selectors)
}

/// Image records; pass [`DEFAULT_IMAGE_SELECTOR`] and `""` for the defaults
pub fn extract_images(html: &str, selector: &str, base_url: &str) -> Result<Vec<ImageRecord>, ExtractError> {
    Document::parse(html).images(selector, base_url)
}

/// Link records; pass [`DEFAULT_LINK_SELECTOR`] and `""` for the defaults
pub fn extract_links(html: &str, selector: &str, base_url: &str) -> Result<Vec<LinkRecord>, ExtractError> {
    Document::parse(html).links(selector, base_url)
}

/// Evaluate a field mapping against `html`
pub fn extract_structured_data(
    html: &str,
    mapping: &ExtractionMapping,
) -> Result<ExtractionResult, ExtractError> {
    Document::parse(html).structured_data(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html>
        <body>
            <h1 class="title">  Blue Kettle  </h1>
            <div class="price">$19.99</div>
            <div class="price">$29.99</div>
            <article id="desc"><p>Boils <b>fast</b>.</p></article>
            <img class="cover" src="/img/kettle.png" alt="kettle" width="640" height="480">
            <img class="thumb" data-src="/img/thumb.png">
            <img class="broken" alt="no source">
            <a href="/cart" class="nav"> Cart </a>
            <a href="https://other.example/help">Help</a>
            <a name="anchor">No href</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_text_trims_and_combines() {
        assert_eq!(extract_text(PRODUCT_PAGE, "h1").unwrap(), "Blue Kettle");
        assert_eq!(extract_text(PRODUCT_PAGE, ".price").unwrap(), "$19.99$29.99");
        assert_eq!(extract_text(PRODUCT_PAGE, "#desc").unwrap(), "Boils fast.");
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        assert_eq!(extract_text(PRODUCT_PAGE, ".missing").unwrap(), "");
        assert!(extract_images(PRODUCT_PAGE, "img.missing", "").unwrap().is_empty());
        assert!(extract_links(PRODUCT_PAGE, "a.missing", "").unwrap().is_empty());
        assert!(extract_text_list(PRODUCT_PAGE, "li").unwrap().is_empty());
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract_text("", "h1").unwrap(), "");
        assert!(extract_links("", DEFAULT_LINK_SELECTOR, "").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selector() {
        let err = extract_text(PRODUCT_PAGE, "div[").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidSelector { ref selector, .. } if selector == "div["));
    }

    #[test]
    fn test_text_list() {
        let prices = extract_text_list(PRODUCT_PAGE, ".price").unwrap();
        assert_eq!(prices, vec!["$19.99", "$29.99"]);
    }

    #[test]
    fn test_text_map_keeps_every_key() {
        let mut selectors = BTreeMap::new();
        selectors.insert("title".to_string(), "h1.title".to_string());
        selectors.insert("sku".to_string(), ".sku".to_string());

        let texts = extract_text_map(PRODUCT_PAGE, &selectors).unwrap();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts["title"], "Blue Kettle");
        assert_eq!(texts["sku"], "");
    }

    #[test]
    fn test_images() {
        let images = extract_images(PRODUCT_PAGE, DEFAULT_IMAGE_SELECTOR, "https://shop.example/").unwrap();
        assert_eq!(images.len(), 2);

        assert_eq!(
            images[0],
            ImageRecord {
                url: "https://shop.example/img/kettle.png".to_string(),
                alt: "kettle".to_string(),
                width: Some("640".to_string()),
                height: Some("480".to_string()),
            }
        );
        assert_eq!(images[1].url, "https://shop.example/img/thumb.png");
        assert_eq!(images[1].alt, "");
        assert_eq!(images[1].width, None);
    }

    #[test]
    fn test_single_image_against_base() {
        let images = extract_images(r#"<img src="/a.png" alt="x">"#, "img", "https://h.example/").unwrap();
        assert_eq!(
            images,
            vec![ImageRecord {
                url: "https://h.example/a.png".to_string(),
                alt: "x".to_string(),
                width: None,
                height: None,
            }]
        );
    }

    #[test]
    fn test_src_wins_over_data_src() {
        let images = extract_images(r#"<img src="/real.png" data-src="/lazy.png">"#, "img", "").unwrap();
        assert_eq!(images[0].url, "/real.png");
    }

    #[test]
    fn test_links() {
        let links = extract_links(r#"<a href="/p">Hi</a>"#, "a", "https://h.example").unwrap();
        assert_eq!(
            links,
            vec![LinkRecord { url: "https://h.example/p".to_string(), text: "Hi".to_string() }]
        );

        let links = extract_links(PRODUCT_PAGE, DEFAULT_LINK_SELECTOR, "").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], LinkRecord { url: "/cart".to_string(), text: "Cart".to_string() });
        assert_eq!(links[1].url, "https://other.example/help");
    }

    #[test]
    fn test_selector_coverage() {
        let html = r#"
            <div id="main" class="box">
                <ul><li class="item" data-kind="a">One</li><li class="item" data-kind="b">Two</li></ul>
            </div>
            <p class="note">Three</p>
        "#;

        assert_eq!(extract_text(html, "#main li").unwrap(), "OneTwo");
        assert_eq!(extract_text(html, "div.box ul li[data-kind='b']").unwrap(), "Two");
        assert_eq!(
            extract_text_list(html, "li.item, p.note").unwrap(),
            vec!["One", "Two", "Three"]
        );
    }

    #[test]
    fn test_structured_data_modes() {
        let html = r#"<h1>T</h1><span class="tag">a</span><span class="tag">b</span>"#;

        let mut mapping = ExtractionMapping::new();
        mapping.insert("title".to_string(), FieldSpec::from("h1"));
        mapping.insert("tags".to_string(), FieldSpec::list(".tag"));

        let result = extract_structured_data(html, &mapping).unwrap();
        assert_eq!(result["title"], FieldValue::Text("T".to_string()));
        assert_eq!(result["tags"], FieldValue::List(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_structured_data_from_declared_mapping() {
        let mapping = parse_mapping(
            r##"{
                "title": "h1",
                "body": {"selector": "#desc", "mode": "html"},
                "cover": {"selector": "img.cover", "mode": "attr", "attrName": "src"},
                "cover_title": {"selector": "img.cover", "mode": "attr", "attrName": "title"},
                "prices": {"selector": ".price", "mode": "list"},
                "rating": ".rating"
            }"##,
        )
        .unwrap();

        let result = extract_structured_data(PRODUCT_PAGE, &mapping).unwrap();

        let expected_keys: Vec<&String> = mapping.keys().collect();
        let actual_keys: Vec<&String> = result.keys().collect();
        assert_eq!(expected_keys, actual_keys);

        assert_eq!(result["title"].as_text(), Some("Blue Kettle"));
        assert_eq!(result["body"].as_text(), Some("<p>Boils <b>fast</b>.</p>"));
        assert_eq!(result["cover"].as_text(), Some("/img/kettle.png"));
        assert!(result["cover_title"].is_missing());
        assert_eq!(result["prices"].as_list().map(|l| l.len()), Some(2));
        assert_eq!(result["rating"].as_text(), Some(""));
    }

    #[test]
    fn test_structured_data_no_matches() {
        let mut mapping = ExtractionMapping::new();
        mapping.insert("a".to_string(), FieldSpec::text(".x"));
        mapping.insert("b".to_string(), FieldSpec::html(".x"));
        mapping.insert("c".to_string(), FieldSpec::attr(".x", "href"));
        mapping.insert("d".to_string(), FieldSpec::list(".x"));

        let result = extract_structured_data("<p>nothing</p>", &mapping).unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result["a"], FieldValue::Text(String::new()));
        assert_eq!(result["b"], FieldValue::Text(String::new()));
        assert_eq!(result["c"], FieldValue::Missing);
        assert_eq!(result["d"], FieldValue::List(Vec::new()));
    }

    #[test]
    fn test_html_mode_is_not_trimmed() {
        let mut mapping = ExtractionMapping::new();
        mapping.insert("raw".to_string(), FieldSpec::html("div"));

        let result = extract_structured_data("<div>  <i>x</i>  </div>", &mapping).unwrap();
        assert_eq!(result["raw"].as_text(), Some("  <i>x</i>  "));
    }

    #[test]
    fn test_document_queries_are_idempotent() {
        let document = Document::parse(PRODUCT_PAGE);

        let first = document.links("a", "https://shop.example").unwrap();
        let second = document.links("a", "https://shop.example").unwrap();
        assert_eq!(first, second);

        assert_eq!(document.text(".price").unwrap(), document.text(".price").unwrap());
        assert_eq!(
            extract_images(PRODUCT_PAGE, "img", "").unwrap(),
            extract_images(PRODUCT_PAGE, "img", "").unwrap()
        );
    }

    #[test]
    fn test_from_bytes() {
        let document = Document::from_bytes(b"<h1>Bytes</h1>").unwrap();
        assert_eq!(document.text("h1").unwrap(), "Bytes");

        let err = Document::from_bytes(&[0x3c, 0x68, 0xff, 0xfe]).err().unwrap();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }

    #[test]
    fn test_malformed_markup_is_lenient() {
        let html = "<ul><li>one<li>two";
        assert_eq!(extract_text_list(html, "li").unwrap(), vec!["one", "two"]);
    }
}
