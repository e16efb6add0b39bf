//! HTML content analysis
//!
//! This module handles parsing fetched pages to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Page title
//! - Visible text volume and link count, used by the thin-content check
//! - Product structured data (Open Graph, JSON-LD, microdata)

use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All links found on the page (absolute URLs)
    pub links: Vec<String>,

    /// Bytes of visible body text, whitespace collapsed
    pub text_len: usize,

    /// Whether the page declares itself a product page in structured data
    pub has_product_markup: bool,
}

impl ParsedPage {
    /// Returns true if the page carries too little to be a server-rendered page
    ///
    /// A page is thin when it has fewer than `min_links` links AND less than
    /// `min_text` bytes of visible text. Such pages are usually shells that
    /// fill themselves in with JavaScript.
    pub fn is_thin(&self, min_links: usize, min_text: usize) -> bool {
        self.links.len() < min_links && self.text_len < min_text
    }
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only anchors
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use product_scout::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/p/1">Link</a></body></html>"#;
/// let base_url = Url::parse("https://shop.example/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://shop.example/p/1".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
        text_len: visible_text_len(&document),
        has_product_markup: has_product_markup(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None for special schemes, fragment-only anchors, invalid URLs and
/// anything that is not HTTP(S) after resolution.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    matches!(absolute_url.scheme(), "http" | "https").then(|| absolute_url.to_string())
}

/// Counts visible text in <body>, skipping script, style and noscript content
fn visible_text_len(document: &Html) -> usize {
    let Ok(body_selector) = Selector::parse("body") else {
        return 0;
    };
    let Some(body) = document.select(&body_selector).next() else {
        return 0;
    };

    body.descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .map(|parent| matches!(parent.value().name(), "script" | "style" | "noscript"))
                    .unwrap_or(false);
                (!hidden).then(|| text.split_whitespace().map(str::len).sum::<usize>())
            }
            _ => None,
        })
        .sum()
}

/// Returns true if the document declares a product in structured data
///
/// Recognized forms: `<meta property="og:type" content="product">`,
/// JSON-LD with `"@type": "Product"` (also inside `@graph` or arrays), and
/// microdata `itemtype` pointing at schema.org/Product.
fn has_product_markup(document: &Html) -> bool {
    if let Ok(og) = Selector::parse("meta[property='og:type'][content]") {
        let og_product = document.select(&og).any(|meta| {
            meta.value()
                .attr("content")
                .map(|c| c.trim().to_ascii_lowercase().starts_with("product"))
                .unwrap_or(false)
        });
        if og_product {
            return true;
        }
    }

    if let Ok(microdata) = Selector::parse("[itemtype]") {
        let declared = document.select(&microdata).any(|el| {
            el.value()
                .attr("itemtype")
                .map(|t| t.trim_end_matches('/').ends_with("schema.org/Product"))
                .unwrap_or(false)
        });
        if declared {
            return true;
        }
    }

    if let Ok(ld) = Selector::parse("script[type='application/ld+json']") {
        return document.select(&ld).any(|script| {
            let raw = script.text().collect::<String>();
            serde_json::from_str::<Value>(&raw)
                .map(|value| declares_product(&value))
                .unwrap_or(false)
        });
    }

    false
}

fn declares_product(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(declares_product),
        Value::Object(map) => {
            let typed = match map.get("@type") {
                Some(Value::String(t)) => t == "Product",
                Some(Value::Array(types)) => types.iter().any(|t| t == "Product"),
                _ => false,
            };
            typed || map.get("@graph").map(declares_product).unwrap_or(false)
        }
        _ => false,
    }
}
