//! URL-only classification rules
//!
//! These are pure functions of the URL: the frontier tier a link is queued
//! under, whether a URL looks like a product-detail page, and whether a link
//! is worth following at all.

use crate::state::Priority;
use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use url::Url;

/// Path/query markers of a product-detail page
const PRODUCT_MARKERS: &[&str] = &[
    r"/p/",
    r"/dp/",
    r"/gp/product/",
    r"/products?/",
    r"/buy(/|$)",
    r"/p-[a-z0-9]",
    r"-p\d+",
    r"[?&]pid=",
];

/// Listing, category and pagination markers
const LISTING_MARKERS: &[&str] = &[
    r"/categor(y|ies)",
    r"/collections?(/|$)",
    r"/c/",
    r"/catalog",
    r"/brands?/",
    r"/shop/",
    r"/store/",
    r"/list/",
    r"/page/\d+",
    r"[?&](page|p|pg)=\d+",
];

/// Product URL patterns (confirmation is stricter than tiering)
const PRODUCT_PATTERNS: &[&str] = &[
    r"/p/[\w-]+",
    r"/buy/?$",
    r"/dp/\w{10}",
    r"/gp/product/\w{10}",
    r"[&?]pid=\w+",
    r"/p-\w+",
    r"/p-mp\d+",
    r"-p\d+",
    r"/\d{6,}/",
];

const EXCLUDED_PATTERNS: &[&str] = &[
    r"/category/",
    r"/search",
    r"\.(jpg|png|webp)(\?|$)",
    r"/cart",
    r"/checkout",
    r"/review",
    r"/wishlist",
    r"/store/",
    r"/shop/",
    r"/list/",
    r"/filter",
    r"/login",
    r"/product-reviews",
    r"/auth",
];

/// Paths never worth following
const SKIPPED_PATHS: &[&str] = &[
    r"^/search(/|$)",
    r"^/filter(/|$)",
    r"^/(cart|checkout|login|logout|signin|register|account|auth)(/|$)",
    r"/(help|contact)/",
];

const STATIC_EXTENSIONS: &[&str] = &[
    "css", "js", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "pdf", "woff", "woff2",
    "zip", "mp4",
];

fn regex_set(cell: &'static OnceLock<RegexSet>, patterns: &[&str]) -> &'static RegexSet {
    cell.get_or_init(|| RegexSet::new(patterns).expect("built-in URL patterns are valid"))
}

fn product_markers() -> &'static RegexSet {
    static CELL: OnceLock<RegexSet> = OnceLock::new();
    regex_set(&CELL, PRODUCT_MARKERS)
}

fn listing_markers() -> &'static RegexSet {
    static CELL: OnceLock<RegexSet> = OnceLock::new();
    regex_set(&CELL, LISTING_MARKERS)
}

fn product_patterns() -> &'static RegexSet {
    static CELL: OnceLock<RegexSet> = OnceLock::new();
    regex_set(&CELL, PRODUCT_PATTERNS)
}

fn excluded_patterns() -> &'static RegexSet {
    static CELL: OnceLock<RegexSet> = OnceLock::new();
    regex_set(&CELL, EXCLUDED_PATTERNS)
}

fn skipped_paths() -> &'static RegexSet {
    static CELL: OnceLock<RegexSet> = OnceLock::new();
    regex_set(&CELL, SKIPPED_PATHS)
}

fn product_id() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(r"\b\d{6,}\b|[_-][a-z0-9]{8,}").expect("built-in URL patterns are valid")
    })
}

/// Lowercased path plus query, the part of the URL the rules look at
fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q).to_lowercase(),
        None => url.path().to_lowercase(),
    }
}

/// Assigns the frontier tier for a URL
///
/// Product-page markers classify HIGH, listing and pagination paths MEDIUM,
/// everything else LOW.
///
/// ```
/// use product_scout::url::classify_priority;
/// use product_scout::Priority;
/// use url::Url;
///
/// let tier = |s: &str| classify_priority(&Url::parse(s).unwrap());
/// assert_eq!(tier("https://shop.example/p/1234"), Priority::High);
/// assert_eq!(tier("https://shop.example/category/shoes"), Priority::Medium);
/// assert_eq!(tier("https://shop.example/about"), Priority::Low);
/// ```
pub fn classify_priority(url: &Url) -> Priority {
    let target = path_and_query(url);

    if product_markers().is_match(&target) {
        Priority::High
    } else if listing_markers().is_match(&target) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Returns true if the URL alone identifies a product-detail page
///
/// Requires a product pattern, no excluded pattern, and a product identifier
/// (a 6+ digit number or an 8+ character alphanumeric slug suffix).
pub fn is_product_url(url: &Url) -> bool {
    let target = path_and_query(url);

    product_patterns().is_match(&target)
        && !excluded_patterns().is_match(&target)
        && product_id().is_match(&target)
}

/// Returns true if a discovered link should be followed at all
///
/// Static assets and search/cart/account paths are never fetched.
pub fn should_follow(url: &Url) -> bool {
    let path = url.path().to_lowercase();

    if skipped_paths().is_match(&path) {
        return false;
    }

    let is_static = path
        .rsplit('/')
        .next()
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| STATIC_EXTENSIONS.contains(&ext))
        .unwrap_or(false);

    !is_static
}
