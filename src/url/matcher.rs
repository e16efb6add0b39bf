/// Checks if a domain matches a rate-limit override pattern
///
/// Two pattern forms are supported:
/// 1. Exact: "shop.example" matches only "shop.example"
/// 2. Wildcard: "*.shop.example" matches "shop.example" and any subdomain of it
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use product_scout::url::matches_wildcard;
///
/// assert!(matches_wildcard("shop.example", "shop.example"));
/// assert!(matches_wildcard("*.shop.example", "m.shop.example"));
/// assert!(!matches_wildcard("*.shop.example", "myshop.example"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || (candidate.len() > base.len()
                    && candidate.ends_with(base)
                    && candidate.as_bytes()[candidate.len() - base.len() - 1] == b'.')
        }
        None => candidate == pattern,
    }
}
