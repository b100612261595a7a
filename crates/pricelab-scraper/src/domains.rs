//! Domain classification for search results.
//!
//! Three buckets: domains that never yield a usable per-seller price (the
//! search engine itself, aggregators), marketplace domains whose search
//! snippets reliably carry the price (no page visit needed), and everything
//! else (fetch the page and scan its text).

/// Substring-matched against the registrable domain. A result whose domain
/// contains any of these is dropped outright.
const SKIP_DOMAINS: &[&str] = &[
    "yandex.ru",
    "yandex.by",
    "yandex.kz",
    "yandex.ua",
    "lamoda",
    "citilink",
    "dns-shop",
    "e-katalog",
    "price",
    "nadavi",
    "onliner",
    "tiu",
    "prom",
    "all-tools",
];

/// Exact-matched registrable domains whose snippets are trusted for price
/// extraction.
const FAST_DOMAINS: &[&str] = &[
    "ozon.ru",
    "wildberries.ru",
    "wildberries.by",
    "wildberries.kz",
    "market.yandex.ru",
    "market.yandex.by",
    "market.yandex.kz",
    "market.yandex.ua",
];

/// Extracts the registrable part of a URL's host: the last two labels, or
/// three when the second-to-last is a short country-code second level like
/// `co` or `com` (`market.yandex.ru` stays three labels via the fast list,
/// which is matched against this value before truncation).
#[must_use]
pub fn registrable_domain(url: &str) -> Option<String> {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.split('@').next_back()?.split(':').next()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

fn last_labels(host: &str, n: usize) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    let start = labels.len().saturating_sub(n);
    labels[start..].join(".")
}

/// True when the result should be dropped without any price extraction.
#[must_use]
pub fn is_skipped(url: &str) -> bool {
    let Some(host) = registrable_domain(url) else {
        return true;
    };
    let key = last_labels(&host, 2);
    SKIP_DOMAINS.iter().any(|skip| key.contains(skip))
}

/// True when the snippet alone is trusted for price extraction.
#[must_use]
pub fn is_fast(url: &str) -> bool {
    let Some(host) = registrable_domain(url) else {
        return false;
    };
    FAST_DOMAINS.contains(&last_labels(&host, 3).as_str())
        || FAST_DOMAINS.contains(&last_labels(&host, 2).as_str())
}

/// Display name for a source: the registrable domain, two labels (three for
/// recognised marketplace subdomains).
#[must_use]
pub fn source_name(url: &str) -> Option<String> {
    let host = registrable_domain(url)?;
    let three = last_labels(&host, 3);
    if FAST_DOMAINS.contains(&three.as_str()) {
        Some(three)
    } else {
        Some(last_labels(&host, 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrable_domain_strips_scheme_path_and_port() {
        assert_eq!(
            registrable_domain("https://shop.example.ru:8080/item?x=1").as_deref(),
            Some("shop.example.ru")
        );
        assert_eq!(
            registrable_domain("http://Example.RU/page").as_deref(),
            Some("example.ru")
        );
    }

    #[test]
    fn search_engine_and_aggregators_are_skipped() {
        assert!(is_skipped("https://yandex.ru/search?text=abc"));
        assert!(is_skipped("https://www.dns-shop.ru/product/1"));
        assert!(is_skipped("https://e-katalog.ru/item"));
        assert!(!is_skipped("https://techshop.ru/item"));
    }

    #[test]
    fn marketplaces_are_fast() {
        assert!(is_fast("https://www.ozon.ru/product/123"));
        assert!(is_fast("https://market.yandex.ru/product/456"));
        assert!(!is_fast("https://techshop.ru/item"));
    }

    #[test]
    fn marketplace_subdomain_is_fast_but_plain_yandex_is_skipped() {
        assert!(is_fast("https://market.yandex.ru/offer/1"));
        assert!(is_skipped("https://yandex.ru/maps"));
    }

    #[test]
    fn source_name_prefers_marketplace_subdomain() {
        assert_eq!(
            source_name("https://market.yandex.ru/offer/1").as_deref(),
            Some("market.yandex.ru")
        );
        assert_eq!(
            source_name("https://shop.techshop.ru/item").as_deref(),
            Some("techshop.ru")
        );
    }
}
