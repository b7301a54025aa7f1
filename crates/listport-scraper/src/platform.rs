//! Marketplace detection and canonical URL handling.
//!
//! Pure string work: no network access. Amazon product pages are recognized
//! by their `/dp/{ASIN}` (or legacy `/gp/product/{ASIN}`) path on any of the
//! supported country storefronts; AliExpress pages by `/item/{digits}.html`.
//! URLs that do not match either path shape fall back to a hostname check so
//! shortened and proxied links (`amzn.to`, `a.aliexpress.com`) still route to
//! the right provider chain.

use std::sync::LazyLock;

use listport_core::Platform;
use regex::Regex;

static AMAZON_PRODUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^https?://(?:[\w-]+\.)*amazon\.(com\.au|com\.mx|com\.br|com\.tr|co\.uk|co\.jp|com|de|fr|it|es|ca|in|nl|sa|ae|eg|sg|se|pl)(?::\d+)?/(?:[^?#]*/)?(?:dp|gp/product)/([A-Z0-9]{10})(?:[/?#]|$)",
    )
    .expect("valid regex")
});

static ALIEXPRESS_PRODUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^https?://(?:[\w-]+\.)*aliexpress\.(com|us|ru)(?::\d+)?/item/(\d+)\.html",
    )
    .expect("valid regex")
});

fn pattern_for(platform: Platform) -> &'static Regex {
    match platform {
        Platform::Amazon => &AMAZON_PRODUCT_RE,
        Platform::AliExpress => &ALIEXPRESS_PRODUCT_RE,
    }
}

/// Classifies `url` into a supported marketplace.
///
/// Returns `None` for anything that is neither a recognizable product page
/// nor hosted on a marketplace domain.
#[must_use]
pub fn detect_platform(url: &str) -> Option<Platform> {
    let url = url.trim();
    if let Some(platform) = Platform::ALL
        .into_iter()
        .find(|p| pattern_for(*p).is_match(url))
    {
        return Some(platform);
    }

    let host = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))?;

    if host.contains("aliexpress.") {
        Some(Platform::AliExpress)
    } else if host.contains("amazon.") || host.contains("amzn.") {
        Some(Platform::Amazon)
    } else {
        None
    }
}

/// Extracts the vendor-native product id: the ASIN for Amazon (uppercased),
/// the numeric item id for AliExpress.
#[must_use]
pub fn extract_product_id(url: &str, platform: Platform) -> Option<String> {
    let caps = pattern_for(platform).captures(url.trim())?;
    let id = caps.get(2)?.as_str();
    Some(match platform {
        Platform::Amazon => id.to_ascii_uppercase(),
        Platform::AliExpress => id.to_owned(),
    })
}

/// Rebuilds a canonical product URL from the extracted id, dropping slugs,
/// tracking parameters and affiliate tags.
///
/// Idempotent: normalizing a canonical URL returns it unchanged.
#[must_use]
pub fn normalize_url(url: &str, platform: Platform) -> Option<String> {
    let caps = pattern_for(platform).captures(url.trim())?;
    let tld = caps.get(1)?.as_str().to_ascii_lowercase();
    let id = caps.get(2)?.as_str();
    Some(match platform {
        Platform::Amazon => format!(
            "https://www.amazon.{tld}/dp/{}",
            id.to_ascii_uppercase()
        ),
        Platform::AliExpress => format!("https://www.aliexpress.{tld}/item/{id}.html"),
    })
}

/// Amazon storefront TLD (`"com"`, `"co.uk"`, `"sa"`, ...), defaulting to `"com"`.
#[must_use]
pub fn amazon_domain(url: &str) -> String {
    AMAZON_PRODUCT_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map_or_else(|| "com".to_string(), |m| m.as_str().to_ascii_lowercase())
}
