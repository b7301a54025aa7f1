//! Maps Oxylabs parsed content onto [`ScrapedProduct`].

use std::collections::BTreeMap;

use listport_core::{Platform, ReviewSummary, ScrapedProduct, SellerInfo, ShippingInfo};

use super::types::{OxylabsAmazonProduct, OxylabsUniversalProduct};
use super::PROVIDER_NAME;
use crate::error::ScraperError;
use crate::field::{count_value, merge_images, non_empty, scalar_text, NumberField};
use crate::platform::extract_product_id;

fn missing_images() -> ScraperError {
    ScraperError::MissingField {
        provider: "Oxylabs".to_string(),
        field: "images".to_string(),
    }
}

fn review_summary(
    rating: Option<NumberField>,
    count: Option<NumberField>,
) -> Option<ReviewSummary> {
    let rating = rating.and_then(|r| r.value()).filter(|r| *r > 0.0)?;
    let count = count.and_then(|c| c.value()).and_then(count_value)?;
    Some(ReviewSummary { rating, count })
}

fn currency_or_usd(currency: Option<String>) -> String {
    non_empty(currency).map_or_else(|| "USD".to_string(), |c| c.to_ascii_uppercase())
}

/// Normalizes `amazon_product` content.
///
/// # Errors
///
/// Returns [`ScraperError::MissingField`] when no image URL is present.
pub(crate) fn normalize_amazon(
    content: OxylabsAmazonProduct,
    source_url: &str,
) -> Result<ScrapedProduct, ScraperError> {
    let images = merge_images(&[&content.images], &[]);
    if images.is_empty() {
        return Err(missing_images());
    }

    let mut product = ScrapedProduct::new(source_url, Platform::Amazon, PROVIDER_NAME);
    product.title = non_empty(content.title).unwrap_or_default();

    let bullets: Vec<&str> = content
        .feature_bullets
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .collect();
    product.description = non_empty(content.description)
        .or_else(|| (!bullets.is_empty()).then(|| bullets.join("\n")))
        .or_else(|| non_empty(content.bullet_points))
        .unwrap_or_default();

    product.price = content
        .price
        .and_then(|p| p.value())
        .filter(|p| *p >= 0.0)
        .unwrap_or(0.0);
    product.currency = currency_or_usd(content.currency);
    product.images = images;
    product.brand = content.brand.and_then(|b| b.name());
    product.sku = non_empty(content.asin)
        .or_else(|| extract_product_id(source_url, Platform::Amazon));
    product.review_summary = review_summary(content.rating, content.reviews_count);
    product.seller = non_empty(content.seller_name).map(|name| SellerInfo {
        name,
        rating: None,
        url: non_empty(content.seller_url),
    });

    let listed: BTreeMap<String, String> = content
        .specifications
        .iter()
        .filter_map(|nv| {
            let name = nv.name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_owned(), scalar_text(&nv.value)?))
        })
        .collect();
    product.specifications = if listed.is_empty() {
        content
            .product_details
            .unwrap_or_default()
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), scalar_text(v)?)))
            .collect()
    } else {
        listed
    };

    product.shipping = content
        .shipping_price
        .and_then(|s| s.value())
        .filter(|cost| *cost >= 0.0)
        .map(|cost| ShippingInfo {
            cost,
            currency: product.currency.clone(),
            free_shipping: cost.abs() < f64::EPSILON,
        });

    Ok(product)
}

/// Normalizes `universal_ecommerce` content.
///
/// # Errors
///
/// Returns [`ScraperError::MissingField`] when no image URL is present.
pub(crate) fn normalize_universal(
    content: OxylabsUniversalProduct,
    source_url: &str,
    platform: Platform,
) -> Result<ScrapedProduct, ScraperError> {
    let images = merge_images(&[&content.images], &[content.image.as_deref()]);
    if images.is_empty() {
        return Err(missing_images());
    }

    let mut product = ScrapedProduct::new(source_url, platform, PROVIDER_NAME);
    product.title = non_empty(content.title)
        .or_else(|| non_empty(content.name))
        .unwrap_or_default();
    product.description = non_empty(content.description).unwrap_or_default();
    product.price = content
        .price
        .and_then(|p| p.value())
        .filter(|p| *p >= 0.0)
        .unwrap_or(0.0);
    product.currency = currency_or_usd(content.currency);
    product.images = images;
    product.brand = content.brand.and_then(|b| b.name());
    product.sku = content
        .sku
        .and_then(|s| s.as_string())
        .or_else(|| extract_product_id(source_url, platform));
    product.review_summary = review_summary(content.rating, content.reviews_count);
    product.seller = non_empty(content.seller).map(|name| SellerInfo {
        name,
        rating: None,
        url: None,
    });

    Ok(product)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
