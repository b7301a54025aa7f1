//! Maps an Apify dataset item onto [`ScrapedProduct`].

use std::collections::BTreeMap;

use listport_core::{Platform, ProductVariant, ReviewSummary, ScrapedProduct, SellerInfo};

use super::types::{ApifyItem, ApifySellerField, KeyValue};
use super::PROVIDER_NAME;
use crate::error::ScraperError;
use crate::field::{count_value, merge_images, non_empty, scalar_text, NumberField};

/// Normalizes one dataset item.
///
/// A missing title is left empty for the orchestrator to repair. A missing
/// gallery is an error since nothing downstream can recover from it.
///
/// # Errors
///
/// Returns [`ScraperError::MissingField`] when the item carries no usable
/// image URL.
pub(crate) fn normalize_item(
    item: ApifyItem,
    source_url: &str,
    platform: Platform,
) -> Result<ScrapedProduct, ScraperError> {
    let extra = item.additional_properties.unwrap_or_default();

    let images = merge_images(
        &[&extra.high_resolution_images, &item.images, &extra.gallery_thumbnails],
        &[item.main_image.as_deref(), item.image.as_deref()],
    );
    if images.is_empty() {
        return Err(ScraperError::MissingField {
            provider: "Apify".to_string(),
            field: "images".to_string(),
        });
    }

    let mut product = ScrapedProduct::new(source_url, platform, PROVIDER_NAME);

    product.title = non_empty(item.title)
        .or_else(|| non_empty(item.name))
        .unwrap_or_default();
    if product.title.is_empty() {
        tracing::warn!(source_url, "Apify item has no title");
    }

    product.description = non_empty(item.description)
        .or_else(|| join_non_empty(&extra.features, "\n\n"))
        .or_else(|| join_non_empty(&item.features, "\n"))
        .unwrap_or_default();

    let offer_price = item
        .offers
        .as_ref()
        .and_then(|o| o.price.as_ref())
        .and_then(NumberField::value);
    product.price = item
        .price
        .as_ref()
        .and_then(NumberField::value)
        .filter(|p| *p > 0.0)
        .or(offer_price)
        .filter(|p| *p >= 0.0)
        .unwrap_or(0.0);

    product.currency = item
        .offers
        .and_then(|o| non_empty(o.price_currency))
        .or_else(|| non_empty(item.currency))
        .map_or_else(|| "USD".to_string(), |c| c.to_ascii_uppercase());

    product.images = images;
    product.brand = item.brand.and_then(|b| b.name());

    let review_count = item
        .reviews_count
        .or(item.review_count)
        .or(extra.reviews_count)
        .and_then(|c| c.value());
    product.review_summary = match (item.rating.and_then(|r| r.value()), review_count) {
        (Some(rating), Some(count)) if rating > 0.0 => {
            count_value(count).map(|count| ReviewSummary { rating, count })
        }
        _ => None,
    };

    product.seller = extra
        .seller
        .and_then(|s| {
            non_empty(s.name).map(|name| SellerInfo {
                name,
                rating: None,
                url: non_empty(s.url),
            })
        })
        .or_else(|| seller_from_field(item.seller))
        .or_else(|| {
            non_empty(item.seller_name).map(|name| SellerInfo {
                name,
                rating: None,
                url: None,
            })
        });

    product.sku = item
        .sku
        .and_then(|s| s.as_string())
        .or_else(|| item.product_id.and_then(|p| p.as_string()))
        .or_else(|| non_empty(extra.asin));

    product.specifications = item
        .specifications
        .map(|specs| {
            specs
                .iter()
                .filter_map(|(k, v)| Some((k.trim().to_owned(), scalar_text(v)?)))
                .filter(|(k, _)| !k.is_empty())
                .collect::<BTreeMap<_, _>>()
        })
        .filter(|specs| !specs.is_empty())
        .or_else(|| key_values(&extra.attributes))
        .or_else(|| key_values(&extra.product_overview))
        .unwrap_or_default();

    product.variants = item
        .variants
        .into_iter()
        .filter_map(|v| {
            let options: Vec<String> = v
                .options
                .into_iter()
                .filter_map(|o| non_empty(Some(o)))
                .collect();
            let name = non_empty(v.name)?;
            (!options.is_empty()).then_some(ProductVariant { name, options })
        })
        .collect();

    Ok(product)
}

fn seller_from_field(field: Option<ApifySellerField>) -> Option<SellerInfo> {
    match field? {
        ApifySellerField::Name(name) => non_empty(Some(name)).map(|name| SellerInfo {
            name,
            rating: None,
            url: None,
        }),
        ApifySellerField::Detailed { name, url, rating } => {
            non_empty(name).map(|name| SellerInfo {
                name,
                rating: rating.and_then(|r| r.value()),
                url: non_empty(url),
            })
        }
    }
}

fn join_non_empty(parts: &[String], separator: &str) -> Option<String> {
    let kept: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    (!kept.is_empty()).then(|| kept.join(separator))
}

fn key_values(pairs: &[KeyValue]) -> Option<BTreeMap<String, String>> {
    let map: BTreeMap<String, String> = pairs
        .iter()
        .filter_map(|kv| {
            let key = kv.key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), scalar_text(&kv.value)?))
        })
        .collect();
    (!map.is_empty()).then_some(map)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
