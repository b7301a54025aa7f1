//! Serde types for Apify dataset items.
//!
//! Only the fields the mapper reads are modeled; everything else is ignored.
//! Nested objects go through [`lenient`] because actors change their output
//! shape between versions.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::field::{lenient, lenient_vec, BrandField, IdField, ImageEntry, NumberField};

/// Body of `run-sync-get-dataset-items`: a bare array, or an `{ "items": [..] }`
/// envelope from some actor versions.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApifyDatasetResponse {
    Items(Vec<ApifyItem>),
    Envelope { items: Vec<ApifyItem> },
}

impl ApifyDatasetResponse {
    pub(crate) fn into_items(self) -> Vec<ApifyItem> {
        match self {
            ApifyDatasetResponse::Items(items) | ApifyDatasetResponse::Envelope { items } => items,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApifyItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<NumberField>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub brand: Option<BrandField>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub images: Vec<ImageEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub main_image: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub reviews_count: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub review_count: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub seller: Option<ApifySellerField>,
    #[serde(default)]
    pub seller_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sku: Option<IdField>,
    #[serde(default, deserialize_with = "lenient")]
    pub product_id: Option<IdField>,
    #[serde(default, deserialize_with = "lenient")]
    pub specifications: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub variants: Vec<ApifyVariant>,
    #[serde(default, deserialize_with = "lenient")]
    pub offers: Option<ApifyOffers>,
    #[serde(default, deserialize_with = "lenient")]
    pub additional_properties: Option<ApifyAdditionalProperties>,
}

/// `seller` is a display name in some actors and an object in others.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApifySellerField {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        rating: Option<NumberField>,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApifyVariant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApifyOffers {
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<NumberField>,
    #[serde(default)]
    pub price_currency: Option<String>,
}

/// Amazon-specific extras the e-commerce actor nests under
/// `additionalProperties`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApifyAdditionalProperties {
    #[serde(default, deserialize_with = "lenient")]
    pub asin: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub high_resolution_images: Vec<ImageEntry>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub gallery_thumbnails: Vec<ImageEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub seller: Option<ApifyStoreSeller>,
    #[serde(default, deserialize_with = "lenient")]
    pub reviews_count: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub attributes: Vec<KeyValue>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub product_overview: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApifyStoreSeller {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyValue {
    pub key: String,
    pub value: serde_json::Value,
}
