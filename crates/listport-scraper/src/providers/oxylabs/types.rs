//! Serde types for Oxylabs realtime query results.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::field::{lenient, lenient_vec, BrandField, IdField, ImageEntry, NumberField};

/// Envelope returned by `POST /v1/queries`.
#[derive(Debug, Deserialize)]
pub(crate) struct OxylabsResponse {
    #[serde(default)]
    pub results: Vec<OxylabsResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OxylabsResult {
    /// Parsed product object when `parse: true` was honored, raw HTML otherwise.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Status of the upstream page fetch, distinct from the HTTP status of
    /// the Oxylabs call itself.
    #[serde(default)]
    pub status_code: Option<u16>,
}

/// Parsed content of the `amazon_product` source.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OxylabsAmazonProduct {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub feature_bullets: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub bullet_points: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub images: Vec<ImageEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub reviews_count: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub brand: Option<BrandField>,
    #[serde(default, deserialize_with = "lenient")]
    pub asin: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub seller_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub seller_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub specifications: Vec<NameValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub product_details: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub shipping_price: Option<NumberField>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameValue {
    pub name: String,
    pub value: serde_json::Value,
}

/// Parsed content of the `universal_ecommerce` source.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OxylabsUniversalProduct {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub images: Vec<ImageEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub reviews_count: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub brand: Option<BrandField>,
    #[serde(default, deserialize_with = "lenient")]
    pub sku: Option<IdField>,
    #[serde(default, deserialize_with = "lenient")]
    pub seller: Option<String>,
}
