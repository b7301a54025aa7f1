use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on the number of gallery images kept per product.
pub const MAX_PRODUCT_IMAGES: usize = 15;

/// Marketplace a product listing was imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    AliExpress,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Amazon, Platform::AliExpress];

    /// Lowercase identifier used in config keys, cost tables and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Amazon => "amazon",
            Platform::AliExpress => "aliexpress",
        }
    }

    /// Human-facing marketplace name, e.g. for prompts.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Amazon => "Amazon",
            Platform::AliExpress => "AliExpress",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amazon" => Ok(Platform::Amazon),
            "aliexpress" => Ok(Platform::AliExpress),
            other => Err(format!(
                "unknown platform '{other}'; expected 'amazon' or 'aliexpress'"
            )),
        }
    }
}

/// A product listing scraped from a marketplace and normalized into the
/// shape every provider adapter must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    /// Listing title. Empty only while a product is waiting for vision repair.
    pub title: String,
    pub description: String,
    /// Non-negative listing price in `currency`.
    pub price: f64,
    /// Three-letter currency code, e.g. `"USD"` or `"SAR"`.
    pub currency: String,
    /// Absolute image URLs, deduplicated, at most [`MAX_PRODUCT_IMAGES`].
    pub images: Vec<String>,
    /// The URL the caller asked to scrape, exactly as given.
    pub source_url: String,
    pub platform: Platform,
    pub brand: Option<String>,
    /// ASIN for Amazon, vendor SKU or item id elsewhere.
    pub sku: Option<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    pub review_summary: Option<ReviewSummary>,
    pub seller: Option<SellerInfo>,
    pub shipping: Option<ShippingInfo>,
    /// Category suggested by vision analysis, when it ran.
    pub category: Option<String>,
    pub scraped_at: DateTime<Utc>,
    /// Provider that produced the data, e.g. `"apify"` or `"oxylabs+vision"`.
    pub provider: String,
    /// `true` only when the title was synthesized from the product image.
    #[serde(default)]
    pub ai_generated: bool,
    pub cost_metadata: Option<ScrapeCostMetadata>,
}

impl ScrapedProduct {
    /// Creates an empty product shell for `source_url`, stamped with the
    /// current time. Adapters fill in the remaining fields.
    #[must_use]
    pub fn new(source_url: &str, platform: Platform, provider: &str) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: 0.0,
            currency: "USD".to_string(),
            images: Vec::new(),
            source_url: source_url.to_owned(),
            platform,
            brand: None,
            sku: None,
            specifications: BTreeMap::new(),
            variants: Vec::new(),
            review_summary: None,
            seller: None,
            shipping: None,
            category: None,
            scraped_at: Utc::now(),
            provider: provider.to_owned(),
            ai_generated: false,
            cost_metadata: None,
        }
    }

    /// Returns `true` when the title contains more than whitespace.
    #[must_use]
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Returns the first gallery image, which vision repair analyzes.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub name: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub rating: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerInfo {
    pub name: String,
    pub rating: Option<f64>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub cost: f64,
    pub currency: String,
    pub free_shipping: bool,
}

/// Estimated vendor spend for one successful top-level scrape.
///
/// Attached by the orchestrator after success; persisted by callers and
/// aggregated later for usage-tier enforcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeCostMetadata {
    pub provider: String,
    pub platform: Platform,
    pub estimated_cost_usd: f64,
    /// RFC 3339 timestamp.
    pub scraped_at: String,
    pub duration_ms: u64,
}
