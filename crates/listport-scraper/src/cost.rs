//! Per-call cost estimates for metered scraping vendors.
//!
//! Figures are approximate list prices used for budgeting and usage-tier
//! accounting, not invoices.

use std::time::Duration;

use chrono::Utc;
use listport_core::{Platform, ScrapeCostMetadata};

/// Vision analysis surcharge per repaired product.
pub const VISION_COST_USD: f64 = 0.005;

/// Used when a provider/platform pair has no entry in the table.
pub const DEFAULT_COST_USD: f64 = 0.02;

/// Estimated USD cost of one call to `provider` for `platform`.
#[must_use]
pub fn provider_cost(provider: &str, platform: Platform) -> Option<f64> {
    match (provider, platform) {
        ("apify", Platform::AliExpress) => Some(0.015),
        ("apify" | "oxylabs", Platform::Amazon) => Some(0.02),
        ("oxylabs", Platform::AliExpress) => Some(0.025),
        _ => None,
    }
}

/// Estimates the cost of one scrape, summing compound attributions such as
/// `"oxylabs+vision"`.
///
/// Unknown combinations fall back to [`DEFAULT_COST_USD`] so usage is never
/// under-counted as free.
#[must_use]
pub fn estimate_scrape_cost(provider: &str, platform: Platform) -> f64 {
    let total: f64 = provider
        .to_ascii_lowercase()
        .split('+')
        .map(str::trim)
        .filter_map(|part| {
            if part == "vision" {
                Some(VISION_COST_USD)
            } else {
                provider_cost(part, platform)
            }
        })
        .sum();

    if total > 0.0 {
        total
    } else {
        tracing::warn!(
            provider,
            platform = %platform,
            default_cost_usd = DEFAULT_COST_USD,
            "unknown provider/platform combination, using default cost"
        );
        DEFAULT_COST_USD
    }
}

/// Builds the cost record attached to a successful scrape.
#[must_use]
pub fn create_cost_metadata(
    provider: &str,
    platform: Platform,
    duration: Duration,
) -> ScrapeCostMetadata {
    ScrapeCostMetadata {
        provider: provider.to_owned(),
        platform,
        estimated_cost_usd: estimate_scrape_cost(provider, platform),
        scraped_at: Utc::now().to_rfc3339(),
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Total estimated spend across cost records.
#[must_use]
pub fn sum_scrape_costs(costs: &[ScrapeCostMetadata]) -> f64 {
    costs.iter().map(|c| c.estimated_cost_usd).sum()
}

/// Formats a cost for display: `"$X.XX"`, or `"< $0.01"` below one cent.
#[must_use]
pub fn format_cost_for_display(cost_usd: f64) -> String {
    if cost_usd < 0.01 {
        "< $0.01".to_string()
    } else {
        format!("${cost_usd:.2}")
    }
}
