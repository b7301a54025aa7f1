//! The seam between the orchestrator and individual scraping vendors.

use async_trait::async_trait;
use listport_core::{Platform, ScrapedProduct};
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;

/// A scraping vendor able to turn a product URL into a [`ScrapedProduct`].
///
/// Implementations translate the vendor's own response shape into the
/// canonical product and fail with a descriptive [`ScraperError`] on vendor
/// HTTP errors, empty result sets or missing images. A missing title is not
/// an adapter error: the product is returned with an empty title and the
/// orchestrator decides whether vision repair can fill it.
///
/// Adapters never attach cost metadata.
#[async_trait]
pub trait ScraperProvider: Send + Sync {
    /// Registry name, e.g. `"apify"`. Used in provider chains and cost lookup.
    fn name(&self) -> &str;

    fn supported_platforms(&self) -> &[Platform];

    fn supports(&self, platform: Platform) -> bool {
        self.supported_platforms().contains(&platform)
    }

    /// Scrapes `url`. `force_refresh` bypasses any response cache the
    /// adapter keeps.
    async fn scrape_product(
        &self,
        url: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<ScrapedProduct, ScraperError>;
}
