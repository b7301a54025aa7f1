//! Scraping orchestration for marketplace product imports.
//!
//! Detects the marketplace behind a product URL, walks a per-platform chain
//! of metered scraping vendors with retry and fallback, normalizes each
//! vendor's response into a [`listport_core::ScrapedProduct`], repairs a
//! missing title with image analysis, and attaches an estimated cost.

pub mod cache;
pub mod cost;
pub mod error;
pub mod orchestrator;
pub mod platform;
pub mod provider;
pub mod providers;
pub mod vision;

mod field;
mod http;

pub use cache::ResponseCache;
pub use cost::{
    create_cost_metadata, estimate_scrape_cost, format_cost_for_display, sum_scrape_costs,
};
pub use error::{ErrorCategory, ScraperError};
pub use orchestrator::{
    AttemptObserver, AttemptRecord, Orchestrator, OrchestratorBuilder, ScrapeReport,
};
pub use platform::{detect_platform, extract_product_id, normalize_url};
pub use provider::ScraperProvider;
pub use providers::{ApifyProvider, OxylabsProvider};
pub use vision::{GeminiVision, VisionAnalysis, VisionAnalyzer};

pub use tokio_util::sync::CancellationToken;
