//! Vendor adapters implementing [`crate::ScraperProvider`].

pub mod apify;
pub mod oxylabs;

pub use apify::ApifyProvider;
pub use oxylabs::OxylabsProvider;
