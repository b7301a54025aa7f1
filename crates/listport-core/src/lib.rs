pub mod app_config;
pub mod config;
pub mod products;
pub mod scraping_config;

use thiserror::Error;

pub use app_config::{AppConfig, ApifyCredentials, OxylabsCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{
    Platform, ProductVariant, ReviewSummary, ScrapeCostMetadata, ScrapedProduct, SellerInfo,
    ShippingInfo, MAX_PRODUCT_IMAGES,
};
pub use scraping_config::{load_scraping_config, ScrapingConfig, ScrapingConfigPatch};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read scraping config {path}: {source}")]
    ScrapingConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scraping config: {0}")]
    ScrapingConfigParse(#[from] serde_yaml::Error),

    #[error("invalid scraping config: {0}")]
    Validation(String),
}
