use std::path::PathBuf;

use crate::products::Platform;
use crate::scraping_config::ScrapingConfig;

#[derive(Clone)]
pub struct ApifyCredentials {
    pub token: String,
}

#[derive(Clone)]
pub struct OxylabsCredentials {
    pub username: String,
    pub password: String,
}

/// Process-level configuration, built once at startup and handed to the
/// orchestrator constructor.
#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub apify: Option<ApifyCredentials>,
    /// Actor used when no per-platform override is set.
    pub apify_default_actor: String,
    pub apify_actor_amazon: Option<String>,
    pub apify_actor_aliexpress: Option<String>,
    pub oxylabs: Option<OxylabsCredentials>,
    pub gemini_api_key: Option<String>,
    pub vision_model: String,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub scraping: ScrapingConfig,
}

impl AppConfig {
    /// Apify actor id for `platform`, honoring per-platform overrides.
    #[must_use]
    pub fn apify_actor_for(&self, platform: Platform) -> &str {
        let specific = match platform {
            Platform::Amazon => self.apify_actor_amazon.as_deref(),
            Platform::AliExpress => self.apify_actor_aliexpress.as_deref(),
        };
        specific.unwrap_or(&self.apify_default_actor)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("apify_token", &self.apify.as_ref().map(|_| "[redacted]"))
            .field("apify_default_actor", &self.apify_default_actor)
            .field("apify_actor_amazon", &self.apify_actor_amazon)
            .field("apify_actor_aliexpress", &self.apify_actor_aliexpress)
            .field(
                "oxylabs_username",
                &self.oxylabs.as_ref().map(|c| c.username.as_str()),
            )
            .field(
                "oxylabs_password",
                &self.oxylabs.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("vision_model", &self.vision_model)
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("scraping", &self.scraping)
            .finish()
    }
}
