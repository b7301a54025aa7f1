//! Apify adapter: runs an e-commerce actor synchronously and reads its
//! dataset items.
//!
//! Raw response bodies are kept in a [`ResponseCache`] so repeated imports of
//! the same URL within the TTL cost nothing. The cache stores the body as
//! received; normalization runs on every read.

mod normalize;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use listport_core::{Platform, ScrapedProduct};
use reqwest::{Client, Url};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::cache::ResponseCache;
use crate::error::ScraperError;
use crate::http::{read_body, until_cancelled, with_deadline, BROWSER_USER_AGENT};
use crate::platform::detect_platform;
use crate::provider::ScraperProvider;

use normalize::normalize_item;
use types::{ApifyDatasetResponse, ApifyItem};

pub(crate) const PROVIDER_NAME: &str = "apify";

const DEFAULT_BASE_URL: &str = "https://api.apify.com/";

/// Actor used for every platform unless overridden.
pub const DEFAULT_ACTOR: &str = "apify/e-commerce-scraping-tool";

const SUPPORTED: [Platform; 2] = [Platform::Amazon, Platform::AliExpress];

/// Scraping provider backed by Apify actors.
pub struct ApifyProvider {
    client: Client,
    token: String,
    base_url: Url,
    timeout: Option<Duration>,
    actor_amazon: String,
    actor_aliexpress: String,
    cache: Option<ResponseCache>,
}

impl ApifyProvider {
    /// Creates a provider pointed at the production Apify API.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(token: &str, timeout: Duration) -> Result<Self, ScraperError> {
        Self::with_base_url(token, timeout, DEFAULT_BASE_URL)
    }

    /// Creates a provider with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed, or
    /// [`ScraperError::UnexpectedContent`] if `base_url` does not parse.
    pub fn with_base_url(
        token: &str,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ScraperError::UnexpectedContent {
            provider: "Apify".to_string(),
            reason: format!("invalid base URL '{base_url}': {e}"),
        })?;

        Ok(Self {
            client,
            token: token.to_owned(),
            base_url,
            timeout: Some(timeout),
            actor_amazon: DEFAULT_ACTOR.to_string(),
            actor_aliexpress: DEFAULT_ACTOR.to_string(),
            cache: None,
        })
    }

    /// Uses `actor_id` (e.g. `"junglee/amazon-crawler"`) for `platform`.
    #[must_use]
    pub fn with_actor(mut self, platform: Platform, actor_id: &str) -> Self {
        match platform {
            Platform::Amazon => self.actor_amazon = actor_id.to_owned(),
            Platform::AliExpress => self.actor_aliexpress = actor_id.to_owned(),
        }
        self
    }

    /// Drops the adapter's own request deadline, leaving it to the caller.
    ///
    /// The orchestrator applies its current `timeout_ms` to every attempt,
    /// so adapters it owns run without a second, fixed deadline.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Enables the response cache.
    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn actor_for(&self, platform: Platform) -> &str {
        match platform {
            Platform::Amazon => &self.actor_amazon,
            Platform::AliExpress => &self.actor_aliexpress,
        }
    }

    /// `POST {base}/v2/acts/{owner~name}/run-sync-get-dataset-items`
    fn run_url(&self, actor_id: &str) -> Result<Url, ScraperError> {
        // Apify addresses actors as `owner~name` in paths.
        let actor_path = actor_id.replace('/', "~");
        self.base_url
            .join(&format!("v2/acts/{actor_path}/run-sync-get-dataset-items"))
            .map_err(|e| ScraperError::UnexpectedContent {
                provider: "Apify".to_string(),
                reason: format!("invalid actor id '{actor_id}': {e}"),
            })
    }

    async fn run_actor(
        &self,
        url: &str,
        platform: Platform,
        cancel: &CancellationToken,
    ) -> Result<String, ScraperError> {
        let actor_id = self.actor_for(platform);
        let run_url = self.run_url(actor_id)?;
        let input = json!({
            "detailsUrls": [{ "url": url }],
            "maxProductResults": 1,
            "additionalProperties": true,
        });

        tracing::info!(actor = actor_id, platform = %platform, url, "running Apify actor");

        let request = async {
            let response = self
                .client
                .post(run_url)
                .bearer_auth(&self.token)
                .json(&input)
                .send()
                .await?;
            read_body("Apify", response).await
        };
        match self.timeout {
            Some(timeout) => with_deadline("Apify actor run", timeout, cancel, request).await,
            None => until_cancelled("Apify actor run", cancel, request).await,
        }
    }

    async fn cached_product(
        &self,
        key: &str,
        url: &str,
        platform: Platform,
    ) -> Option<ScrapedProduct> {
        let cache = self.cache.as_ref()?;
        let body = cache.get(key).await?;

        // A cached body that no longer parses is treated as a miss.
        match parse_first_item(&body).and_then(|item| normalize_item(item, url, platform)) {
            Ok(product) => {
                let age_secs = cache.age(key).await.map_or(0, |age| age.as_secs());
                tracing::info!(url, key, age_secs, "using cached Apify response");
                Some(product)
            }
            Err(e) => {
                tracing::warn!(url, key, error = %e, "discarding unusable cached Apify response");
                None
            }
        }
    }
}

/// Parses a dataset body and takes its first item.
fn parse_first_item(body: &str) -> Result<ApifyItem, ScraperError> {
    let response: ApifyDatasetResponse =
        serde_json::from_str(body).map_err(|e| ScraperError::Deserialize {
            context: "Apify dataset items".to_string(),
            source: e,
        })?;

    response
        .into_items()
        .into_iter()
        .next()
        .ok_or_else(|| ScraperError::EmptyResult {
            provider: "Apify".to_string(),
        })
}

#[async_trait]
impl ScraperProvider for ApifyProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supported_platforms(&self) -> &[Platform] {
        &SUPPORTED
    }

    async fn scrape_product(
        &self,
        url: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<ScrapedProduct, ScraperError> {
        let platform = detect_platform(url).ok_or_else(|| ScraperError::UnsupportedUrl {
            url: url.to_owned(),
        })?;
        let key = ResponseCache::cache_key(url);

        if !force_refresh {
            if let Some(product) = self.cached_product(&key, url, platform).await {
                return Ok(product);
            }
        }

        let body = self.run_actor(url, platform, cancel).await?;
        let item = parse_first_item(&body)?;

        // Only bodies that produced an item are worth caching.
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &body).await {
                tracing::warn!(url, error = %e, "failed to write Apify response cache");
            }
        }

        normalize_item(item, url, platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ApifyProvider {
        ApifyProvider::with_base_url("tok", Duration::from_secs(5), "http://localhost:9/")
            .expect("provider")
    }

    #[test]
    fn run_url_uses_tilde_actor_path_without_token() {
        let url = provider().run_url(DEFAULT_ACTOR).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9/v2/acts/apify~e-commerce-scraping-tool/run-sync-get-dataset-items"
        );
    }

    #[test]
    fn with_actor_overrides_one_platform_only() {
        let p = provider().with_actor(Platform::Amazon, "junglee/amazon-crawler");
        assert_eq!(p.actor_for(Platform::Amazon), "junglee/amazon-crawler");
        assert_eq!(p.actor_for(Platform::AliExpress), DEFAULT_ACTOR);
    }

    #[test]
    fn parse_first_item_accepts_array_and_envelope() {
        let item = parse_first_item(r#"[{"title": "Lamp"}]"#).unwrap();
        assert_eq!(item.title.as_deref(), Some("Lamp"));
        let item = parse_first_item(r#"{"items": [{"name": "Desk"}]}"#).unwrap();
        assert_eq!(item.name.as_deref(), Some("Desk"));
    }

    #[test]
    fn parse_first_item_rejects_empty_dataset() {
        let err = parse_first_item("[]").unwrap_err();
        assert!(matches!(err, ScraperError::EmptyResult { .. }));
        assert_eq!(err.to_string(), "No product data returned from Apify");
    }

    #[test]
    fn parse_first_item_rejects_non_json() {
        let err = parse_first_item("<html>busy</html>").unwrap_err();
        assert!(matches!(err, ScraperError::Deserialize { .. }));
    }
}
