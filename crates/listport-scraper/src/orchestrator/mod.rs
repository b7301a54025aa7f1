//! Scrape orchestration: provider fallback chains with retry, validation,
//! vision repair and cost attribution.
//!
//! One scrape runs as a single sequential flow:
//!
//! 1. detect the platform (unsupported URLs fail immediately);
//! 2. resolve the configured chain against the registered providers;
//! 3. try each provider up to `max_retries` times with exponential backoff
//!    between attempts of the same provider, validating every result;
//! 4. repair a missing title from the primary image when needed;
//! 5. attach cost metadata and return.
//!
//! The orchestrator holds no per-scrape state, so one instance is shared
//! across concurrent callers behind an `Arc`.

mod attempt;
mod validate;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use listport_core::{AppConfig, Platform, ScrapedProduct, ScrapingConfig, ScrapingConfigPatch};
use tokio_util::sync::CancellationToken;

use crate::cache::ResponseCache;
use crate::cost::create_cost_metadata;
use crate::error::{ErrorCategory, ScraperError};
use crate::http::{duration_ms, sleep_or_cancel, with_deadline};
use crate::platform::detect_platform;
use crate::provider::ScraperProvider;
use crate::providers::{ApifyProvider, OxylabsProvider};
use crate::vision::{GeminiVision, VisionAnalyzer};

pub use attempt::{AttemptObserver, AttemptRecord, ScrapeReport};

use attempt::{backoff_delay, summarize};
use validate::{validate_product, Readiness};

/// Drives product scrapes across the registered providers.
pub struct Orchestrator {
    providers: Vec<Arc<dyn ScraperProvider>>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    config: RwLock<Arc<ScrapingConfig>>,
    observer: Option<AttemptObserver>,
}

/// Assembles an [`Orchestrator`] from explicit parts.
#[derive(Default)]
pub struct OrchestratorBuilder {
    providers: Vec<Arc<dyn ScraperProvider>>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    config: ScrapingConfig,
    observer: Option<AttemptObserver>,
}

impl OrchestratorBuilder {
    /// Registers a provider. A later provider with the same name replaces
    /// the earlier one.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn ScraperProvider>) -> Self {
        self.providers.retain(|p| p.name() != provider.name());
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn vision(mut self, vision: Arc<dyn VisionAnalyzer>) -> Self {
        self.vision = Some(vision);
        self
    }

    #[must_use]
    pub fn config(mut self, config: ScrapingConfig) -> Self {
        self.config = config;
        self
    }

    /// Calls `observer` with every attempt record as it happens.
    #[must_use]
    pub fn on_attempt<F>(mut self, observer: F) -> Self
    where
        F: Fn(&AttemptRecord) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::NoProvidersConfigured`] when no provider was
    /// registered and [`ScraperError::Config`] when the config is invalid.
    pub fn build(self) -> Result<Orchestrator, ScraperError> {
        if self.providers.is_empty() {
            return Err(ScraperError::NoProvidersConfigured);
        }
        self.config.validate()?;

        Ok(Orchestrator {
            providers: self.providers,
            vision: self.vision,
            config: RwLock::new(Arc::new(self.config)),
            observer: self.observer,
        })
    }
}

impl Orchestrator {
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Builds the production orchestrator, registering a provider for each
    /// set of vendor credentials present in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::NoProvidersConfigured`] when neither Apify nor
    /// Oxylabs credentials are set, or [`ScraperError::Http`] if an HTTP
    /// client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let timeout = Duration::from_millis(config.scraping.timeout_ms);
        let mut builder = Self::builder().config(config.scraping.clone());

        if let Some(apify) = &config.apify {
            let cache = ResponseCache::new(
                &config.cache_dir,
                Duration::from_secs(config.cache_ttl_secs),
            );
            let provider = ApifyProvider::new(&apify.token, timeout)?
                .without_timeout()
                .with_actor(Platform::Amazon, config.apify_actor_for(Platform::Amazon))
                .with_actor(
                    Platform::AliExpress,
                    config.apify_actor_for(Platform::AliExpress),
                )
                .with_cache(cache);
            builder = builder.provider(Arc::new(provider));
        }

        if let Some(oxylabs) = &config.oxylabs {
            let provider = OxylabsProvider::new(&oxylabs.username, &oxylabs.password, timeout)?
                .without_timeout();
            builder = builder.provider(Arc::new(provider));
        }

        if let Some(api_key) = &config.gemini_api_key {
            let vision = GeminiVision::new(api_key, &config.vision_model)?;
            builder = builder.vision(Arc::new(vision));
        }

        let orchestrator = builder.build()?;
        tracing::info!(
            providers = ?orchestrator.available_providers(),
            vision = orchestrator.has_vision(),
            "scraping orchestrator ready"
        );
        Ok(orchestrator)
    }

    /// Names of the registered providers, in registration order.
    #[must_use]
    pub fn available_providers(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_owned()).collect()
    }

    #[must_use]
    pub fn has_vision(&self) -> bool {
        self.vision.is_some()
    }

    /// Snapshot of the current scraping configuration.
    #[must_use]
    pub fn config(&self) -> Arc<ScrapingConfig> {
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Applies `patch` on top of the current configuration.
    ///
    /// The merged config replaces the old one as a whole; scrapes already in
    /// flight keep the snapshot they started with.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Config`] if the merged configuration is
    /// invalid; the current configuration is left untouched.
    pub fn update_config(&self, patch: &ScrapingConfigPatch) -> Result<(), ScraperError> {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let merged = guard.merged(patch);
        merged.validate()?;
        tracing::info!(
            max_retries = merged.max_retries,
            retry_delay_ms_base = merged.retry_delay_ms_base,
            timeout_ms = merged.timeout_ms,
            "scraping config updated"
        );
        *guard = Arc::new(merged);
        Ok(())
    }

    /// Scrapes `url` with no caller cancellation.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::scrape_with_report`].
    pub async fn scrape_product(
        &self,
        url: &str,
        force_refresh: bool,
    ) -> Result<ScrapedProduct, ScraperError> {
        self.scrape_product_with_cancel(url, force_refresh, &CancellationToken::new())
            .await
    }

    /// Scrapes `url`, aborting in-flight work when `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::scrape_with_report`].
    pub async fn scrape_product_with_cancel(
        &self,
        url: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<ScrapedProduct, ScraperError> {
        self.scrape_with_report(url, force_refresh, cancel)
            .await
            .map(|report| report.product)
    }

    /// Scrapes `url` and returns the product with the attempt log.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnsupportedUrl`] if the URL is not a known marketplace.
    /// - [`ScraperError::NoProvidersForPlatform`] if no chain entry is registered.
    /// - [`ScraperError::VisionNotConfigured`] / [`ScraperError::VisionFailed`]
    ///   when a product needs a title and vision repair cannot supply one.
    /// - [`ScraperError::Cancelled`] if `cancel` fires.
    /// - [`ScraperError::AllProvidersFailed`] when every attempt failed.
    pub async fn scrape_with_report(
        &self,
        url: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<ScrapeReport, ScraperError> {
        let started = Instant::now();
        let config = self.config();

        let platform = detect_platform(url).ok_or_else(|| {
            tracing::warn!(url, "unsupported product URL");
            ScraperError::UnsupportedUrl {
                url: url.to_owned(),
            }
        })?;

        let chain = self.resolve_chain(&config, platform)?;
        let chain_names: Vec<&str> = chain.iter().map(|p| p.name()).collect();
        tracing::info!(
            url,
            platform = %platform,
            chain = ?chain_names,
            force_refresh,
            "starting scrape"
        );

        let timeout = Duration::from_millis(config.timeout_ms);
        let mut attempts = Vec::new();
        let mut last_error: Option<ScraperError> = None;

        for provider in &chain {
            let name = provider.name();

            for attempt in 1..=config.max_retries {
                let attempt_started = Instant::now();
                let outcome = with_deadline(
                    &format!("{name} scrape"),
                    timeout,
                    cancel,
                    provider.scrape_product(url, force_refresh, cancel),
                )
                .await
                .and_then(|product| validate_product(&product).map(|ready| (product, ready)));
                let elapsed = attempt_started.elapsed();

                match outcome {
                    Ok((product, readiness)) => {
                        self.record(
                            &mut attempts,
                            AttemptRecord::succeeded(name, attempt, elapsed),
                        );
                        tracing::info!(
                            provider = name,
                            attempt,
                            duration_ms = duration_ms(elapsed),
                            needs_vision = readiness == Readiness::NeedsVision,
                            "provider attempt succeeded"
                        );

                        let mut product = match readiness {
                            Readiness::Ready => product,
                            Readiness::NeedsVision => {
                                self.repair_title(product, platform, cancel).await?
                            }
                        };

                        let total = started.elapsed();
                        product.cost_metadata =
                            Some(create_cost_metadata(&product.provider, platform, total));
                        tracing::info!(
                            url,
                            provider = %product.provider,
                            attempts = attempts.len(),
                            duration_ms = duration_ms(total),
                            "scrape completed"
                        );
                        return Ok(ScrapeReport { product, attempts });
                    }
                    Err(e) => {
                        self.record(
                            &mut attempts,
                            AttemptRecord::failed(name, attempt, elapsed, e.to_string()),
                        );
                        tracing::warn!(
                            provider = name,
                            attempt,
                            max_attempts = config.max_retries,
                            duration_ms = duration_ms(elapsed),
                            error = %e,
                            "provider attempt failed"
                        );

                        if matches!(e, ScraperError::Cancelled { .. }) {
                            return Err(e);
                        }
                        let skip_rest = config.skip_retries_on_invalid_data
                            && matches!(e, ScraperError::InvalidProduct { .. });
                        last_error = Some(e);
                        if skip_rest {
                            tracing::info!(
                                provider = name,
                                "invalid product data, skipping remaining retries"
                            );
                            break;
                        }

                        if attempt < config.max_retries {
                            let delay = backoff_delay(config.retry_delay_ms_base, attempt);
                            tracing::info!(
                                provider = name,
                                next_attempt = attempt + 1,
                                delay_ms = duration_ms(delay),
                                "retrying provider after backoff"
                            );
                            sleep_or_cancel(delay, cancel).await?;
                        }
                    }
                }
            }

            tracing::warn!(provider = name, "provider exhausted, moving to next in chain");
        }

        let (last_error, last_category) = last_error.map_or_else(
            || ("no attempts were made".to_string(), ErrorCategory::Vendor),
            |e| (e.to_string(), e.category()),
        );
        tracing::error!(
            url,
            platform = %platform,
            attempts = %summarize(&attempts),
            error = %last_error,
            "all scraping providers failed"
        );
        Err(ScraperError::AllProvidersFailed {
            platform,
            url: url.to_owned(),
            attempts: summarize(&attempts),
            last_error,
            last_category,
        })
    }

    /// Configured chain for `platform`, limited to registered providers that
    /// support it.
    fn resolve_chain(
        &self,
        config: &ScrapingConfig,
        platform: Platform,
    ) -> Result<Vec<Arc<dyn ScraperProvider>>, ScraperError> {
        let configured = config.chain_for(platform);
        let chain: Vec<Arc<dyn ScraperProvider>> = configured
            .iter()
            .filter_map(|name| self.providers.iter().find(|p| p.name() == name.as_str()))
            .filter(|p| p.supports(platform))
            .cloned()
            .collect();

        if chain.is_empty() {
            tracing::error!(
                platform = %platform,
                configured = ?configured,
                "no registered provider in chain"
            );
            return Err(ScraperError::NoProvidersForPlatform {
                platform,
                configured: configured.join(", "),
                available: self.available_providers().join(", "),
            });
        }
        Ok(chain)
    }

    /// Fills in title and description from the primary image.
    async fn repair_title(
        &self,
        mut product: ScrapedProduct,
        platform: Platform,
        cancel: &CancellationToken,
    ) -> Result<ScrapedProduct, ScraperError> {
        let Some(vision) = &self.vision else {
            tracing::error!(
                provider = %product.provider,
                "product has no title and vision is not configured"
            );
            return Err(ScraperError::VisionNotConfigured {
                provider: product.provider,
            });
        };
        let Some(image_url) = product.primary_image().map(str::to_owned) else {
            return Err(ScraperError::VisionFailed {
                provider: product.provider,
                reason: "no image to analyze".to_string(),
            });
        };

        tracing::info!(
            provider = %product.provider,
            image_url = %image_url,
            "product has no title, running vision repair"
        );
        match vision.analyze_image(&image_url, platform, cancel).await {
            Ok(analysis) => {
                product.title = analysis.title;
                if !analysis.description.is_empty() {
                    product.description = analysis.description;
                }
                product.category = analysis.category;
                product.provider = format!("{}+vision", product.provider);
                product.ai_generated = true;
                Ok(product)
            }
            Err(e @ ScraperError::Cancelled { .. }) => Err(e),
            Err(e) => {
                tracing::error!(provider = %product.provider, error = %e, "vision repair failed");
                Err(ScraperError::VisionFailed {
                    provider: product.provider,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn record(&self, attempts: &mut Vec<AttemptRecord>, record: AttemptRecord) {
        if let Some(observer) = &self.observer {
            observer(&record);
        }
        attempts.push(record);
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
