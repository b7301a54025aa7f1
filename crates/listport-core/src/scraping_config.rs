//! Provider fallback chains and retry policy for the scraping orchestrator.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::Platform;
use crate::ConfigError;

/// Runtime-tunable orchestration policy.
///
/// The orchestrator holds one of these for its whole lifetime and swaps it
/// out wholesale on update, so readers never observe a half-applied change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Ordered provider names per platform; the first entry is the primary.
    pub provider_chains: BTreeMap<Platform, Vec<String>>,
    /// Attempts per provider before moving to the next one in the chain.
    pub max_retries: u32,
    /// Base for exponential backoff between attempts on the same provider.
    pub retry_delay_ms_base: u64,
    /// Ceiling for a single vendor request.
    pub timeout_ms: u64,
    /// When set, a structurally invalid result (no images, negative price)
    /// skips the provider's remaining attempts instead of retrying it.
    pub skip_retries_on_invalid_data: bool,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        let mut provider_chains = BTreeMap::new();
        provider_chains.insert(
            Platform::Amazon,
            vec!["oxylabs".to_string(), "apify".to_string()],
        );
        provider_chains.insert(
            Platform::AliExpress,
            vec!["apify".to_string(), "oxylabs".to_string()],
        );
        Self {
            provider_chains,
            max_retries: 2,
            retry_delay_ms_base: 1_000,
            timeout_ms: 120_000,
            skip_retries_on_invalid_data: false,
        }
    }
}

impl ScrapingConfig {
    /// Configured chain for `platform`, empty when none is set.
    #[must_use]
    pub fn chain_for(&self, platform: Platform) -> &[String] {
        self.provider_chains
            .get(&platform)
            .map_or(&[], Vec::as_slice)
    }

    /// Returns a new config with every field present in `patch` replaced.
    ///
    /// Chains in the patch replace the chain for that platform only; other
    /// platforms keep their current chain.
    #[must_use]
    pub fn merged(&self, patch: &ScrapingConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(chains) = &patch.provider_chains {
            for (platform, chain) in chains {
                next.provider_chains.insert(*platform, chain.clone());
            }
        }
        if let Some(max_retries) = patch.max_retries {
            next.max_retries = max_retries;
        }
        if let Some(delay) = patch.retry_delay_ms_base {
            next.retry_delay_ms_base = delay;
        }
        if let Some(timeout) = patch.timeout_ms {
            next.timeout_ms = timeout;
        }
        if let Some(skip) = patch.skip_retries_on_invalid_data {
            next.skip_retries_on_invalid_data = skip;
        }
        next
    }

    /// Checks the policy is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `max_retries` or `timeout_ms`
    /// is zero, or a chain contains a blank provider name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        for (platform, chain) in &self.provider_chains {
            if chain.iter().any(|name| name.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "provider chain for {platform} contains an empty provider name"
                )));
            }
        }
        Ok(())
    }
}

/// Partial update for [`ScrapingConfig`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapingConfigPatch {
    pub provider_chains: Option<BTreeMap<Platform, Vec<String>>>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms_base: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub skip_retries_on_invalid_data: Option<bool>,
}

/// Load and validate a [`ScrapingConfig`] from a YAML file.
///
/// Keys present in the file are applied over [`ScrapingConfig::default`];
/// a chain listed for one platform leaves the other platform's default chain
/// in place.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_scraping_config(path: &Path) -> Result<ScrapingConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ScrapingConfigIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let patch: ScrapingConfigPatch = serde_yaml::from_str(&content)?;
    let config = ScrapingConfig::default().merged(&patch);
    config.validate()?;

    Ok(config)
}

/// Parse a comma-separated provider chain, e.g. `"oxylabs, apify"`.
pub(crate) fn parse_chain(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
