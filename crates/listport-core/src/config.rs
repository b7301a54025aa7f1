use std::path::{Path, PathBuf};

use crate::app_config::{AppConfig, ApifyCredentials, OxylabsCredentials};
use crate::products::Platform;
use crate::scraping_config::{load_scraping_config, parse_chain, ScrapingConfig};
use crate::ConfigError;

const DEFAULT_APIFY_ACTOR: &str = "apify/e-commerce-scraping-tool";
const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or the scraping config file
/// cannot be loaded.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or the scraping config file
/// cannot be loaded.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    // Blank values count as unset so `FOO=` in a .env file disables a provider.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default =
        |var: &str, default: &str| -> String { optional(var).unwrap_or_else(|| default.to_string()) };

    let parse_u32 = |var: &str| -> Result<Option<u32>, ConfigError> {
        optional(var)
            .map(|raw| {
                raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    };

    let parse_u64 = |var: &str| -> Result<Option<u64>, ConfigError> {
        optional(var)
            .map(|raw| {
                raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    };

    let apify = optional("APIFY_TOKEN").map(|token| ApifyCredentials { token });

    let oxylabs = match (optional("OXYLABS_USERNAME"), optional("OXYLABS_PASSWORD")) {
        (Some(username), Some(password)) => Some(OxylabsCredentials { username, password }),
        _ => None,
    };

    let mut scraping = match optional("LISTPORT_SCRAPING_CONFIG") {
        Some(path) => load_scraping_config(Path::new(&path))?,
        None => ScrapingConfig::default(),
    };

    for (platform, var) in [
        (Platform::Amazon, "LISTPORT_CHAIN_AMAZON"),
        (Platform::AliExpress, "LISTPORT_CHAIN_ALIEXPRESS"),
    ] {
        if let Some(raw) = optional(var) {
            scraping.provider_chains.insert(platform, parse_chain(&raw));
        }
    }
    if let Some(max_retries) = parse_u32("LISTPORT_MAX_RETRIES")? {
        scraping.max_retries = max_retries;
    }
    if let Some(delay) = parse_u64("LISTPORT_RETRY_DELAY_MS")? {
        scraping.retry_delay_ms_base = delay;
    }
    if let Some(timeout) = parse_u64("LISTPORT_TIMEOUT_MS")? {
        scraping.timeout_ms = timeout;
    }
    scraping.validate()?;

    Ok(AppConfig {
        log_level: or_default("LISTPORT_LOG_LEVEL", "info"),
        apify,
        apify_default_actor: or_default("APIFY_ACTOR_DEFAULT", DEFAULT_APIFY_ACTOR),
        apify_actor_amazon: optional("APIFY_ACTOR_AMAZON"),
        apify_actor_aliexpress: optional("APIFY_ACTOR_ALIEXPRESS"),
        oxylabs,
        gemini_api_key: optional("GEMINI_API_KEY"),
        vision_model: or_default("LISTPORT_VISION_MODEL", DEFAULT_VISION_MODEL),
        cache_dir: PathBuf::from(or_default("LISTPORT_CACHE_DIR", ".cache/apify")),
        cache_ttl_secs: parse_u64("LISTPORT_CACHE_TTL_SECS")?.unwrap_or(30 * 60),
        scraping,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
