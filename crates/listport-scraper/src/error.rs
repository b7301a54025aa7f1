use listport_core::{ConfigError, Platform};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    #[error("{provider} API error ({status}): {body}")]
    VendorStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No product data returned from {provider}")]
    EmptyResult { provider: String },

    #[error("No {field} found in {provider} product data")]
    MissingField { provider: String, field: String },

    #[error("unexpected {provider} response: {reason}")]
    UnexpectedContent { provider: String, reason: String },

    #[error("response cache error at {path}: {source}")]
    Cache {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid product data: {reasons}")]
    InvalidProduct { reasons: String },

    #[error("Unsupported URL. Only AliExpress and Amazon URLs are supported. URL: {url}")]
    UnsupportedUrl { url: String },

    #[error(
        "No scraping providers configured. Please set APIFY_TOKEN or OXYLABS_USERNAME/OXYLABS_PASSWORD."
    )]
    NoProvidersConfigured,

    #[error("No providers available for {platform}. Configured: [{configured}], Available: [{available}]")]
    NoProvidersForPlatform {
        platform: Platform,
        configured: String,
        available: String,
    },

    #[error("failed to fetch product image {url}: {reason}")]
    ImageFetch { url: String, reason: String },

    #[error("vision analysis error: {0}")]
    Vision(String),

    #[error("Product from {provider} has no title and vision fallback is not configured (set GEMINI_API_KEY)")]
    VisionNotConfigured { provider: String },

    #[error("Product from {provider} has no title and vision fallback failed: {reason}")]
    VisionFailed { provider: String, reason: String },

    #[error(
        "All scraping providers failed for {platform}.\nURL: {url}\nAttempts: {attempts}\nLast error: {last_error}"
    )]
    AllProvidersFailed {
        platform: Platform,
        url: String,
        attempts: String,
        last_error: String,
        last_category: ErrorCategory,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification used by callers to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credentials or provider chains need fixing.
    Configuration,
    /// A vendor or the network misbehaved; retrying later may help.
    Vendor,
    /// The listing itself could not be read; try a different URL.
    Data,
}

impl ErrorCategory {
    /// Short operator-facing hint for this category.
    #[must_use]
    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Configuration => {
                "check scraping provider credentials and configuration"
            }
            ErrorCategory::Vendor => "the scraping vendor is unavailable, retry later",
            ErrorCategory::Data => {
                "the product listing could not be read, try a different product URL"
            }
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Vendor => write!(f, "vendor"),
            ErrorCategory::Data => write!(f, "data"),
        }
    }
}

// Request URLs are dropped so query strings never reach logs or messages.
impl From<reqwest::Error> for ScraperError {
    fn from(e: reqwest::Error) -> Self {
        ScraperError::Http(e.without_url())
    }
}

impl ScraperError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScraperError::NoProvidersConfigured
            | ScraperError::NoProvidersForPlatform { .. }
            | ScraperError::VisionNotConfigured { .. }
            | ScraperError::Config(_) => ErrorCategory::Configuration,
            // Rejected credentials are a configuration problem, not an outage.
            ScraperError::VendorStatus { status, .. } if matches!(status, 401 | 403) => {
                ErrorCategory::Configuration
            }
            ScraperError::UnsupportedUrl { .. }
            | ScraperError::EmptyResult { .. }
            | ScraperError::MissingField { .. }
            | ScraperError::UnexpectedContent { .. }
            | ScraperError::InvalidProduct { .. }
            | ScraperError::VisionFailed { .. } => ErrorCategory::Data,
            ScraperError::AllProvidersFailed { last_category, .. } => *last_category,
            ScraperError::Http(_)
            | ScraperError::Timeout { .. }
            | ScraperError::Cancelled { .. }
            | ScraperError::VendorStatus { .. }
            | ScraperError::Deserialize { .. }
            | ScraperError::Cache { .. }
            | ScraperError::ImageFetch { .. }
            | ScraperError::Vision(_) => ErrorCategory::Vendor,
        }
    }

    /// Returns `true` for conditions where the same request may succeed
    /// later: 429, 5xx, network failures, timeouts, malformed bodies.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(_)
            | ScraperError::Timeout { .. }
            | ScraperError::Deserialize { .. } => true,
            ScraperError::VendorStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
