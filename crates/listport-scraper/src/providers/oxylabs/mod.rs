//! Oxylabs adapter: one realtime query per scrape, with Oxylabs doing the
//! page parsing.
//!
//! Amazon goes through the dedicated `amazon_product` source keyed by ASIN;
//! every other platform uses `universal_ecommerce` with a rendered page.

mod normalize;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use listport_core::{Platform, ScrapedProduct};
use reqwest::{Client, Url};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;
use crate::http::{read_body, until_cancelled, with_deadline};
use crate::platform::{amazon_domain, detect_platform, extract_product_id};
use crate::provider::ScraperProvider;

use normalize::{normalize_amazon, normalize_universal};
use types::{OxylabsAmazonProduct, OxylabsResponse, OxylabsUniversalProduct};

pub(crate) const PROVIDER_NAME: &str = "oxylabs";

const DEFAULT_BASE_URL: &str = "https://realtime.oxylabs.io/";

const SUPPORTED: [Platform; 2] = [Platform::Amazon, Platform::AliExpress];

/// Scraping provider backed by the Oxylabs realtime API.
pub struct OxylabsProvider {
    client: Client,
    username: String,
    password: String,
    endpoint: Url,
    timeout: Option<Duration>,
}

impl OxylabsProvider {
    /// Creates a provider pointed at the production realtime endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(username: &str, password: &str, timeout: Duration) -> Result<Self, ScraperError> {
        Self::with_base_url(username, password, timeout, DEFAULT_BASE_URL)
    }

    /// Creates a provider with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed, or
    /// [`ScraperError::UnexpectedContent`] if `base_url` does not parse.
    pub fn with_base_url(
        username: &str,
        password: &str,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("listport/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join("v1/queries"))
            .map_err(|e| ScraperError::UnexpectedContent {
                provider: "Oxylabs".to_string(),
                reason: format!("invalid base URL '{base_url}': {e}"),
            })?;

        Ok(Self {
            client,
            username: username.to_owned(),
            password: password.to_owned(),
            endpoint,
            timeout: Some(timeout),
        })
    }

    /// Drops the adapter's own request deadline, leaving it to the caller.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Request body for `url` on `platform`.
    fn payload(url: &str, platform: Platform) -> Result<Value, ScraperError> {
        match platform {
            Platform::Amazon => {
                let asin = extract_product_id(url, Platform::Amazon).ok_or_else(|| {
                    ScraperError::UnexpectedContent {
                        provider: "Oxylabs".to_string(),
                        reason: format!("could not extract ASIN from URL: {url}"),
                    }
                })?;
                Ok(json!({
                    "source": "amazon_product",
                    "query": asin,
                    "domain": amazon_domain(url),
                    "parse": true,
                }))
            }
            Platform::AliExpress => Ok(json!({
                "source": "universal_ecommerce",
                "url": url,
                "parse": true,
                "render": "html",
            })),
        }
    }

    async fn query(
        &self,
        payload: &Value,
        cancel: &CancellationToken,
    ) -> Result<String, ScraperError> {
        let request = async {
            let response = self
                .client
                .post(self.endpoint.clone())
                .basic_auth(&self.username, Some(&self.password))
                .json(payload)
                .send()
                .await?;
            read_body("Oxylabs", response).await
        };
        match self.timeout {
            Some(timeout) => with_deadline("Oxylabs request", timeout, cancel, request).await,
            None => until_cancelled("Oxylabs request", cancel, request).await,
        }
    }
}

/// Pulls the parsed content of the first result out of a response body.
fn first_content(body: &str) -> Result<Value, ScraperError> {
    let response: OxylabsResponse =
        serde_json::from_str(body).map_err(|e| ScraperError::Deserialize {
            context: "Oxylabs query response".to_string(),
            source: e,
        })?;

    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ScraperError::EmptyResult {
            provider: "Oxylabs".to_string(),
        })?;

    if let Some(status) = result.status_code.filter(|s| *s != 200) {
        return Err(ScraperError::VendorStatus {
            provider: "Oxylabs".to_string(),
            status,
            body: format!("Oxylabs returned status {status}"),
        });
    }

    match result.content {
        Value::Object(_) => Ok(result.content),
        Value::String(_) => Err(ScraperError::UnexpectedContent {
            provider: "Oxylabs".to_string(),
            reason: "content was returned unparsed".to_string(),
        }),
        _ => Err(ScraperError::EmptyResult {
            provider: "Oxylabs".to_string(),
        }),
    }
}

fn decode_content<T: serde::de::DeserializeOwned>(content: Value) -> Result<T, ScraperError> {
    serde_json::from_value(content).map_err(|e| ScraperError::Deserialize {
        context: "Oxylabs parsed content".to_string(),
        source: e,
    })
}

#[async_trait]
impl ScraperProvider for OxylabsProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supported_platforms(&self) -> &[Platform] {
        &SUPPORTED
    }

    /// Oxylabs keeps no response cache, so `force_refresh` has no effect.
    async fn scrape_product(
        &self,
        url: &str,
        _force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<ScrapedProduct, ScraperError> {
        let platform = detect_platform(url).ok_or_else(|| ScraperError::UnsupportedUrl {
            url: url.to_owned(),
        })?;
        let payload = Self::payload(url, platform)?;

        tracing::info!(
            source = payload["source"].as_str().unwrap_or_default(),
            platform = %platform,
            url,
            "querying Oxylabs"
        );

        let body = self.query(&payload, cancel).await?;
        let content = first_content(&body)?;

        match platform {
            Platform::Amazon => {
                normalize_amazon(decode_content::<OxylabsAmazonProduct>(content)?, url)
            }
            Platform::AliExpress => normalize_universal(
                decode_content::<OxylabsUniversalProduct>(content)?,
                url,
                platform,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amazon_payload_uses_asin_and_domain() {
        let url = "https://www.amazon.co.uk/gp/product/B08N5WRWNW";
        let payload = OxylabsProvider::payload(url, Platform::Amazon).unwrap();
        assert_eq!(
            payload,
            json!({
                "source": "amazon_product",
                "query": "B08N5WRWNW",
                "domain": "co.uk",
                "parse": true,
            })
        );
    }

    #[test]
    fn aliexpress_payload_renders_the_page() {
        let url = "https://www.aliexpress.com/item/1005006123456789.html";
        let payload = OxylabsProvider::payload(url, Platform::AliExpress).unwrap();
        assert_eq!(payload["source"], "universal_ecommerce");
        assert_eq!(payload["url"], url);
        assert_eq!(payload["render"], "html");
    }

    #[test]
    fn first_content_rejects_non_200_result() {
        let body = r#"{"results": [{"content": {}, "status_code": 404}]}"#;
        let err = first_content(body).unwrap_err();
        assert!(matches!(err, ScraperError::VendorStatus { status: 404, .. }));
        assert!(err.to_string().contains("Oxylabs returned status 404"));
    }

    #[test]
    fn first_content_rejects_empty_and_unparsed_results() {
        assert!(matches!(
            first_content(r#"{"results": []}"#).unwrap_err(),
            ScraperError::EmptyResult { .. }
        ));
        assert!(matches!(
            first_content(r#"{"results": [{"content": "<html></html>", "status_code": 200}]}"#)
                .unwrap_err(),
            ScraperError::UnexpectedContent { .. }
        ));
    }

    #[test]
    fn first_content_returns_parsed_object() {
        let content =
            first_content(r#"{"results": [{"content": {"title": "x"}, "status_code": 200}]}"#)
                .unwrap();
        assert_eq!(content["title"], "x");
    }
}
