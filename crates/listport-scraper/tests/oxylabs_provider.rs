//! Integration tests for `OxylabsProvider` against a wiremock realtime API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use listport_core::Platform;
use listport_scraper::{
    CancellationToken, ErrorCategory, OxylabsProvider, ScraperError, ScraperProvider,
};

const AMAZON_URL: &str = "https://www.amazon.de/dp/B08N5WRWNW?th=1";
const ALIEXPRESS_URL: &str = "https://www.aliexpress.com/item/1005006123456789.html";

fn provider(server: &MockServer) -> OxylabsProvider {
    OxylabsProvider::with_base_url("user", "pass", Duration::from_secs(5), &server.uri())
        .expect("failed to build test OxylabsProvider")
}

fn results(content: serde_json::Value, status_code: u16) -> serde_json::Value {
    json!({ "results": [{ "content": content, "status_code": status_code, "url": "https://example" }] })
}

#[tokio::test]
async fn amazon_query_uses_asin_source_and_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .and(basic_auth("user", "pass"))
        .and(body_partial_json(json!({
            "source": "amazon_product",
            "query": "B08N5WRWNW",
            "domain": "de",
            "parse": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            json!({
                "title": "Echo Dot",
                "price": 39.99,
                "currency": "EUR",
                "images": ["https://m.media-amazon.com/1.jpg"],
                "asin": "B08N5WRWNW"
            }),
            200,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let product = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .expect("scrape succeeds");

    assert_eq!(product.title, "Echo Dot");
    assert_eq!(product.currency, "EUR");
    assert_eq!(product.provider, "oxylabs");
    assert_eq!(product.source_url, AMAZON_URL);
}

#[tokio::test]
async fn aliexpress_query_uses_universal_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .and(body_partial_json(json!({
            "source": "universal_ecommerce",
            "url": ALIEXPRESS_URL,
            "render": "html"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            json!({
                "name": "LED Desk Lamp",
                "price": "12.34",
                "image": "https://ae01.alicdn.com/main.jpg"
            }),
            200,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let product = provider(&server)
        .scrape_product(ALIEXPRESS_URL, false, &CancellationToken::new())
        .await
        .expect("scrape succeeds");

    assert_eq!(product.title, "LED Desk Lamp");
    assert_eq!(product.platform, Platform::AliExpress);
    assert_eq!(product.images, vec!["https://ae01.alicdn.com/main.jpg"]);
}

#[tokio::test]
async fn server_error_is_transient_vendor_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Oxylabs API error (503): Service Unavailable"
    );
    assert!(err.is_transient());
    assert_eq!(err.category(), ErrorCategory::Vendor);
}

#[tokio::test]
async fn rejected_credentials_are_a_configuration_problem() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[tokio::test]
async fn upstream_page_status_is_checked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(json!({}), 404)))
        .mount(&server)
        .await;

    let err = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::VendorStatus { status: 404, .. }));
    assert!(err.to_string().contains("Oxylabs returned status 404"));
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::Deserialize { .. }));
}

#[tokio::test]
async fn slow_query_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let oxylabs =
        OxylabsProvider::with_base_url("user", "pass", Duration::from_millis(100), &server.uri())
            .expect("provider");
    let err = oxylabs
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Oxylabs request timed out after 100ms");
}

#[tokio::test]
async fn unsupported_url_never_reaches_the_vendor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server)
        .scrape_product("https://www.ebay.com/itm/1", false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::UnsupportedUrl { .. }));
}
