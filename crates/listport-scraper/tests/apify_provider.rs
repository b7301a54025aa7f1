//! Integration tests for `ApifyProvider` against a wiremock Apify API.
//!
//! Covers normalization of a dataset response, the response cache
//! (hit, bypass via `force_refresh`, no caching of empty results) and the
//! vendor and transport error paths.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use listport_core::Platform;
use listport_scraper::{
    ApifyProvider, CancellationToken, ResponseCache, ScraperError, ScraperProvider,
};

const RUN_PATH: &str = "/v2/acts/apify~e-commerce-scraping-tool/run-sync-get-dataset-items";
const AMAZON_URL: &str = "https://www.amazon.com/Widget/dp/B08N5WRWNW";

fn dataset() -> serde_json::Value {
    json!([{
        "title": "Widget Pro",
        "price": 19.99,
        "currency": "USD",
        "images": ["https://cdn.example/x.jpg"],
        "additionalProperties": { "asin": "B08N5WRWNW" }
    }])
}

fn provider(server: &MockServer) -> ApifyProvider {
    ApifyProvider::with_base_url("apify_api_test", Duration::from_secs(5), &server.uri())
        .expect("failed to build test ApifyProvider")
}

fn cached_provider(server: &MockServer, dir: &tempfile::TempDir) -> ApifyProvider {
    provider(server).with_cache(ResponseCache::new(dir.path(), ResponseCache::DEFAULT_TTL))
}

#[tokio::test]
async fn scrape_product_posts_actor_input_and_normalizes_first_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RUN_PATH))
        .and(header("authorization", "Bearer apify_api_test"))
        .and(body_partial_json(json!({
            "detailsUrls": [{ "url": AMAZON_URL }],
            "maxProductResults": 1,
            "additionalProperties": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset()))
        .expect(1)
        .mount(&server)
        .await;

    let product = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .expect("scrape succeeds");

    assert_eq!(product.title, "Widget Pro");
    assert_eq!(product.platform, Platform::Amazon);
    assert_eq!(product.provider, "apify");
    assert_eq!(product.sku.as_deref(), Some("B08N5WRWNW"));
    assert_eq!(product.images, vec!["https://cdn.example/x.jpg"]);
    assert!(product.cost_metadata.is_none());
}

#[tokio::test]
async fn per_platform_actor_override_changes_the_run_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/acts/junglee~amazon-crawler/run-sync-get-dataset-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset()))
        .expect(1)
        .mount(&server)
        .await;

    let product = provider(&server)
        .with_actor(Platform::Amazon, "junglee/amazon-crawler")
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .expect("scrape succeeds");
    assert_eq!(product.title, "Widget Pro");
}

#[tokio::test]
async fn second_scrape_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RUN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let apify = cached_provider(&server, &dir);
    let cancel = CancellationToken::new();

    let first = apify.scrape_product(AMAZON_URL, false, &cancel).await.unwrap();
    let second = apify.scrape_product(AMAZON_URL, false, &cancel).await.unwrap();

    assert_eq!(first.title, second.title);
    assert_eq!(first.images, second.images);
    let key = ResponseCache::cache_key(AMAZON_URL);
    assert!(dir.path().join(format!("{key}.json")).exists());
}

#[tokio::test]
async fn force_refresh_always_calls_the_vendor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RUN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset()))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let apify = cached_provider(&server, &dir);
    let cancel = CancellationToken::new();

    apify.scrape_product(AMAZON_URL, true, &cancel).await.unwrap();
    apify.scrape_product(AMAZON_URL, true, &cancel).await.unwrap();
}

#[tokio::test]
async fn empty_dataset_is_an_error_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RUN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let apify = cached_provider(&server, &dir);
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let err = apify
            .scrape_product(AMAZON_URL, false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::EmptyResult { .. }));
    }
    assert!(ResponseCache::new(dir.path(), ResponseCache::DEFAULT_TTL)
        .get(&ResponseCache::cache_key(AMAZON_URL))
        .await
        .is_none());
}

#[tokio::test]
async fn vendor_error_includes_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RUN_PATH))
        .respond_with(ResponseTemplate::new(402).set_body_string("Monthly usage hard limit exceeded"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::VendorStatus { status: 402, .. }));
    assert_eq!(
        err.to_string(),
        "Apify API error (402): Monthly usage hard limit exceeded"
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn slow_actor_run_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RUN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(dataset())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let apify = ApifyProvider::with_base_url("t", Duration::from_millis(100), &server.uri())
        .expect("provider");
    let err = apify
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Apify actor run timed out after 100ms");
    assert!(err.is_transient());
}

#[tokio::test]
async fn item_without_images_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RUN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "title": "Widget Pro" }])),
        )
        .mount(&server)
        .await;

    let err = provider(&server)
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No images found in Apify product data");
}

#[tokio::test]
async fn connection_error_does_not_expose_the_token() {
    // Nothing listens on port 1.
    let apify = ApifyProvider::with_base_url(
        "SECRET-APIFY-TOKEN",
        Duration::from_secs(5),
        "http://127.0.0.1:1/",
    )
    .expect("provider");
    let err = apify
        .scrape_product(AMAZON_URL, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::Http(_)), "unexpected error: {err}");
    assert!(!err.to_string().contains("SECRET-APIFY-TOKEN"));
    assert!(!format!("{err:?}").contains("SECRET-APIFY-TOKEN"));
}
