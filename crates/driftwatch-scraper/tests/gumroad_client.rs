//! Integration tests for `GumroadClient` against a local wiremock server.
//!
//! The client performs exactly one request per call, so every error variant
//! maps to exactly one canned response. Pagination and detail merging are
//! exercised end to end with no real network traffic.

use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use driftwatch_scraper::{AdapterError, GumroadClient, RawObservation, SourceAdapter};

fn test_client() -> GumroadClient {
    GumroadClient::new(5, "driftwatch-test/0.1").expect("failed to build test GumroadClient")
}

#[tokio::test]
async fn fetch_listing_parses_products_and_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "products": [
                {"id": "a1", "url": "https://gumroad.com/l/a1", "name": "A"},
                {"id": "a2", "url": "https://gumroad.com/l/a2", "name": "B"}
            ],
            "next_page_token": "cursor2"
        })))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let page = client.fetch_listing(&listing_url, None).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].product_id.as_deref(), Some("a1"));
    assert_eq!(page.next_page_token.as_deref(), Some("cursor2"));
}

#[tokio::test]
async fn fetch_listing_second_page_sends_page_param() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "products": [{"id": "p1", "url": "https://gumroad.com/l/p1", "name": "One"}],
            "next_page_token": "cursor2"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .and(query_param("page", "cursor2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "products": [{"id": "p2", "url": "https://gumroad.com/l/p2", "name": "Two"}],
            "next_page_token": null
        })))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());

    let first = client.fetch_listing(&listing_url, None).await.unwrap();
    assert_eq!(first.next_page_token.as_deref(), Some("cursor2"));

    let second = client
        .fetch_listing(&listing_url, first.next_page_token.as_deref())
        .await
        .unwrap();
    assert_eq!(second.items[0].product_id.as_deref(), Some("p2"));
    assert!(second.next_page_token.is_none());
}

#[tokio::test]
async fn fetch_listing_tolerates_missing_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "products": [{"name": "Bare Card"}]
        })))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let page = client.fetch_listing(&listing_url, None).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert!(page.items[0].product_id.is_none());
    assert!(page.items[0].url.is_none());
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn fetch_listing_maps_429_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let err = client.fetch_listing(&listing_url, None).await.unwrap_err();

    match err {
        AdapterError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 30),
        other => panic!("expected AdapterError::RateLimited, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_listing_429_without_header_defaults_to_60s() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let err = client.fetch_listing(&listing_url, None).await.unwrap_err();

    match err {
        AdapterError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 60),
        other => panic!("expected AdapterError::RateLimited, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_listing_maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let err = client.fetch_listing(&listing_url, None).await.unwrap_err();

    assert!(
        matches!(err, AdapterError::NotFound { .. }),
        "expected AdapterError::NotFound, got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_listing_maps_5xx_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let err = client.fetch_listing(&listing_url, None).await.unwrap_err();

    match err {
        AdapterError::UnexpectedStatus { status, .. } => assert_eq!(status, 503),
        other => panic!("expected AdapterError::UnexpectedStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_listing_maps_malformed_json_to_deserialize() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is not json"))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let err = client.fetch_listing(&listing_url, None).await.unwrap_err();

    assert!(
        matches!(err, AdapterError::Deserialize { .. }),
        "expected AdapterError::Deserialize, got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_detail_returns_detail_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/l/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "rating_text": "4.9 (200)",
            "sales_text": "1.2K sales",
            "tags": ["figma", "design"]
        })))
        .mount(&server)
        .await;

    let client = test_client();
    let observation = RawObservation {
        url: Some(format!("{}/l/abc", server.uri())),
        ..RawObservation::default()
    };
    let detail = client.fetch_detail(&observation).await.unwrap();

    assert_eq!(detail.rating_text.as_deref(), Some("4.9 (200)"));
    assert_eq!(detail.sales_text.as_deref(), Some("1.2K sales"));
    assert_eq!(detail.tags.len(), 2);
}

#[tokio::test]
async fn fetch_detail_without_url_is_malformed() {
    let client = test_client();
    let err = client
        .fetch_detail(&RawObservation::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, AdapterError::Malformed { field: "url" }),
        "expected AdapterError::Malformed, got: {err:?}"
    );
}

#[tokio::test]
async fn capture_diagnostics_reports_status_and_snippet() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(403).set_body_string("blocked by upstream"))
        .mount(&server)
        .await;

    let client = test_client();
    let listing_url = format!("{}/discover", server.uri());
    let diagnostics = client.capture_diagnostics(&listing_url).await.unwrap();

    assert_eq!(diagnostics["status"], 403);
    assert_eq!(diagnostics["body_snippet"], "blocked by upstream");
}
