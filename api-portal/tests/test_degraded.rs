// Copyright 2026 Oxide Computer Company

//! A catalog that can't be loaded leaves the server up with nothing in it.

use api_portal::assembler::ApiInfoResponse;
use api_portal::assembler::HealthResponse;
use api_portal::catalog::ApiDescriptor;
use http::Method;
use http::StatusCode;
use openapiv3::OpenAPI;
use serde_json::json;
use serde_json::Value;

pub mod common;
use common::test_setup;
use common::PortalTestContext;

/// Checks that every endpoint behaves as if the catalog were empty.
async fn assert_empty_catalog(testctx: &PortalTestContext) {
    let client = testctx.client();

    let health: HealthResponse = client.object_get("/health").await;
    assert_eq!(health.status, "OK");
    assert_eq!(health.apis_loaded, 0);

    let config: Value = client.object_get("/api/swagger-config").await;
    assert_eq!(config, json!({ "urls": [], "validatorUrl": null }));

    let apis: Vec<ApiDescriptor> = client.object_get("/api/apis").await;
    assert!(apis.is_empty());
    let apis: Vec<ApiDescriptor> = client.object_get("/api/search?q=w").await;
    assert!(apis.is_empty());
    let apis: Vec<ApiDescriptor> = client.object_get("/api/search").await;
    assert!(apis.is_empty());

    let info: ApiInfoResponse = client.object_get("/api").await;
    assert_eq!(info.total_apis, 0);

    let error = client
        .make_request_error(
            Method::GET,
            "/api/apis/Weather",
            StatusCode::NOT_FOUND,
        )
        .await;
    assert_eq!(error.error, "API not found");

    // Docs don't depend on the catalog at all.
    let doc: OpenAPI = client.object_get("/api/weather/api-docs").await;
    assert_eq!(doc.info.title, "API Documentation - /api/weather/api-docs");
}

#[tokio::test]
async fn test_missing_catalog() {
    let testctx = test_setup("missing_catalog", None);
    assert_empty_catalog(&testctx).await;
    testctx.teardown().await;
}

#[tokio::test]
async fn test_malformed_catalog() {
    let testctx = test_setup("malformed_catalog", Some("[{\"name\": "));
    assert_empty_catalog(&testctx).await;
    testctx.teardown().await;
}

#[tokio::test]
async fn test_catalog_not_an_array() {
    let testctx = test_setup(
        "catalog_not_an_array",
        Some(r#"{"name": "Weather", "url": "https://x/weather.json"}"#),
    );
    assert_empty_catalog(&testctx).await;
    testctx.teardown().await;
}

#[tokio::test]
async fn test_catalog_with_bad_entry() {
    // One bad entry rejects the whole payload.
    let testctx = test_setup(
        "catalog_with_bad_entry",
        Some(
            r#"[
                { "name": "Weather", "url": "https://x/weather.json" },
                { "name": "Maps" }
            ]"#,
        ),
    );
    assert_empty_catalog(&testctx).await;
    testctx.teardown().await;
}

#[tokio::test]
async fn test_empty_catalog() {
    let testctx = test_setup("empty_catalog", Some("[]"));
    assert_empty_catalog(&testctx).await;
    testctx.teardown().await;
}
