// Copyright 2026 Oxide Computer Company

//! Response bodies for the portal's endpoints
//!
//! Everything here is a pure function of the catalog (plus the clock or the
//! uptime where a body reports them).  Handlers pick the shape they need and
//! hand it to [`crate::HttpResponseOk`].

use crate::catalog::ApiDescriptor;
use crate::catalog::Catalog;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

pub const PORTAL_MESSAGE: &str = "API Portal Server";
pub const PORTAL_VERSION: &str = "1.0.0";

/// Sent when the swagger-config body can't be produced.
pub const MESSAGE_SWAGGER_CONFIG_FAILED: &str =
    "Failed to load API configuration";
/// Sent when the full listing can't be produced.
pub const MESSAGE_APIS_FAILED: &str = "Failed to load APIs";
/// Sent when search results can't be produced.
pub const MESSAGE_SEARCH_FAILED: &str = "Search failed";
/// Sent when a single descriptor can't be produced.
pub const MESSAGE_API_FAILED: &str = "Failed to load API";
/// Sent when the API information summary can't be produced.
pub const MESSAGE_API_INFO_FAILED: &str = "Failed to load API information";

/// Configuration document consumed by the portal's Swagger UI
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwaggerConfigResponse {
    pub urls: Vec<ApiDescriptor>,
    /// always null: the portal doesn't ask a remote validator about specs
    pub validator_url: Option<String>,
}

/// Relative paths of the portal's endpoints, as advertised by `GET /api`
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EndpointMap {
    #[serde(rename = "swagger-config")]
    pub swagger_config: String,
    pub apis: String,
    pub search: String,
    pub health: String,
    pub docs: String,
}

impl Default for EndpointMap {
    fn default() -> Self {
        EndpointMap {
            swagger_config: String::from("/api/swagger-config"),
            apis: String::from("/api/apis"),
            search: String::from("/api/search?q=term"),
            health: String::from("/health"),
            docs: String::from("/api/*/api-docs"),
        }
    }
}

/// Summary returned by `GET /api`
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfoResponse {
    pub message: String,
    pub version: String,
    pub endpoints: EndpointMap,
    pub total_apis: usize,
    pub timestamp: String,
}

/// Status returned by `GET /health`
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub apis_loaded: usize,
    /// seconds since the server started
    pub uptime: f64,
}

/// Formats `when` the way every body reports time: ISO-8601 in UTC with
/// millisecond precision, e.g. `2026-10-19T12:34:56.789Z`.
pub fn timestamp(when: DateTime<Utc>) -> String {
    when.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn swagger_config(catalog: &Catalog) -> SwaggerConfigResponse {
    SwaggerConfigResponse { urls: catalog.all().to_vec(), validator_url: None }
}

/// Properties that accompany the error message when the swagger-config body
/// can't be produced, so the portal still receives a usable configuration.
pub fn swagger_config_defaults() -> Map<String, Value> {
    let mut defaults = Map::new();
    defaults.insert(String::from("urls"), Value::Array(Vec::new()));
    defaults.insert(String::from("validatorUrl"), Value::Null);
    defaults
}

pub fn api_info(catalog: &Catalog, now: DateTime<Utc>) -> ApiInfoResponse {
    ApiInfoResponse {
        message: PORTAL_MESSAGE.to_string(),
        version: PORTAL_VERSION.to_string(),
        endpoints: EndpointMap::default(),
        total_apis: catalog.len(),
        timestamp: timestamp(now),
    }
}

pub fn health(
    catalog: &Catalog,
    uptime_seconds: f64,
    now: DateTime<Utc>,
) -> HealthResponse {
    HealthResponse {
        status: String::from("OK"),
        timestamp: timestamp(now),
        apis_loaded: catalog.len(),
        uptime: uptime_seconds,
    }
}
