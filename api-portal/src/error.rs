// Copyright 2026 Oxide Computer Company

//! Error handling for the portal's HTTP surface
//!
//! Every request concludes with a response.  Failures come from two places:
//!
//! * The HTTP layer itself: no route matched the request, the path couldn't
//!   be decoded, the query string was malformed, or a handler panicked.
//! * The portal's endpoints: a descriptor lookup found nothing, or a
//!   response body couldn't be encoded.
//!
//! The domain-level failures are described by [`PortalError`], which knows
//! nothing about status codes.  Both kinds end up as an [`HttpError`], which
//! carries a status code, the message sent to the client, and a separate
//! message for the log.  Clients always see the same body shape:
//!
//! ```text
//! { "error": "<external message>" }
//! ```
//!
//! Some endpoints extend that body with safe defaults so that the portal
//! never receives a malformed document even when something went wrong (see
//! [`HttpError::with_body_defaults`]).
//!
//! Catalog load failures are deliberately absent here.  They are recovered at
//! startup (see [`crate::catalog::Catalog::load_or_empty`]) and never reach
//! a client.

use crate::http_util::Body;
use crate::http_util::CONTENT_TYPE_JSON;
use http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use std::error::Error;
use std::fmt;

/// Message sent for any failure that doesn't have a more specific one.
pub const MESSAGE_GENERIC: &str = "Something went wrong!";
/// Message sent when no route matches the request.
pub const MESSAGE_ROUTE_NOT_FOUND: &str = "Route not found";
/// Message sent when a descriptor lookup by name comes up empty.
pub const MESSAGE_API_NOT_FOUND: &str = "API not found";

/// Domain-level failures raised while serving a request
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// no descriptor in the catalog has exactly this name
    #[error("no API named {name:?}")]
    NotFound { name: String },

    /// a response body could not be assembled
    #[error("assembling {context}: {source}")]
    Assembly {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// no handler is registered for the request's method and path
    #[error("no route for {method} {path}")]
    RouteNotFound { method: http::Method, path: String },
}

impl From<PortalError> for HttpError {
    fn from(error: PortalError) -> Self {
        let internal_message = error.to_string();
        let (status_code, external_message) = match error {
            PortalError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, MESSAGE_API_NOT_FOUND)
            }
            PortalError::Assembly { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, MESSAGE_GENERIC)
            }
            PortalError::RouteNotFound { .. } => {
                (StatusCode::NOT_FOUND, MESSAGE_ROUTE_NOT_FOUND)
            }
        };
        HttpError {
            status_code,
            external_message: external_message.to_string(),
            internal_message,
            body_defaults: Map::new(),
        }
    }
}

/// `HttpError` represents an error generated as part of handling a request.
/// When it bubbles up to the top of the request handling stack it's turned
/// into an HTTP response with:
///
///   * a 400-level or 500-level status code
///   * a JSON body whose `error` property is the external message, plus any
///     `body_defaults`
///
/// The internal message is recorded in the log only.  A 500 caused by a
/// serialization failure tells the client "Something went wrong!" while the
/// log says what couldn't be serialized and why.
#[derive(Debug)]
pub struct HttpError {
    /// HTTP status code for this error
    pub status_code: StatusCode,
    /// Error message to be sent to the client
    pub external_message: String,
    /// Error message recorded in the log
    pub internal_message: String,
    /// Extra properties merged into the response body alongside `error`
    pub body_defaults: Map<String, Value>,
}

/// Body of an HTTP response for an `HttpError`.  Clients (and the test suite)
/// can use this to deserialize an error response.
#[derive(Debug, Deserialize, Serialize)]
pub struct HttpErrorResponseBody {
    pub error: String,
    #[serde(flatten)]
    pub defaults: Map<String, Value>,
}

impl HttpError {
    /// Generates an `HttpError` for a 400 "Bad Request" error with the given
    /// `message` used for both the internal and external message.
    pub fn for_bad_request(message: String) -> Self {
        HttpError {
            status_code: StatusCode::BAD_REQUEST,
            internal_message: message.clone(),
            external_message: message,
            body_defaults: Map::new(),
        }
    }

    /// Generates an `HttpError` for a 500 "Internal Server Error" with the
    /// given `internal_message`.  The client sees only the generic message.
    pub fn for_internal_error(internal_message: String) -> Self {
        HttpError {
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            external_message: MESSAGE_GENERIC.to_string(),
            internal_message,
            body_defaults: Map::new(),
        }
    }

    /// Replaces the message sent to the client, leaving the status code and
    /// internal message alone.  Endpoints use this to say which operation
    /// failed (e.g., "Search failed").
    pub fn with_external_message(mut self, message: &str) -> Self {
        self.external_message = message.to_string();
        self
    }

    /// Attaches properties that are sent alongside `error` in the body.  An
    /// `error` key in `defaults` never overrides the external message.
    pub fn with_body_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.body_defaults = defaults;
        self
    }

    /// Generates the HTTP response for this error, tagged with `request_id`.
    pub fn into_response(self, request_id: &str) -> hyper::Response<Body> {
        let mut body = self.body_defaults;
        body.insert("error".to_string(), Value::String(self.external_message));

        // Encoding a map of JSON values into a string can't fail, but if it
        // somehow did we'd still rather send a well-formed body than nothing.
        let encoded = serde_json::to_vec(&body).unwrap_or_else(|_| {
            format!("{{\"error\":\"{}\"}}", MESSAGE_GENERIC).into_bytes()
        });

        let mut response = hyper::Response::new(Body::from(encoded));
        *response.status_mut() = self.status_code;
        let headers = response.headers_mut();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        if let Ok(value) = http::HeaderValue::from_str(request_id) {
            headers.insert(crate::http_util::HEADER_REQUEST_ID, value);
        }
        response
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpError({}): {}", self.status_code, self.external_message)
    }
}

impl Error for HttpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod test {
    use super::HttpError;
    use super::HttpErrorResponseBody;
    use super::PortalError;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;

    #[test]
    fn test_serialize_error_response_body() {
        let err = HttpErrorResponseBody {
            error: "oy!".to_string(),
            defaults: serde_json::Map::new(),
        };
        let out = serde_json::to_string(&err).unwrap();
        assert_eq!(out, r#"{"error":"oy!"}"#);

        let body: HttpErrorResponseBody = serde_json::from_str(
            r#"{"error":"nope","urls":[],"validatorUrl":null}"#,
        )
        .unwrap();
        assert_eq!(body.error, "nope");
        assert_eq!(body.defaults["urls"], json!([]));
        assert_eq!(body.defaults["validatorUrl"], json!(null));
    }

    #[test]
    fn test_portal_error_conversions() {
        let error = HttpError::from(PortalError::NotFound {
            name: String::from("maps"),
        });
        assert_eq!(error.status_code, StatusCode::NOT_FOUND);
        assert_eq!(error.external_message, "API not found");
        assert_eq!(error.internal_message, "no API named \"maps\"");

        let error = HttpError::from(PortalError::RouteNotFound {
            method: http::Method::GET,
            path: String::from("/unknown/path"),
        });
        assert_eq!(error.status_code, StatusCode::NOT_FOUND);
        assert_eq!(error.external_message, "Route not found");
        assert_eq!(error.internal_message, "no route for GET /unknown/path");

        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let error = HttpError::from(PortalError::Assembly {
            context: "search results",
            source,
        });
        assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.external_message, "Something went wrong!");
        assert!(error
            .internal_message
            .starts_with("assembling search results"));
    }

    #[tokio::test]
    async fn test_into_response_with_defaults() {
        let mut defaults = serde_json::Map::new();
        defaults.insert("urls".to_string(), json!([]));
        defaults.insert("error".to_string(), json!("overridden?"));

        let response = HttpError::for_internal_error("boom".to_string())
            .with_external_message("Failed to load API configuration")
            .with_body_defaults(defaults)
            .into_response("req-123");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-request-id"], "req-123");
        assert_eq!(response.headers()["content-type"], "application/json");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "urls": [],
                "error": "Failed to load API configuration",
            })
        );
    }
}
