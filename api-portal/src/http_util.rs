// Copyright 2026 Oxide Computer Company

//! General-purpose HTTP-related facilities

#![allow(clippy::declare_interior_mutable_const)]

use bytes::Bytes;
use http::header::HeaderMap;
use http::header::HeaderName;
use http::header::HeaderValue;
use http_body_util::Full;

/// Response body type used throughout the server.  Every response we produce
/// is fully buffered before it's sent.
pub type Body = Full<Bytes>;

/// header name for conveying request ids ("x-request-id")
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// MIME type for JSON bodies
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// MIME type for the portal's HTML entry page
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

const CORS_ALLOW_ORIGIN: HeaderValue = HeaderValue::from_static("*");
const CORS_ALLOW_METHODS: HeaderValue =
    HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS");
const CORS_ALLOW_HEADERS: HeaderValue = HeaderValue::from_static(
    "Origin, X-Requested-With, Content-Type, Accept, Authorization",
);

/// Adds the permissive cross-origin headers that go out on every response,
/// successful or not.
pub fn insert_cors_headers(headers: &mut HeaderMap) {
    let entries: [(HeaderName, HeaderValue); 3] = [
        (http::header::ACCESS_CONTROL_ALLOW_ORIGIN, CORS_ALLOW_ORIGIN),
        (http::header::ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS),
        (http::header::ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS),
    ];
    for (name, value) in entries {
        headers.insert(name, value);
    }
}
