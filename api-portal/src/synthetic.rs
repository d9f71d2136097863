// Copyright 2026 Oxide Computer Company

//! Placeholder OpenAPI documents for documentation paths
//!
//! The portal asks for `/api/<something>/api-docs` for each API it shows.
//! We don't proxy those requests anywhere.  Instead, every such path gets the
//! same small OpenAPI 3.0 document, with the requested path worked into its
//! title and descriptions.  The path isn't checked against the catalog.

use indexmap::IndexMap;
use openapiv3::Info;
use openapiv3::MediaType;
use openapiv3::ObjectType;
use openapiv3::OpenAPI;
use openapiv3::Operation;
use openapiv3::PathItem;
use openapiv3::Paths;
use openapiv3::ReferenceOr;
use openapiv3::Response;
use openapiv3::Responses;
use openapiv3::Schema;
use openapiv3::SchemaData;
use openapiv3::SchemaKind;
use openapiv3::StatusCode;
use openapiv3::StringType;
use openapiv3::Type;

const OPENAPI_VERSION: &str = "3.0.0";
const DOCUMENT_VERSION: &str = "1.0.0";
const EXAMPLE_PATH: &str = "/example";

/// Generates the placeholder document for `path`.  The same `path` always
/// produces the same document.
pub fn generate(path: &str) -> OpenAPI {
    let info = Info {
        title: format!("API Documentation - {}", path),
        description: Some(format!("Documentation for {}", path)),
        version: DOCUMENT_VERSION.to_string(),
        ..Default::default()
    };

    let mut paths = Paths::default();
    paths.paths.insert(
        EXAMPLE_PATH.to_string(),
        ReferenceOr::Item(PathItem {
            get: Some(example_operation(path)),
            ..Default::default()
        }),
    );

    OpenAPI {
        openapi: OPENAPI_VERSION.to_string(),
        info,
        paths,
        ..Default::default()
    }
}

fn example_operation(path: &str) -> Operation {
    let mut content = IndexMap::new();
    content.insert(
        crate::CONTENT_TYPE_JSON.to_string(),
        MediaType {
            schema: Some(ReferenceOr::Item(message_schema())),
            ..Default::default()
        },
    );

    let mut responses = Responses::default();
    responses.responses.insert(
        StatusCode::Code(200),
        ReferenceOr::Item(Response {
            description: String::from("Successful response"),
            content,
            ..Default::default()
        }),
    );

    Operation {
        summary: Some(String::from("Example endpoint")),
        description: Some(format!("Example endpoint for {}", path)),
        responses,
        ..Default::default()
    }
}

/// `{ "message": "Hello from API" }`, as a schema
fn message_schema() -> Schema {
    let message = Schema {
        schema_data: SchemaData {
            example: Some(serde_json::Value::String(String::from(
                "Hello from API",
            ))),
            ..Default::default()
        },
        schema_kind: SchemaKind::Type(Type::String(StringType::default())),
    };

    let mut object = ObjectType::default();
    object
        .properties
        .insert(String::from("message"), ReferenceOr::Item(Box::new(message)));

    Schema {
        schema_data: SchemaData::default(),
        schema_kind: SchemaKind::Type(Type::Object(object)),
    }
}
