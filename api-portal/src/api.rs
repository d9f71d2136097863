// Copyright 2026 Oxide Computer Company

//! The portal's HTTP endpoints
//!
//! Each handler reads the immutable [`Portal`] context and returns one of the
//! bodies from [`crate::assembler`].  When a body can't be produced, the
//! client sees a message naming the operation that failed (e.g., "Search
//! failed") rather than the generic one.

use crate::assembler;
use crate::assembler::MESSAGE_API_FAILED;
use crate::assembler::MESSAGE_API_INFO_FAILED;
use crate::assembler::MESSAGE_APIS_FAILED;
use crate::assembler::MESSAGE_SEARCH_FAILED;
use crate::assembler::MESSAGE_SWAGGER_CONFIG_FAILED;
use crate::catalog::ApiDescriptor;
use crate::catalog::Catalog;
use crate::handler::HttpResponse;
use crate::query::search;
use crate::query::SearchQuery;
use crate::synthetic;
use crate::ApiEndpoint;
use crate::Body;
use crate::HttpError;
use crate::HttpHandlerResult;
use crate::HttpResponseOk;
use crate::HttpRouter;
use crate::RequestContext;
use crate::CONTENT_TYPE_HTML;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use chrono::Utc;
use http::Method;
use hyper::Response;
use serde::Deserialize;
use std::time::Instant;

/// State shared by every request: the catalog loaded at startup and where
/// to find the portal's entry page
#[derive(Debug)]
pub struct Portal {
    catalog: Catalog,
    index_path: Utf8PathBuf,
    started: Instant,
}

impl Portal {
    pub fn new(catalog: Catalog, index_path: Utf8PathBuf) -> Portal {
        Portal { catalog, index_path, started: Instant::now() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index_path(&self) -> &Utf8Path {
        &self.index_path
    }

    /// Seconds since this context was created, which is to say since the
    /// server started.
    pub fn uptime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Returns a router with every portal endpoint registered.
pub fn portal_api() -> HttpRouter<Portal> {
    let mut router = HttpRouter::new();
    router.insert(ApiEndpoint::new(
        String::from("portal_index"),
        portal_index,
        Method::GET,
        "/",
    ));
    router.insert(ApiEndpoint::new(
        String::from("api_info"),
        api_info,
        Method::GET,
        "/api",
    ));
    router.insert(ApiEndpoint::new(
        String::from("swagger_config"),
        swagger_config,
        Method::GET,
        "/api/swagger-config",
    ));
    router.insert(ApiEndpoint::new(
        String::from("api_list"),
        api_list,
        Method::GET,
        "/api/apis",
    ));
    router.insert(ApiEndpoint::new(
        String::from("api_search"),
        api_search,
        Method::GET,
        "/api/search",
    ));
    router.insert(ApiEndpoint::new(
        String::from("api_by_name"),
        api_by_name,
        Method::GET,
        "/api/apis/{name}",
    ));
    router.insert(ApiEndpoint::new(
        String::from("api_docs"),
        api_docs,
        Method::GET,
        "/api/{path:.*}/api-docs",
    ));
    router.insert(ApiEndpoint::new(
        String::from("health"),
        health,
        Method::GET,
        "/health",
    ));
    router
}

async fn portal_index(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let path = rqctx.context().index_path();
    let contents = tokio::fs::read(path).await.map_err(|error| {
        HttpError::for_internal_error(format!("reading {}: {}", path, error))
    })?;

    let mut response = Response::new(Body::from(contents));
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(CONTENT_TYPE_HTML),
    );
    Ok(response)
}

async fn api_info(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let body = assembler::api_info(rqctx.context().catalog(), Utc::now());
    HttpResponseOk(body)
        .to_result()
        .map_err(|error| error.with_external_message(MESSAGE_API_INFO_FAILED))
}

async fn swagger_config(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let body = assembler::swagger_config(rqctx.context().catalog());
    HttpResponseOk(body).to_result().map_err(|error| {
        error
            .with_external_message(MESSAGE_SWAGGER_CONFIG_FAILED)
            .with_body_defaults(assembler::swagger_config_defaults())
    })
}

async fn api_list(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let body = rqctx.context().catalog().all().to_vec();
    HttpResponseOk(body)
        .to_result()
        .map_err(|error| error.with_external_message(MESSAGE_APIS_FAILED))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn api_search(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let params: SearchParams = rqctx.query()?;
    let search_query = SearchQuery::new(params.q.as_deref());
    let results: Vec<ApiDescriptor> =
        search(rqctx.context().catalog(), &search_query)
            .into_iter()
            .cloned()
            .collect();
    debug!(rqctx.log, "search";
        "term" => search_query.term(),
        "results" => results.len(),
    );

    HttpResponseOk(results)
        .to_result()
        .map_err(|error| error.with_external_message(MESSAGE_SEARCH_FAILED))
}

async fn api_by_name(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let name = rqctx.path_param("name")?;
    let found = rqctx.context().catalog().find_by_name(name);
    debug!(rqctx.log, "lookup by name";
        "name" => name,
        "found" => found.is_ok(),
    );

    HttpResponseOk(found?.clone())
        .to_result()
        .map_err(|error| error.with_external_message(MESSAGE_API_FAILED))
}

/// Serves the placeholder document for any `/api/.../api-docs` path.  The
/// document is parameterized by the whole request path, as received.  Paths
/// the router can't decode (dot-segments, bad percent-encoding) never get
/// here: they're rejected with a 400 before any handler runs.
async fn api_docs(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let path = rqctx.request.uri().path();
    debug!(rqctx.log, "generating docs"; "path" => path);
    HttpResponseOk(synthetic::generate(path)).to_result()
}

async fn health(rqctx: RequestContext<Portal>) -> HttpHandlerResult {
    let portal = rqctx.context();
    let body = assembler::health(portal.catalog(), portal.uptime(), Utc::now());
    HttpResponseOk(body).to_result()
}
