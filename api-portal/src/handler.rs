// Copyright 2026 Oxide Computer Company

//! Interface for implementing HTTP endpoint handler functions
//!
//! An endpoint is an async function that takes a [`RequestContext`] and
//! returns `Result<R, HttpError>`, where `R` is anything that implements
//! [`HttpResponse`]: usually an [`HttpResponseOk`] wrapping a serializable
//! body, or a hand-built `Response<Body>`.
//!
//! Handlers come in many types (every async fn has its own).  The router
//! stores them all as `Box<dyn RouteHandler<Context>>`: [`HttpRouteHandler`]
//! wraps any function satisfying [`HttpHandlerFunc`] and erases its type.

use crate::error::HttpError;
use crate::error::PortalError;
use crate::http_util::Body;
use crate::http_util::CONTENT_TYPE_JSON;
use crate::router::VariableSet;
use crate::router::VariableValue;
use crate::server::ServerContext;
use crate::server::ServerState;
use async_trait::async_trait;
use http::Method;
use hyper::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use slog::Logger;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type alias for the result returned by HTTP handler functions.
pub type HttpHandlerResult = Result<Response<Body>, HttpError>;

/// Everything a handler gets to know about the request it's serving
pub struct RequestContext<Context: ServerContext> {
    /// shared server state
    pub server: Arc<ServerState<Context>>,
    /// what's left of the request once it's been routed
    pub request: RequestInfo,
    /// values of the route's path variables
    pub path_variables: VariableSet,
    /// name of the endpoint being invoked
    pub operation_id: String,
    /// unique id assigned to this request
    pub request_id: String,
    /// logger for this specific request
    pub log: Logger,
}

impl<Context: ServerContext> RequestContext<Context> {
    /// Returns the server's application-specific state.
    pub fn context(&self) -> &Context {
        &self.server.private
    }

    /// Parses the query string as a `Q`.  A query string that doesn't fit is
    /// the client's fault, so this fails with a 400.
    pub fn query<Q: DeserializeOwned>(&self) -> Result<Q, HttpError> {
        let raw = self.request.uri().query().unwrap_or("");
        serde_urlencoded::from_str(raw).map_err(|error| {
            HttpError::for_bad_request(format!(
                "unable to parse query string: {}",
                error
            ))
        })
    }

    /// Returns the (decoded) value of the single-segment path variable
    /// `name`.
    pub fn path_param(&self, name: &str) -> Result<&str, HttpError> {
        match self.path_variables.get(name) {
            Some(VariableValue::String(value)) => Ok(value),
            Some(VariableValue::Components(_)) => {
                Err(HttpError::for_internal_error(format!(
                    "path variable {:?} spans several segments",
                    name
                )))
            }
            None => Err(HttpError::for_internal_error(format!(
                "no path variable {:?} on this route",
                name
            ))),
        }
    }
}

/// The parts of a `hyper::Request` that handlers read after the request
/// itself has been handed off
#[derive(Debug)]
pub struct RequestInfo {
    uri: http::Uri,
}

impl RequestInfo {
    pub(crate) fn new<B>(request: &hyper::Request<B>) -> Self {
        RequestInfo { uri: request.uri().clone() }
    }

    /// The request's URI as received, still percent-encoded
    pub fn uri(&self) -> &http::Uri {
        &self.uri
    }
}

/// Something a handler can return on success
pub trait HttpResponse {
    fn to_result(self) -> HttpHandlerResult;
}

impl HttpResponse for Response<Body> {
    fn to_result(self) -> HttpHandlerResult {
        Ok(self)
    }
}

/// A 200 response whose body is `T` encoded as JSON
pub struct HttpResponseOk<T: Serialize + Send + Sync + 'static>(pub T);

impl<T: Serialize + Send + Sync + 'static> HttpResponse for HttpResponseOk<T> {
    fn to_result(self) -> HttpHandlerResult {
        let context = std::any::type_name::<T>();
        let body = serde_json::to_vec(&self.0)
            .map_err(|source| PortalError::Assembly { context, source })?;
        let mut response = Response::new(Body::from(body));
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        Ok(response)
    }
}

/// An async function usable as an endpoint
#[async_trait]
pub trait HttpHandlerFunc<Context, ResponseType>: Send + Sync + 'static
where
    Context: ServerContext,
    ResponseType: HttpResponse + Send + Sync + 'static,
{
    async fn handle_request(
        &self,
        rqctx: RequestContext<Context>,
    ) -> HttpHandlerResult;
}

#[async_trait]
impl<Context, FuncType, FutureType, ResponseType>
    HttpHandlerFunc<Context, ResponseType> for FuncType
where
    Context: ServerContext,
    FuncType: Fn(RequestContext<Context>) -> FutureType
        + Send
        + Sync
        + 'static,
    FutureType: Future<Output = Result<ResponseType, HttpError>>
        + Send
        + 'static,
    ResponseType: HttpResponse + Send + Sync + 'static,
{
    async fn handle_request(
        &self,
        rqctx: RequestContext<Context>,
    ) -> HttpHandlerResult {
        let response = (self)(rqctx).await?;
        response.to_result()
    }
}

/// Type-erased handler stored by the router
#[async_trait]
pub trait RouteHandler<Context: ServerContext>: Debug + Send + Sync {
    /// A description of this handler, normally the endpoint's operation id
    fn label(&self) -> &str;

    async fn handle_request(
        &self,
        rqctx: RequestContext<Context>,
    ) -> HttpHandlerResult;
}

/// Wraps an [`HttpHandlerFunc`] so that it can be stored as a
/// [`RouteHandler`], which is not parametrized by the response type.
pub struct HttpRouteHandler<Context, HandlerType, ResponseType>
where
    Context: ServerContext,
    HandlerType: HttpHandlerFunc<Context, ResponseType>,
    ResponseType: HttpResponse + Send + Sync + 'static,
{
    handler: HandlerType,
    label: String,
    phantom: PhantomData<(ResponseType, Context)>,
}

impl<Context, HandlerType, ResponseType> Debug
    for HttpRouteHandler<Context, HandlerType, ResponseType>
where
    Context: ServerContext,
    HandlerType: HttpHandlerFunc<Context, ResponseType>,
    ResponseType: HttpResponse + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "handler: {}", self.label)
    }
}

#[async_trait]
impl<Context, HandlerType, ResponseType> RouteHandler<Context>
    for HttpRouteHandler<Context, HandlerType, ResponseType>
where
    Context: ServerContext,
    HandlerType: HttpHandlerFunc<Context, ResponseType>,
    ResponseType: HttpResponse + Send + Sync + 'static,
{
    fn label(&self) -> &str {
        &self.label
    }

    async fn handle_request(
        &self,
        rqctx: RequestContext<Context>,
    ) -> HttpHandlerResult {
        self.handler.handle_request(rqctx).await
    }
}

impl<Context, HandlerType, ResponseType>
    HttpRouteHandler<Context, HandlerType, ResponseType>
where
    Context: ServerContext,
    HandlerType: HttpHandlerFunc<Context, ResponseType>,
    ResponseType: HttpResponse + Send + Sync + 'static,
{
    pub fn new_with_name(
        handler: HandlerType,
        label: &str,
    ) -> Arc<dyn RouteHandler<Context>> {
        Arc::new(HttpRouteHandler {
            label: label.to_string(),
            handler,
            phantom: PhantomData,
        })
    }
}

/// One route: a handler plus the method and path it serves
#[derive(Debug)]
pub struct ApiEndpoint<Context: ServerContext> {
    pub operation_id: String,
    pub handler: Arc<dyn RouteHandler<Context>>,
    pub method: Method,
    pub path: String,
}

impl<Context: ServerContext> ApiEndpoint<Context> {
    pub fn new<HandlerType, ResponseType>(
        operation_id: String,
        handler: HandlerType,
        method: Method,
        path: &str,
    ) -> Self
    where
        HandlerType: HttpHandlerFunc<Context, ResponseType>,
        ResponseType: HttpResponse + Send + Sync + 'static,
    {
        let handler = HttpRouteHandler::new_with_name(handler, &operation_id);
        ApiEndpoint {
            operation_id,
            handler,
            method,
            path: path.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::HttpResponse;
    use super::HttpResponseOk;
    use super::RequestInfo;
    use crate::error::MESSAGE_GENERIC;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde::Serialize;
    use serde::Serializer;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_request_info_keeps_raw_uri() {
        let request = hyper::Request::get("/api/My%20API/api-docs?q=a%2Fb")
            .body(())
            .unwrap();
        let info = RequestInfo::new(&request);
        assert_eq!(info.uri().path(), "/api/My%20API/api-docs");
        assert_eq!(info.uri().query(), Some("q=a%2Fb"));
    }

    #[tokio::test]
    async fn test_response_ok() {
        let response =
            HttpResponseOk(vec!["Weather", "Maps"]).to_result().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"[\"Weather\",\"Maps\"]");
    }

    #[test]
    fn test_response_ok_serialization_failure() {
        let error = HttpResponseOk(Unserializable).to_result().unwrap_err();
        assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.external_message, MESSAGE_GENERIC);
        assert!(error.internal_message.contains("Unserializable"));
        assert!(error.internal_message.contains("refusing to serialize"));
    }
}
