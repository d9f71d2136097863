// Copyright 2026 Oxide Computer Company

//! Generic server-wide state and facilities

use crate::config::ConfigServer;
use crate::error::HttpError;
use crate::handler::RequestContext;
use crate::handler::RequestInfo;
use crate::http_util::insert_cors_headers;
use crate::http_util::Body;
use crate::http_util::HEADER_REQUEST_ID;
use crate::router::HttpRouter;
use futures::future::BoxFuture;
use futures::future::FusedFuture;
use futures::future::Shared;
use futures::FutureExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::Request;
use hyper::Response;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use scopeguard::guard;
use scopeguard::ScopeGuard;
use slog::Logger;
use std::any::Any;
use std::future::Future;
use std::mem;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Application-specific state shared by every request.  Anything `Send +
/// Sync + 'static` qualifies.
pub trait ServerContext: Send + Sync + 'static {}

impl<T: 'static> ServerContext for T where T: Send + Sync {}

/// Stores shared state used by the server
pub struct ServerState<C: ServerContext> {
    /// caller-specific state
    pub private: C,
    /// static server configuration parameters
    pub router: HttpRouter<C>,
    /// server-wide log handle
    pub log: Logger,
    /// bound local address for the server
    pub local_addr: SocketAddr,
}

/// A server whose listening socket is bound but which isn't yet accepting
/// connections.  Splitting the two steps lets a caller learn the bound address
/// (e.g., for port 0) before anything can connect.
pub struct HttpServerStarter<C: ServerContext> {
    app_state: Arc<ServerState<C>>,
    listener: TcpListener,
}

impl<C: ServerContext> HttpServerStarter<C> {
    /// Binds the listening socket described by `config`.  This must be called
    /// from within a tokio runtime.
    pub fn new(
        config: &ConfigServer,
        router: HttpRouter<C>,
        private: C,
        log: &Logger,
    ) -> Result<HttpServerStarter<C>, GenericError> {
        let std_listener = std::net::TcpListener::bind(config.bind_address)?;
        std_listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(std_listener)?;
        let local_addr = listener.local_addr()?;
        let log = log.new(o!("local_addr" => local_addr));

        for endpoint in router.endpoints() {
            debug!(log, "registered endpoint";
                "method" => %endpoint.method,
                "path" => &endpoint.path,
                "operation_id" => &endpoint.operation_id,
            );
        }

        let app_state =
            Arc::new(ServerState { private, router, log, local_addr });
        Ok(HttpServerStarter { app_state, listener })
    }

    /// Starts accepting connections.
    pub fn start(self) -> HttpServer<C> {
        let (tx, rx) = oneshot::channel::<()>();
        let local_addr = self.app_state.local_addr;
        info!(self.app_state.log, "listening");

        let join_handle = tokio::spawn(run_server(
            self.listener,
            Arc::clone(&self.app_state),
            rx,
        ));
        let join_future = async move {
            join_handle
                .await
                .map_err(|error| format!("waiting for server: {}", error))?
        }
        .boxed()
        .shared();

        HttpServer {
            app_state: self.app_state,
            local_addr,
            closer: CloseHandle { close_channel: Some(tx) },
            join_future,
        }
    }
}

/// Accepts connections until told to stop, then waits for the ones in flight
/// to finish.
async fn run_server<C: ServerContext>(
    listener: TcpListener,
    server: Arc<ServerState<C>>,
    mut close_rx: oneshot::Receiver<()>,
) -> Result<(), String> {
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(error) => {
                        warn!(server.log, "failed to accept connection";
                            "error" => %error,
                        );
                        continue;
                    }
                };

                debug!(server.log, "accepted connection";
                    "remote_addr" => %remote_addr,
                );
                let service =
                    ServerRequestHandler::new(Arc::clone(&server), remote_addr);
                let connection = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service);
                let connection = graceful.watch(connection);
                let log = server.log.clone();
                tokio::spawn(async move {
                    if let Err(error) = connection.await {
                        debug!(log, "connection closed with error";
                            "remote_addr" => %remote_addr,
                            "error" => %error,
                        );
                    }
                });
            }

            _ = &mut close_rx => {
                info!(server.log, "shutting down");
                break;
            }
        }
    }

    mem::drop(listener);
    graceful.shutdown().await;
    Ok(())
}

type SharedBoxFuture<T> = Shared<Pin<Box<dyn Future<Output = T> + Send>>>;

/// Future returned by [`HttpServer::wait_for_shutdown()`].
pub struct ShutdownWaitFuture(SharedBoxFuture<Result<(), String>>);

impl Future for ShutdownWaitFuture {
    type Output = Result<(), String>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().0).poll(cx)
    }
}

impl FusedFuture for ShutdownWaitFuture {
    fn is_terminated(&self) -> bool {
        self.0.is_terminated()
    }
}

/// A running HTTP server
pub struct HttpServer<C: ServerContext> {
    app_state: Arc<ServerState<C>>,
    local_addr: SocketAddr,
    closer: CloseHandle,
    join_future: SharedBoxFuture<Result<(), String>>,
}

// Handle used to trigger the shutdown of an [HttpServer].
struct CloseHandle {
    close_channel: Option<oneshot::Sender<()>>,
}

impl<C: ServerContext> HttpServer<C> {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn app_private(&self) -> &C {
        &self.app_state.private
    }

    /// Returns a future which completes when the server has shut down.  This
    /// does not itself shut the server down; see [`HttpServer::close`].
    pub fn wait_for_shutdown(&self) -> ShutdownWaitFuture {
        ShutdownWaitFuture(self.join_future.clone())
    }

    /// Signals the server to stop and waits for it to exit.
    pub async fn close(mut self) -> Result<(), String> {
        if let Some(close_channel) = self.closer.close_channel.take() {
            // The receiver only goes away once the server has already exited.
            let _ = close_channel.send(());
        }
        mem::drop(self.app_state);
        self.join_future.await
    }
}

// `close()` is the clean way to stop the server, but a server that's dropped
// (e.g., by a failing test) should stop too.
impl Drop for CloseHandle {
    fn drop(&mut self) {
        if let Some(c) = self.close_channel.take() {
            let _ = c.send(());
        }
    }
}

/// Entry point for every request.  Whatever happens below, the response that
/// goes out carries the request id and the cross-origin headers.
async fn http_request_handle_wrap<C: ServerContext>(
    server: Arc<ServerState<C>>,
    remote_addr: SocketAddr,
    request: Request<Incoming>,
) -> Result<Response<Body>, GenericError> {
    let start_time = std::time::Instant::now();
    let request_id = generate_request_id();

    let request_log = server.log.new(o!(
        "remote_addr" => remote_addr,
        "req_id" => request_id.clone(),
        "method" => request.method().as_str().to_string(),
        "uri" => format!("{}", request.uri()),
    ));
    trace!(request_log, "incoming request");

    // If the client goes away, hyper drops this future and the guard fires.
    let on_disconnect = guard((), |_| {
        let latency_us = start_time.elapsed().as_micros();
        warn!(request_log, "request handling cancelled (client disconnected)";
            "latency_us" => latency_us,
        );
    });

    let maybe_response = http_request_handle(
        server,
        request,
        &request_id,
        request_log.new(o!()),
    )
    .await;

    let _ = ScopeGuard::into_inner(on_disconnect);

    let latency_us = start_time.elapsed().as_micros();
    let mut response = match maybe_response {
        Err(error) => {
            let message_external = error.external_message.clone();
            let message_internal = error.internal_message.clone();
            let response = error.into_response(&request_id);
            info!(request_log, "request completed";
                "response_code" => response.status().as_str(),
                "latency_us" => latency_us,
                "error_message_internal" => message_internal,
                "error_message_external" => message_external,
            );
            response
        }

        Ok(mut response) => {
            if let Ok(value) = http::HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(HEADER_REQUEST_ID, value);
            }
            info!(request_log, "request completed";
                "response_code" => response.status().as_str(),
                "latency_us" => latency_us,
            );
            response
        }
    };

    insert_cors_headers(response.headers_mut());
    Ok(response)
}

async fn http_request_handle<C: ServerContext>(
    server: Arc<ServerState<C>>,
    request: Request<Incoming>,
    request_id: &str,
    request_log: Logger,
) -> Result<Response<Body>, HttpError> {
    let lookup_result =
        server.router.lookup_route(request.method(), request.uri().path())?;
    let rqctx = RequestContext {
        server: Arc::clone(&server),
        request: RequestInfo::new(&request),
        path_variables: lookup_result.variables,
        operation_id: lookup_result.operation_id,
        request_id: request_id.to_string(),
        log: request_log.clone(),
    };
    let handler = lookup_result.handler;

    // The handler runs on its own task so that it finishes even if the client
    // disconnects, and so that a panic stays inside it.
    let handler_task =
        tokio::spawn(async move { handler.handle_request(rqctx).await });

    match handler_task.await {
        Ok(result) => result,
        Err(join_error) => {
            let message = if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                String::from("handler task was cancelled")
            };
            error!(request_log, "handler failed to complete";
                "panic" => &message,
            );
            Err(HttpError::for_internal_error(format!(
                "handler panicked: {}",
                message
            )))
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}

fn generate_request_id() -> String {
    format!("{}", Uuid::new_v4())
}

/// hyper service for a single connection.  Each request is passed along to
/// `http_request_handle_wrap()` with the server state and the peer's address.
pub struct ServerRequestHandler<C: ServerContext> {
    server: Arc<ServerState<C>>,
    remote_addr: SocketAddr,
}

impl<C: ServerContext> ServerRequestHandler<C> {
    fn new(server: Arc<ServerState<C>>, remote_addr: SocketAddr) -> Self {
        ServerRequestHandler { server, remote_addr }
    }
}

impl<C: ServerContext> Service<Request<Incoming>> for ServerRequestHandler<C> {
    type Response = Response<Body>;
    type Error = GenericError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        Box::pin(http_request_handle_wrap(
            Arc::clone(&self.server),
            self.remote_addr,
            req,
        ))
    }
}
