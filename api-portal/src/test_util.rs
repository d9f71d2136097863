// Copyright 2026 Oxide Computer Company

//! Automated testing facilities.  These are intended for use both by this
//! crate's own tests and by its integration tests.

use crate::config::ConfigServer;
use crate::error::HttpErrorResponseBody;
use crate::http_util::Body;
use crate::logging::ConfigLogging;
use crate::router::HttpRouter;
use crate::server::HttpServer;
use crate::server::HttpServerStarter;
use crate::server::ServerContext;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use chrono::DateTime;
use chrono::Utc;
use http::Method;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Request;
use hyper::Response;
use hyper::Uri;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use slog::Logger;
use std::fmt::Debug;
use std::fs;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

/// Headers that every response must carry, with their exact values.
const REQUIRED_CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, PUT, DELETE, OPTIONS"),
    (
        "access-control-allow-headers",
        "Origin, X-Requested-With, Content-Type, Accept, Authorization",
    ),
];

/// An HTTP client pointed at a server under test
pub struct ClientTestContext {
    /// actual bind address of the HTTP server under test
    pub bind_address: SocketAddr,
    client: Client<HttpConnector, Body>,
    /// logger for the test suite HTTP client
    pub client_log: Logger,
}

impl ClientTestContext {
    pub fn new(server_addr: SocketAddr, log: Logger) -> ClientTestContext {
        ClientTestContext {
            bind_address: server_addr,
            client: Client::builder(TokioExecutor::new()).build_http(),
            client_log: log,
        }
    }

    /// Returns the URL for `path` (which may include a query string) on the
    /// server under test.
    pub fn url(&self, path: &str) -> Uri {
        Uri::builder()
            .scheme("http")
            .authority(format!("{}", self.bind_address).as_str())
            .path_and_query(path)
            .build()
            .expect("attempted to construct invalid URI")
    }

    /// Sends a request with no body and checks what every response must
    /// satisfy:
    ///
    /// - the status code is `expected_status`
    /// - there's a UUID in the `x-request-id` header
    /// - the cross-origin headers are present with their fixed values
    /// - for error statuses, the body is a JSON error object, which is
    ///   returned as the `Err` variant
    pub async fn make_request(
        &self,
        method: Method,
        path: &str,
        expected_status: StatusCode,
    ) -> Result<Response<Incoming>, HttpErrorResponseBody> {
        let uri = self.url(path);
        let request = Request::builder()
            .method(method.clone())
            .uri(uri.clone())
            .body(Body::default())
            .expect("attempted to construct invalid request");

        debug!(self.client_log, "client request";
            "method" => %method,
            "uri" => %uri,
        );
        let response = self
            .client
            .request(request)
            .await
            .expect("failed to make request to server");
        debug!(self.client_log, "client received response";
            "status" => response.status().as_u16(),
        );

        assert_eq!(expected_status, response.status());

        let headers = response.headers();
        let request_id = headers
            .get(crate::HEADER_REQUEST_ID)
            .expect("missing request id header")
            .to_str()
            .expect("request id header is not a string");
        uuid::Uuid::parse_str(request_id).expect("request id is not a UUID");
        for (name, value) in REQUIRED_CORS_HEADERS {
            assert_eq!(
                headers.get(name).map(|v| v.to_str().unwrap()),
                Some(value),
                "header {:?}",
                name
            );
        }

        if !expected_status.is_client_error()
            && !expected_status.is_server_error()
        {
            return Ok(response);
        }

        assert_eq!(
            headers.get(http::header::CONTENT_TYPE).unwrap(),
            crate::CONTENT_TYPE_JSON
        );
        if method == Method::HEAD {
            return Err(HttpErrorResponseBody {
                error: String::new(),
                defaults: serde_json::Map::new(),
            });
        }
        Err(read_json::<HttpErrorResponseBody>(response).await)
    }

    /// Sends a request for which we expect an error response and returns
    /// the error body.
    pub async fn make_request_error(
        &self,
        method: Method,
        path: &str,
        expected_status: StatusCode,
    ) -> HttpErrorResponseBody {
        self.make_request(method, path, expected_status)
            .await
            .expect_err("expected an error response")
    }

    /// Fetches `path` with `GET`, expecting a 200 with a JSON body.
    pub async fn object_get<T: DeserializeOwned>(&self, path: &str) -> T {
        let response = self
            .make_request(Method::GET, path, StatusCode::OK)
            .await
            .unwrap_or_else(|error| {
                panic!("GET {:?} failed: {:?}", path, error)
            });
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            crate::CONTENT_TYPE_JSON
        );
        read_json(response).await
    }
}

/// Reads the whole body of `response` and parses it as JSON.
pub async fn read_json<T: DeserializeOwned>(
    response: Response<Incoming>,
) -> T {
    let body = read_string(response).await;
    serde_json::from_str(&body).unwrap_or_else(|error| {
        panic!("failed to parse response body {:?}: {}", body, error)
    })
}

/// Reads the whole body of `response` as a string.
pub async fn read_string(response: Response<Incoming>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("error reading body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("response body is not UTF-8")
}

/// A logger for one test, plus the log file to remove if the test passes
///
/// When the configuration names a file, its path is ignored and replaced by a
/// unique file in the temporary directory named after the test.
/// `cleanup_successful()` removes that file.  It's not called automatically
/// on drop so that the log of a failed test sticks around.
pub struct LogContext {
    /// general-purpose logger
    pub log: Logger,
    log_path: Option<Utf8PathBuf>,
}

impl LogContext {
    pub fn new(
        test_name: &str,
        initial_config_logging: &ConfigLogging,
    ) -> LogContext {
        let (log_path, log_config) = match initial_config_logging {
            ConfigLogging::File { level, path: _, if_exists } => {
                let new_path = log_file_for_test(test_name);
                eprintln!("log file: {}", new_path);
                (
                    Some(new_path.clone()),
                    ConfigLogging::File {
                        level: level.clone(),
                        path: new_path,
                        if_exists: if_exists.clone(),
                    },
                )
            }
            other_config => (None, other_config.clone()),
        };

        let log = log_config
            .to_logger(test_name)
            .expect("failed to create test logger");
        LogContext { log, log_path }
    }

    /// Removes the log file, if this was a file-based logger.
    pub fn cleanup_successful(self) {
        if let Some(ref log_path) = self.log_path {
            fs::remove_file(log_path).unwrap();
        }
    }
}

/// A running server and a client for it, for the common pattern of setting
/// both up at the start of a test and tearing them down at the end
pub struct TestContext<Context: ServerContext> {
    pub client_testctx: ClientTestContext,
    pub server: HttpServer<Context>,
    pub log: Logger,
    log_context: Option<LogContext>,
}

impl<Context: ServerContext> TestContext<Context> {
    /// Starts a server for `router` and `private` and a client for it.
    /// `config.bind_address` must use port 0 so that tests can run
    /// concurrently.
    pub fn new(
        router: HttpRouter<Context>,
        private: Context,
        config: &ConfigServer,
        log_context: Option<LogContext>,
        log: Logger,
    ) -> TestContext<Context> {
        assert_eq!(
            0,
            config.bind_address.port(),
            "test suite only supports binding on port 0 (any available port)"
        );

        let server = HttpServerStarter::new(config, router, private, &log)
            .expect("failed to create server")
            .start();

        let server_addr = server.local_addr();
        let client_log = log.new(o!("http_client" => "api-portal test suite"));
        let client_testctx = ClientTestContext::new(server_addr, client_log);

        TestContext { client_testctx, server, log, log_context }
    }

    /// Shuts the server down gracefully, waits for it, and cleans up the log
    /// context (if any).
    pub async fn teardown(self) {
        self.server.close().await.expect("server stopped with an error");
        if let Some(log_context) = self.log_context {
            log_context.cleanup_successful();
        }
    }
}

static TEST_SUITE_LOGGER_ID: AtomicU32 = AtomicU32::new(0);

/// Returns a unique path in the temporary directory that includes
/// `test_name`.
pub fn log_file_for_test(test_name: &str) -> Utf8PathBuf {
    let arg0 = std::env::args()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from("test"));

    let dir = Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .expect("temporary directory is not UTF-8");
    let id = TEST_SUITE_LOGGER_ID.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    dir.join(format!("{}-{}.{}.{}.log", arg0, test_name, pid, id))
}

/// Loads a `T` (usually a hunk of configuration) from TOML `contents`.
/// `label` identifies the case in the test output.
pub fn read_config<T: DeserializeOwned + Debug>(
    label: &str,
    contents: &str,
) -> Result<T, toml::de::Error> {
    let result = toml::from_str(contents);
    eprintln!("config \"{}\": {:?}", label, result);
    result
}

/// The standard fields of a bunyan log record
#[derive(Debug, Deserialize)]
pub struct BunyanLogRecord {
    pub time: DateTime<Utc>,
    pub name: String,
    pub hostname: String,
    pub pid: u32,
    pub msg: String,
    pub v: usize,
}

/// Reads a bunyan-format log file.
pub fn read_bunyan_log(logpath: &Utf8Path) -> Vec<BunyanLogRecord> {
    let log_contents = fs::read_to_string(logpath).unwrap();
    log_contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str::<BunyanLogRecord>(line).unwrap())
        .collect()
}
