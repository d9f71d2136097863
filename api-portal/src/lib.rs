// Copyright 2026 Oxide Computer Company

//! `api-portal` serves a read-only catalog of external API descriptors to a
//! browser-based documentation portal.
//!
//! The catalog is a JSON array of objects, each with at least a `name` and a
//! `url` (the location of that API's own OpenAPI document), plus whatever
//! display metadata the portal wants.  It is loaded exactly once at startup.
//! If it can't be loaded, the server still comes up and serves an empty
//! catalog; the failure shows up in the log, not in responses.
//!
//! ## Layout
//!
//! The domain pieces are small and independent of HTTP:
//!
//! * [`catalog`]: the loaded descriptors and lookup by exact name
//! * [`query`]: case-insensitive substring search over names and URLs
//! * [`assembler`]: the response bodies each endpoint returns
//! * [`synthetic`]: a fabricated OpenAPI document for any docs path
//!
//! Around them sits the HTTP plumbing: a trie [`router`](HttpRouter), the
//! [`handler`](RequestContext) types, a hyper-based [`HttpServer`], and the
//! portal's endpoints in [`api`].
//!
//! ## Usage
//!
//! ```no_run
//! use api_portal::api::portal_api;
//! use api_portal::api::Portal;
//! use api_portal::catalog::Catalog;
//! use api_portal::ConfigLogging;
//! use api_portal::ConfigLoggingLevel;
//! use api_portal::ConfigServer;
//! use api_portal::HttpServerStarter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let log_config =
//!         ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Info };
//!     let log = log_config
//!         .to_logger("api-portal")
//!         .map_err(|error| format!("failed to create logger: {}", error))?;
//!
//!     let catalog = Catalog::load_or_empty("data.json".as_ref(), &log);
//!     let portal = Portal::new(catalog, "index.html".into());
//!
//!     let server = HttpServerStarter::new(
//!         &ConfigServer::default(),
//!         portal_api(),
//!         portal,
//!         &log,
//!     )
//!     .map_err(|error| format!("failed to create server: {}", error))?
//!     .start();
//!
//!     server.wait_for_shutdown().await
//! }
//! ```

#[macro_use]
extern crate slog;

pub mod api;
pub mod assembler;
pub mod catalog;
mod config;
mod error;
mod handler;
mod http_util;
mod logging;
pub mod query;
mod router;
mod server;
pub mod synthetic;
pub mod test_util;

pub use config::Config;
pub use config::ConfigError;
pub use config::ConfigPortal;
pub use config::ConfigServer;
pub use error::HttpError;
pub use error::HttpErrorResponseBody;
pub use error::PortalError;
pub use handler::ApiEndpoint;
pub use handler::HttpHandlerResult;
pub use handler::HttpResponseOk;
pub use handler::RequestContext;
pub use handler::RequestInfo;
pub use handler::RouteHandler;
pub use http_util::Body;
pub use http_util::CONTENT_TYPE_HTML;
pub use http_util::CONTENT_TYPE_JSON;
pub use http_util::HEADER_REQUEST_ID;
pub use logging::ConfigLogging;
pub use logging::ConfigLoggingIfExists;
pub use logging::ConfigLoggingLevel;
pub use router::HttpRouter;
pub use router::RouterLookupResult;
pub use router::VariableSet;
pub use router::VariableValue;
pub use server::HttpServer;
pub use server::HttpServerStarter;
pub use server::ServerContext;
pub use server::ServerState;
