// Copyright 2026 Oxide Computer Company

//! Runs the portal server until it's interrupted.

use api_portal::api::portal_api;
use api_portal::api::Portal;
use api_portal::catalog::Catalog;
use api_portal::Config;
use api_portal::HttpServerStarter;
use camino::Utf8PathBuf;
use clap::Parser;
use slog::info;

#[derive(Debug, Parser)]
#[clap(about = "Serve a catalog of API descriptors to a documentation portal")]
struct Args {
    /// TOML configuration file (every setting has a default)
    #[clap(long, value_name("FILE"))]
    config: Option<Utf8PathBuf>,

    /// TCP port to listen on, overriding the configuration
    #[clap(long, env("PORT"))]
    port: Option<u16>,

    /// catalog payload to load, overriding the configuration
    #[clap(long, env("CATALOG_PATH"), value_name("FILE"))]
    catalog: Option<Utf8PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path).map_err(|e| e.to_string())?,
        None => Config::default(),
    };
    let config = config.with_port(args.port).with_catalog_path(args.catalog);

    let log = config
        .log
        .to_logger("api-portal")
        .map_err(|error| format!("failed to create logger: {}", error))?;

    let catalog = Catalog::load_or_empty(&config.portal.catalog_path(), &log);
    let portal = Portal::new(catalog, config.portal.index_path());

    let server = HttpServerStarter::new(
        &config.http_api_server,
        portal_api(),
        portal,
        &log,
    )
    .map_err(|error| format!("failed to create server: {}", error))?
    .start();

    let shutdown = server.wait_for_shutdown();
    tokio::select! {
        result = shutdown => result,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|error| {
                format!("failed to listen for interrupt: {}", error)
            })?;
            info!(log, "interrupted; shutting down");
            server.close().await
        }
    }
}
