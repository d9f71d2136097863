// Copyright 2026 Oxide Computer Company

//! Common facilities for automated testing.

use api_portal::api::portal_api;
use api_portal::api::Portal;
use api_portal::catalog::Catalog;
use api_portal::test_util::ClientTestContext;
use api_portal::test_util::LogContext;
use api_portal::test_util::TestContext;
use api_portal::ConfigLogging;
use api_portal::ConfigLoggingIfExists;
use api_portal::ConfigLoggingLevel;
use api_portal::ConfigPortal;
use api_portal::ConfigServer;
use camino::Utf8PathBuf;
use slog::o;
use tempfile::TempDir;

/// Catalog used by most tests: two APIs, one of them carrying extra display
/// metadata.
pub const CATALOG_WEATHER_MAPS: &str = r#"[
    {
        "name": "Weather",
        "url": "https://x/weather.json",
        "description": "Forecasts and observations",
        "tags": ["public", "beta"]
    },
    { "name": "Maps", "url": "https://y/maps.json" }
]"#;

pub const INDEX_HTML: &str =
    "<!DOCTYPE html>\n<html><body><div id=\"swagger-ui\"></div></body>\n";

/// A portal server running against files in its own temporary directory
pub struct PortalTestContext {
    pub testctx: TestContext<Portal>,
    // Removed on drop, so it has to outlive the server.
    _static_dir: TempDir,
}

impl PortalTestContext {
    pub fn client(&self) -> &ClientTestContext {
        &self.testctx.client_testctx
    }

    pub async fn teardown(self) {
        self.testctx.teardown().await;
    }
}

/// Starts a portal whose catalog file contains `catalog`.  With `None`, no
/// catalog file is written at all.
pub fn test_setup(
    test_name: &str,
    catalog: Option<&str>,
) -> PortalTestContext {
    let static_dir = tempfile::tempdir().expect("failed to create temp dir");
    let dir_path = Utf8PathBuf::from_path_buf(static_dir.path().to_path_buf())
        .expect("temp dir path is not UTF-8");
    let config_portal =
        ConfigPortal { static_dir: dir_path, catalog_path: None };

    std::fs::write(config_portal.index_path(), INDEX_HTML)
        .expect("failed to write index.html");
    if let Some(contents) = catalog {
        std::fs::write(config_portal.catalog_path(), contents)
            .expect("failed to write catalog");
    }

    // Port 0 lets tests run concurrently without fighting over a port.
    let config_server =
        ConfigServer { bind_address: "127.0.0.1:0".parse().unwrap() };

    let logctx = create_log_context(test_name);
    let log = logctx.log.new(o!());
    let catalog = Catalog::load_or_empty(&config_portal.catalog_path(), &log);
    let portal = Portal::new(catalog, config_portal.index_path());
    let testctx = TestContext::new(
        portal_api(),
        portal,
        &config_server,
        Some(logctx),
        log,
    );

    PortalTestContext { testctx, _static_dir: static_dir }
}

pub fn create_log_context(test_name: &str) -> LogContext {
    let log_config = ConfigLogging::File {
        level: ConfigLoggingLevel::Debug,
        path: "UNUSED".into(),
        if_exists: ConfigLoggingIfExists::Fail,
    };
    LogContext::new(test_name, &log_config)
}
