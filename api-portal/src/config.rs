// Copyright 2026 Oxide Computer Company

//! Configuration for the portal server
//!
//! Everything can be left out.  A config file that only says
//!
//! ```toml
//! [portal]
//! static_dir = "portal"
//! ```
//!
//! serves `portal/index.html` and loads `portal/data.json`, listening on port
//! 3000 of every interface and logging to the terminal.

use crate::logging::ConfigLogging;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;

const DEFAULT_PORT: u16 = 3000;
const CATALOG_FILE_NAME: &str = "data.json";
const INDEX_FILE_NAME: &str = "index.html";

/// Configuration for the HTTP listener
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ConfigServer {
    /// IP address and TCP port to which to bind for accepting connections
    pub bind_address: SocketAddr,
}

impl Default for ConfigServer {
    fn default() -> Self {
        ConfigServer {
            bind_address: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                DEFAULT_PORT,
            ),
        }
    }
}

/// Where the portal's files live
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ConfigPortal {
    /// directory holding `index.html` (and, by default, the catalog)
    pub static_dir: Utf8PathBuf,
    /// catalog payload; `<static_dir>/data.json` when not given
    pub catalog_path: Option<Utf8PathBuf>,
}

impl Default for ConfigPortal {
    fn default() -> Self {
        ConfigPortal { static_dir: Utf8PathBuf::from("."), catalog_path: None }
    }
}

impl ConfigPortal {
    pub fn catalog_path(&self) -> Utf8PathBuf {
        match &self.catalog_path {
            Some(path) => path.clone(),
            None => self.static_dir.join(CATALOG_FILE_NAME),
        }
    }

    pub fn index_path(&self) -> Utf8PathBuf {
        self.static_dir.join(INDEX_FILE_NAME)
    }
}

/// Top-level server configuration, normally read from a TOML file
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub http_api_server: ConfigServer,
    pub portal: ConfigPortal,
    pub log: ConfigLogging,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Reads the configuration at `path`.  Unlike the catalog, a config file
    /// that's named but unusable is an error.
    pub fn from_file(path: &Utf8Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io { path: path.to_owned(), source }
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Replaces the listening port, keeping the configured address.
    pub fn with_port(mut self, port: Option<u16>) -> Config {
        if let Some(port) = port {
            self.http_api_server.bind_address.set_port(port);
        }
        self
    }

    /// Replaces the catalog location.
    pub fn with_catalog_path(mut self, path: Option<Utf8PathBuf>) -> Config {
        if path.is_some() {
            self.portal.catalog_path = path;
        }
        self
    }
}
