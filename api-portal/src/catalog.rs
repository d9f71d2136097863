// Copyright 2026 Oxide Computer Company

//! The catalog of API descriptors
//!
//! A [`Catalog`] is built once, before the server starts accepting
//! connections, and never changes afterwards.  Handlers only ever read it, so
//! it's shared without any locking.

use crate::error::PortalError;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use slog::Logger;

/// One entry in the catalog, describing a single external API.
///
/// Anything beyond `name` and `url` is display metadata for the portal.  We
/// don't interpret it, but we do hand it back exactly as it was loaded.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ApiDescriptor {
    /// identifies the API within the catalog (case-sensitive)
    pub name: String,
    /// location of the API's own OpenAPI document
    pub url: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ApiDescriptor {
    pub fn new(name: &str, url: &str) -> ApiDescriptor {
        ApiDescriptor {
            name: name.to_string(),
            url: url.to_string(),
            metadata: Map::new(),
        }
    }
}

/// Reasons the catalog payload couldn't be loaded
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("reading catalog {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing catalog {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },

    #[error("catalog {path}: entry {index} has an empty name")]
    EmptyName { path: Utf8PathBuf, index: usize },
}

/// Ordered, read-only collection of [`ApiDescriptor`]s
///
/// Names are not required to be unique.  When two entries share a name,
/// [`Catalog::find_by_name`] returns whichever was loaded first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    descriptors: Vec<ApiDescriptor>,
}

impl Catalog {
    /// Reads the catalog payload at `path`: a JSON array of objects, each
    /// with string `name` and `url` properties.  Any problem with the payload
    /// rejects the whole thing.
    pub fn load(path: &Utf8Path) -> Result<Catalog, LoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            LoadError::Io { path: path.to_owned(), source }
        })?;
        Catalog::parse(path, &contents)
    }

    fn parse(path: &Utf8Path, contents: &str) -> Result<Catalog, LoadError> {
        let deserializer = &mut serde_json::Deserializer::from_str(contents);
        let descriptors: Vec<ApiDescriptor> =
            serde_path_to_error::deserialize(deserializer).map_err(
                |source| LoadError::Parse { path: path.to_owned(), source },
            )?;

        if let Some(index) = descriptors.iter().position(|d| d.name.is_empty())
        {
            return Err(LoadError::EmptyName { path: path.to_owned(), index });
        }

        Ok(Catalog { descriptors })
    }

    /// Loads the catalog at `path`, falling back to an empty catalog if that
    /// fails.  This is the only place a [`LoadError`] is handled: it's logged
    /// here and goes no further, so the server always comes up.
    pub fn load_or_empty(path: &Utf8Path, log: &Logger) -> Catalog {
        match Catalog::load(path) {
            Ok(catalog) => {
                info!(log, "loaded catalog";
                    "path" => %path,
                    "apis_loaded" => catalog.len(),
                );
                catalog
            }
            Err(error) => {
                error!(log, "failed to load catalog; serving an empty one";
                    "path" => %path,
                    "error" => %error,
                );
                Catalog::default()
            }
        }
    }

    pub fn from_descriptors(descriptors: Vec<ApiDescriptor>) -> Catalog {
        Catalog { descriptors }
    }

    /// Returns every descriptor, in load order.
    pub fn all(&self) -> &[ApiDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the first descriptor whose name is exactly `name`.
    pub fn find_by_name(
        &self,
        name: &str,
    ) -> Result<&ApiDescriptor, PortalError> {
        self.descriptors.iter().find(|d| d.name == name).ok_or_else(|| {
            PortalError::NotFound { name: name.to_string() }
        })
    }
}

#[cfg(test)]
mod test {
    use super::ApiDescriptor;
    use super::Catalog;
    use super::LoadError;
    use crate::error::PortalError;
    use crate::test_util::LogContext;
    use crate::ConfigLogging;
    use crate::ConfigLoggingLevel;
    use camino::Utf8Path;
    use camino::Utf8PathBuf;
    use serde_json::json;
    use std::io::Write;

    fn weather_and_maps() -> Catalog {
        Catalog::from_descriptors(vec![
            ApiDescriptor::new("Weather", "https://x/weather.json"),
            ApiDescriptor::new("Maps", "https://y/maps.json"),
        ])
    }

    fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn utf8_path(file: &tempfile::NamedTempFile) -> &Utf8Path {
        Utf8Path::from_path(file.path()).expect("temp path is not UTF-8")
    }

    #[test]
    fn test_find_by_name_is_exact() {
        let catalog = weather_and_maps();
        assert_eq!(
            catalog.find_by_name("Maps").unwrap().url,
            "https://y/maps.json"
        );

        let error = catalog.find_by_name("maps").unwrap_err();
        assert!(matches!(
            error,
            PortalError::NotFound { ref name } if name == "maps"
        ));
        assert!(catalog.find_by_name("Map").is_err());
        assert!(catalog.find_by_name("").is_err());
    }

    #[test]
    fn test_find_by_name_duplicates_first_wins() {
        let catalog = Catalog::from_descriptors(vec![
            ApiDescriptor::new("Dup", "https://first"),
            ApiDescriptor::new("Other", "https://other"),
            ApiDescriptor::new("Dup", "https://second"),
        ]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.find_by_name("Dup").unwrap().url, "https://first");
    }

    #[test]
    fn test_load_preserves_order_and_metadata() {
        let file = write_catalog(
            r#"[
                {"name": "Weather", "url": "https://x/weather.json",
                 "zeta": 1, "alpha": {"nested": true}},
                {"name": "Maps", "url": "https://y/maps.json"}
            ]"#,
        );
        let catalog = Catalog::load(utf8_path(&file)).unwrap();
        let names: Vec<_> =
            catalog.all().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Weather", "Maps"]);

        let weather = &catalog.all()[0];
        let keys: Vec<_> = weather.metadata.keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha"]);

        // Serializing puts the metadata back alongside name and url.
        assert_eq!(
            serde_json::to_value(weather).unwrap(),
            json!({
                "name": "Weather",
                "url": "https://x/weather.json",
                "zeta": 1,
                "alpha": {"nested": true},
            })
        );
    }

    #[test]
    fn test_load_missing_file() {
        let path = Utf8PathBuf::from("/nonexistent/api-portal/data.json");
        let error = Catalog::load(&path).unwrap_err();
        assert!(matches!(error, LoadError::Io { .. }));
        assert!(error.to_string().starts_with(
            "reading catalog /nonexistent/api-portal/data.json: "
        ));
    }

    #[test]
    fn test_load_bad_payloads() {
        let cases = [
            ("not json at all", "expected value"),
            (
                r#"{"name": "Weather", "url": "https://x"}"#,
                "expected a sequence",
            ),
            (r#"[{"name": "Weather"}]"#, "missing field `url`"),
            (r#"[{"name": 3, "url": "https://x"}]"#, "invalid type: integer"),
            (r#"[{"name": "a", "url": "b"}, "c"]"#, "[1]"),
        ];

        for (contents, expected) in cases {
            let file = write_catalog(contents);
            let error = Catalog::load(utf8_path(&file)).unwrap_err();
            let message = error.to_string();
            println!("payload {:?}: {}", contents, message);
            assert!(matches!(error, LoadError::Parse { .. }));
            assert!(
                message.contains(expected),
                "expected {:?} in {:?}",
                expected,
                message
            );
        }
    }

    #[test]
    fn test_load_empty_name() {
        let file = write_catalog(
            r#"[{"name": "a", "url": "b"}, {"name": "", "url": "c"}]"#,
        );
        let error = Catalog::load(utf8_path(&file)).unwrap_err();
        assert!(matches!(error, LoadError::EmptyName { index: 1, .. }));
    }

    #[test]
    fn test_load_or_empty() {
        let logctx = LogContext::new(
            "test_load_or_empty",
            &ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Warn },
        );

        let file = write_catalog("[");
        let catalog = Catalog::load_or_empty(utf8_path(&file), &logctx.log);
        assert!(catalog.is_empty());
        assert_eq!(catalog, Catalog::default());

        let file = write_catalog(r#"[{"name": "a", "url": "b"}]"#);
        let catalog = Catalog::load_or_empty(utf8_path(&file), &logctx.log);
        assert_eq!(catalog.len(), 1);

        logctx.cleanup_successful();
    }

    #[test]
    fn test_load_empty_array() {
        let file = write_catalog("[]");
        let catalog = Catalog::load(utf8_path(&file)).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.all().is_empty());
    }
}
