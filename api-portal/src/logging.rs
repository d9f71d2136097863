// Copyright 2026 Oxide Computer Company

//! Logging configuration for the portal server
//!
//! Logs go either to a terminal on stderr or, as bunyan-formatted JSON, to a
//! file.  The choice lives in the `[log]` block of the config file.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;
use slog::Drain;
use slog::Level;
use slog::Logger;
use std::fs::OpenOptions;
use std::io;
use std::io::LineWriter;
use std::io::Write;

/// Where log records go and which ones are kept
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "mode")]
pub enum ConfigLogging {
    /// Human-readable output on stderr
    StderrTerminal { level: ConfigLoggingLevel },
    /// Bunyan records appended to (or replacing) a file
    File {
        level: ConfigLoggingLevel,
        path: Utf8PathBuf,
        if_exists: ConfigLoggingIfExists,
    },
}

impl Default for ConfigLogging {
    fn default() -> Self {
        ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Info }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigLoggingLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl From<&ConfigLoggingLevel> for Level {
    fn from(config_level: &ConfigLoggingLevel) -> Level {
        match config_level {
            ConfigLoggingLevel::Trace => Level::Trace,
            ConfigLoggingLevel::Debug => Level::Debug,
            ConfigLoggingLevel::Info => Level::Info,
            ConfigLoggingLevel::Warn => Level::Warning,
            ConfigLoggingLevel::Error => Level::Error,
            ConfigLoggingLevel::Critical => Level::Critical,
        }
    }
}

/// What to do when the log file is already there
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigLoggingIfExists {
    Fail,
    Truncate,
    Append,
}

impl ConfigLogging {
    /// Builds the root logger.  `log_name` becomes the bunyan `name` field for
    /// file logs.
    pub fn to_logger<S: AsRef<str>>(
        &self,
        log_name: S,
    ) -> Result<Logger, io::Error> {
        match self {
            ConfigLogging::StderrTerminal { level } => {
                let decorator = slog_term::TermDecorator::new().build();
                let drain =
                    slog_term::FullFormat::new(decorator).build().fuse();
                Ok(async_root_logger(level, drain))
            }

            ConfigLogging::File { level, path, if_exists } => {
                let mut open_options = OpenOptions::new();
                open_options.write(true).create(true);
                match if_exists {
                    ConfigLoggingIfExists::Fail => {
                        open_options.create_new(true);
                    }
                    ConfigLoggingIfExists::Append => {
                        open_options.append(true);
                    }
                    ConfigLoggingIfExists::Truncate => {
                        open_options.truncate(true);
                    }
                }

                let drain = log_drain_for_file(
                    &open_options,
                    path,
                    log_name.as_ref().to_string(),
                )?;
                let logger = async_root_logger(level, drain);

                // Leave a pointer on stderr so an operator knows where the
                // rest of the output went.  Failing to write it isn't fatal.
                if let Err(err) = writeln!(
                    io::stderr(),
                    "note: configured to log to \"{path}\"",
                ) {
                    warn!(logger, "failed to report log path on stderr";
                        "err" => %err,
                    );
                }

                Ok(logger)
            }
        }
    }
}

fn async_root_logger<T>(level: &ConfigLoggingLevel, drain: T) -> Logger
where
    T: Drain + Send + 'static,
    <T as Drain>::Err: std::fmt::Debug,
{
    let level_drain = slog::LevelFilter(drain, Level::from(level)).fuse();
    let async_drain =
        slog_async::Async::new(level_drain).chan_size(1024).build().fuse();
    Logger::root(async_drain, o!())
}

fn log_drain_for_file(
    open_options: &OpenOptions,
    path: &Utf8Path,
    log_name: String,
) -> Result<slog::Fuse<slog_json::Json<LineWriter<std::fs::File>>>, io::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = LineWriter::new(open_options.open(path)?);

    // slog_bunyan wants a `&'static str` name.  We create one logger per
    // process (or per test), so leaking it is bounded.
    let log_name: &'static str = Box::leak(log_name.into_boxed_str());
    Ok(slog_bunyan::with_name(log_name, file).build().fuse())
}

#[cfg(test)]
mod test {
    use crate::test_util::read_bunyan_log;
    use crate::test_util::read_config;
    use crate::ConfigLogging;
    use crate::ConfigLoggingIfExists;
    use crate::ConfigLoggingLevel;
    use camino::Utf8Path;
    use camino::Utf8PathBuf;
    use slog::Logger;

    fn file_logger(
        path: &Utf8Path,
        level: &str,
        if_exists: &str,
    ) -> Result<Logger, std::io::Error> {
        let contents = format!(
            "mode = \"file\"\nlevel = \"{}\"\nif_exists = \"{}\"\n\
             path = \"{}\"\n",
            level,
            if_exists,
            path.as_str().escape_default(),
        );
        read_config::<ConfigLogging>("file", &contents)
            .unwrap()
            .to_logger("api-portal-test")
    }

    fn temp_log_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name))
            .expect("temp path is not UTF-8")
    }

    #[test]
    fn test_config_default() {
        assert_eq!(
            ConfigLogging::default(),
            ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Info }
        );
    }

    #[test]
    fn test_config_errors() {
        let cases = [
            (
                r#"mode = "syslog""#,
                "unknown variant `syslog`, expected `stderr-terminal` or \
                 `file`",
            ),
            (r#"mode = "stderr-terminal""#, "missing field `level`"),
            (
                "mode = \"stderr-terminal\"\nlevel = \"verbose\"",
                "unknown variant `verbose`, expected one of `trace`, \
                 `debug`, `info`, `warn`, `error`, `critical`",
            ),
            (
                "mode = \"file\"\nlevel = \"info\"\nif_exists = \"append\"",
                "missing field `path`",
            ),
        ];
        for (contents, expected) in cases {
            let error = read_config::<ConfigLogging>("bad_log", contents)
                .unwrap_err()
                .to_string();
            assert!(error.contains(expected), "{:?}: {}", contents, error);
        }
    }

    #[test]
    fn test_config_stderr_terminal() {
        let config = read_config::<ConfigLogging>(
            "stderr_terminal",
            "mode = \"stderr-terminal\"\nlevel = \"debug\"",
        )
        .unwrap();
        assert_eq!(
            config,
            ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Debug }
        );
        config.to_logger("api-portal-test").unwrap();
    }

    #[test]
    fn test_file_exists_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir, "portal.log");
        std::fs::write(&path, "").unwrap();

        let config = ConfigLogging::File {
            level: ConfigLoggingLevel::Info,
            path,
            if_exists: ConfigLoggingIfExists::Fail,
        };
        let error = config.to_logger("api-portal-test").unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_file_append_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir, "logs/portal.log");

        // Each logger is dropped (and so flushed) before the file is read.
        {
            let log = file_logger(&path, "info", "fail").unwrap();
            debug!(log, "registered endpoint");
            info!(log, "loaded catalog"; "apis_loaded" => 2);
            error!(log, "failed to load catalog");
        }
        {
            let log = file_logger(&path, "info", "append").unwrap();
            info!(log, "listening");
        }

        let records = read_bunyan_log(&path);
        let hostname = hostname::get().unwrap().into_string().unwrap();
        let messages: Vec<_> = records.iter().map(|r| r.msg.as_str()).collect();
        assert_eq!(
            messages,
            ["loaded catalog", "failed to load catalog", "listening"]
        );
        for record in &records {
            assert_eq!(record.name, "api-portal-test");
            assert_eq!(record.hostname, hostname);
            assert_eq!(record.pid, std::process::id());
            assert_eq!(record.v, 0);
        }

        {
            let log = file_logger(&path, "trace", "truncate").unwrap();
            trace!(log, "incoming request");
        }
        let records = read_bunyan_log(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].msg, "incoming request");
    }
}
