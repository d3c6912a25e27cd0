//! Application settings.
//!
//! Settings come from a TOML file, then environment overrides are applied
//! on top. Every field has a default, so an empty file is valid:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:5000"
//! max_body_size = 1048576
//!
//! [app]
//! debug = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! | Variable               | Field                  |
//! |------------------------|------------------------|
//! | `TRUSS_CONFIG`         | file to load           |
//! | `TRUSS_BIND`           | `server.bind`          |
//! | `TRUSS_MAX_BODY_SIZE`  | `server.max_body_size` |
//! | `TRUSS_DEBUG`          | `app.debug`            |
//! | `TRUSS_LOG_LEVEL`      | `logging.level`        |
//! | `TRUSS_LOG_FORMAT`     | `logging.format`       |

use std::path::Path;
use std::str::FromStr;
use std::{env, fs};

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// 1 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub app: AppSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: "127.0.0.1:5000".to_owned(), max_body_size: DEFAULT_MAX_BODY_SIZE }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_owned(), format: LogFormat::default() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("invalid log format: {s}")),
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "settings file loaded");
        Self::from_toml(&content)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, Error> {
        let mut settings = Self::default();
        settings.apply_overrides(|key| env::var(key).ok())?;
        Ok(settings)
    }

    /// Loads `TRUSS_CONFIG` when set, then applies environment overrides.
    pub fn load() -> Result<Self, Error> {
        let mut settings = match env::var("TRUSS_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        settings.apply_overrides(|key| env::var(key).ok())?;
        Ok(settings)
    }

    /// Applies `TRUSS_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        if let Some(bind) = lookup("TRUSS_BIND") {
            self.server.bind = bind;
        }
        if let Some(size) = lookup("TRUSS_MAX_BODY_SIZE") {
            self.server.max_body_size = size
                .parse()
                .map_err(|_| Error::Setting { key: "TRUSS_MAX_BODY_SIZE", value: size.clone() })?;
        }
        if let Some(debug) = lookup("TRUSS_DEBUG") {
            self.app.debug = parse_bool(&debug)
                .ok_or_else(|| Error::Setting { key: "TRUSS_DEBUG", value: debug.clone() })?;
        }
        if let Some(level) = lookup("TRUSS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TRUSS_LOG_FORMAT") {
            self.logging.format = format
                .parse()
                .map_err(|_| Error::Setting { key: "TRUSS_LOG_FORMAT", value: format.clone() })?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server.bind, "127.0.0.1:5000");
        assert_eq!(settings.server.max_body_size, 1024 * 1024);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert!(!settings.app.debug);
    }

    #[test]
    fn reads_every_section() {
        let settings = Settings::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:8080"
            max_body_size = 4096

            [app]
            debug = true

            [logging]
            level = "truss=debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert_eq!(settings.server.max_body_size, 4096);
        assert!(settings.app.debug);
        assert_eq!(settings.logging.level, "truss=debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = Settings::from_toml("[server\nbind = 1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\ndebug = true").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert!(settings.app.debug);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut settings = Settings::from_toml("[server]\nbind = \"0.0.0.0:1\"").unwrap();
        settings
            .apply_overrides(lookup(&[
                ("TRUSS_BIND", "0.0.0.0:2"),
                ("TRUSS_DEBUG", "yes"),
                ("TRUSS_LOG_FORMAT", "JSON"),
            ]))
            .unwrap();

        assert_eq!(settings.server.bind, "0.0.0.0:2");
        assert!(settings.app.debug);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn bad_override_is_rejected() {
        let mut settings = Settings::default();
        let err = settings.apply_overrides(lookup(&[("TRUSS_DEBUG", "maybe")])).unwrap_err();
        assert!(matches!(err, Error::Setting { key: "TRUSS_DEBUG", .. }));
    }

    #[test]
    fn body_limit_override() {
        let mut settings = Settings::default();
        settings.apply_overrides(lookup(&[("TRUSS_MAX_BODY_SIZE", "2048")])).unwrap();
        assert_eq!(settings.server.max_body_size, 2048);

        let err = settings.apply_overrides(lookup(&[("TRUSS_MAX_BODY_SIZE", "1MB")])).unwrap_err();
        assert!(matches!(err, Error::Setting { key: "TRUSS_MAX_BODY_SIZE", .. }));
    }
}
