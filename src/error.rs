//! Unified infrastructure error type.

use thiserror::Error as ThisError;

/// The error type returned by truss's fallible setup operations.
///
/// Request-level failures (400, 404, 500 …) are expressed as
/// [`ApiError`](crate::ApiError) values and rendered as JSON responses, not
/// as `Error`s. This type surfaces failures that happen before or around
/// request handling: binding a port, reading configuration, compiling a
/// schema.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid value `{value}` for {key}")]
    Setting { key: &'static str, value: String },

    #[error("logging: {0}")]
    Logging(String),
}
