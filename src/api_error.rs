//! Request-level errors and their JSON rendering.
//!
//! Every failure that reaches the client is an [`ApiError`]. It renders as
//!
//! ```json
//! {"status": 501, "message": "API Error", "code": "E001"}
//! ```
//!
//! where everything past `status` and `message` comes from
//! [`ApiError::to_primitive`]. Internal errors (anything converted from a
//! `std::error::Error`) never leak their message; they render as a generic
//! 500 and are logged instead.

use std::fmt;

use http::StatusCode;
use serde_json::{Map, Value};
use tracing::error;

use crate::response::Response;
use crate::schema::{ErrorEntry, ErrorTree};

/// Boxed error source kept alongside an [`ApiError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const INTERNAL_MESSAGE: &str = "An error occured.";

/// An error returned to the client as a structured JSON body.
///
/// ```rust
/// use truss::{ApiError, StatusCode};
///
/// let err = ApiError::new(StatusCode::NOT_IMPLEMENTED, "API Error").with("code", "E001");
/// assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
/// assert_eq!(err.to_primitive()["code"], "E001");
/// ```
pub struct ApiError {
    status: StatusCode,
    message: String,
    data: Map<String, Value>,
    source: Option<BoxError>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), data: Map::new(), source: None }
    }

    /// A 500 whose cause is logged but never shown to the client.
    pub fn internal(source: impl Into<BoxError>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE).with_source(source)
    }

    /// Adds an extra field to the error body.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attaches the underlying cause. Shown only in debug mode.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn data(&self) -> &Map<String, Value> { &self.data }

    pub fn source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Extra error data, merged into the rendered body.
    pub fn to_primitive(&self) -> Map<String, Value> {
        self.data.clone()
    }

    /// Renders the JSON error body. Errors with status >= 500 are logged; in
    /// debug mode the source chain is exposed as `detail`.
    pub fn render(&self, debug: bool) -> Response {
        let mut body = Map::new();
        body.insert("status".to_owned(), Value::from(self.status.as_u16()));
        body.insert("message".to_owned(), Value::from(self.message.clone()));
        body.extend(self.to_primitive());

        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), source = ?self.source, "{}", self.message);
            if debug {
                if let Some(chain) = self.source_chain() {
                    body.insert("detail".to_owned(), Value::from(chain));
                }
            }
        }

        Response::builder()
            .status(self.status)
            .json(serde_json::to_vec(&Value::Object(body)).unwrap_or_default())
    }

    fn source_chain(&self) -> Option<Vec<String>> {
        let source: &(dyn std::error::Error + 'static) = self.source.as_deref()?;
        let mut current = Some(source);
        let mut chain = Vec::new();
        while let Some(err) = current {
            chain.push(err.to_string());
            current = err.source();
        }
        Some(chain)
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("data", &self.data)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.message)
    }
}

/// Any standard error becomes an internal 500.
impl<E> From<E> for ApiError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::internal(err)
    }
}

// ── ValidationErrors ──────────────────────────────────────────────────────────

/// Invalid input data: a 400 carrying the flattened error tree.
///
/// ```rust
/// use serde_json::json;
/// use truss::{ApiError, ValidationErrors};
/// use truss::schema::ErrorTree;
///
/// let errors = ValidationErrors::new(ErrorTree::from_value(&json!({
///     "body": {"options": {"val": ["Error message"]}}
/// })));
/// let err: ApiError = errors.into();
/// assert_eq!(err.status().as_u16(), 400);
/// assert_eq!(
///     err.to_primitive()["error_list"],
///     json!([{"location": ["body", "options", "val"], "messages": ["Error message"]}])
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationErrors {
    errors: ErrorTree,
    data: Map<String, Value>,
}

impl ValidationErrors {
    pub fn new(errors: ErrorTree) -> Self {
        Self { errors, data: Map::new() }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn errors(&self) -> &ErrorTree { &self.errors }

    /// One entry per location holding messages, sorted by location.
    pub fn error_list(&self) -> Vec<ErrorEntry> {
        self.errors.entries()
    }

    /// `{"error_list": [...]}` plus any extra data.
    pub fn to_primitive(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            "error_list".to_owned(),
            serde_json::to_value(self.error_list()).unwrap_or_default(),
        );
        out.extend(self.data.clone());
        out
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input data ({} errors)", self.error_list().len())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid input data".to_owned(),
            data: errors.to_primitive(),
            source: None,
        }
    }
}
