//! Outgoing responses and the [`IntoOutcome`] conversion trait.
//!
//! A handler can answer three ways:
//!
//! - a bare value ([`serde_json::Value`] or [`Json<T>`]) that the filter
//!   chain turns into a [`DataResponse`];
//! - a [`DataResponse`]: data plus status and headers, serialized as late as
//!   possible so filters can still validate and reshape it;
//! - a raw [`Response`]: already-serialized bytes that every built-in filter
//!   passes through untouched.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;

use crate::api_error::ApiError;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    FormData,    // application/x-www-form-urlencoded
    Html,        // text/html; charset=utf-8
    Json,        // application/json
    OctetStream, // application/octet-stream
    Text,        // text/plain; charset=utf-8
    Xml,         // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A raw, already-serialized HTTP response.
///
/// ```rust
/// use truss::{ContentType, Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::bytes_raw("application/json", body.into())
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/plain; charset=utf-8", Bytes::from(body.into()))
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    fn bytes_raw(content_type: &str, body: Bytes) -> Self {
        Self {
            body,
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            status: StatusCode::OK,
        }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        replace_header(&mut self.headers, name, value);
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(self.body)).unwrap_or_else(|e| {
            tracing::error!("invalid response headers: {e}");
            let mut fallback = http::Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish("application/json", body.into())
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", Bytes::from(body.into()))
    }

    /// Terminate with a typed body. Use this for XML, HTML, binary, etc.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type.as_str(), body.into())
    }

    pub fn no_body(self) -> Response {
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Bytes) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── DataResponse ──────────────────────────────────────────────────────────────

/// A JSON response whose data stays a [`Value`] until it leaves the app.
///
/// Filters further out in the chain can read and rewrite the data without a
/// serialize/deserialize round trip.
///
/// ```rust
/// use serde_json::json;
/// use truss::{DataResponse, StatusCode};
///
/// let rsp = DataResponse::new(json!({"id": 42}))
///     .with_status(StatusCode::CREATED)
///     .with_header("location", "/users/42");
/// assert_eq!(rsp.data()["id"], 42);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DataResponse {
    data: Value,
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl DataResponse {
    pub fn new(data: impl Into<Value>) -> Self {
        Self { data: data.into(), status: StatusCode::OK, headers: Vec::new() }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn data(&self) -> &Value { &self.data }
    pub fn data_mut(&mut self) -> &mut Value { &mut self.data }
    pub fn set_data(&mut self, data: Value) { self.data = data; }
    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        replace_header(&mut self.headers, name, value);
    }

    /// Serializes the data. This is the only place a `DataResponse` turns
    /// into bytes.
    pub fn into_response(self) -> Response {
        match serde_json::to_vec(&self.data) {
            Ok(body) => {
                let mut headers = vec![("content-type".to_owned(), "application/json".to_owned())];
                for (name, value) in self.headers {
                    replace_header(&mut headers, &name, &value);
                }
                Response { body: Bytes::from(body), headers, status: self.status }
            }
            Err(e) => ApiError::internal(e).render(false),
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// What an endpoint produced, as seen by the filters wrapping it.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Already serialized; bypasses response validation.
    Raw(Response),
    /// Data response, validated and serialized on the way out.
    Data(DataResponse),
    /// A bare value not yet wrapped into a [`DataResponse`].
    Value(Value),
}

impl Outcome {
    /// Sets a header on whichever response this is, wrapping a bare value
    /// into a [`DataResponse`] first.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self {
            Outcome::Raw(rsp) => rsp.set_header(name, value),
            Outcome::Data(rsp) => rsp.set_header(name, value),
            Outcome::Value(data) => {
                let rsp = DataResponse::new(std::mem::take(data)).with_header(name, value);
                *self = Outcome::Data(rsp);
            }
        }
    }

    /// The data carried by a data response or bare value.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Raw(_) => None,
            Outcome::Data(rsp) => Some(rsp.data()),
            Outcome::Value(data) => Some(data),
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            Outcome::Raw(rsp) => rsp,
            Outcome::Data(rsp) => rsp.into_response(),
            Outcome::Value(data) => DataResponse::new(data).into_response(),
        }
    }
}

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Conversion of handler return values into an [`Outcome`].
///
/// `Result<T, E>` is supported for any `E: Into<ApiError>`, so handlers can
/// use `?` on any standard error and get a 500, or return an [`ApiError`]
/// with a status of their choosing.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, ApiError>;
}

/// Serializes `T` into a bare value with serde.
///
/// ```rust,ignore
/// #[derive(Serialize)]
/// struct User { id: u64 }
///
/// async fn get_user(_req: Request) -> Json<User> {
///     Json(User { id: 1 })
/// }
/// ```
pub struct Json<T>(pub T);

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Result<Outcome, ApiError> { Ok(self) }
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Result<Outcome, ApiError> { Ok(Outcome::Raw(self)) }
}

impl IntoOutcome for DataResponse {
    fn into_outcome(self) -> Result<Outcome, ApiError> { Ok(Outcome::Data(self)) }
}

impl IntoOutcome for Value {
    fn into_outcome(self) -> Result<Outcome, ApiError> { Ok(Outcome::Value(self)) }
}

impl<T: Serialize> IntoOutcome for Json<T> {
    fn into_outcome(self) -> Result<Outcome, ApiError> {
        serde_json::to_value(self.0).map(Outcome::Value).map_err(ApiError::internal)
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Result<Outcome, ApiError> { Ok(Outcome::Raw(Response::text(self))) }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Result<Outcome, ApiError> { Ok(Outcome::Raw(Response::text(self))) }
}

/// Return a status directly from a handler: `return StatusCode::NO_CONTENT`
impl IntoOutcome for StatusCode {
    fn into_outcome(self) -> Result<Outcome, ApiError> { Ok(Outcome::Raw(Response::status(self))) }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<ApiError>,
{
    fn into_outcome(self) -> Result<Outcome, ApiError> {
        self.map_err(Into::into)?.into_outcome()
    }
}

// ── Header helpers ────────────────────────────────────────────────────────────

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn replace_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_owned(), value.to_owned()));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn data_response_serializes_late() {
        let mut rsp = DataResponse::new(json!({"test": 1}));
        rsp.data_mut()["test"] = json!(2);

        let raw = rsp.with_status(StatusCode::CREATED).with_header("x-test", "test").into_response();
        assert_eq!(raw.status_code(), StatusCode::CREATED);
        assert_eq!(raw.header("content-type"), Some("application/json"));
        assert_eq!(raw.header("X-Test"), Some("test"));
        assert_eq!(raw.body().as_ref(), br#"{"test":2}"#);
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut rsp = Response::text("abc");
        rsp.set_header("Content-Type", "text/csv");
        assert_eq!(rsp.headers().len(), 1);
        assert_eq!(rsp.header("content-type"), Some("text/csv"));
    }

    #[test]
    fn bare_value_becomes_data_response_when_headers_are_set() {
        let mut outcome = Outcome::Value(json!({"version": 2}));
        outcome.set_header("x-test", "abc");

        match outcome {
            Outcome::Data(rsp) => {
                assert_eq!(rsp.data(), &json!({"version": 2}));
                assert_eq!(rsp.header("x-test"), Some("abc"));
            }
            other => panic!("expected data response, got {other:?}"),
        }
    }

    #[test]
    fn result_outcomes() {
        let ok: Result<Value, ApiError> = Ok(json!([1, 2]));
        assert!(matches!(ok.into_outcome(), Ok(Outcome::Value(_))));

        let err: Result<Value, ApiError> = Err(ApiError::new(StatusCode::IM_A_TEAPOT, "short and stout"));
        let err = err.into_outcome().unwrap_err();
        assert_eq!(err.status(), StatusCode::IM_A_TEAPOT);

        let io: Result<Value, std::io::Error> = Err(std::io::Error::other("disk"));
        assert_eq!(io.into_outcome().unwrap_err().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn into_inner_copies_status_and_headers() {
        let raw = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(r#"{"id":"99"}"#);
        let inner = raw.into_inner();
        assert_eq!(inner.status(), StatusCode::CREATED);
        assert_eq!(inner.headers()["location"], "/users/99");
        assert_eq!(inner.headers()["content-type"], "application/json");
    }
}
