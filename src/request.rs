//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api_error::ApiError;
use crate::schema::FieldKind;

/// An incoming HTTP request with its body already read.
///
/// When the resource has a request schema, [`Request::validated`] holds the
/// converted `{"headers", "path", "params", "body"}` document after the
/// validation filter ran. It is an empty object otherwise.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Params,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) validated: Value,
}

impl Request {
    pub(crate) fn from_parts(
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            path: uri.path().to_owned(),
            query: Params::parse(uri.query().unwrap_or_default().as_bytes()),
            headers,
            body,
            params,
            validated: Value::Object(Map::new()),
        }
    }

    /// Builds a request by hand, mostly for exercising filters in tests.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> &Params { &self.query }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn params(&self) -> &HashMap<String, String> { &self.params }
    pub fn validated(&self) -> &Value { &self.validated }

    pub fn set_validated(&mut self, validated: Value) {
        self.validated = validated;
    }

    /// Case-insensitive header lookup. Non-ASCII values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// `true` for `application/x-www-form-urlencoded` bodies. Media types
    /// compare case-insensitively and parameters are ignored.
    pub fn is_form(&self) -> bool {
        self.content_type()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mt| mt.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
    }

    /// The body decoded as form fields. Empty unless [`Request::is_form`].
    pub fn form(&self) -> Params {
        if self.is_form() { Params::parse(&self.body) } else { Params::default() }
    }

    /// The body parsed as JSON. An unparseable body is a 400.
    pub fn json(&self) -> Result<Value, ApiError> {
        self.json_as()
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "Invalid JSON body").with_source(e))
    }
}

// ── Params ────────────────────────────────────────────────────────────────────

/// Multi-valued, order-preserving `key=value` pairs from a query string or a
/// form body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn parse(input: &[u8]) -> Self {
        Self(url::form_urlencoded::parse(input).into_owned().collect())
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct keys in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        self.grouped().into_iter().map(|(k, _)| k).collect()
    }

    /// Every key mapped to the list of its values: `{"page": ["2"]}`.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .grouped()
            .into_iter()
            .map(|(k, values)| (k.to_owned(), Value::from(values)))
            .collect();
        Value::Object(map)
    }

    /// Shapes the pairs for validation.
    ///
    /// A key declared as a list in `kinds` always becomes an array. Any
    /// other key with a single value becomes a scalar string; several values
    /// stay an array and are left to the schema to reject.
    pub fn to_document(&self, kinds: Option<&[FieldKind]>) -> Value {
        let repeated: HashMap<&str, bool> = kinds
            .unwrap_or_default()
            .iter()
            .map(|f| (f.name.as_str(), f.repeated))
            .collect();
        let map: Map<String, Value> = self
            .grouped()
            .into_iter()
            .filter_map(|(k, values)| {
                let values = values.into_iter().map(Value::from).collect();
                let repeated = repeated.get(k).copied().unwrap_or(false);
                collapse(values, repeated).map(|v| (k.to_owned(), v))
            })
            .collect();
        Value::Object(map)
    }

    /// Values grouped under their key, keys in first-seen order. One pass.
    fn grouped(&self) -> Vec<(&str, Vec<&str>)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (k, v) in &self.0 {
            match index.get(k.as_str()) {
                Some(&i) => groups[i].1.push(v.as_str()),
                None => {
                    index.insert(k.as_str(), groups.len());
                    groups.push((k.as_str(), vec![v.as_str()]));
                }
            }
        }
        groups
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Single values become scalars unless the field is a list.
pub(crate) fn collapse(mut values: Vec<Value>, repeated: bool) -> Option<Value> {
    match values.len() {
        0 => None,
        1 if !repeated => values.pop(),
        _ => Some(Value::Array(values)),
    }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Builder returned by [`Request::builder`].
///
/// ```rust
/// use truss::{Method, Request};
///
/// let req = Request::builder()
///     .method(Method::POST)
///     .uri("/tags/abc?page=2")
///     .param("tag", "abc")
///     .header("content-type", "application/json")
///     .body(r#"{"name":"x"}"#)
///     .build();
///
/// assert_eq!(req.query().get("page"), Some("2"));
/// assert_eq!(req.param("tag"), Some("abc"));
/// ```
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_owned();
        self
    }

    /// Appends a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) =
            (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
        {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a matched path parameter.
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn build(self) -> Request {
        let (path, query) = match self.uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (self.uri.as_str(), ""),
        };
        Request {
            method: self.method,
            path: if path.is_empty() { "/".to_owned() } else { path.to_owned() },
            query: Params::parse(query.as_bytes()),
            headers: self.headers,
            body: self.body,
            params: self.params,
            validated: Value::Object(Map::new()),
        }
    }
}
