//! In-process test client.
//!
//! Requests go straight through [`App`]'s routing and filter chains, no
//! socket involved:
//!
//! ```rust
//! use serde_json::{Value, json};
//! use truss::{App, Request, Resource, StatusCode};
//!
//! async fn echo(req: Request) -> Value {
//!     req.json().unwrap_or(Value::Null)
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let client = App::new().resource(Resource::post("/echo", echo)).test_client();
//!
//! let rsp = client.post("/echo").json(&json!({"a": 1})).send().await;
//! assert_eq!(rsp.status(), StatusCode::OK);
//! assert_eq!(rsp.json(), json!({"a": 1}));
//! # }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::Serialize;
use serde_json::Value;

use crate::app::App;
use crate::response::Response;

/// Sends requests to an [`App`] without a server.
#[derive(Clone)]
pub struct TestClient {
    app: Arc<App>,
}

impl TestClient {
    pub fn new(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    pub fn get(&self, uri: &str) -> TestRequest {
        self.request(Method::GET, uri)
    }

    pub fn post(&self, uri: &str) -> TestRequest {
        self.request(Method::POST, uri)
    }

    pub fn put(&self, uri: &str) -> TestRequest {
        self.request(Method::PUT, uri)
    }

    pub fn patch(&self, uri: &str) -> TestRequest {
        self.request(Method::PATCH, uri)
    }

    pub fn delete(&self, uri: &str) -> TestRequest {
        self.request(Method::DELETE, uri)
    }

    pub fn request(&self, method: Method, uri: &str) -> TestRequest {
        TestRequest {
            app: Arc::clone(&self.app),
            method,
            uri: uri.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// A request being built by a [`TestClient`].
///
/// Invalid header names or URIs panic, this type is meant for tests.
pub struct TestRequest {
    app: Arc<App>,
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

impl TestRequest {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(name.as_bytes())
            .unwrap_or_else(|e| panic!("invalid header name `{name}`: {e}"));
        let value = HeaderValue::from_str(value)
            .unwrap_or_else(|e| panic!("invalid header value `{value}`: {e}"));
        self.headers.append(name, value);
        self
    }

    /// Serializes `body` as JSON and sets the content type.
    pub fn json(mut self, body: &impl Serialize) -> Self {
        let bytes = serde_json::to_vec(body).unwrap_or_else(|e| panic!("unserializable body: {e}"));
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = bytes.into();
        self
    }

    /// URL-encodes `pairs` as a form body.
    pub fn form<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.body = encoded.into();
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub async fn send(self) -> TestResponse {
        let uri: Uri = self.uri.parse()
            .unwrap_or_else(|e| panic!("invalid uri `{}`: {e}", self.uri));
        let response = self.app.handle(self.method, &uri, self.headers, self.body).await;
        TestResponse { inner: response }
    }
}

/// The response an app produced for a [`TestRequest`].
#[derive(Debug)]
pub struct TestResponse {
    inner: Response,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.inner.status_code()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.inner.body()).into_owned()
    }

    /// The body parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(self.inner.body())
            .unwrap_or_else(|e| panic!("response body is not JSON ({e}): {}", self.text()))
    }
}
