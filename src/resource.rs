//! Resources: handlers registered together with their filter chain and
//! schemas.

use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::{Map, Value};

use crate::filter::{BoxedFilter, Endpoint, Filter, boxed};
use crate::handler::Handler;
use crate::schema::{Schema, SharedSchema};

/// A route whose handler runs behind a filter chain.
///
/// ```rust
/// use serde_json::{Value, json};
/// use truss::{App, Request, Resource};
///
/// async fn list_tags(req: Request) -> Value {
///     json!({"validated": req.validated()})
/// }
///
/// let app = App::new().resource(Resource::get("/tags", list_tags));
/// ```
pub struct Resource {
    pub(crate) uri: String,
    pub(crate) methods: Vec<Method>,
    pub(crate) handler: Endpoint,
    pub(crate) filters: Option<Vec<BoxedFilter>>,
    pub(crate) validators: Vec<BoxedFilter>,
    pub(crate) options: ResourceOptions,
}

impl Resource {
    /// A `GET` resource.
    pub fn new(uri: &str, handler: impl Handler) -> Self {
        Self {
            uri: uri.to_owned(),
            methods: vec![Method::GET],
            handler: handler.into_endpoint(),
            filters: None,
            validators: Vec::new(),
            options: ResourceOptions::default(),
        }
    }

    pub fn get(uri: &str, handler: impl Handler) -> Self {
        Self::new(uri, handler)
    }

    pub fn post(uri: &str, handler: impl Handler) -> Self {
        Self::new(uri, handler).methods([Method::POST])
    }

    pub fn put(uri: &str, handler: impl Handler) -> Self {
        Self::new(uri, handler).methods([Method::PUT])
    }

    pub fn patch(uri: &str, handler: impl Handler) -> Self {
        Self::new(uri, handler).methods([Method::PATCH])
    }

    pub fn delete(uri: &str, handler: impl Handler) -> Self {
        Self::new(uri, handler).methods([Method::DELETE])
    }

    /// Replaces the accepted methods.
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Replaces the app's default filters for this resource.
    pub fn filters(mut self, filters: Vec<BoxedFilter>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Appends a filter after the default (or replaced) filters, making it
    /// outermost.
    pub fn validator(mut self, filter: impl Filter) -> Self {
        self.validators.push(boxed(filter));
        self
    }

    pub fn request_schema(mut self, schema: impl Schema) -> Self {
        self.options.request_schema = Some(Arc::new(schema));
        self
    }

    pub fn response_schema(mut self, schema: impl Schema) -> Self {
        self.options.response_schema = Some(Arc::new(schema));
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.options.name = Some(name.to_owned());
        self
    }

    /// Free-form option visible to every filter of this resource.
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.extra.insert(key.to_owned(), value.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("uri", &self.uri)
            .field("methods", &self.methods)
            .field("validators", &self.validators.len())
            .finish()
    }
}

// ── ResourceOptions ───────────────────────────────────────────────────────────

/// Everything a filter may want to know about the resource it wraps.
#[derive(Clone, Default)]
pub struct ResourceOptions {
    pub(crate) uri: String,
    pub(crate) methods: Vec<Method>,
    pub(crate) name: Option<String>,
    pub(crate) blueprint: Option<String>,
    pub(crate) request_schema: Option<SharedSchema>,
    pub(crate) response_schema: Option<SharedSchema>,
    pub(crate) extra: Map<String, Value>,
}

impl ResourceOptions {
    pub fn uri(&self) -> &str { &self.uri }
    pub fn methods(&self) -> &[Method] { &self.methods }
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    /// Name of the blueprint the resource was registered through.
    pub fn blueprint(&self) -> Option<&str> { self.blueprint.as_deref() }
    pub fn request_schema(&self) -> Option<&SharedSchema> { self.request_schema.as_ref() }
    pub fn response_schema(&self) -> Option<&SharedSchema> { self.response_schema.as_ref() }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn with_request_schema(mut self, schema: SharedSchema) -> Self {
        self.request_schema = Some(schema);
        self
    }

    pub fn with_response_schema(mut self, schema: SharedSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_owned(), value.into());
        self
    }
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("uri", &self.uri)
            .field("methods", &self.methods)
            .field("name", &self.name)
            .field("blueprint", &self.blueprint)
            .field("request_schema", &self.request_schema.is_some())
            .field("response_schema", &self.response_schema.is_some())
            .field("extra", &self.extra)
            .finish()
    }
}
