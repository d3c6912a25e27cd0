//! The application: a routing table of filtered endpoints.

use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use tracing::{debug, info};

use crate::api_error::ApiError;
use crate::blueprint::Blueprint;
use crate::config::Settings;
use crate::filter::{self, BoxedFilter, boxed};
use crate::handler::Handler;
use crate::request::Request;
use crate::resource::Resource;
use crate::response::Response;
use crate::router::{Lookup, Router};
use crate::testing::TestClient;

/// The filters every resource gets unless it brings its own list.
///
/// Innermost first: request validation, then wrapping of bare values, then
/// response validation.
pub fn default_filters() -> Vec<BoxedFilter> {
    vec![
        boxed(filter::validate_request),
        boxed(filter::transform_response),
        boxed(filter::validate_response),
    ]
}

/// An application ready to be handed to [`Server::serve`](crate::Server::serve)
/// or exercised in-process through [`App::test_client`].
pub struct App {
    router: Router,
    default_filters: Vec<BoxedFilter>,
    debug: bool,
}

impl App {
    pub fn new() -> Self {
        Self { router: Router::default(), default_filters: default_filters(), debug: false }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new().debug(settings.app.debug)
    }

    /// In debug mode, internal errors expose their source chain.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Replaces the filter list applied to resources registered afterwards.
    pub fn default_filters(mut self, filters: Vec<BoxedFilter>) -> Self {
        self.default_filters = filters;
        self
    }

    /// Registers a resource for each of its methods, behind its filter chain.
    ///
    /// # Panics
    ///
    /// Panics if the URI is malformed or already registered for one of the
    /// methods.
    pub fn resource(mut self, resource: Resource) -> Self {
        let Resource { uri, methods, handler, filters, validators, mut options } = resource;

        let mut chain = filters.unwrap_or_else(|| self.default_filters.clone());
        chain.extend(validators);

        options.uri = uri.clone();
        options.methods = methods.clone();

        let endpoint = filter::compose(handler, &chain, &options);
        debug!(
            uri = %uri,
            methods = ?methods,
            filters = chain.len(),
            blueprint = ?options.blueprint(),
            "resource registered"
        );

        for method in methods {
            self.router.insert(method, &uri, endpoint.clone());
        }
        self
    }

    /// Registers a plain route: the handler's outcome is sent as-is, no
    /// filter runs.
    pub fn route(mut self, method: Method, uri: &str, handler: impl Handler) -> Self {
        debug!(uri = %uri, method = %method, "route registered");
        self.router.insert(method, uri, handler.into_endpoint());
        self
    }

    /// Registers every resource of `blueprint` under its own prefix.
    pub fn blueprint(self, blueprint: Blueprint) -> Self {
        self.register_blueprint(blueprint, None)
    }

    /// Registers every resource of `blueprint` under `url_prefix` instead of
    /// the blueprint's own prefix.
    pub fn blueprint_at(self, blueprint: Blueprint, url_prefix: &str) -> Self {
        self.register_blueprint(blueprint, Some(url_prefix))
    }

    fn register_blueprint(self, blueprint: Blueprint, prefix: Option<&str>) -> Self {
        debug!(name = blueprint.name(), prefix = ?prefix, "blueprint registered");
        blueprint
            .into_resources(prefix)
            .into_iter()
            .fold(self, App::resource)
    }

    /// An in-process client for tests.
    pub fn test_client(self) -> TestClient {
        TestClient::new(self)
    }

    /// Routes one request through the matching endpoint. Every failure ends
    /// up as a rendered JSON error.
    pub(crate) async fn handle(
        &self,
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let started = Instant::now();
        let path = uri.path().to_owned();

        let reply = match self.router.lookup(&method, &path) {
            Lookup::Found(endpoint, params) => {
                let req = Request::from_parts(method.clone(), uri, headers, body, params);
                endpoint.call(req).await
            }
            Lookup::MethodNotAllowed => Err(ApiError::new(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("Method {method} not allowed for URL {path}"),
            )),
            Lookup::NotFound => Err(ApiError::new(
                StatusCode::NOT_FOUND,
                format!("Requested URL {path} not found"),
            )),
        };

        let response = match reply {
            Ok(outcome) => outcome.into_response(),
            Err(err) => err.render(self.debug),
        };

        info!(
            method = %method,
            path = %path,
            status = response.status_code().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
