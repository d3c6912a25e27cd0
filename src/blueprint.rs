//! Blueprints group resources under a shared URL prefix.

use crate::resource::Resource;

/// A named group of resources registered together on an [`App`](crate::App).
///
/// ```rust
/// use serde_json::Value;
/// use truss::{App, Blueprint, Request, Resource};
///
/// async fn status(_req: Request) -> Value {
///     serde_json::json!({"ok": true})
/// }
///
/// let v1 = Blueprint::new("v1")
///     .url_prefix("/v1")
///     .resource(Resource::get("/status", status));
///
/// let app = App::new().blueprint(v1);
/// ```
#[derive(Debug)]
pub struct Blueprint {
    name: String,
    url_prefix: Option<String>,
    resources: Vec<Resource>,
}

impl Blueprint {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), url_prefix: None, resources: Vec::new() }
    }

    pub fn url_prefix(mut self, prefix: &str) -> Self {
        self.url_prefix = Some(prefix.to_owned());
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources with their final URI. `prefix` overrides the blueprint's
    /// own prefix when given.
    pub(crate) fn into_resources(self, prefix: Option<&str>) -> Vec<Resource> {
        let prefix = prefix.map(str::to_owned).or(self.url_prefix);
        let name = self.name;

        self.resources
            .into_iter()
            .map(|mut resource| {
                if let Some(prefix) = prefix.as_deref() {
                    resource.uri = join(prefix, &resource.uri);
                }
                resource.options.blueprint = Some(name.clone());
                resource
            })
            .collect()
    }
}

fn join(prefix: &str, uri: &str) -> String {
    let uri = format!("{prefix}{uri}");
    match uri.strip_prefix('/') {
        Some(rest) if rest.starts_with('/') => rest.to_owned(),
        _ => uri,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::request::Request;

    async fn noop(_req: Request) -> Value {
        Value::Null
    }

    #[test]
    fn prefix_is_joined() {
        assert_eq!(join("/v1", "/users"), "/v1/users");
        assert_eq!(join("/", "/users"), "/users");
        assert_eq!(join("", "/users"), "/users");
    }

    #[test]
    fn override_prefix_wins() {
        let bp = Blueprint::new("bp")
            .url_prefix("/v1")
            .resource(Resource::get("/a", noop));

        let resources = bp.into_resources(Some("/v2"));
        assert_eq!(resources[0].uri(), "/v2/a");
        assert_eq!(resources[0].options.blueprint(), Some("bp"));
    }

    #[test]
    fn no_prefix_keeps_uri() {
        let resources = Blueprint::new("bp").resource(Resource::get("/a", noop)).into_resources(None);
        assert_eq!(resources[0].uri(), "/a");
    }
}
