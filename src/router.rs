//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A path that is known
//! under some other method is reported separately so the app can answer
//! `405` instead of `404`.

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::filter::Endpoint;

pub(crate) enum Lookup {
    Found(Endpoint, HashMap<String, String>),
    MethodNotAllowed,
    NotFound,
}

#[derive(Default)]
pub(crate) struct Router {
    routes: HashMap<Method, MatchitRouter<Endpoint>>,
}

impl Router {
    /// Registers `endpoint` for `method` + `path`.
    ///
    /// Path parameters use `{name}` syntax.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or collides with an existing route
    /// for the same method. Routes are registered at startup, so this is a
    /// programming error.
    pub(crate) fn insert(&mut self, method: Method, path: &str, endpoint: Endpoint) {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, endpoint)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Lookup {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Lookup::Found(matched.value.clone(), params);
        }

        if self.routes.values().any(|tree| tree.at(path).is_ok()) {
            Lookup::MethodNotAllowed
        } else {
            Lookup::NotFound
        }
    }
}
