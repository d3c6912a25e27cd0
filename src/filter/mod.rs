//! Filter chains.
//!
//! A filter takes the [`Endpoint`] it wraps (`next`) plus the options of the
//! resource being registered, and returns a new endpoint. The new endpoint
//! may look at or rewrite the request, answer on its own without calling
//! `next`, fail with an [`ApiError`], or reshape the [`Outcome`] that `next`
//! produced.
//!
//! Chains are folded left to right: the first filter of the list wraps the
//! handler itself and the last one is outermost.
//!
//! ```text
//! filters = [validate_request, transform_response, validate_response]
//!
//! validate_response ( transform_response ( validate_request ( handler ) ) )
//! ```
//!
//! A filter is any `fn(Endpoint, &ResourceOptions) -> Endpoint`:
//!
//! ```rust
//! use truss::{ApiError, Endpoint, Request, ResourceOptions, StatusCode};
//!
//! fn basic_filter(next: Endpoint, _options: &ResourceOptions) -> Endpoint {
//!     Endpoint::new(move |req: Request| {
//!         let next = next.clone();
//!         async move {
//!             if req.query().get("action") == Some("abort") {
//!                 return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Abort!"));
//!             }
//!             next.call(req).await
//!         }
//!     })
//! }
//! ```

mod transform;
mod validate;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::api_error::ApiError;
use crate::request::Request;
use crate::resource::ResourceOptions;
use crate::response::Outcome;

pub use transform::transform_response;
pub use validate::{validate_request, validate_response};

/// A heap-allocated, type-erased future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What an endpoint resolves to.
pub type Reply = Result<Outcome, ApiError>;

// ── Endpoint ──────────────────────────────────────────────────────────────────

trait ErasedEndpoint: Send + Sync {
    fn call(&self, req: Request) -> BoxFuture<Reply>;
}

struct FnEndpoint<F>(F);

impl<F, Fut> ErasedEndpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Reply> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Reply> {
        Box::pin((self.0)(req))
    }
}

/// A type-erased async function from [`Request`] to [`Reply`].
///
/// Cloning is one atomic increment; filters clone `next` once per request.
#[derive(Clone)]
pub struct Endpoint(Arc<dyn ErasedEndpoint>);

impl Endpoint {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send + 'static,
    {
        Self(Arc::new(FnEndpoint(f)))
    }

    pub fn call(&self, req: Request) -> BoxFuture<Reply> {
        self.0.call(req)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Endpoint")
    }
}

// ── Filter ────────────────────────────────────────────────────────────────────

/// Wraps an endpoint into another one.
///
/// Implemented for every `Fn(Endpoint, &ResourceOptions) -> Endpoint`.
/// `apply` runs once per resource, at registration.
pub trait Filter: Send + Sync + 'static {
    fn apply(&self, next: Endpoint, options: &ResourceOptions) -> Endpoint;
}

impl<F> Filter for F
where
    F: Fn(Endpoint, &ResourceOptions) -> Endpoint + Send + Sync + 'static,
{
    fn apply(&self, next: Endpoint, options: &ResourceOptions) -> Endpoint {
        self(next, options)
    }
}

/// A filter shared between every resource that uses it.
pub type BoxedFilter = Arc<dyn Filter>;

pub fn boxed(filter: impl Filter) -> BoxedFilter {
    Arc::new(filter)
}

/// Wraps `handler` with `filters`, first filter innermost.
pub fn compose(handler: Endpoint, filters: &[BoxedFilter], options: &ResourceOptions) -> Endpoint {
    filters.iter().fold(handler, |next, filter| filter.apply(next, options))
}
