//! Handler trait and type erasure.
//!
//! Routes and resources hold handlers of *different* types in one table, so
//! every handler is erased into an [`Endpoint`] on registration:
//!
//! ```text
//! async fn hello(req: Request) -> Value { … }        ← user writes this
//!        ↓ Resource::get("/", hello)
//! hello.into_endpoint()                              ← Handler blanket impl
//!        ↓
//! Endpoint(Arc<FnEndpoint<…>>)                       ← what filters wrap
//!        ↓
//! endpoint.call(req) at request time                 ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_outcome() })
//! ```

use std::future::Future;

use crate::filter::Endpoint;
use crate::request::Request;
use crate::response::IntoOutcome;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> Endpoint;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_endpoint(self) -> Endpoint {
        Endpoint::new(move |req| {
            let fut = self(req);
            async move { fut.await.into_outcome() }
        })
    }
}
