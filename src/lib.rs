//! # truss
//!
//! Resources on top of hyper: every route handler runs behind a chain of
//! filters that validate the incoming request against a schema, turn the
//! handler's return value into a response, and validate the outgoing data.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::{Value, json};
//! use truss::schema::JsonSchema;
//! use truss::{App, Request, Resource, Server, Settings, logging};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), truss::Error> {
//!     let settings = Settings::load()?;
//!     logging::init(&settings.logging)?;
//!
//!     let schema = JsonSchema::new(json!({
//!         "type": "object",
//!         "properties": {
//!             "path": {
//!                 "type": "object",
//!                 "properties": {"id": {"type": "integer"}},
//!                 "required": ["id"]
//!             }
//!         }
//!     }))?;
//!
//!     let app = App::from_settings(&settings)
//!         .resource(Resource::get("/users/{id}", get_user).request_schema(schema));
//!
//!     Server::from_settings(&settings)?.serve(app).await
//! }
//!
//! // `validated` holds the converted request: `{"path": {"id": 42}, ...}`.
//! async fn get_user(req: Request) -> Value {
//!     json!({"id": req.validated()["path"]["id"], "name": "alice"})
//! }
//! ```
//!
//! ## Errors
//!
//! Handlers fail with an [`ApiError`]; any standard error converts into an
//! internal `500`. Every error leaves the app as JSON:
//!
//! ```text
//! {"status": 400, "message": "Invalid input data", "error_list": [...]}
//! ```

mod api_error;
mod app;
mod blueprint;
mod error;
mod handler;
mod request;
mod resource;
mod response;
mod router;
mod server;

pub mod config;
pub mod filter;
pub mod logging;
pub mod schema;
pub mod testing;

pub use api_error::{ApiError, ValidationErrors};
pub use app::{App, default_filters};
pub use blueprint::Blueprint;
pub use config::Settings;
pub use error::Error;
pub use filter::{BoxedFilter, Endpoint, Filter};
pub use handler::Handler;
pub use request::{Params, Request, RequestBuilder};
pub use resource::{Resource, ResourceOptions};
pub use response::{ContentType, DataResponse, IntoOutcome, Json, Outcome, Response, ResponseBuilder};
pub use server::Server;
pub use testing::TestClient;

pub use http::{Method, StatusCode};
