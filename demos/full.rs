//! Resources with request and response schemas, custom filters, errors.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example full
//!
//! Try:
//!   curl http://localhost:5000/
//!   curl -X POST http://localhost:5000/post -d '{"id": "12"}'
//!   curl 'http://localhost:5000/tags/42?sort=desc&page=3'
//!   curl 'http://localhost:5000/filter?action=abort'
//!   curl -X POST http://localhost:5000/return -d '{"name": "x", "params": {"xray": "1"}}'
//!   curl http://localhost:5000/error

use serde_json::{Value, json};
use truss::schema::JsonSchema;
use truss::{
    ApiError, App, DataResponse, Endpoint, Method, Outcome, Request, Resource, ResourceOptions,
    Response, Server, Settings, StatusCode, logging,
};

#[tokio::main]
async fn main() -> Result<(), truss::Error> {
    let settings = Settings::load()?;
    logging::init(&settings.logging)?;

    let app = App::from_settings(&settings)
        .route(Method::GET, "/", main_view)
        .resource(Resource::post("/post", post).request_schema(input_schema()?))
        .resource(Resource::get("/tags/{tag}", tag).request_schema(tag_schema()?))
        .resource(Resource::get("/filter", filtered).validator(basic_filter))
        .resource(Resource::post("/return", return_schema).response_schema(return_schema_def()?))
        .resource(Resource::get("/error", error));

    Server::from_settings(&settings)?.serve(app).await
}

fn input_schema() -> Result<JsonSchema, truss::Error> {
    JsonSchema::new(json!({
        "type": "object",
        "properties": {
            "body": {
                "type": "object",
                "required": ["id"],
                "properties": {
                    "name": {"type": "string", "default": ""},
                    "id": {"type": "integer"}
                }
            }
        }
    }))
}

fn tag_schema() -> Result<JsonSchema, truss::Error> {
    JsonSchema::new(json!({
        "type": "object",
        "properties": {
            "path": {"type": "object", "properties": {"tag": {"type": "integer"}}},
            "params": {
                "type": "object",
                "properties": {
                    "sort": {"type": "string", "enum": ["asc", "desc"], "default": "asc"},
                    "page": {"type": "integer", "minimum": 1, "default": 1}
                }
            }
        }
    }))
}

fn return_schema_def() -> Result<JsonSchema, truss::Error> {
    JsonSchema::new(json!({
        "type": "object",
        "properties": {
            "body": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "params": {
                        "type": "object",
                        "properties": {"xray": {"type": "boolean", "default": false}}
                    }
                }
            }
        }
    }))
}

fn basic_filter(next: Endpoint, _options: &ResourceOptions) -> Endpoint {
    Endpoint::new(move |req: Request| {
        let next = next.clone();
        async move {
            match req.query().get("action") {
                Some("abort") => Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Abort!")),
                Some("text") => Ok(Outcome::Raw(Response::text("test response"))),
                _ => next.call(req).await,
            }
        }
    })
}

async fn main_view(_req: Request) -> &'static str {
    "Hi mate!"
}

async fn post(req: Request) -> DataResponse {
    let raw = if req.is_form() { req.form().to_value() } else { req.json().unwrap_or_default() };
    DataResponse::new(json!({"raw": raw, "validated": req.validated()}))
        .with_status(StatusCode::CREATED)
}

async fn tag(req: Request) -> Value {
    json!({
        "args": req.query().to_value(),
        "tag": req.param("tag"),
        "validated": req.validated()
    })
}

async fn filtered(req: Request) -> Value {
    req.query().to_value()
}

async fn return_schema(req: Request) -> Result<Value, ApiError> {
    req.json()
}

async fn error(_req: Request) -> Result<Value, ApiError> {
    let status = StatusCode::from_u16(599)?;
    Err(ApiError::new(status, "Error").with("info", "Something really bad!"))
}
