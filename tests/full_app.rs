use serde_json::{Value, json};
use truss::schema::JsonSchema;
use truss::{
    ApiError, App, DataResponse, Method, Request, Resource, StatusCode, TestClient,
};

fn schema(raw: Value) -> JsonSchema {
    JsonSchema::new(raw).unwrap()
}

fn headers_section() -> Value {
    json!({"type": "object", "properties": {"x-test": {"type": "integer"}}})
}

fn get_args() -> JsonSchema {
    schema(json!({
        "type": "object",
        "properties": {
            "params": {
                "type": "object",
                "properties": {
                    "test": {"type": "integer", "default": 0},
                    "test_s": {"type": "string"}
                }
            },
            "path": {
                "type": "object",
                "required": ["tag"],
                "properties": {"tag": {"type": "string"}}
            },
            "headers": headers_section()
        }
    }))
}

fn post_args() -> JsonSchema {
    schema(json!({
        "type": "object",
        "properties": {
            "headers": headers_section(),
            "body": {
                "type": "object",
                "properties": {"val1": {"type": "integer", "minimum": 1}}
            },
            "plop": {"type": "integer", "default": 1}
        }
    }))
}

fn output_schema() -> JsonSchema {
    schema(json!({
        "type": "object",
        "properties": {
            "body": {
                "type": "object",
                "required": ["name", "id"],
                "properties": {
                    "name": {"type": "string"},
                    "id": {"type": "integer"},
                    "extra": {"type": "object", "properties": {"op1": {"type": "string"}}}
                }
            }
        }
    }))
}

async fn main_view(_req: Request) -> &'static str {
    "main"
}

async fn simple_get(req: Request) -> Value {
    json!({"tag": req.param("tag"), "res": req.validated()})
}

async fn simple_post(req: Request) -> DataResponse {
    DataResponse::new(req.validated().clone()).with_status(StatusCode::CREATED)
}

async fn return_json(req: Request) -> Result<Value, ApiError> {
    req.json()
}

async fn error_base(_req: Request) -> Result<Value, std::io::Error> {
    Err(std::io::Error::other("Base 500 error"))
}

async fn error_api(_req: Request) -> Result<Value, ApiError> {
    Err(ApiError::new(StatusCode::NOT_IMPLEMENTED, "API Error").with("code", "E001"))
}

fn app() -> App {
    App::new()
        .route(Method::GET, "/", main_view)
        .resource(Resource::get("/simple/{tag}", simple_get).request_schema(get_args()))
        .resource(Resource::post("/post", simple_post).request_schema(post_args()))
        .resource(Resource::post("/return", return_json).response_schema(output_schema()))
        .resource(Resource::get("/error/base", error_base))
        .resource(Resource::get("/error/api", error_api))
}

fn client() -> TestClient {
    app().test_client()
}

#[tokio::test]
async fn plain_route() {
    let rsp = client().get("/").send().await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(rsp.text(), "main");
    assert_eq!(rsp.content_type(), Some("text/plain; charset=utf-8"));
}

#[tokio::test]
async fn request_schema_on_get() {
    let client = client();

    let rsp = client.get("/simple/tag1").send().await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(
        rsp.json(),
        json!({
            "tag": "tag1",
            "res": {
                "params": {"test": 0, "test_s": null},
                "headers": {"x-test": null},
                "path": {"tag": "tag1"}
            }
        })
    );

    let rsp = client.get("/simple/tag1?test=1").header("X-Test", "7").send().await;
    assert_eq!(
        rsp.json()["res"],
        json!({
            "params": {"test": 1, "test_s": null},
            "headers": {"x-test": 7},
            "path": {"tag": "tag1"}
        })
    );
}

#[tokio::test]
async fn request_schema_on_post() {
    let client = client();
    let expected = json!({"headers": {"x-test": null}, "body": {"val1": 1}, "plop": 1});

    let rsp = client.post("/post").body(r#"{"val1": 1}"#).send().await;
    assert_eq!(rsp.status(), StatusCode::CREATED);
    assert_eq!(rsp.json(), expected);

    let rsp = client.post("/post").form([("val1", "1")]).send().await;
    assert_eq!(rsp.status(), StatusCode::CREATED);
    assert_eq!(rsp.json(), expected);
}

#[tokio::test]
async fn request_schema_errors() {
    let rsp = client().post("/post").json(&json!({"val1": "a"})).send().await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);

    let body = rsp.json();
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "Invalid input data");
    let list = body["error_list"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["location"], json!(["body", "val1"]));
    assert_eq!(list[0]["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn response_schema_converts_output() {
    let client = client();

    let rsp = client.post("/return").json(&json!({"id": "1", "name": "Name"})).send().await;
    assert_eq!(rsp.status(), StatusCode::OK);
    assert_eq!(rsp.json(), json!({"id": 1, "name": "Name", "extra": {"op1": null}}));

    let rsp = client
        .post("/return")
        .json(&json!({"id": "1", "name": "Name", "extra": {"op1": 12}}))
        .send()
        .await;
    assert_eq!(rsp.json(), json!({"id": 1, "name": "Name", "extra": {"op1": "12"}}));
}

#[tokio::test]
async fn response_schema_rejects_output() {
    let rsp = client().post("/return").json(&json!({"id": "abc"})).send().await;
    assert_eq!(rsp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(rsp.json(), json!({"status": 500, "message": "Wrong data output"}));
}

#[tokio::test]
async fn standard_error_is_hidden() {
    let rsp = client().get("/error/base").send().await;
    assert_eq!(rsp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(rsp.json(), json!({"status": 500, "message": "An error occured."}));
}

#[tokio::test]
async fn debug_mode_shows_the_cause() {
    let rsp = app().debug(true).test_client().get("/error/base").send().await;
    assert_eq!(
        rsp.json(),
        json!({"status": 500, "message": "An error occured.", "detail": ["Base 500 error"]})
    );
}

#[tokio::test]
async fn api_error_keeps_extra_data() {
    let rsp = client().get("/error/api").send().await;
    assert_eq!(rsp.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(rsp.json(), json!({"status": 501, "code": "E001", "message": "API Error"}));
}

#[tokio::test]
async fn unknown_url() {
    let rsp = client().get("/nope").send().await;
    assert_eq!(rsp.status(), StatusCode::NOT_FOUND);
    assert_eq!(rsp.json(), json!({"status": 404, "message": "Requested URL /nope not found"}));
}

#[tokio::test]
async fn wrong_method() {
    let rsp = client().delete("/post").send().await;
    assert_eq!(rsp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        rsp.json(),
        json!({"status": 405, "message": "Method DELETE not allowed for URL /post"})
    );
}
