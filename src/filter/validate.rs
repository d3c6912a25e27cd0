//! Schema validation filters.

use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde_json::{Map, Value, json};
use thiserror::Error as ThisError;
use tracing::{debug, error};

use crate::api_error::{ApiError, ValidationErrors};
use crate::filter::Endpoint;
use crate::request::{Request, collapse};
use crate::resource::ResourceOptions;
use crate::response::{DataResponse, Outcome};
use crate::schema::{FieldKind, Schema};

#[derive(Debug, ThisError)]
#[error("response is not a data response")]
struct NotDataResponse;

/// Validates the request against the resource's request schema and stores
/// the result in [`Request::validated`].
///
/// The schema sees one document:
///
/// ```json
/// {"headers": {...}, "path": {...}, "params": {...}, "body": {...}}
/// ```
///
/// Query parameters and form bodies are multi-valued; a field the schema
/// declares as a list always gets a list, other fields get a single value.
///
/// Without a request schema this filter returns `next` unchanged.
pub fn validate_request(next: Endpoint, options: &ResourceOptions) -> Endpoint {
    let Some(schema) = options.request_schema().cloned() else {
        return next;
    };

    Endpoint::new(move |mut req: Request| {
        let next = next.clone();
        let schema = Arc::clone(&schema);
        async move {
            let document = request_document(&req, schema.as_ref())?;
            match schema.validate(document) {
                Ok(validated) => req.set_validated(validated),
                Err(errors) => {
                    debug!(path = %req.path(), errors = %errors.to_value(), "request rejected");
                    return Err(ApiError::from(ValidationErrors::new(errors)));
                }
            }
            next.call(req).await
        }
    })
}

fn request_document(req: &Request, schema: &dyn Schema) -> Result<Value, ApiError> {
    let headers = header_section(req.headers(), schema.field_kinds("headers").as_deref());

    let path: Map<String, Value> = req
        .params()
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect();

    let params = req.query().to_document(schema.field_kinds("params").as_deref());

    let body = if req.body().is_empty() {
        Value::Object(Map::new())
    } else if req.is_form() {
        req.form().to_document(schema.field_kinds("body").as_deref())
    } else {
        req.json()?
    };

    Ok(json!({
        "headers": headers,
        "path": path,
        "params": params,
        "body": body,
    }))
}

/// Declared headers are looked up case-insensitively and keyed by their
/// declared name. Without declarations every header is passed on.
fn header_section(headers: &HeaderMap, kinds: Option<&[FieldKind]>) -> Value {
    let values_of = |name: &str| -> Vec<Value> {
        headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(Value::from)
            .collect()
    };

    let section: Map<String, Value> = match kinds {
        Some(kinds) => kinds
            .iter()
            .filter_map(|kind| {
                collapse(values_of(kind.name.as_str()), kind.repeated).map(|v| (kind.name.clone(), v))
            })
            .collect(),
        None => headers
            .keys()
            .filter_map(|name| {
                collapse(values_of(name.as_str()), false).map(|v| (name.as_str().to_owned(), v))
            })
            .collect(),
    };
    Value::Object(section)
}

/// Validates and converts data responses against the resource's response
/// schema.
///
/// - Raw responses pass through untouched.
/// - A bare value is an internal error: put [`transform_response`] closer to
///   the handler.
/// - With a schema, the document `{"body": data, "headers": {...}}` is
///   validated; the converted body replaces the data and converted headers
///   are set on the response. Failure is a 500 `Wrong data output`.
///
/// [`transform_response`]: crate::filter::transform_response
pub fn validate_response(next: Endpoint, options: &ResourceOptions) -> Endpoint {
    let schema = options.response_schema().cloned();

    Endpoint::new(move |req: Request| {
        let next = next.clone();
        let schema = schema.clone();
        async move {
            let mut rsp = match next.call(req).await? {
                raw @ Outcome::Raw(_) => return Ok(raw),
                Outcome::Data(rsp) => rsp,
                Outcome::Value(_) => return Err(ApiError::internal(NotDataResponse)),
            };
            if let Some(schema) = schema {
                serialize(schema.as_ref(), &mut rsp)?;
            }
            Ok(Outcome::Data(rsp))
        }
    })
}

fn serialize(schema: &dyn Schema, rsp: &mut DataResponse) -> Result<(), ApiError> {
    let headers = response_headers(rsp, schema.field_kinds("headers").as_deref());
    let document = json!({"body": rsp.data(), "headers": headers});

    let mut result = match schema.validate(document) {
        Ok(Value::Object(result)) => result,
        Ok(_) => return Ok(()),
        Err(errors) => {
            error!(errors = %errors.to_value(), "response rejected by schema");
            return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Wrong data output"));
        }
    };

    if let Some(body) = result.remove("body") {
        rsp.set_data(body);
    }
    if let Some(Value::Object(headers)) = result.remove("headers") {
        for (name, value) in headers {
            match value {
                Value::Null => {}
                Value::String(s) => rsp.set_header(&name, &s),
                other => rsp.set_header(&name, &other.to_string()),
            }
        }
    }
    Ok(())
}

/// Declared headers are keyed by their declared name, whatever case the
/// handler used. Without declarations every header is passed on, lowercased.
fn response_headers(rsp: &DataResponse, kinds: Option<&[FieldKind]>) -> Map<String, Value> {
    match kinds {
        Some(kinds) => kinds
            .iter()
            .filter_map(|kind| {
                let values: Vec<Value> = rsp
                    .headers()
                    .iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case(&kind.name))
                    .map(|(_, v)| Value::from(v.as_str()))
                    .collect();
                collapse(values, kind.repeated).map(|v| (kind.name.clone(), v))
            })
            .collect(),
        None => rsp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), Value::from(v.as_str())))
            .collect(),
    }
}
