//! [`Schema`] backed by JSON Schema (draft 7).
//!
//! Validation proper is done by the `jsonschema` crate. Around it sits a
//! conforming pass that gives documents the shape the schema describes:
//! unknown keys are dropped, defaults are filled, nested nodes are
//! materialised, and wire strings are coerced to the declared scalar types.

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Number, Value};

use super::{ErrorTree, FieldKind, Schema};
use crate::error::Error;

const REQUIRED_MESSAGE: &str = "This field is required.";

/// A compiled JSON Schema.
///
/// Objects that declare `properties` are *nodes*: when absent from the
/// document they are created empty, so their own defaults and required
/// fields still apply.
///
/// ```rust
/// use serde_json::json;
/// use truss::schema::{JsonSchema, Schema};
///
/// let schema = JsonSchema::new(json!({
///     "type": "object",
///     "properties": {
///         "params": {
///             "type": "object",
///             "properties": {
///                 "page": {"type": "integer", "minimum": 1, "default": 1},
///                 "sort": {"type": "string", "enum": ["asc", "desc"], "default": "asc"}
///             }
///         }
///     }
/// })).unwrap();
///
/// let validated = schema.validate(json!({"params": {"page": "2"}})).unwrap();
/// assert_eq!(validated, json!({"params": {"page": 2, "sort": "asc"}}));
/// ```
pub struct JsonSchema {
    raw: Value,
    compiled: JSONSchema,
}

impl JsonSchema {
    /// Compiles `raw`. Fails with [`Error::Schema`] if it is not a valid
    /// draft 7 schema.
    pub fn new(raw: Value) -> Result<Self, Error> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&raw)
            .map_err(|e| Error::Schema(e.to_string()))?;
        Ok(Self { raw, compiled })
    }

    /// Parses and compiles a schema from JSON text.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let raw = serde_json::from_str(text).map_err(|e| Error::Schema(e.to_string()))?;
        Self::new(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").field("raw", &self.raw).finish()
    }
}

impl Schema for JsonSchema {
    fn field_kinds(&self, section: &str) -> Option<Vec<FieldKind>> {
        let node = self.raw.get("properties")?.get(section)?;
        let fields = node.get("properties")?.as_object()?;
        Some(
            fields
                .iter()
                .map(|(name, field)| FieldKind {
                    name: name.clone(),
                    repeated: declared_type(field) == Some("array"),
                })
                .collect(),
        )
    }

    fn validate(&self, document: Value) -> Result<Value, ErrorTree> {
        let mut conformed = conform(&self.raw, document);

        if let Err(errors) = self.compiled.validate(&conformed) {
            let mut tree = ErrorTree::new();
            for error in errors {
                let mut location = error.instance_path.clone().into_vec();
                let message = match &error.kind {
                    // Reported on the parent object; point at the field instead.
                    ValidationErrorKind::Required { property } => {
                        location.push(match property {
                            Value::String(name) => name.clone(),
                            other => other.to_string(),
                        });
                        REQUIRED_MESSAGE.to_owned()
                    }
                    _ => error.to_string(),
                };
                tree.add(location, message);
            }
            return Err(tree);
        }

        fill_absent(&self.raw, &mut conformed);
        Ok(conformed)
    }
}

// ── Conforming ────────────────────────────────────────────────────────────────

fn declared_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(ty) => Some(ty.as_str()),
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|ty| *ty != "null"),
        _ => None,
    }
}

fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties")?.as_object()
}

fn is_node(schema: &Value) -> bool {
    properties(schema).is_some()
}

fn is_required(schema: &Value, name: &str) -> bool {
    schema
        .get("required")
        .and_then(Value::as_array)
        .is_some_and(|required| required.iter().any(|r| r.as_str() == Some(name)))
}

fn keeps_unknown(schema: &Value) -> bool {
    matches!(schema.get("additionalProperties"), Some(Value::Bool(true) | Value::Object(_)))
}

fn conform(schema: &Value, value: Value) -> Value {
    if value.is_null() {
        return value;
    }
    match declared_type(schema) {
        Some("object") | None if is_node(schema) => conform_object(schema, value),
        Some("array") => conform_array(schema, value),
        Some("integer") => coerce_integer(value),
        Some("number") => coerce_number(value),
        Some("boolean") => coerce_boolean(value),
        Some("string") => coerce_string(value),
        _ => value,
    }
}

fn conform_object(schema: &Value, value: Value) -> Value {
    let Value::Object(mut input) = value else {
        return value;
    };
    let Some(fields) = properties(schema) else {
        return Value::Object(input);
    };

    let mut out = Map::new();
    for (name, field) in fields {
        // A required field sent as null counts as missing.
        let present = input.remove(name).filter(|v| !(v.is_null() && is_required(schema, name)));
        if let Some(present) = present {
            out.insert(name.clone(), conform(field, present));
        } else if let Some(default) = field.get("default") {
            out.insert(name.clone(), conform(field, default.clone()));
        } else if is_node(field) {
            out.insert(name.clone(), conform(field, Value::Object(Map::new())));
        }
    }
    if keeps_unknown(schema) {
        out.extend(input);
    }
    Value::Object(out)
}

fn conform_array(schema: &Value, value: Value) -> Value {
    match (value, schema.get("items")) {
        (Value::Array(items), Some(item_schema)) if item_schema.is_object() => {
            Value::Array(items.into_iter().map(|item| conform(item_schema, item)).collect())
        }
        (value, _) => value,
    }
}

fn coerce_integer(value: Value) -> Value {
    match value {
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(s),
        },
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
            _ => Value::Number(n),
        },
        other => other,
    }
}

fn coerce_number(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Value::from(n);
            }
            match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(s),
            }
        }
        other => other,
    }
}

fn coerce_boolean(value: Value) -> Value {
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => Value::String(s),
        },
        Value::Number(n) => match n.as_i64() {
            Some(0) => Value::Bool(false),
            Some(1) => Value::Bool(true),
            _ => Value::Number(n),
        },
        other => other,
    }
}

fn coerce_string(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other,
    }
}

/// Declared properties that are still missing after validation become `null`.
fn fill_absent(schema: &Value, value: &mut Value) {
    match value {
        Value::Object(map) => {
            let Some(fields) = properties(schema) else { return };
            for (name, field) in fields {
                let slot = map.entry(name.clone()).or_insert(Value::Null);
                fill_absent(field, slot);
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    fill_absent(item_schema, item);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn schema(raw: Value) -> JsonSchema {
        JsonSchema::new(raw).unwrap()
    }

    fn locations(tree: &ErrorTree) -> Vec<Vec<String>> {
        tree.entries().into_iter().map(|e| e.location).collect()
    }

    #[test]
    fn rejects_invalid_schema() {
        let err = JsonSchema::new(json!({"type": 12})).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn field_kinds_of_a_section() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "params": {
                    "type": "object",
                    "properties": {
                        "p1": {"type": "integer"},
                        "p2": {"type": "array", "items": {"type": "integer"}}
                    }
                }
            }
        }));

        let mut kinds = s.field_kinds("params").unwrap();
        kinds.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            kinds,
            vec![
                FieldKind { name: "p1".into(), repeated: false },
                FieldKind { name: "p2".into(), repeated: true },
            ]
        );
        assert_eq!(s.field_kinds("body"), None);
    }

    #[test]
    fn missing_optional_fields_become_null() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "params": {"type": "object", "properties": {"p": {"type": "integer"}}}
            }
        }));

        assert_eq!(s.validate(json!({})).unwrap(), json!({"params": {"p": null}}));
    }

    #[test]
    fn required_field_is_reported_at_its_own_location() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "body": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {
                        "id": {"type": "integer"},
                        "name": {"type": "string", "default": ""}
                    }
                }
            }
        }));

        let tree = s.validate(json!({"body": {}})).unwrap_err();
        let entries = tree.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, ["body", "id"]);
        assert_eq!(entries[0].messages, [REQUIRED_MESSAGE]);

        let ok = s.validate(json!({"body": {"id": "2", "extra-data": "ignored"}})).unwrap();
        assert_eq!(ok, json!({"body": {"id": 2, "name": ""}}));
    }

    #[test]
    fn null_required_field_is_reported_as_missing() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "body": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {
                        "id": {"type": "integer"},
                        "note": {"type": ["string", "null"]}
                    }
                }
            }
        }));

        let tree = s.validate(json!({"body": {"id": null}})).unwrap_err();
        let entries = tree.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, ["body", "id"]);
        assert_eq!(entries[0].messages, [REQUIRED_MESSAGE]);

        assert_eq!(
            s.validate(json!({"body": {"id": 3, "note": null}})).unwrap(),
            json!({"body": {"id": 3, "note": null}})
        );
    }

    #[test]
    fn collects_every_error() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "params": {
                    "type": "object",
                    "properties": {
                        "sort": {"type": "string", "enum": ["asc", "desc"], "default": "asc"},
                        "page": {"type": "integer", "minimum": 1, "default": 1}
                    }
                },
                "path": {
                    "type": "object",
                    "properties": {"tag": {"type": "string", "pattern": "^[a-z]+$"}}
                }
            }
        }));

        let tree = s
            .validate(json!({"params": {"sort": "z", "page": "-4"}, "path": {"tag": "abc12"}}))
            .unwrap_err();
        assert_eq!(
            locations(&tree),
            vec![
                vec!["params".to_string(), "page".into()],
                vec!["params".into(), "sort".into()],
                vec!["path".into(), "tag".into()],
            ]
        );
    }

    #[test]
    fn uncoercible_values_fail_type_check() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "headers": {"type": "object", "properties": {"x-test": {"type": "integer"}}}
            }
        }));

        let tree = s.validate(json!({"headers": {"x-test": "a"}})).unwrap_err();
        assert_eq!(locations(&tree), vec![vec!["headers".to_string(), "x-test".into()]]);

        let ok = s.validate(json!({"headers": {"x-test": "12"}})).unwrap();
        assert_eq!(ok, json!({"headers": {"x-test": 12}}));
    }

    #[test]
    fn scalar_coercions() {
        assert_eq!(coerce_integer(json!("10")), json!(10));
        assert_eq!(coerce_integer(json!(3.0)), json!(3));
        assert_eq!(coerce_integer(json!("x")), json!("x"));
        assert_eq!(coerce_number(json!("1.5")), json!(1.5));
        assert_eq!(coerce_number(json!("7")), json!(7));
        assert_eq!(coerce_boolean(json!("1")), json!(true));
        assert_eq!(coerce_boolean(json!("off")), json!(false));
        assert_eq!(coerce_boolean(json!("maybe")), json!("maybe"));
        assert_eq!(coerce_string(json!(12)), json!("12"));
        assert_eq!(coerce_string(json!(true)), json!("true"));
    }

    #[test]
    fn array_items_are_coerced() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "params": {
                    "type": "object",
                    "properties": {"p2": {"type": "array", "items": {"type": "integer"}}}
                }
            }
        }));

        let ok = s.validate(json!({"params": {"p2": ["5", "4"]}})).unwrap();
        assert_eq!(ok, json!({"params": {"p2": [5, 4]}}));
    }

    #[test]
    fn nested_nodes_are_materialised() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "body": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {"type": "string", "minLength": 1},
                        "options": {
                            "type": "object",
                            "properties": {"xray": {"type": "boolean", "default": false}}
                        }
                    }
                }
            }
        }));

        let ok = s.validate(json!({"body": {"name": "olivier"}})).unwrap();
        assert_eq!(ok, json!({"body": {"name": "olivier", "options": {"xray": false}}}));

        let ok = s
            .validate(json!({"body": {"name": "olivier", "options": {"xray": "1"}}}))
            .unwrap();
        assert_eq!(ok, json!({"body": {"name": "olivier", "options": {"xray": true}}}));
    }

    #[test]
    fn additional_properties_are_kept_when_allowed() {
        let s = schema(json!({
            "type": "object",
            "additionalProperties": true,
            "properties": {"a": {"type": "integer"}}
        }));

        assert_eq!(s.validate(json!({"a": "1", "b": 2})).unwrap(), json!({"a": 1, "b": 2}));
    }
}
