//! Schema seam and the structured error tree it reports into.
//!
//! The validation engine itself is a black box behind [`Schema`]: it receives
//! one structured document (`{"headers", "path", "params", "body"}` for
//! requests, `{"body", "headers"}` for responses) and either returns the
//! validated document or an [`ErrorTree`] keyed by location.
//!
//! [`JsonSchema`] is the built-in implementation, backed by the
//! `jsonschema` crate.

mod json;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub use json::JsonSchema;

/// A validation engine for request or response documents.
pub trait Schema: Send + Sync + 'static {
    /// Fields declared under the top-level `section` (`"params"`, `"body"` …),
    /// or `None` when the schema says nothing about that section.
    ///
    /// Multi-valued sources (query strings, form bodies) use this to decide
    /// whether a key becomes a scalar or a list.
    fn field_kinds(&self, section: &str) -> Option<Vec<FieldKind>>;

    /// Validates `document`, returning its converted form or every error found.
    fn validate(&self, document: Value) -> Result<Value, ErrorTree>;
}

/// A schema shared between every request of a resource.
pub type SharedSchema = Arc<dyn Schema>;

/// One declared field of a document section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldKind {
    pub name: String,
    /// `true` when the field holds a list.
    pub repeated: bool,
}

// ── ErrorTree ─────────────────────────────────────────────────────────────────

/// Nested validation errors.
///
/// Each node carries the messages reported at its own location plus one
/// child per nested key:
///
/// ```text
/// body ─┬─ age      ["invalid age"]
///       └─ options ── extra ── ex1   ["invalid ex1"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: BTreeMap<String, ErrorTree>,
}

/// A flattened error: where it happened and what went wrong.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ErrorEntry {
    pub location: Vec<String>,
    pub messages: Vec<String>,
}

impl ErrorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a nested JSON object whose leaves are message
    /// strings or arrays of message strings.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use truss::schema::ErrorTree;
    ///
    /// let tree = ErrorTree::from_value(&json!({"body": {"val": ["Error message"]}}));
    /// assert_eq!(tree.entries()[0].location, ["body", "val"]);
    /// ```
    pub fn from_value(value: &Value) -> Self {
        let mut tree = Self::new();
        tree.fill(value);
        tree
    }

    fn fill(&mut self, value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.children.entry(key.clone()).or_default().fill(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.fill(item);
                }
            }
            Value::String(message) => self.messages.push(message.clone()),
            Value::Null => {}
            other => self.messages.push(other.to_string()),
        }
    }

    /// Records `message` at `location`, creating intermediate nodes.
    pub fn add<I, S>(&mut self, location: I, message: impl Into<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = self;
        for key in location {
            node = node.children.entry(key.into()).or_default();
        }
        node.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(ErrorTree::is_empty)
    }

    /// Depth-first flattening, sorted by location.
    pub fn entries(&self) -> Vec<ErrorEntry> {
        let mut out = Vec::new();
        self.walk(&mut Vec::new(), &mut out);
        out.sort();
        out
    }

    fn walk(&self, path: &mut Vec<String>, out: &mut Vec<ErrorEntry>) {
        if !self.messages.is_empty() {
            out.push(ErrorEntry {
                location: path.clone(),
                messages: self.messages.clone(),
            });
        }
        for (key, child) in &self.children {
            path.push(key.clone());
            child.walk(path, out);
            path.pop();
        }
    }

    /// The nested-object form, the inverse of [`ErrorTree::from_value`] for
    /// trees whose inner nodes carry no messages of their own.
    pub fn to_value(&self) -> Value {
        if self.children.is_empty() {
            return Value::from(self.messages.clone());
        }
        let mut map: serde_json::Map<String, Value> = self
            .children
            .iter()
            .map(|(key, child)| (key.clone(), child.to_value()))
            .collect();
        if !self.messages.is_empty() {
            map.insert(String::new(), Value::from(self.messages.clone()));
        }
        Value::Object(map)
    }
}
