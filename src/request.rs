use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};

/// HTTP verbs the RoiChat API uses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// One fully shaped outbound call: verb, API path relative to the base URL,
/// query pairs and an optional JSON body. Built per row and consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCallSpec {
    pub method: HttpMethod,
    pub path: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpCallSpec {
    pub fn get(path: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: &'static str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn put(path: &'static str, body: Value) -> Self {
        Self {
            method: HttpMethod::Put,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: &'static str, body: Value) -> Self {
        Self {
            method: HttpMethod::Delete,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Keys of the JSON body, for assertions and logging.
    pub fn body_keys(&self) -> Vec<String> {
        match &self.body {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

/// Whether a parameter value counts as present when assembling a sparse
/// query or body. Empty strings and zero numbers are treated as unset, so
/// untouched optional fields never reach the wire.
pub(crate) fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Bool(b) => *b,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Render a scalar parameter for the query string.
pub(crate) fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Copy the listed keys from `source` into a query, skipping unset values.
pub(crate) fn sparse_query(source: &Map<String, Value>, keys: &[&str]) -> Vec<(String, String)> {
    let mut query = Vec::new();
    for key in keys {
        if let Some(value) = source.get(*key)
            && is_set(value)
        {
            query.push(((*key).to_string(), query_value(value)));
        }
    }
    query
}

/// Insert `value` into a body map only when it is set.
pub(crate) fn insert_if_set(body: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value
        && is_set(&value)
    {
        body.insert(key.to_string(), value);
    }
}
