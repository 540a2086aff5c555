use crate::error::NodeError;
use crate::request::{HttpCallSpec, is_set};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Per-row parameter lookup supplied by the host runtime. The node never
/// evaluates expressions itself; it only reads resolved values by name.
pub trait ParameterSource: Send + Sync {
    /// Resolved value of `name` for the given input row, if any.
    fn parameter(&self, name: &str, row: usize) -> Option<Value>;
    /// Number of input rows in this run.
    fn row_count(&self) -> usize;
}

/// Authenticated HTTP primitive supplied by the host (or by
/// [`crate::client::RoiChatClient`] when the node owns the connection).
#[async_trait]
pub trait HttpRequester: Send + Sync {
    /// Issue one call and return the parsed JSON payload.
    async fn request(&self, spec: &HttpCallSpec) -> Result<Value, NodeError>;
}

/// Simple [`ParameterSource`] over in-memory rows: per-row values first,
/// then run-wide values such as `resource` and `operation`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputRows {
    shared: Map<String, Value>,
    rows: Vec<Map<String, Value>>,
}

impl InputRows {
    pub fn new(rows: Vec<Map<String, Value>>) -> Self {
        Self {
            shared: Map::new(),
            rows,
        }
    }

    pub fn with_shared(mut self, name: &str, value: Value) -> Self {
        self.shared.insert(name.to_string(), value);
        self
    }
}

impl ParameterSource for InputRows {
    fn parameter(&self, name: &str, row: usize) -> Option<Value> {
        self.rows
            .get(row)
            .and_then(|r| r.get(name))
            .or_else(|| self.shared.get(name))
            .cloned()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Everything a node run borrows from the host: parameters, the
/// authenticated requester and the failure policy.
#[derive(Clone)]
pub struct NodeContext {
    params: Arc<dyn ParameterSource>,
    http: Arc<dyn HttpRequester>,
    continue_on_fail: bool,
}

impl NodeContext {
    pub fn new(
        params: Arc<dyn ParameterSource>,
        http: Arc<dyn HttpRequester>,
        continue_on_fail: bool,
    ) -> Self {
        Self {
            params,
            http,
            continue_on_fail,
        }
    }

    pub fn params(&self) -> &dyn ParameterSource {
        self.params.as_ref()
    }

    pub fn http(&self) -> &dyn HttpRequester {
        self.http.as_ref()
    }

    /// Tolerant mode: capture per-row failures as `{error}` records instead
    /// of aborting the batch.
    pub fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }
}

/// View over one row's parameters with typed accessors.
pub struct RowParams<'a> {
    source: &'a dyn ParameterSource,
    row: usize,
}

impl<'a> RowParams<'a> {
    pub fn new(source: &'a dyn ParameterSource, row: usize) -> Self {
        Self { source, row }
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.source.parameter(name, self.row)
    }

    /// Present and non-empty, per the sparse-payload rules.
    pub fn has(&self, name: &str) -> bool {
        self.value(name).is_some_and(|v| is_set(&v))
    }

    /// Required string parameter.
    pub fn string(&self, name: &str) -> Result<String, NodeError> {
        match self.value(name) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(NodeError::MissingParameter(name.to_string())),
        }
    }

    /// Optional string parameter; empty counts as absent.
    pub fn opt_string(&self, name: &str) -> Option<String> {
        match self.value(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn u64_or(&self, name: &str, default: u64) -> u64 {
        self.value(name)
            .and_then(|v| v.as_u64())
            .unwrap_or(default)
    }

    /// Object-valued parameter (filter/option collections); absent means empty.
    pub fn object(&self, name: &str) -> Map<String, Value> {
        match self.value(name) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Array-of-strings parameter; absent means empty.
    pub fn string_array(&self, name: &str) -> Vec<String> {
        match self.value(name) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Array-of-objects parameter; absent means empty.
    pub fn object_array(&self, name: &str) -> Vec<Map<String, Value>> {
        match self.value(name) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
