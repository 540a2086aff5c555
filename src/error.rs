use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a node run can surface to the host.
///
/// Remote API failures keep the upstream message untouched so the host can
/// show it verbatim; input problems are raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Error)]
pub enum NodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("Processing error: {0}")]
    ExecutionFailed(String),
    #[error("Failed to connect: {0}")]
    ConnectionFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
