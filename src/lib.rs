//! RoiChat chat/CRM integration node.
//!
//! Exposes the RoiChat REST API (contacts, tags, custom fields, flows,
//! broadcasts, WhatsApp templates, conversation history) as point-and-click
//! operations for a flow host. The node is stateless: each run maps a
//! selected (resource, operation) pair plus per-row parameters onto one
//! authenticated HTTP call per row, and forwards the JSON payload verbatim.
//!
//! The host runtime is abstracted behind two narrow seams,
//! [`host::ParameterSource`] and [`host::HttpRequester`], so the dispatcher
//! runs unchanged against a live host or a test double.

pub mod client;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod node;
pub mod options;
pub mod request;

pub use client::RoiChatClient;
pub use credentials::RoiChatCredentials;
pub use dispatch::{Operation, Resource};
pub use error::NodeError;
pub use host::{HttpRequester, InputRows, NodeContext, ParameterSource};
pub use node::RoiChatNode;
pub use options::ListOption;
pub use request::{HttpCallSpec, HttpMethod};
