use crate::credentials::{RoiChatCredentials, VERIFY_PATH};
use crate::error::NodeError;
use crate::host::HttpRequester;
use crate::request::{HttpCallSpec, HttpMethod};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

/// Authenticated reqwest client for the RoiChat API. Stateless apart from
/// the credential; one instance can serve a whole run.
#[derive(Debug, Clone)]
pub struct RoiChatClient {
    http: Client,
    credentials: RoiChatCredentials,
}

impl RoiChatClient {
    pub fn new(credentials: RoiChatCredentials) -> Self {
        Self {
            http: Client::new(),
            credentials,
        }
    }

    /// Credential test: any non-error response from the bot-fields listing
    /// means the key is valid.
    pub async fn verify(&self) -> Result<(), NodeError> {
        self.request(&HttpCallSpec::get(VERIFY_PATH)).await.map(|_| ())
    }
}

#[async_trait]
impl HttpRequester for RoiChatClient {
    async fn request(&self, spec: &HttpCallSpec) -> Result<Value, NodeError> {
        let url = self.credentials.endpoint(spec.path);
        debug!(method = %spec.method, %url, "roichat request");

        let mut req = match spec.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
            HttpMethod::Put => self.http.put(&url),
            HttpMethod::Delete => self.http.delete(&url),
        };
        req = req.bearer_auth(self.credentials.api_key());
        if !spec.query.is_empty() {
            req = req.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            NodeError::ConnectionFailed(format!("RoiChat request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".into());
            error!("RoiChat API error: {}", text);
            return Err(NodeError::ExecutionFailed(text));
        }

        resp.json().await.map_err(|e| {
            NodeError::ExecutionFailed(format!("invalid RoiChat response: {e}"))
        })
    }
}
