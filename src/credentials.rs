use crate::error::NodeError;
use std::env;
use std::fmt;
use url::Url;

/// Default RoiChat API base.
pub const DEFAULT_BASE_URL: &str = "https://roichatpartner.com.br/api";

/// Connectivity-test endpoint; any non-error response validates a key.
pub const VERIFY_PATH: &str = "/flow/bot-fields";

const API_KEY_VAR: &str = "ROICHAT_API_KEY";
const BASE_URL_VAR: &str = "ROICHAT_BASE_URL";

/// One stored secret (the API key) plus the base URL it authenticates
/// against. Every outbound request carries `Authorization: Bearer <key>`.
#[derive(Clone)]
pub struct RoiChatCredentials {
    api_key: String,
    base_url: Url,
}

impl RoiChatCredentials {
    pub fn new(api_key: impl Into<String>) -> Result<Self, NodeError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, NodeError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(NodeError::InvalidInput("API key is empty".into()));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| NodeError::InvalidInput(format!("invalid base URL: {e}")))?;
        Ok(Self { api_key, base_url })
    }

    /// Read `ROICHAT_API_KEY` (and optional `ROICHAT_BASE_URL`) from the
    /// environment, loading a `.env` file when present.
    pub fn from_env() -> Result<Self, NodeError> {
        dotenvy::dotenv().ok();
        let api_key = env::var(API_KEY_VAR)
            .map_err(|_| NodeError::Internal(format!("{API_KEY_VAR} is not set")))?;
        match env::var(BASE_URL_VAR) {
            Ok(base) => Self::with_base_url(api_key, &base),
            Err(_) => Self::new(api_key),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Absolute URL for an API path, tolerant of trailing slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for RoiChatCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print the key
        f.debug_struct("RoiChatCredentials")
            .field("api_key", &"***")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}
