//! HTTP client for the listing service
//!
//! Wraps a single `reqwest::Client` built once from [`ApiClientConfig`] and
//! normalizes every failure (transport or HTTP status) into [`RemoteError`], so
//! callers never branch on reqwest's error shapes.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// Error Types
// =============================================================================

/// Normalized remote failure
///
/// `status` is `None` when the request never produced an HTTP response
/// (DNS failure, refused connection, timeout). Otherwise it carries the HTTP
/// status and whatever body the server sent back as `payload`.
///
/// # Examples
/// ```
/// use universities_client::RemoteError;
///
/// let error = RemoteError::new(Some(404), "Not found", None);
/// assert_eq!(error.status(), Some(404));
/// assert!(!error.is_transport());
/// assert!(RemoteError::transport("connection refused").is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    message: String,
    status: Option<u16>,
    payload: Option<Value>,
}

impl RemoteError {
    /// Create a new remote error
    pub fn new(status: Option<u16>, message: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            message: message.into(),
            status,
            payload,
        }
    }

    /// Error for a request that never got an HTTP response
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message, None)
    }

    /// Build an error from a non-2xx response body
    ///
    /// The message comes from the body's `message` (or `error`) field when the
    /// body is a JSON object carrying one.
    pub fn from_response(status: u16, body: &str) -> Self {
        let payload = if body.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.to_string())),
            )
        };

        let message = payload
            .as_ref()
            .and_then(|p| p.get("message").or_else(|| p.get("error")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status code {}", status));

        Self::new(Some(status), message, payload)
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, if a response was received
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Response body sent with the failure
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// True when no HTTP response was received
    pub fn is_transport(&self) -> bool {
        self.status.is_none()
    }

    /// Whether retrying the same request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::new(Some(status.as_u16()), err.to_string(), None),
            None => Self::transport(err.to_string()),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Default listing service
pub const DEFAULT_BASE_URL: &str = "http://universities.hipolabs.com";

/// Configuration for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base service URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Headers sent with every request
    pub default_headers: HashMap<String, String>,
    /// Log every request and failure at info/error level
    pub enable_logs: bool,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Whitebeard/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
            enable_logs: false,
        }
    }
}

impl ApiClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Toggle request logging
    pub fn with_logs(mut self, enabled: bool) -> Self {
        self.enable_logs = enabled;
        self
    }
}

// =============================================================================
// Client
// =============================================================================

/// Shared HTTP client
///
/// Cheap to clone; clones share the connection pool. Nothing in here is
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Build a client from configuration
    pub fn new(config: ApiClientConfig) -> crate::Result<Self> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|e| crate::Error::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// GET `path` with query parameters and decode a JSON body
    ///
    /// Returns `Ok(None)` for a 2xx response whose body is empty or JSON `null`.
    pub async fn get_json<T>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, RemoteError>
    where
        T: DeserializeOwned,
    {
        let url = self.url_for(path);

        if self.config.enable_logs {
            tracing::info!(method = "GET", url = %url, params = ?params, "API request");
        }

        let mut req = self.client.get(&url).query(params);
        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        let result = match req.send().await {
            Ok(response) => Self::parse_response(response).await,
            Err(e) => Err(RemoteError::from(e)),
        };

        if let Err(error) = &result {
            if self.config.enable_logs {
                tracing::error!(
                    url = %url,
                    status = ?error.status(),
                    payload = ?error.payload(),
                    "API request failed: {}",
                    error.message()
                );
            }
        }

        result
    }

    async fn parse_response<T>(response: reqwest::Response) -> Result<Option<T>, RemoteError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            RemoteError::new(
                Some(status.as_u16()),
                format!("Failed to read response: {}", e),
                None,
            )
        })?;

        if !status.is_success() {
            return Err(RemoteError::from_response(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str::<Option<T>>(&body).map_err(|e| {
            RemoteError::new(
                Some(status.as_u16()),
                format!("Invalid response body: {}", e),
                Some(Value::String(body)),
            )
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}
