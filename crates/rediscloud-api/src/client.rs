//! HTTP client for the Redis Cloud management API
//!
//! [`CloudClient`] carries the base URL, the API key pair, and a bounded
//! retry policy for rate-limit and server errors. Handlers clone it freely;
//! the underlying `reqwest::Client` is an `Arc` internally.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{CloudError, Result};

/// Default public endpoint of the management API
pub const DEFAULT_API_URL: &str = "https://api.redislabs.com/v1";

/// User agent string for API requests
const USER_AGENT: &str = concat!("rediscloud-provider/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the API base URL
pub const ENV_API_URL: &str = "REDISCLOUD_URL";
/// Environment variable holding the account API access key
pub const ENV_ACCESS_KEY: &str = "REDISCLOUD_ACCESS_KEY";
/// Environment variable holding the account API secret key
pub const ENV_SECRET_KEY: &str = "REDISCLOUD_SECRET_KEY";

/// Connection settings for [`CloudClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the management API
    pub api_url: String,
    /// Account-level API access key
    pub access_key: String,
    /// Account-level API secret key
    pub secret_key: String,
    /// Maximum attempts for retryable failures (429/5xx/transport)
    pub max_attempts: u32,
    /// Initial retry backoff; doubles per attempt
    pub backoff: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Build a config from explicit credentials, defaulting everything else
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Resolve credentials from `REDISCLOUD_URL`, `REDISCLOUD_ACCESS_KEY`
    /// and `REDISCLOUD_SECRET_KEY`
    pub fn from_env() -> Result<Self> {
        let access_key = std::env::var(ENV_ACCESS_KEY).map_err(|_| CloudError::AuthenticationFailed {
            message: format!("{ENV_ACCESS_KEY} is not set"),
        })?;
        let secret_key = std::env::var(ENV_SECRET_KEY).map_err(|_| CloudError::AuthenticationFailed {
            message: format!("{ENV_SECRET_KEY} is not set"),
        })?;
        let mut config = Self::new(access_key, secret_key);
        if let Ok(url) = std::env::var(ENV_API_URL) {
            config.api_url = url;
        }
        Ok(config)
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

/// Authenticated client for the management API
#[derive(Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    access_key: String,
    secret_key: String,
    max_attempts: u32,
    backoff: Duration,
}

impl CloudClient {
    /// Create a client from the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| CloudError::ConnectionError(format!("invalid API URL: {e}")))?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            access_key: config.access_key,
            secret_key: config.secret_key,
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff,
        })
    }

    /// Create a client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// The base URL this client talks to
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        // Base URLs carry a path segment (/v1), so join on the string form.
        let joined = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| CloudError::ConnectionError(format!("invalid path {path}: {e}")))
    }

    /// GET a JSON resource
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(reqwest::Method::GET, path, None::<&()>).await
    }

    /// POST a JSON body, decoding a JSON response
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(reqwest::Method::POST, path, Some(body)).await
    }

    /// PUT a JSON body, decoding a JSON response
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(reqwest::Method::PUT, path, Some(body)).await
    }

    /// DELETE a resource, decoding a JSON response
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(reqwest::Method::DELETE, path, None::<&()>).await
    }

    async fn execute<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let mut attempt = 0u32;
        let mut backoff = self.backoff;
        loop {
            attempt += 1;
            debug!(%method, %url, attempt, "cloud API request");

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header("x-api-key", &self.access_key)
                .header("x-api-secret-key", &self.secret_key);
            if let Some(body) = body {
                request = request.json(body);
            }

            let outcome = match request.send().await {
                Ok(response) => self.decode(response).await,
                Err(e) => Err(CloudError::from(e)),
            };

            match outcome {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(%url, attempt, error = %e, "retrying cloud API request");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                other => return other,
            }
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;
        trace!(status = status.as_u16(), body = %text, "cloud API response");

        if status.is_success() {
            // Task-returning DELETEs occasionally answer with an empty body.
            let body = if text.trim().is_empty() { "null" } else { &text };
            return serde_json::from_str(body).map_err(CloudError::from);
        }

        let message = extract_error_message(&text);
        Err(match status.as_u16() {
            400 => CloudError::BadRequest { message },
            401 | 403 => CloudError::AuthenticationFailed { message },
            404 => CloudError::NotFound { message },
            409 => CloudError::Conflict { message },
            429 => CloudError::RateLimited { message },
            _ if status.is_server_error() => CloudError::ServerError(message),
            code => CloudError::Api { code, message },
        })
    }
}

/// Pull a human-readable message out of an API error body
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "description", "detail", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        "no error detail provided".to_string()
    } else {
        body.trim().to_string()
    }
}
