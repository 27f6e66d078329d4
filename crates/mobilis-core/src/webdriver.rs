//! HTTP transport for the W3C WebDriver protocol.
//!
//! [`WebDriverClient`] sends JSON commands to an Appium server and unwraps the
//! `{"value": ...}` envelope of every response. Failures are reported as
//! [`WebDriverError`]: transport problems, W3C command errors carrying the
//! server's error code, or bodies that are not valid WebDriver responses.
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::webdriver::WebDriverClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebDriverClient::new("http://127.0.0.1:4723")?;
//! let status = client.status().await?;
//! println!("ready: {}", status.ready);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::capabilities::Capabilities;
use crate::driver::DriverError;

/// Timeout for establishing a connection to the server.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a whole command round-trip. Session creation may boot
/// an emulator, so it is generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors that can occur while talking to a WebDriver server.
#[derive(Error, Debug)]
pub enum WebDriverError {
    /// The request could not be sent or the response not received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a W3C error.
    #[error("{error}: {message}")]
    Command {
        /// The W3C error code, e.g. `"no such element"`.
        error: String,
        message: String,
    },

    /// The response body is not a WebDriver response.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<WebDriverError> for DriverError {
    fn from(err: WebDriverError) -> Self {
        match err {
            // reqwest flags an elapsed client timeout as a request error too.
            WebDriverError::Http(e) if e.is_timeout() => DriverError::Timeout(e.to_string()),
            WebDriverError::Http(e) => DriverError::ConnectionLost(e.to_string()),
            WebDriverError::Command { error, message } => DriverError::from_w3c(&error, message),
            WebDriverError::Decode(msg) => DriverError::MalformedResponse(msg),
        }
    }
}

/// The payload of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Appium 1.x omits this field; a response at all means ready.
    #[serde(default = "ready_default")]
    pub ready: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub build: Option<Value>,
}

fn ready_default() -> bool {
    true
}

impl ServerStatus {
    /// The server version reported under `build.version`.
    pub fn version(&self) -> Option<&str> {
        self.build.as_ref()?.get("version")?.as_str()
    }
}

/// A newly created session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    /// Capabilities the server actually applied.
    pub capabilities: Value,
}

/// Async JSON client for one WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    /// Create a client for the server at `base_url` (including any base path).
    pub fn new(base_url: impl Into<String>) -> Result<Self, WebDriverError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WebDriverError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a command and return the `value` of the response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, WebDriverError> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%method, %url, "sending webdriver command");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!(%method, %url, status = status.as_u16(), bytes = text.len(), "received webdriver response");

        let mut envelope: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) if !status.is_success() => {
                return Err(WebDriverError::Command {
                    error: "unknown error".into(),
                    message: format!("HTTP {status}: {text}"),
                });
            }
            Err(e) => return Err(WebDriverError::Decode(e.to_string())),
        };

        let value = envelope
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null);

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            debug!(%url, error, %message, "webdriver command failed");
            return Err(WebDriverError::Command {
                error: error.to_string(),
                message,
            });
        }
        if !status.is_success() {
            return Err(WebDriverError::Command {
                error: "unknown error".into(),
                message: format!("HTTP {status}"),
            });
        }
        Ok(value)
    }

    pub async fn get(&self, path: &str) -> Result<Value, WebDriverError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, WebDriverError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, WebDriverError> {
        self.request(Method::DELETE, path, None).await
    }

    /// Query `GET /status`.
    pub async fn status(&self) -> Result<ServerStatus, WebDriverError> {
        let value = self.get("/status").await?;
        serde_json::from_value(value).map_err(|e| WebDriverError::Decode(e.to_string()))
    }

    /// Create a session with the given desired capabilities.
    pub async fn new_session(&self, caps: &Capabilities) -> Result<NewSession, WebDriverError> {
        let value = self.post("/session", &caps.to_w3c()).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Decode("response carries no sessionId".into()))?
            .to_string();
        let capabilities = value.get("capabilities").cloned().unwrap_or(Value::Null);
        debug!(%session_id, "webdriver session created");
        Ok(NewSession {
            session_id,
            capabilities,
        })
    }
}
