//! [`MobileDriver`] implementation backed by a WebDriver session.
//!
//! [`WebDriverSession`] translates every driver call into the corresponding
//! W3C endpoint under `/session/{id}`, plus the Appium extensions
//! (`/appium/app/close`, `mobile:` commands through `/execute/sync`).
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::capabilities::Capabilities;
//! use mobilis_core::driver::MobileDriver;
//! use mobilis_core::locator::By;
//! use mobilis_core::session::WebDriverSession;
//!
//! # async fn example(caps: Capabilities) -> Result<(), Box<dyn std::error::Error>> {
//! let session = WebDriverSession::create("http://127.0.0.1:4723", &caps).await?;
//! let buttons = session.find_elements(&By::class_name("android.widget.Button"), None).await?;
//! session.click(&buttons[0]).await?;
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::capabilities::Capabilities;
use crate::driver::{DriverError, ElementId, MobileDriver, Rect};
use crate::gesture::ActionSequence;
use crate::locator::By;
use crate::webdriver::WebDriverClient;

/// W3C key of an element reference.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Key used by JSON wire protocol servers.
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Extracts the element id from an element reference object.
fn element_id(value: &Value) -> Result<ElementId, DriverError> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(ElementId::new)
        .ok_or_else(|| DriverError::MalformedResponse(format!("not an element reference: {value}")))
}

fn as_bool(value: Value) -> Result<bool, DriverError> {
    value
        .as_bool()
        .ok_or_else(|| DriverError::MalformedResponse(format!("expected a boolean, got {value}")))
}

fn as_string(value: Value) -> Result<String, DriverError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(DriverError::MalformedResponse(format!(
            "expected a string, got {other}"
        ))),
    }
}

/// A live Appium session.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: WebDriverClient,
    session_id: String,
}

impl WebDriverSession {
    /// Create a new session on the server at `url`.
    #[instrument(skip(caps), level = "debug")]
    pub async fn create(url: &str, caps: &Capabilities) -> Result<Self, DriverError> {
        let client = WebDriverClient::new(url).map_err(DriverError::from)?;
        let created = client.new_session(caps).await?;
        Ok(Self::attach(client, created.session_id))
    }

    /// Wrap an existing session.
    pub fn attach(client: WebDriverClient, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.session_id, suffix)
    }

    fn element_path(&self, element: &ElementId, suffix: &str) -> String {
        self.path(&format!("/element/{}{}", element, suffix))
    }

    async fn get(&self, suffix: &str) -> Result<Value, DriverError> {
        Ok(self.client.get(&self.path(suffix)).await?)
    }

    async fn post(&self, suffix: &str, body: Value) -> Result<Value, DriverError> {
        Ok(self.client.post(&self.path(suffix), &body).await?)
    }

    async fn get_element(&self, element: &ElementId, suffix: &str) -> Result<Value, DriverError> {
        Ok(self.client.get(&self.element_path(element, suffix)).await?)
    }

    async fn post_element(
        &self,
        element: &ElementId,
        suffix: &str,
        body: Value,
    ) -> Result<Value, DriverError> {
        Ok(self
            .client
            .post(&self.element_path(element, suffix), &body)
            .await?)
    }
}

#[async_trait]
impl MobileDriver for WebDriverSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_elements(
        &self,
        locator: &By,
        parent: Option<&ElementId>,
    ) -> Result<Vec<ElementId>, DriverError> {
        let value = match parent {
            Some(parent) => {
                self.post_element(parent, "/elements", locator.to_request())
                    .await?
            }
            None => self.post("/elements", locator.to_request()).await?,
        };
        let found = value
            .as_array()
            .ok_or_else(|| DriverError::MalformedResponse(format!("expected an array, got {value}")))?
            .iter()
            .map(element_id)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = found.len(), "elements found");
        Ok(found)
    }

    async fn click(&self, element: &ElementId) -> Result<(), DriverError> {
        self.post_element(element, "/click", json!({})).await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementId) -> Result<(), DriverError> {
        self.post_element(element, "/clear", json!({})).await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError> {
        let chars: Vec<String> = text.chars().map(String::from).collect();
        self.post_element(element, "/value", json!({ "text": text, "value": chars }))
            .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementId) -> Result<String, DriverError> {
        as_string(self.get_element(element, "/text").await?)
    }

    async fn attribute(
        &self,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self
            .get_element(element, &format!("/attribute/{name}"))
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn is_displayed(&self, element: &ElementId) -> Result<bool, DriverError> {
        as_bool(self.get_element(element, "/displayed").await?)
    }

    async fn is_enabled(&self, element: &ElementId) -> Result<bool, DriverError> {
        as_bool(self.get_element(element, "/enabled").await?)
    }

    async fn is_selected(&self, element: &ElementId) -> Result<bool, DriverError> {
        as_bool(self.get_element(element, "/selected").await?)
    }

    async fn rect(&self, element: &ElementId) -> Result<Rect, DriverError> {
        let value = self.get_element(element, "/rect").await?;
        serde_json::from_value(value).map_err(|e| DriverError::MalformedResponse(e.to_string()))
    }

    async fn window_rect(&self) -> Result<Rect, DriverError> {
        let value = self.get("/window/rect").await?;
        serde_json::from_value(value).map_err(|e| DriverError::MalformedResponse(e.to_string()))
    }

    #[instrument(skip(self, actions), fields(pointers = actions.len()), level = "debug")]
    async fn perform_actions(&self, actions: &[ActionSequence]) -> Result<(), DriverError> {
        self.post("/actions", ActionSequence::to_request(actions))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let encoded = as_string(self.get("/screenshot").await?)?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| DriverError::MalformedResponse(e.to_string()))?;
        debug!(bytes = data.len(), "screenshot captured");
        Ok(data)
    }

    async fn alert_text(&self) -> Result<String, DriverError> {
        as_string(self.get("/alert/text").await?)
    }

    async fn accept_alert(&self) -> Result<(), DriverError> {
        self.post("/alert/accept", json!({})).await?;
        Ok(())
    }

    async fn dismiss_alert(&self) -> Result<(), DriverError> {
        self.post("/alert/dismiss", json!({})).await?;
        Ok(())
    }

    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), DriverError> {
        self.post("/timeouts", json!({ "implicit": wait.as_millis() as u64 }))
            .await?;
        Ok(())
    }

    async fn back(&self) -> Result<(), DriverError> {
        self.post("/back", json!({})).await?;
        Ok(())
    }

    #[instrument(skip(self, args), level = "debug")]
    async fn execute_mobile(&self, command: &str, args: Value) -> Result<Value, DriverError> {
        self.post(
            "/execute/sync",
            json!({ "script": command, "args": [args] }),
        )
        .await
    }

    async fn close_app(&self) -> Result<(), DriverError> {
        self.post("/appium/app/close", json!({})).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(session = %self.session_id), level = "debug")]
    async fn quit(&self) -> Result<(), DriverError> {
        self.client.delete(&self.path("")).await?;
        Ok(())
    }
}
