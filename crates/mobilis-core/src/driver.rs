//! Mobile driver trait for backend-agnostic session access.
//!
//! This module defines the [`MobileDriver`] trait, the seam between the
//! element DSL (activities, element actions, verification) and a live
//! automation session. The production implementation is
//! [`WebDriverSession`](crate::session::WebDriverSession), which speaks the
//! W3C WebDriver protocol to an Appium server; tests substitute in-memory
//! implementations.
//!
//! Errors from any backend are normalized into [`DriverError`], whose variants
//! mirror the W3C error codes the DSL needs to tell apart (a lost session, a
//! missing element, an unsupported selector, ...).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::gesture::ActionSequence;
use crate::locator::By;

/// Errors that can occur during driver operations.
#[derive(Error, Debug)]
pub enum DriverError {
    /// No element matched the locator.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// The locator strategy or expression is not supported by the driver.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// The session no longer exists on the server.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// The server could not be reached.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A server-side operation timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// No alert is currently open.
    #[error("no such alert: {0}")]
    NoSuchAlert(String),

    /// The element reference no longer points at a live element.
    #[error("stale element reference: {0}")]
    StaleElement(String),

    /// The element exists but cannot be interacted with.
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// The command is not implemented by the server or automation backend.
    #[error("unsupported command: {0}")]
    Unsupported(String),

    /// Any other W3C error.
    #[error("{error}: {message}")]
    CommandFailed {
        /// The W3C error code.
        error: String,
        /// The server-provided message.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl DriverError {
    /// Classifies a W3C error code returned by the server.
    pub fn from_w3c(error: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match error {
            "no such element" => DriverError::NoSuchElement(message),
            "invalid selector" => DriverError::InvalidSelector(message),
            "invalid session id" | "no such session" => DriverError::InvalidSession(message),
            "timeout" | "script timeout" => DriverError::Timeout(message),
            "no such alert" => DriverError::NoSuchAlert(message),
            "stale element reference" => DriverError::StaleElement(message),
            "element not interactable" | "element click intercepted" => {
                DriverError::NotInteractable(message)
            }
            "unknown command" | "unknown method" | "unsupported operation" => {
                DriverError::Unsupported(message)
            }
            other => DriverError::CommandFailed {
                error: other.to_string(),
                message,
            },
        }
    }

    /// Returns `true` if the session or the server behind it is gone.
    pub fn is_session_lost(&self) -> bool {
        matches!(
            self,
            DriverError::InvalidSession(_) | DriverError::ConnectionLost(_)
        )
    }

    /// Returns `true` if the error means "not there yet" while polling.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::NoSuchElement(_) | DriverError::StaleElement(_)
        )
    }
}

/// Opaque reference to an element inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Position and size of an element or window, in device points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The centre of the rectangle, rounded to whole points.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x + self.width / 2.0).round() as i64,
            (self.y + self.height / 2.0).round() as i64,
        )
    }
}

/// Trait for a live automation session on a mobile device.
///
/// Element lookups return every match; callers pick by index. Methods are
/// async so the HTTP-backed implementation never blocks the runtime.
///
/// Appium `mobile:` extension commands are reached through
/// [`execute_mobile`](MobileDriver::execute_mobile); the provided
/// [`hide_keyboard`](MobileDriver::hide_keyboard),
/// [`shake`](MobileDriver::shake) and
/// [`open_notifications`](MobileDriver::open_notifications) build on it.
#[async_trait]
pub trait MobileDriver: Send + Sync {
    /// The server-assigned session id.
    fn session_id(&self) -> &str;

    /// Find all elements matching `locator`, searching inside `parent` when given.
    async fn find_elements(
        &self,
        locator: &By,
        parent: Option<&ElementId>,
    ) -> Result<Vec<ElementId>, DriverError>;

    async fn click(&self, element: &ElementId) -> Result<(), DriverError>;

    async fn clear(&self, element: &ElementId) -> Result<(), DriverError>;

    /// Type `text` into the element.
    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError>;

    async fn text(&self, element: &ElementId) -> Result<String, DriverError>;

    /// Read an attribute; `None` when the element does not carry it.
    async fn attribute(
        &self,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn is_displayed(&self, element: &ElementId) -> Result<bool, DriverError>;

    async fn is_enabled(&self, element: &ElementId) -> Result<bool, DriverError>;

    async fn is_selected(&self, element: &ElementId) -> Result<bool, DriverError>;

    async fn rect(&self, element: &ElementId) -> Result<Rect, DriverError>;

    /// Size and position of the current window (the device screen).
    async fn window_rect(&self) -> Result<Rect, DriverError>;

    /// Dispatch W3C input action sequences, one per pointer.
    async fn perform_actions(&self, actions: &[ActionSequence]) -> Result<(), DriverError>;

    /// Capture the screen as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    async fn alert_text(&self) -> Result<String, DriverError>;

    async fn accept_alert(&self) -> Result<(), DriverError>;

    async fn dismiss_alert(&self) -> Result<(), DriverError>;

    /// Set the session-wide implicit element wait.
    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), DriverError>;

    /// Navigate back (Android hardware back button).
    async fn back(&self) -> Result<(), DriverError>;

    /// Run an Appium `mobile:` extension command.
    async fn execute_mobile(&self, command: &str, args: Value) -> Result<Value, DriverError>;

    /// Close the application under test without ending the session.
    async fn close_app(&self) -> Result<(), DriverError>;

    /// End the session.
    async fn quit(&self) -> Result<(), DriverError>;

    /// Hide the soft keyboard.
    ///
    /// `strategy` and `key` only matter on iOS, where the keyboard is
    /// dismissed by pressing a named key (e.g. strategy `"pressKey"`, key
    /// `"Done"`).
    async fn hide_keyboard(
        &self,
        strategy: Option<&str>,
        key: Option<&str>,
    ) -> Result<(), DriverError> {
        let mut args = serde_json::Map::new();
        if let Some(strategy) = strategy {
            args.insert("strategy".into(), Value::from(strategy));
        }
        if let Some(key) = key {
            args.insert("key".into(), Value::from(key));
            args.insert("keys".into(), Value::from(vec![key]));
        }
        self.execute_mobile("mobile: hideKeyboard", Value::Object(args))
            .await
            .map(|_| ())
    }

    /// Simulate a device shake (iOS simulators).
    async fn shake(&self) -> Result<(), DriverError> {
        self.execute_mobile("mobile: shake", serde_json::json!({}))
            .await
            .map(|_| ())
    }

    /// Pull down the notification shade (Android).
    async fn open_notifications(&self) -> Result<(), DriverError> {
        self.execute_mobile("mobile: openNotifications", serde_json::json!({}))
            .await
            .map(|_| ())
    }
}
