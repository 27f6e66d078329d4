//! The user-facing error hierarchy.
//!
//! Every public operation of the DSL (devices, activities, element actions,
//! verification, server lifecycle) returns [`AppiumError`]. Lower layers keep
//! their own error types ([`DriverError`], [`ConfigError`]) and are translated
//! here with the context of the failing operation attached.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{ConfigError, PlatformType};
use crate::driver::DriverError;

/// Message used whenever a call fails because the session or server is gone.
pub const SERVER_STOPPED: &str = "Server session has been stopped.";

/// Errors raised by the automation DSL.
#[derive(Error, Debug)]
pub enum AppiumError {
    /// A local Appium server could not be spawned or never became ready.
    #[error("Appium server not starting: {0}")]
    ServerNotStarting(String),

    /// The spawned Appium server could not be terminated.
    #[error("Appium server not stopping: {0}")]
    ServerNotStopping(String),

    /// A server already answers on the configured address.
    #[error("Appium server already running at {0}")]
    ServerAlreadyRunning(String),

    /// The server or the driver session has gone away.
    #[error("{}", SERVER_STOPPED)]
    ServerStopped(#[source] Option<DriverError>),

    /// The configured application binary does not exist.
    #[error("App not found on mentioned location [{}]", .0.display())]
    DeviceAppNotFound(PathBuf),

    /// A mandatory capability has no value in the device settings.
    #[error("Desired capability not set: {0}")]
    CapabilityNotSet(String),

    /// The device driver is used before [`Device::start`](crate::device::Device::start).
    #[error("Device driver has not been started")]
    DriverNotStarted,

    /// Creating the driver session failed.
    #[error("Error occurred starting device driver")]
    DriverNotStarting(#[source] DriverError),

    /// Closing the app or quitting the session failed.
    #[error("Error occurred while stopping device driver")]
    DriverNotStopping(#[source] DriverError),

    /// Applying the implicit wait to a fresh session failed.
    #[error("Error occurred while setting device driver default wait")]
    DriverDefaultWait(#[source] DriverError),

    /// A platform-specific action set was requested for another platform.
    #[error("Expected a {expected} device but this device runs {actual}")]
    PlatformMismatch {
        expected: PlatformType,
        actual: PlatformType,
    },

    /// Two elements of one activity share a name.
    #[error("DeviceElement with name [{0}] declared more than once")]
    DuplicateElementName(String),

    /// No element with this name is declared on the activity.
    #[error("DeviceElement with name [{0}] not found")]
    ElementNameNotFound(String),

    /// The element lookup failed for a reason other than a timeout.
    #[error("Error occurred while finding {scope} device element with locator [{locator}] at index [{index}]")]
    ElementNotFound {
        locator: String,
        index: usize,
        /// `"root"` or `"child of [parent]"`.
        scope: String,
        #[source]
        source: Option<DriverError>,
    },

    /// The wait strategy was not satisfied in time.
    #[error("[{locator}] locator timed out")]
    ElementFindTimedOut { locator: String },

    /// The locator strategy is not supported by the automation backend.
    #[error("Selector not supported: {locator}")]
    SelectorNotImplemented {
        locator: String,
        #[source]
        source: DriverError,
    },

    /// An action on a resolved element failed.
    #[error("Error occurred while performing [{action}] on element [{element}]")]
    ElementActionFailed {
        element: String,
        action: &'static str,
        #[source]
        source: DriverError,
    },

    /// A device-level action failed.
    #[error("Error occurred while performing device action [{action}]")]
    DeviceActionFailed {
        action: &'static str,
        #[source]
        source: DriverError,
    },

    /// Gesture parameters are out of range.
    #[error("Invalid gesture: {0}")]
    InvalidGesture(String),

    /// A verification on an element did not hold.
    #[error("Verification failed on element [{element}]: expected {expected}, but was {actual}")]
    VerificationFailed {
        element: String,
        expected: String,
        actual: String,
    },

    /// Capturing or storing a screenshot failed.
    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    /// Loading or querying configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppiumError {
    /// Translates a driver failure during `action` on `element`.
    pub fn element_action(element: &str, action: &'static str, err: DriverError) -> Self {
        if err.is_session_lost() {
            AppiumError::ServerStopped(Some(err))
        } else {
            AppiumError::ElementActionFailed {
                element: element.to_string(),
                action,
                source: err,
            }
        }
    }

    /// Translates a driver failure during a device-level `action`.
    pub fn device_action(action: &'static str, err: DriverError) -> Self {
        if err.is_session_lost() {
            AppiumError::ServerStopped(Some(err))
        } else {
            AppiumError::DeviceActionFailed { action, source: err }
        }
    }
}
