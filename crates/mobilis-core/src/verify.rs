//! Assertions on a resolved element.
//!
//! Every check returns the verifier again so checks can be chained:
//!
//! ```no_run
//! # use mobilis_core::element_actions::DeviceElementActions;
//! # async fn example(success: DeviceElementActions<'_>) -> Result<(), mobilis_core::error::AppiumError> {
//! success
//!     .verify_that()
//!     .should_be_displayed()
//!     .await?
//!     .text_should_be_equal_to("Circle dropped")
//!     .await?;
//! # Ok(())
//! # }
//! ```

use tracing::{error, info};

use crate::element_actions::DeviceElementActions;
use crate::error::AppiumError;

/// Checks against one element.
pub struct DeviceElementVerify<'a, 'd> {
    element: &'a DeviceElementActions<'d>,
}

impl<'a, 'd> DeviceElementVerify<'a, 'd> {
    pub fn new(element: &'a DeviceElementActions<'d>) -> Self {
        Self { element }
    }

    fn check(
        &self,
        holds: bool,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Result<&Self, AppiumError> {
        let expected = expected.into();
        if holds {
            info!(element = self.element.name(), %expected, "verified");
            return Ok(self);
        }
        let actual = actual.into();
        error!(element = self.element.name(), %expected, %actual, "verification failed");
        Err(AppiumError::VerificationFailed {
            element: self.element.name().to_string(),
            expected,
            actual,
        })
    }

    pub async fn should_be_displayed(&self) -> Result<&Self, AppiumError> {
        let visible = self.element.visible().await?;
        self.check(visible, "displayed", "not displayed")
    }

    pub async fn should_not_be_displayed(&self) -> Result<&Self, AppiumError> {
        let visible = self.element.visible().await?;
        self.check(!visible, "not displayed", "displayed")
    }

    pub async fn should_be_enabled(&self) -> Result<&Self, AppiumError> {
        let enabled = self.element.enabled().await?;
        self.check(enabled, "enabled", "disabled")
    }

    pub async fn should_be_disabled(&self) -> Result<&Self, AppiumError> {
        let enabled = self.element.enabled().await?;
        self.check(!enabled, "disabled", "enabled")
    }

    pub async fn text_should_be_equal_to(&self, expected: &str) -> Result<&Self, AppiumError> {
        let text = self.element.text().await?;
        self.check(
            text == expected,
            format!("text [{expected}]"),
            format!("[{text}]"),
        )
    }

    pub async fn text_should_contain(&self, part: &str) -> Result<&Self, AppiumError> {
        let text = self.element.text().await?;
        self.check(
            text.contains(part),
            format!("text containing [{part}]"),
            format!("[{text}]"),
        )
    }
}
