//! iOS-specific actions.

use std::ops::Deref;

use tracing::info;

use crate::actions::DeviceActions;
use crate::error::AppiumError;

/// Actions only available on iOS devices.
pub struct IosDeviceActions<'d> {
    actions: DeviceActions<'d>,
}

impl<'d> IosDeviceActions<'d> {
    pub fn new(actions: DeviceActions<'d>) -> Self {
        Self { actions }
    }

    /// Dismiss the keyboard, e.g. with strategy `"pressKey"` and key `"Done"`.
    pub async fn hide_keyboard(&self, strategy: &str, key: &str) -> Result<(), AppiumError> {
        info!(strategy, key, "hiding keyboard");
        self.driver()
            .hide_keyboard(Some(strategy), Some(key))
            .await
            .map_err(|e| AppiumError::device_action("hide keyboard", e))
    }

    pub async fn shake(&self) -> Result<(), AppiumError> {
        info!("shaking the device");
        self.driver()
            .shake()
            .await
            .map_err(|e| AppiumError::device_action("shake", e))
    }
}

impl<'d> Deref for IosDeviceActions<'d> {
    type Target = DeviceActions<'d>;

    fn deref(&self) -> &Self::Target {
        &self.actions
    }
}
