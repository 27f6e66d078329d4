//! Android-specific actions and system activities.

use std::ops::Deref;

use tracing::info;

use crate::actions::DeviceActions;
use crate::activity::{Activity, DeviceActivity};
use crate::device::Device;
use crate::element::DeviceElement;
use crate::error::AppiumError;
use crate::locator::By;

/// Actions only available on Android devices.
pub struct AndroidDeviceActions<'d> {
    actions: DeviceActions<'d>,
}

impl<'d> AndroidDeviceActions<'d> {
    pub fn new(actions: DeviceActions<'d>) -> Self {
        Self { actions }
    }

    pub async fn hide_keyboard(&self) -> Result<(), AppiumError> {
        info!("hiding keyboard");
        self.driver()
            .hide_keyboard(None, None)
            .await
            .map_err(|e| AppiumError::device_action("hide keyboard", e))
    }

    /// Press the hardware back button.
    pub async fn back(&self) -> Result<(), AppiumError> {
        info!("navigating back");
        self.driver()
            .back()
            .await
            .map_err(|e| AppiumError::device_action("back", e))
    }

    pub async fn open_notifications(&self) -> Result<(), AppiumError> {
        info!("opening notifications");
        self.driver()
            .open_notifications()
            .await
            .map_err(|e| AppiumError::device_action("open notifications", e))
    }
}

impl<'d> Deref for AndroidDeviceActions<'d> {
    type Target = DeviceActions<'d>;

    fn deref(&self) -> &Self::Target {
        &self.actions
    }
}

/// The runtime permission dialog shown by the package installer.
///
/// Elements: `Permission Window`, and inside it `Message`, `Allow`, `Deny`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionActivity;

impl PermissionActivity {
    /// Tap `Allow` on the permission dialog.
    pub async fn allow(device: &Device) -> Result<(), AppiumError> {
        DeviceActivity::new(device, &PermissionActivity)?
            .on_element("Allow")
            .await?
            .click()
            .await
    }

    /// Tap `Deny` on the permission dialog.
    pub async fn deny(device: &Device) -> Result<(), AppiumError> {
        DeviceActivity::new(device, &PermissionActivity)?
            .on_element("Deny")
            .await?
            .click()
            .await
    }
}

impl Activity for PermissionActivity {
    fn prepare(&self) -> DeviceElement {
        DeviceElement::new(
            "Permission Window",
            By::id("com.android.packageinstaller:id/dialog_container"),
        )
        .children([
            DeviceElement::new(
                "Message",
                By::id("com.android.packageinstaller:id/permission_message"),
            ),
            DeviceElement::new(
                "Allow",
                By::id("com.android.packageinstaller:id/permission_allow_button"),
            ),
            DeviceElement::new(
                "Deny",
                By::id("com.android.packageinstaller:id/permission_deny_button"),
            ),
        ])
    }
}
