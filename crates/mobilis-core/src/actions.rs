//! Actions on the device as a whole: screenshots, alerts, window swipes.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::driver::{DriverError, MobileDriver};
use crate::error::AppiumError;
use crate::gesture::{self, SwipeDirection, SwipeStartPosition};
use crate::wait::{Wait, WaitError};

/// Device-level actions of a started [`Device`].
pub struct DeviceActions<'d> {
    device: &'d Device,
    driver: Arc<dyn MobileDriver>,
}

impl<'d> DeviceActions<'d> {
    /// Fails with [`AppiumError::DriverNotStarted`] before the device is started.
    pub fn new(device: &'d Device) -> Result<Self, AppiumError> {
        Ok(Self {
            device,
            driver: device.driver()?,
        })
    }

    pub fn device(&self) -> &'d Device {
        self.device
    }

    pub fn driver(&self) -> &dyn MobileDriver {
        self.driver.as_ref()
    }

    /// Save a PNG of the screen to the playback screenshot directory.
    ///
    /// Files are named `SCR-<platform>-<timestamp>.png`.
    pub async fn capture_screenshot(&self) -> Result<PathBuf, AppiumError> {
        let png = self.driver.screenshot().await.map_err(|e| {
            if e.is_session_lost() {
                AppiumError::ServerStopped(Some(e))
            } else {
                AppiumError::Screenshot(e.to_string())
            }
        })?;

        let dir = &self.device.setting().playback.screenshot_path;
        tokio::fs::create_dir_all(dir).await?;
        let file = dir.join(format!(
            "SCR-{}-{}.png",
            self.device.platform(),
            Local::now().format("%Y%m%d-%H%M%S%.3f")
        ));
        tokio::fs::write(&file, &png).await?;
        info!(path = %file.display(), bytes = png.len(), "screenshot saved");
        Ok(file)
    }

    async fn wait_for_alert(&self) -> Result<Option<String>, AppiumError> {
        let driver = self.driver.as_ref();
        let wait = Wait::from_playback(&self.device.setting().playback);
        let result = wait
            .until(move || async move {
                match driver.alert_text().await {
                    Ok(text) => Ok(Some(text)),
                    Err(DriverError::NoSuchAlert(_)) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await;
        match result {
            Ok(text) => Ok(Some(text)),
            Err(WaitError::TimedOut(after)) => {
                warn!(?after, "no alert appeared");
                Ok(None)
            }
            Err(WaitError::Driver(e)) => Err(AppiumError::device_action("wait for alert", e)),
        }
    }

    /// Wait for an alert, accept it and return its message.
    ///
    /// Returns `None` when no alert shows up within the element wait.
    pub async fn handle_alert(&self) -> Result<Option<String>, AppiumError> {
        let Some(text) = self.wait_for_alert().await? else {
            return Ok(None);
        };
        info!(message = %text, "accepting alert");
        self.driver
            .accept_alert()
            .await
            .map_err(|e| AppiumError::device_action("accept alert", e))?;
        Ok(Some(text))
    }

    /// Wait for an alert, dismiss it and return its message.
    pub async fn dismiss_alert(&self) -> Result<Option<String>, AppiumError> {
        let Some(text) = self.wait_for_alert().await? else {
            return Ok(None);
        };
        info!(message = %text, "dismissing alert");
        self.driver
            .dismiss_alert()
            .await
            .map_err(|e| AppiumError::device_action("dismiss alert", e))?;
        Ok(Some(text))
    }

    /// Swipe across the whole screen.
    pub async fn swipe(
        &self,
        direction: SwipeDirection,
        start: SwipeStartPosition,
        distance: u8,
    ) -> Result<(), AppiumError> {
        let window = self
            .driver
            .window_rect()
            .await
            .map_err(|e| AppiumError::device_action("swipe", e))?;
        let (from, to) = gesture::swipe_points(&window, direction, start, distance)?;
        debug!(?direction, ?start, distance, ?from, ?to, "swiping screen");
        let duration = self.device.setting().playback.swipe_duration();
        self.driver
            .perform_actions(&gesture::swipe(from, to, duration))
            .await
            .map_err(|e| AppiumError::device_action("swipe", e))
    }
}
