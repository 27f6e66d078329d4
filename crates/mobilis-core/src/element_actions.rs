//! Actions on a resolved element.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::device::Device;
use crate::driver::{DriverError, ElementId, MobileDriver, Rect};
use crate::error::AppiumError;
use crate::gesture::{self, ActionSequence, SwipeDirection, SwipeStartPosition};
use crate::verify::DeviceElementVerify;

/// A resolved element of an activity.
///
/// Driver failures surface as [`AppiumError::ElementActionFailed`] naming the
/// element and the action, or [`AppiumError::ServerStopped`] when the session
/// is gone.
pub struct DeviceElementActions<'d> {
    device: &'d Device,
    driver: Arc<dyn MobileDriver>,
    name: String,
    element: ElementId,
}

impl<'d> DeviceElementActions<'d> {
    pub fn new(device: &'d Device, name: &str, element: ElementId) -> Result<Self, AppiumError> {
        Ok(Self {
            device,
            driver: device.driver()?,
            name: name.to_string(),
            element,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &ElementId {
        &self.element
    }

    fn failed(&self, action: &'static str) -> impl FnOnce(DriverError) -> AppiumError + '_ {
        move |e| AppiumError::element_action(&self.name, action, e)
    }

    async fn perform(
        &self,
        action: &'static str,
        sequences: Vec<ActionSequence>,
    ) -> Result<(), AppiumError> {
        self.driver
            .perform_actions(&sequences)
            .await
            .map_err(self.failed(action))
    }

    pub async fn click(&self) -> Result<(), AppiumError> {
        info!(element = %self.name, "clicking");
        self.driver
            .click(&self.element)
            .await
            .map_err(self.failed("click"))
    }

    /// Touch the centre of the element.
    pub async fn tap(&self) -> Result<(), AppiumError> {
        info!(element = %self.name, "tapping");
        let rect = self.rect_for("tap").await?;
        self.perform("tap", gesture::tap(rect.center())).await
    }

    pub async fn clear(&self) -> Result<(), AppiumError> {
        info!(element = %self.name, "clearing");
        self.driver
            .clear(&self.element)
            .await
            .map_err(self.failed("clear"))
    }

    pub async fn enter_text(&self, text: &str) -> Result<(), AppiumError> {
        info!(element = %self.name, text, "entering text");
        self.driver
            .send_keys(&self.element, text)
            .await
            .map_err(self.failed("enter text"))
    }

    pub async fn text(&self) -> Result<String, AppiumError> {
        let text = self
            .driver
            .text(&self.element)
            .await
            .map_err(self.failed("get text"))?;
        debug!(element = %self.name, %text, "read text");
        Ok(text)
    }

    pub async fn attribute(&self, attribute: &str) -> Result<Option<String>, AppiumError> {
        self.driver
            .attribute(&self.element, attribute)
            .await
            .map_err(self.failed("get attribute"))
    }

    pub async fn enabled(&self) -> Result<bool, AppiumError> {
        self.driver
            .is_enabled(&self.element)
            .await
            .map_err(self.failed("check enabled"))
    }

    pub async fn visible(&self) -> Result<bool, AppiumError> {
        self.driver
            .is_displayed(&self.element)
            .await
            .map_err(self.failed("check visible"))
    }

    pub async fn selected(&self) -> Result<bool, AppiumError> {
        self.driver
            .is_selected(&self.element)
            .await
            .map_err(self.failed("check selected"))
    }

    pub async fn rect(&self) -> Result<Rect, AppiumError> {
        self.rect_for("get rect").await
    }

    async fn rect_for(&self, action: &'static str) -> Result<Rect, AppiumError> {
        self.driver
            .rect(&self.element)
            .await
            .map_err(self.failed(action))
    }

    pub async fn long_press(&self) -> Result<(), AppiumError> {
        self.long_press_for(gesture::LONG_PRESS).await
    }

    pub async fn long_press_for(&self, hold: Duration) -> Result<(), AppiumError> {
        info!(element = %self.name, ?hold, "long pressing");
        let rect = self.rect_for("long press").await?;
        self.perform("long press", gesture::press_for(rect.center(), hold))
            .await
    }

    /// Swipe within the element, travelling `distance` percent of its extent.
    pub async fn swipe(
        &self,
        direction: SwipeDirection,
        start: SwipeStartPosition,
        distance: u8,
    ) -> Result<(), AppiumError> {
        let rect = self.rect_for("swipe").await?;
        let (from, to) = gesture::swipe_points(&rect, direction, start, distance)?;
        info!(element = %self.name, ?direction, ?start, distance, "swiping");
        debug!(?from, ?to, "swipe path");
        self.perform("swipe", gesture::swipe(from, to, self.swipe_duration()))
            .await
    }

    pub async fn zoom(&self, distance: u8) -> Result<(), AppiumError> {
        info!(element = %self.name, distance, "zooming");
        let rect = self.rect_for("zoom").await?;
        let sequences = gesture::zoom(&rect, distance, self.swipe_duration())?;
        self.perform("zoom", sequences).await
    }

    pub async fn pinch(&self, distance: u8) -> Result<(), AppiumError> {
        info!(element = %self.name, distance, "pinching");
        let rect = self.rect_for("pinch").await?;
        let sequences = gesture::pinch(&rect, distance, self.swipe_duration())?;
        self.perform("pinch", sequences).await
    }

    /// Drag this element onto `target`.
    pub async fn drag_drop(&self, target: &ElementId) -> Result<(), AppiumError> {
        info!(element = %self.name, %target, "dragging");
        let source = self.rect_for("drag drop").await?;
        let target = self
            .driver
            .rect(target)
            .await
            .map_err(self.failed("drag drop"))?;
        self.perform("drag drop", gesture::drag_drop(&source, &target))
            .await
    }

    pub fn verify_that(&self) -> DeviceElementVerify<'_, 'd> {
        DeviceElementVerify::new(self)
    }

    fn swipe_duration(&self) -> Duration {
        self.device.setting().playback.swipe_duration()
    }
}
