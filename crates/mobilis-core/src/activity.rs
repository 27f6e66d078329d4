//! Activities: named element trees resolved against a live device.
//!
//! An [`Activity`] declares the elements of one screen. A [`DeviceActivity`]
//! binds it to a started [`Device`] and resolves elements by name: every
//! ancestor of the requested element is found first (each one inside its own
//! parent), then the element itself inside the innermost ancestor. Each step
//! polls until the element's [`WaitStrategy`] holds or the playback element
//! wait runs out.
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::activity::{Activity, DeviceActivity};
//! use mobilis_core::device::Device;
//! use mobilis_core::element::DeviceElement;
//! use mobilis_core::locator::By;
//!
//! struct LoginActivity;
//!
//! impl Activity for LoginActivity {
//!     fn prepare(&self) -> DeviceElement {
//!         DeviceElement::new("Main", By::id("android:id/content"))
//!             .child(DeviceElement::new("Login", By::accessibility_id("login")))
//!     }
//! }
//!
//! # async fn example(device: &Device) -> Result<(), Box<dyn std::error::Error>> {
//! let login = DeviceActivity::new(device, &LoginActivity)?;
//! login.on_element("Login").await?.click().await?;
//! # Ok(())
//! # }
//! ```

use tracing::{debug, trace, warn};

use crate::actions::DeviceActions;
use crate::device::Device;
use crate::driver::{DriverError, ElementId, MobileDriver};
use crate::element::{DeviceElement, ElementEntry, ElementRegistry};
use crate::element_actions::DeviceElementActions;
use crate::error::AppiumError;
use crate::locator::{By, WaitStrategy};
use crate::wait::{Wait, WaitError};

/// A screen of the application under test.
pub trait Activity: Send + Sync {
    /// The root of the screen's element tree.
    fn prepare(&self) -> DeviceElement;
}

/// An activity bound to a device.
pub struct DeviceActivity<'d> {
    device: &'d Device,
    registry: ElementRegistry,
}

impl<'d> DeviceActivity<'d> {
    /// Load the elements of `activity`; names must be unique.
    pub fn new(device: &'d Device, activity: &dyn Activity) -> Result<Self, AppiumError> {
        Self::from_element(device, activity.prepare())
    }

    pub fn from_element(device: &'d Device, root: DeviceElement) -> Result<Self, AppiumError> {
        trace!(platform = %device.platform(), root = %root.name, "loading activity elements");
        Ok(Self {
            device,
            registry: ElementRegistry::load(root)?,
        })
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Resolve the element called `name`.
    pub async fn get_element(&self, name: &str) -> Result<ElementId, AppiumError> {
        trace!(element = name, "getting element");
        self.resolve(name, None).await
    }

    /// Resolve `name` and return the actions available on it.
    pub async fn on_element(&self, name: &str) -> Result<DeviceElementActions<'d>, AppiumError> {
        self.device.server().ensure_running().await?;
        trace!(element = name, "preparing element actions");
        let id = self.resolve(name, None).await?;
        DeviceElementActions::new(self.device, name, id)
    }

    /// Like [`on_element`](Self::on_element), picking the `index`-th match of
    /// the element itself. Ancestors keep their declared index.
    pub async fn on_element_at(
        &self,
        name: &str,
        index: usize,
    ) -> Result<DeviceElementActions<'d>, AppiumError> {
        self.device.server().ensure_running().await?;
        trace!(element = name, index, "preparing dynamic element actions");
        let id = self.resolve(name, Some(index)).await?;
        DeviceElementActions::new(self.device, name, id)
    }

    pub async fn on_device(&self) -> Result<DeviceActions<'d>, AppiumError> {
        self.device.actions().await
    }

    async fn resolve(&self, name: &str, index: Option<usize>) -> Result<ElementId, AppiumError> {
        let driver = self.device.driver()?;
        let lineage = self.registry.lineage(name)?;
        let last = lineage.len() - 1;

        let mut parent: Option<(ElementId, &str)> = None;
        for (depth, entry) in lineage.into_iter().enumerate() {
            let index = match index {
                Some(index) if depth == last => index,
                _ => entry.index,
            };
            let id = self
                .find(driver.as_ref(), entry, index, parent.as_ref())
                .await?;
            parent = Some((id, entry.name.as_str()));
        }
        // The lineage always contains at least the element itself.
        parent
            .map(|(id, _)| id)
            .ok_or_else(|| AppiumError::ElementNameNotFound(name.to_string()))
    }

    async fn find(
        &self,
        driver: &dyn MobileDriver,
        entry: &ElementEntry,
        index: usize,
        parent: Option<&(ElementId, &str)>,
    ) -> Result<ElementId, AppiumError> {
        let scope = match parent {
            Some((_, name)) => format!("child of [{name}]"),
            None => "root".to_string(),
        };
        debug!(element = %entry.name, locator = %entry.by, index, wait = %entry.wait, %scope, "finding element");

        let wait = Wait::from_playback(&self.device.setting().playback);
        let by = &entry.by;
        let strategy = entry.wait;
        let parent_id = parent.map(|(id, _)| id);
        let result = wait
            .until(move || matching(driver, by, strategy, parent_id))
            .await;

        let not_found = |source: Option<DriverError>| AppiumError::ElementNotFound {
            locator: by.to_string(),
            index,
            scope: scope.clone(),
            source,
        };
        match result {
            Ok(found) => match found.into_iter().nth(index) {
                Some(id) => Ok(id),
                None => {
                    self.screenshot_on_error().await;
                    Err(not_found(None))
                }
            },
            Err(WaitError::TimedOut(after)) => {
                debug!(locator = %by, ?after, "element wait timed out");
                self.screenshot_on_error().await;
                Err(AppiumError::ElementFindTimedOut {
                    locator: by.to_string(),
                })
            }
            Err(WaitError::Driver(e)) if e.is_session_lost() => {
                Err(AppiumError::ServerStopped(Some(e)))
            }
            Err(WaitError::Driver(e @ DriverError::InvalidSelector(_))) => {
                Err(AppiumError::SelectorNotImplemented {
                    locator: by.to_string(),
                    source: e,
                })
            }
            Err(WaitError::Driver(e)) => {
                self.screenshot_on_error().await;
                Err(not_found(Some(e)))
            }
        }
    }

    async fn screenshot_on_error(&self) {
        if !self.device.setting().playback.screenshot_on_error {
            return;
        }
        let saved = match DeviceActions::new(self.device) {
            Ok(actions) => actions.capture_screenshot().await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            warn!(error = %e, "failed to capture screenshot on error");
        }
    }
}

/// Evaluates `strategy` once against the elements matching `by`.
///
/// Yields the matches once the strategy holds:
/// present when any match exists, visible when every match is displayed,
/// enabled when the first match is displayed and enabled.
async fn matching(
    driver: &dyn MobileDriver,
    by: &By,
    strategy: WaitStrategy,
    parent: Option<&ElementId>,
) -> Result<Option<Vec<ElementId>>, DriverError> {
    let found = driver.find_elements(by, parent).await?;
    let Some(first) = found.first() else {
        return Ok(None);
    };
    let holds = match strategy {
        WaitStrategy::Present => true,
        WaitStrategy::Visible => {
            let mut all = true;
            for id in &found {
                if !driver.is_displayed(id).await? {
                    all = false;
                    break;
                }
            }
            all
        }
        WaitStrategy::Enabled => {
            driver.is_displayed(first).await? && driver.is_enabled(first).await?
        }
    };
    Ok(holds.then_some(found))
}
