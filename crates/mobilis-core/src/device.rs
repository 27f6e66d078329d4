//! A configured device and its driver session.
//!
//! A [`Device`] is created from a named entry of [`AppiumSetting`]. Its
//! capabilities are built (and validated) up front; the driver session only
//! exists between [`Device::start`] and [`Device::stop`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobilis_core::config::AppiumSetting;
//! use mobilis_core::device::Device;
//! use mobilis_core::server::AppiumServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = AppiumSetting::load()?;
//! let server = Arc::new(AppiumServer::new(settings.server.clone()));
//! server.start().await?;
//!
//! let mut device = Device::new(server.clone(), &settings, "pixel")?;
//! device.start().await?;
//! device.actions().await?.capture_screenshot().await?;
//! device.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::actions::DeviceActions;
use crate::android::AndroidDeviceActions;
use crate::capabilities::{build_capabilities, Capabilities};
use crate::config::{ApplicationType, AppiumSetting, DeviceSetting, PlatformType};
use crate::driver::{DriverError, MobileDriver};
use crate::error::AppiumError;
use crate::ios::IosDeviceActions;
use crate::server::AppiumServer;
use crate::session::WebDriverSession;

/// Opens driver sessions for a device.
#[async_trait]
pub trait DriverConnector: Send + Sync {
    /// Create a session on the server at `url`.
    async fn connect(
        &self,
        url: &str,
        caps: &Capabilities,
    ) -> Result<Arc<dyn MobileDriver>, DriverError>;
}

/// Connects over HTTP with [`WebDriverSession`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteConnector;

#[async_trait]
impl DriverConnector for RemoteConnector {
    async fn connect(
        &self,
        url: &str,
        caps: &Capabilities,
    ) -> Result<Arc<dyn MobileDriver>, DriverError> {
        Ok(Arc::new(WebDriverSession::create(url, caps).await?))
    }
}

/// A device under test.
pub struct Device {
    name: String,
    server: Arc<AppiumServer>,
    setting: DeviceSetting,
    capabilities: Capabilities,
    connector: Arc<dyn DriverConnector>,
    driver: Option<Arc<dyn MobileDriver>>,
}

impl Device {
    /// Look up device `name` in `settings` and build its capabilities.
    pub fn new(
        server: Arc<AppiumServer>,
        settings: &AppiumSetting,
        name: &str,
    ) -> Result<Self, AppiumError> {
        let setting = settings.device(name)?.clone();
        Self::from_setting(server, name, setting, &settings.resources_dir)
    }

    pub fn from_setting(
        server: Arc<AppiumServer>,
        name: &str,
        setting: DeviceSetting,
        resources_dir: &Path,
    ) -> Result<Self, AppiumError> {
        let capabilities = build_capabilities(&setting, resources_dir)?;
        Ok(Self {
            name: name.to_string(),
            server,
            setting,
            capabilities,
            connector: Arc::new(RemoteConnector),
            driver: None,
        })
    }

    /// Replace how sessions are opened.
    pub fn with_connector(mut self, connector: Arc<dyn DriverConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn setting(&self) -> &DeviceSetting {
        &self.setting
    }

    pub fn platform(&self) -> PlatformType {
        self.setting.platform_type
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn server(&self) -> &AppiumServer {
        &self.server
    }

    pub fn is_started(&self) -> bool {
        self.driver.is_some()
    }

    /// The live session; fails before [`start`](Self::start).
    pub fn driver(&self) -> Result<Arc<dyn MobileDriver>, AppiumError> {
        self.driver.clone().ok_or(AppiumError::DriverNotStarted)
    }

    /// Open a session and apply the configured implicit wait.
    #[instrument(skip(self), fields(device = %self.name))]
    pub async fn start(&mut self) -> Result<(), AppiumError> {
        if self.driver.is_some() {
            warn!("device driver already started");
            return Ok(());
        }
        info!(platform = %self.setting.platform_type, "starting device driver");
        let driver = self
            .connector
            .connect(&self.server.service_url(), &self.capabilities)
            .await
            .map_err(AppiumError::DriverNotStarting)?;

        if let Err(e) = driver
            .set_implicit_wait(self.setting.playback.default_wait())
            .await
        {
            if e.is_session_lost() {
                return Err(AppiumError::ServerStopped(Some(e)));
            }
            if let Err(quit) = driver.quit().await {
                warn!(error = %quit, "could not quit session after failed start");
            }
            return Err(AppiumError::DriverDefaultWait(e));
        }

        info!(session = driver.session_id(), "device driver started");
        self.driver = Some(driver);
        Ok(())
    }

    /// Close the app and end the session. A stopped device stays stopped.
    #[instrument(skip(self), fields(device = %self.name))]
    pub async fn stop(&mut self) -> Result<(), AppiumError> {
        let Some(driver) = self.driver.clone() else {
            info!("device driver already stopped");
            return Ok(());
        };
        let stopping = |e: DriverError| {
            if e.is_session_lost() {
                AppiumError::ServerStopped(Some(e))
            } else {
                AppiumError::DriverNotStopping(e)
            }
        };
        let closed = if self.setting.app_type != ApplicationType::Web {
            driver.close_app().await
        } else {
            Ok(())
        };
        if let Err(e) = &closed {
            warn!(error = %e, "could not close app, quitting session anyway");
        }
        // Keep the session until quit succeeds.
        let quit = driver.quit().await;
        if quit.is_ok() {
            self.driver = None;
        }
        closed.and(quit).map_err(stopping)?;
        info!("device driver stopped");
        Ok(())
    }

    /// Device-level actions; the server must be reachable.
    pub async fn actions(&self) -> Result<DeviceActions<'_>, AppiumError> {
        self.server.ensure_running().await?;
        DeviceActions::new(self)
    }

    /// Android-only actions.
    pub async fn android(&self) -> Result<AndroidDeviceActions<'_>, AppiumError> {
        self.expect_platform(PlatformType::Android)?;
        Ok(AndroidDeviceActions::new(self.actions().await?))
    }

    /// iOS-only actions.
    pub async fn ios(&self) -> Result<IosDeviceActions<'_>, AppiumError> {
        self.expect_platform(PlatformType::Ios)?;
        Ok(IosDeviceActions::new(self.actions().await?))
    }

    fn expect_platform(&self, expected: PlatformType) -> Result<(), AppiumError> {
        let actual = self.platform();
        if actual == expected {
            Ok(())
        } else {
            Err(AppiumError::PlatformMismatch { expected, actual })
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("platform", &self.setting.platform_type)
            .field("started", &self.driver.is_some())
            .finish()
    }
}
