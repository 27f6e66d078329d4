//! Configuration for servers, devices, and playback policy.
//!
//! Settings are stored as JSON. The file is located, in order, from an
//! explicit path, the `MOBILIS_CONFIG` environment variable, `mobilis.json`
//! in the working directory, and finally `~/.mobilis/config.json`.
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::config::AppiumSetting;
//!
//! let settings = AppiumSetting::load().expect("config");
//! let device = settings.device("pixel").expect("device");
//! println!("{:?} on {}", device.device_name, device.platform_type);
//! ```
//!
//! A minimal file:
//!
//! ```json
//! {
//!   "server": { "port": 4723 },
//!   "devices": {
//!     "pixel": {
//!       "platform_type": "android",
//!       "device_name": "Pixel 7",
//!       "automation_name": "uiautomator2",
//!       "android": { "app_package": "com.example", "app_activity": ".Main" }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MOBILIS_CONFIG";

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mobilis.json";

/// Returns the `~/.mobilis` directory, creating it if necessary.
///
/// Falls back to a relative `.mobilis` directory when no home directory can
/// be determined.
pub fn mobilis_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mobilis");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns the `~/.mobilis/logs` directory, creating it if necessary.
pub fn logs_dir() -> PathBuf {
    let dir = mobilis_dir().join("logs");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Errors raised while loading or querying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`AppiumSetting`].
    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No configuration file was found in any of the searched locations.
    #[error("No configuration file found (set MOBILIS_CONFIG or create mobilis.json)")]
    NotFound,

    /// The named device is not present in the configuration.
    #[error("Device [{0}] not found in configuration")]
    DeviceNotFound(String),
}

/// Mobile platform of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    #[default]
    Android,
    Ios,
    Windows,
}

impl PlatformType {
    /// The `platformName` capability value.
    pub fn capability_name(&self) -> &'static str {
        match self {
            PlatformType::Android => "Android",
            PlatformType::Ios => "iOS",
            PlatformType::Windows => "Windows",
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.capability_name())
    }
}

/// Whether the target is an emulator/simulator or a physical device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Simulator,
    Real,
}

/// Kind of application under test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    #[default]
    Native,
    Hybrid,
    Web,
}

/// Appium automation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomationName {
    Appium,
    UiAutomator2,
    Espresso,
    XcuiTest,
    Windows,
}

impl AutomationName {
    /// The `automationName` capability value.
    pub fn capability_name(&self) -> &'static str {
        match self {
            AutomationName::Appium => "Appium",
            AutomationName::UiAutomator2 => "UiAutomator2",
            AutomationName::Espresso => "Espresso",
            AutomationName::XcuiTest => "XCUITest",
            AutomationName::Windows => "Windows",
        }
    }
}

/// Connection and launch settings for the Appium server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSetting {
    /// Address the server listens on.
    pub host: String,
    pub port: u16,
    /// Base path of the WebDriver endpoints (`/wd/hub` for Appium 1.x).
    pub base_path: String,
    /// When true the server is managed elsewhere and is never spawned.
    pub external: bool,
    /// The `appium` executable.
    pub appium_path: PathBuf,
    /// Server log file (`--log`).
    pub log_file: Option<PathBuf>,
    /// Server log level (`--log-level`).
    pub log_level: Option<String>,
    pub session_override: bool,
    pub relaxed_security: bool,
    /// Extra command-line arguments passed through verbatim.
    pub args: Vec<String>,
    /// Seconds to wait for a spawned server to report ready.
    pub startup_timeout: u64,
}

impl Default for ServerSetting {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4723,
            base_path: String::new(),
            external: false,
            appium_path: PathBuf::from("appium"),
            log_file: None,
            log_level: None,
            session_override: true,
            relaxed_security: false,
            args: Vec::new(),
            startup_timeout: 60,
        }
    }
}

impl ServerSetting {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout)
    }
}

/// Timing and diagnostics policy applied while driving a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSetting {
    /// Implicit wait applied to the session, in seconds.
    pub default_wait: u64,
    /// Maximum time to wait for an element's wait strategy, in seconds.
    pub wait_for_element_until: u64,
    /// Interval between wait-strategy polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Capture a screenshot when an element lookup fails.
    pub screenshot_on_error: bool,
    /// Directory receiving screenshots.
    pub screenshot_path: PathBuf,
    /// Duration of swipe, zoom, and pinch gestures, in milliseconds.
    pub swipe_duration_ms: u64,
}

impl Default for PlaybackSetting {
    fn default() -> Self {
        Self {
            default_wait: 0,
            wait_for_element_until: 10,
            poll_interval_ms: 500,
            screenshot_on_error: false,
            screenshot_path: PathBuf::from("screenshots"),
            swipe_duration_ms: 800,
        }
    }
}

impl PlaybackSetting {
    pub fn default_wait(&self) -> Duration {
        Duration::from_secs(self.default_wait)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.wait_for_element_until)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn swipe_duration(&self) -> Duration {
        Duration::from_millis(self.swipe_duration_ms)
    }
}

/// Android-only device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidDeviceSetting {
    /// Emulator AVD name (simulators only).
    pub avd: Option<String>,
    /// Seconds to wait for the AVD to finish booting.
    pub avd_ready_timeout: u64,
    /// Seconds to wait for the AVD to launch.
    pub avd_launch_timeout: u64,
    pub app_activity: Option<String>,
    pub app_package: Option<String>,
    pub app_wait_activity: Option<String>,
    pub app_wait_package: Option<String>,
    /// Milliseconds to wait for the app activity.
    pub app_wait_timeout: Option<u64>,
    /// Milliseconds to wait for the APK to install.
    pub apk_install_timeout: Option<u64>,
    pub auto_grant_permissions: bool,
    pub chrome_driver_path: Option<PathBuf>,
    pub system_port: Option<u16>,
    pub adb_port: Option<u16>,
    /// Seconds to wait for the device to be ready.
    pub device_ready_timeout: Option<u64>,
}

impl Default for AndroidDeviceSetting {
    fn default() -> Self {
        Self {
            avd: None,
            avd_ready_timeout: 120,
            avd_launch_timeout: 120,
            app_activity: None,
            app_package: None,
            app_wait_activity: None,
            app_wait_package: None,
            app_wait_timeout: None,
            apk_install_timeout: None,
            auto_grant_permissions: true,
            chrome_driver_path: None,
            system_port: None,
            adb_port: None,
            device_ready_timeout: None,
        }
    }
}

/// iOS-only device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IosDeviceSetting {
    pub bundle_id: Option<String>,
    /// Apple developer team id (`xcodeOrgId`), required on real devices.
    pub team_id: Option<String>,
    /// Code signing identity (`xcodeSigningId`), required on real devices.
    pub signing_id: Option<String>,
    pub app_name: Option<String>,
    /// Milliseconds to wait for WebDriverAgent to answer.
    pub wda_connection_timeout: u64,
    pub bootstrap_path: Option<PathBuf>,
    pub agent_path: Option<PathBuf>,
    pub updated_wda_bundle_id: Option<String>,
    pub use_new_wda: bool,
    pub use_prebuilt_wda: bool,
    pub show_xcode_log: bool,
    pub wda_startup_retries: Option<u32>,
    /// Milliseconds between WebDriverAgent startup retries.
    pub wda_startup_retry_interval: Option<u64>,
    pub auto_accept_alerts: bool,
    pub auto_dismiss_alerts: bool,
    pub wda_local_port: Option<u16>,
    /// Milliseconds to wait for the app to launch.
    pub launch_timeout: Option<u64>,
}

impl Default for IosDeviceSetting {
    fn default() -> Self {
        Self {
            bundle_id: None,
            team_id: None,
            signing_id: None,
            app_name: None,
            wda_connection_timeout: 240_000,
            bootstrap_path: None,
            agent_path: None,
            updated_wda_bundle_id: None,
            use_new_wda: false,
            use_prebuilt_wda: false,
            show_xcode_log: false,
            wda_startup_retries: None,
            wda_startup_retry_interval: None,
            auto_accept_alerts: false,
            auto_dismiss_alerts: false,
            wda_local_port: None,
            launch_timeout: None,
        }
    }
}

/// Settings for one device entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSetting {
    pub platform_type: PlatformType,
    pub device_type: DeviceType,
    pub app_type: ApplicationType,
    pub device_name: Option<String>,
    pub device_version: Option<String>,
    pub automation_name: Option<AutomationName>,
    pub udid: Option<String>,
    pub no_reset: bool,
    pub full_reset: bool,
    /// Seconds of client inactivity before the server ends the session.
    pub session_timeout: Option<u64>,
    pub clear_system_files: bool,
    pub event_timings: bool,
    /// Browser name for web apps.
    pub browser: Option<String>,
    /// Application binary, relative to the resources directory.
    pub app_location: Option<String>,
    /// Treat `app_location` as an absolute path or URL instead.
    pub external_app: bool,
    pub android: Option<AndroidDeviceSetting>,
    pub ios: Option<IosDeviceSetting>,
    pub playback: PlaybackSetting,
}

/// Root of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppiumSetting {
    pub server: ServerSetting,
    /// Directory against which relative `app_location`s are resolved.
    pub resources_dir: PathBuf,
    pub devices: BTreeMap<String, DeviceSetting>,
}

impl Default for AppiumSetting {
    fn default() -> Self {
        Self {
            server: ServerSetting::default(),
            resources_dir: PathBuf::from("tests/resources"),
            devices: BTreeMap::new(),
        }
    }
}

impl AppiumSetting {
    /// Load settings from the first configuration file found.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::locate().ok_or(ConfigError::NotFound)?;
        Self::load_from(path)
    }

    /// Load settings from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Finds the configuration file using the documented search order.
    pub fn locate() -> Option<PathBuf> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        locate_in(explicit, dirs::home_dir().as_deref())
    }

    /// Settings of the named device.
    pub fn device(&self, name: &str) -> Result<&DeviceSetting, ConfigError> {
        self.devices
            .get(name)
            .ok_or_else(|| ConfigError::DeviceNotFound(name.to_string()))
    }

    /// Names of all configured devices.
    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }
}

/// Search order behind [`AppiumSetting::locate`]. Only checks paths, so
/// `~/.mobilis` is never created by a lookup.
fn locate_in(explicit: Option<PathBuf>, home: Option<&Path>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    let home = home?.join(".mobilis").join("config.json");
    home.exists().then_some(home)
}
