//! Desired-capability building for Android and iOS sessions.
//!
//! [`build_capabilities`] maps a [`DeviceSetting`] onto the capability set
//! Appium expects when creating a session. Optional settings are only sent
//! when configured; mandatory ones fail fast with
//! [`AppiumError::CapabilityNotSet`] before any session is attempted.
//!
//! [`Capabilities::to_w3c`] produces the new-session payload. Keys outside the
//! W3C standard set are sent with the `appium:` vendor prefix.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, trace};

use crate::config::{
    AndroidDeviceSetting, ApplicationType, DeviceSetting, DeviceType, IosDeviceSetting,
    PlatformType,
};
use crate::error::AppiumError;

/// Capability names understood by Appium.
pub mod keys {
    pub const APP: &str = "app";
    pub const AUTOMATION_NAME: &str = "automationName";
    pub const BROWSER_NAME: &str = "browserName";
    pub const CLEAR_SYSTEM_FILES: &str = "clearSystemFiles";
    pub const DEVICE_NAME: &str = "deviceName";
    pub const EVENT_TIMINGS: &str = "eventTimings";
    pub const FULL_RESET: &str = "fullReset";
    pub const NEW_COMMAND_TIMEOUT: &str = "newCommandTimeout";
    pub const NO_RESET: &str = "noReset";
    pub const PLATFORM_NAME: &str = "platformName";
    pub const PLATFORM_VERSION: &str = "platformVersion";
    pub const UDID: &str = "udid";

    pub const ADB_PORT: &str = "adbPort";
    pub const ANDROID_INSTALL_TIMEOUT: &str = "androidInstallTimeout";
    pub const APP_ACTIVITY: &str = "appActivity";
    pub const APP_PACKAGE: &str = "appPackage";
    pub const APP_WAIT_ACTIVITY: &str = "appWaitActivity";
    pub const APP_WAIT_DURATION: &str = "appWaitDuration";
    pub const APP_WAIT_PACKAGE: &str = "appWaitPackage";
    pub const AUTO_GRANT_PERMISSIONS: &str = "autoGrantPermissions";
    pub const AVD: &str = "avd";
    pub const AVD_LAUNCH_TIMEOUT: &str = "avdLaunchTimeout";
    pub const AVD_READY_TIMEOUT: &str = "avdReadyTimeout";
    pub const CHROMEDRIVER_EXECUTABLE: &str = "chromedriverExecutable";
    pub const DEVICE_READY_TIMEOUT: &str = "deviceReadyTimeout";
    pub const SYSTEM_PORT: &str = "systemPort";

    pub const AGENT_PATH: &str = "agentPath";
    pub const APP_NAME: &str = "appName";
    pub const AUTO_ACCEPT_ALERTS: &str = "autoAcceptAlerts";
    pub const AUTO_DISMISS_ALERTS: &str = "autoDismissAlerts";
    pub const BOOTSTRAP_PATH: &str = "bootstrapPath";
    pub const BUNDLE_ID: &str = "bundleId";
    pub const LAUNCH_TIMEOUT: &str = "launchTimeout";
    pub const SHOW_XCODE_LOG: &str = "showXcodeLog";
    pub const UPDATE_WDA_BUNDLEID: &str = "updatedWDABundleId";
    pub const USE_NEW_WDA: &str = "useNewWDA";
    pub const USE_PREBUILT_WDA: &str = "usePrebuiltWDA";
    pub const WDA_CONNECTION_TIMEOUT: &str = "wdaConnectionTimeout";
    pub const WDA_LOCAL_PORT: &str = "wdaLocalPort";
    pub const WDA_STARTUP_RETRIES: &str = "wdaStartupRetries";
    pub const WDA_STARTUP_RETRY_INTERVAL: &str = "wdaStartupRetryInterval";
    pub const XCODE_ORG_ID: &str = "xcodeOrgId";
    pub const XCODE_SIGNING_ID: &str = "xcodeSigningId";
}

/// Capability names defined by the W3C specification; these are never prefixed.
const W3C_STANDARD: &[&str] = &[
    "acceptInsecureCerts",
    "browserName",
    "browserVersion",
    "pageLoadStrategy",
    "platformName",
    "proxy",
    "setWindowRect",
    "strictFileInteractability",
    "timeouts",
    "unhandledPromptBehavior",
    "webSocketUrl",
];

/// An ordered set of desired capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` when `value` is present; absent values are skipped.
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            trace!(key, "setting capability");
            self.0.insert(key.to_string(), value.into());
        }
        self
    }

    /// Set a mandatory `key`; fails when `value` is absent.
    pub fn set_required<V: Into<Value>>(
        &mut self,
        key: &str,
        value: Option<V>,
    ) -> Result<&mut Self, AppiumError> {
        match value {
            Some(value) => {
                self.0.insert(key.to_string(), value.into());
                Ok(self)
            }
            None => {
                error!(key, "mandatory capability not set");
                Err(AppiumError::CapabilityNotSet(key.to_string()))
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion-independent key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The capabilities with vendor prefixes applied.
    pub fn always_match(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(key, value)| {
                let key = if key.contains(':') || W3C_STANDARD.contains(&key.as_str()) {
                    key.clone()
                } else {
                    format!("appium:{key}")
                };
                (key, value.clone())
            })
            .collect()
    }

    /// The body of a W3C new-session request.
    pub fn to_w3c(&self) -> Value {
        serde_json::json!({
            "capabilities": {
                "alwaysMatch": Value::Object(self.always_match()),
                "firstMatch": [{}],
            }
        })
    }
}

/// Builds the capabilities of a device session.
///
/// Relative `app_location`s are resolved against `resources_dir` unless the
/// device marks the app as external.
pub fn build_capabilities(
    setting: &DeviceSetting,
    resources_dir: &Path,
) -> Result<Capabilities, AppiumError> {
    trace!("building device capabilities");
    let mut caps = Capabilities::new();

    set_common(&mut caps, setting)?;
    match setting.platform_type {
        PlatformType::Android => {
            if let Some(android) = &setting.android {
                set_android(&mut caps, setting, android)?;
            }
        }
        PlatformType::Ios => {
            if let Some(ios) = &setting.ios {
                set_ios(&mut caps, setting, ios)?;
            }
        }
        PlatformType::Windows => {}
    }

    if setting.app_type == ApplicationType::Web {
        caps.set_required(keys::BROWSER_NAME, setting.browser.clone())?;
    } else if let Some(app) = &setting.app_location {
        let path = resolve_app(app, setting.external_app, resources_dir)?;
        caps.set(keys::APP, Some(path.to_string_lossy().into_owned()));
    }

    trace!(count = caps.len(), "building device capabilities completed");
    Ok(caps)
}

/// Resolves and verifies the application path.
///
/// Remote apps (`http://`, `https://`) are passed through unchecked.
fn resolve_app(app: &str, external: bool, resources_dir: &Path) -> Result<PathBuf, AppiumError> {
    if app.starts_with("http://") || app.starts_with("https://") {
        return Ok(PathBuf::from(app));
    }
    let path = if external {
        PathBuf::from(app)
    } else {
        resources_dir.join(app)
    };
    if !path.exists() {
        error!(path = %path.display(), "app not found");
        return Err(AppiumError::DeviceAppNotFound(path));
    }
    Ok(path)
}

fn set_common(caps: &mut Capabilities, setting: &DeviceSetting) -> Result<(), AppiumError> {
    caps.set_required(keys::DEVICE_NAME, setting.device_name.clone())?;
    caps.set_required(
        keys::PLATFORM_NAME,
        Some(setting.platform_type.capability_name()),
    )?;
    caps.set(keys::PLATFORM_VERSION, setting.device_version.clone());
    caps.set(keys::NO_RESET, Some(setting.no_reset));
    caps.set(keys::FULL_RESET, Some(setting.full_reset));
    caps.set(keys::NEW_COMMAND_TIMEOUT, setting.session_timeout);
    caps.set(keys::CLEAR_SYSTEM_FILES, Some(setting.clear_system_files));
    caps.set_required(
        keys::AUTOMATION_NAME,
        setting.automation_name.map(|a| a.capability_name()),
    )?;
    caps.set(keys::UDID, setting.udid.clone());
    caps.set(keys::EVENT_TIMINGS, Some(setting.event_timings));
    Ok(())
}

fn set_android(
    caps: &mut Capabilities,
    setting: &DeviceSetting,
    android: &AndroidDeviceSetting,
) -> Result<(), AppiumError> {
    if setting.device_type == DeviceType::Simulator {
        caps.set_required(keys::AVD, android.avd.clone())?;
        caps.set(keys::AVD_READY_TIMEOUT, Some(android.avd_ready_timeout.saturating_mul(1000)));
        caps.set(keys::AVD_LAUNCH_TIMEOUT, Some(android.avd_launch_timeout.saturating_mul(1000)));
    }
    if setting.app_type != ApplicationType::Web {
        if android.app_package.is_none() && setting.app_location.is_none() {
            error!("neither app location nor app package configured");
            return Err(AppiumError::CapabilityNotSet(format!(
                "{} or {}",
                keys::APP,
                keys::APP_PACKAGE
            )));
        }
        caps.set(keys::APP_ACTIVITY, android.app_activity.clone());
        caps.set(keys::APP_PACKAGE, android.app_package.clone());
        caps.set(keys::APP_WAIT_ACTIVITY, android.app_wait_activity.clone());
        caps.set(keys::APP_WAIT_DURATION, android.app_wait_timeout);
        caps.set(keys::APP_WAIT_PACKAGE, android.app_wait_package.clone());
        caps.set(keys::ANDROID_INSTALL_TIMEOUT, android.apk_install_timeout);
        caps.set(keys::AUTO_GRANT_PERMISSIONS, Some(android.auto_grant_permissions));
    } else {
        caps.set(
            keys::CHROMEDRIVER_EXECUTABLE,
            android
                .chrome_driver_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        );
    }
    caps.set(keys::SYSTEM_PORT, android.system_port);
    caps.set(keys::ADB_PORT, android.adb_port);
    caps.set(
        keys::DEVICE_READY_TIMEOUT,
        android.device_ready_timeout,
    );
    Ok(())
}

fn set_ios(
    caps: &mut Capabilities,
    setting: &DeviceSetting,
    ios: &IosDeviceSetting,
) -> Result<(), AppiumError> {
    if setting.app_type != ApplicationType::Web {
        caps.set_required(keys::BUNDLE_ID, ios.bundle_id.clone())?;
    }
    if setting.device_type == DeviceType::Real {
        caps.set_required(keys::XCODE_ORG_ID, ios.team_id.clone())?;
        caps.set_required(keys::XCODE_SIGNING_ID, ios.signing_id.clone())?;
    }
    let path_string = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().into_owned());

    caps.set(keys::APP_NAME, ios.app_name.clone());
    caps.set(keys::WDA_CONNECTION_TIMEOUT, Some(ios.wda_connection_timeout));
    caps.set(keys::BOOTSTRAP_PATH, path_string(&ios.bootstrap_path));
    caps.set(keys::AGENT_PATH, path_string(&ios.agent_path));
    caps.set(keys::UPDATE_WDA_BUNDLEID, ios.updated_wda_bundle_id.clone());
    caps.set(keys::USE_NEW_WDA, Some(ios.use_new_wda));
    caps.set(keys::USE_PREBUILT_WDA, Some(ios.use_prebuilt_wda));
    caps.set(keys::SHOW_XCODE_LOG, Some(ios.show_xcode_log));
    caps.set(keys::WDA_STARTUP_RETRIES, ios.wda_startup_retries);
    caps.set(keys::WDA_STARTUP_RETRY_INTERVAL, ios.wda_startup_retry_interval);
    caps.set(keys::AUTO_ACCEPT_ALERTS, Some(ios.auto_accept_alerts));
    caps.set(keys::AUTO_DISMISS_ALERTS, Some(ios.auto_dismiss_alerts));
    caps.set(keys::WDA_LOCAL_PORT, ios.wda_local_port);
    caps.set(keys::LAUNCH_TIMEOUT, ios.launch_timeout);
    Ok(())
}
