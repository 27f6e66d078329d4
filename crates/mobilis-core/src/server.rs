//! Lifecycle management for the Appium server.
//!
//! [`AppiumServer`] either spawns a local `appium` process or attaches to an
//! externally managed one, and answers whether the server is reachable. The
//! spawned process is tied to the handle: dropping the server kills it.
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::config::ServerSetting;
//! use mobilis_core::server::AppiumServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = AppiumServer::new(ServerSetting::default());
//! server.start().await?;
//! println!("Appium listening on {}", server.service_url());
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::ServerSetting;
use crate::driver::DriverError;
use crate::error::AppiumError;
use crate::webdriver::{ServerStatus, WebDriverClient};

/// Budget for a single reachability check.
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay between readiness polls while the server starts.
const STARTUP_POLL: Duration = Duration::from_millis(500);

/// An Appium server, spawned locally or managed elsewhere.
#[derive(Debug)]
pub struct AppiumServer {
    setting: ServerSetting,
    child: Mutex<Option<Child>>,
}

impl AppiumServer {
    pub fn new(setting: ServerSetting) -> Self {
        Self {
            setting,
            child: Mutex::new(None),
        }
    }

    pub fn setting(&self) -> &ServerSetting {
        &self.setting
    }

    /// The URL sessions are created against, including the base path.
    pub fn service_url(&self) -> String {
        let base = self.setting.base_path.trim_matches('/');
        if base.is_empty() {
            format!("http://{}:{}", self.setting.host, self.setting.port)
        } else {
            format!("http://{}:{}/{}", self.setting.host, self.setting.port, base)
        }
    }

    /// Command-line arguments passed to the `appium` executable.
    pub fn command_args(&self) -> Vec<String> {
        let s = &self.setting;
        let mut args = vec![
            "--address".to_string(),
            s.host.clone(),
            "--port".to_string(),
            s.port.to_string(),
        ];
        let base = s.base_path.trim_matches('/');
        if !base.is_empty() {
            args.push("--base-path".into());
            args.push(format!("/{base}"));
        }
        if let Some(log) = &s.log_file {
            args.push("--log".into());
            args.push(log.to_string_lossy().into_owned());
        }
        if let Some(level) = &s.log_level {
            args.push("--log-level".into());
            args.push(level.clone());
        }
        if s.session_override {
            args.push("--session-override".into());
        }
        if s.relaxed_security {
            args.push("--relaxed-security".into());
        }
        args.extend(s.args.iter().cloned());
        args
    }

    fn client(&self, timeout: Duration) -> Result<WebDriverClient, AppiumError> {
        WebDriverClient::with_timeout(self.service_url(), timeout)
            .map_err(|e| AppiumError::ServerStopped(Some(DriverError::from(e))))
    }

    /// Query the server's `/status` endpoint.
    pub async fn status(&self) -> Result<ServerStatus, AppiumError> {
        self.client(STATUS_TIMEOUT)?
            .status()
            .await
            .map_err(|e| AppiumError::ServerStopped(Some(DriverError::from(e))))
    }

    /// Whether a server answers and reports itself ready.
    pub async fn is_running(&self) -> bool {
        match self.status().await {
            Ok(status) => status.ready,
            Err(e) => {
                debug!(error = %e, url = %self.service_url(), "server not reachable");
                false
            }
        }
    }

    /// Fails with [`AppiumError::ServerStopped`] when the server is gone.
    pub async fn ensure_running(&self) -> Result<(), AppiumError> {
        if self.is_running().await {
            Ok(())
        } else {
            Err(AppiumError::ServerStopped(None))
        }
    }

    /// Whether this handle owns a spawned process.
    pub async fn is_managed(&self) -> bool {
        self.child.lock().await.is_some()
    }

    /// Start the server and wait until it is ready.
    ///
    /// External servers are only checked for reachability.
    #[instrument(skip(self), fields(url = %self.service_url()))]
    pub async fn start(&self) -> Result<(), AppiumError> {
        if self.setting.external {
            info!("using external Appium server");
            return if self.is_running().await {
                Ok(())
            } else {
                Err(AppiumError::ServerNotStarting(format!(
                    "external server at {} is not reachable",
                    self.service_url()
                )))
            };
        }

        let mut guard = self.child.lock().await;
        if guard.is_some() || self.is_running().await {
            return Err(AppiumError::ServerAlreadyRunning(self.service_url()));
        }

        let args = self.command_args();
        info!(program = %self.setting.appium_path.display(), ?args, "starting Appium server");
        let mut child = Command::new(&self.setting.appium_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppiumError::ServerNotStarting(format!(
                    "failed to spawn {}: {e}",
                    self.setting.appium_path.display()
                ))
            })?;

        let deadline = tokio::time::Instant::now() + self.setting.startup_timeout();
        loop {
            if let Ok(Some(exit)) = child.try_wait() {
                return Err(AppiumError::ServerNotStarting(format!(
                    "process exited during startup with {exit}"
                )));
            }
            if self.is_running().await {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill unresponsive Appium server");
                }
                return Err(AppiumError::ServerNotStarting(format!(
                    "not ready within {:?}",
                    self.setting.startup_timeout()
                )));
            }
            tokio::time::sleep(STARTUP_POLL).await;
        }

        info!(pid = child.id(), "Appium server started");
        *guard = Some(child);
        Ok(())
    }

    /// Stop the spawned server. External servers are left alone.
    #[instrument(skip(self), fields(url = %self.service_url()))]
    pub async fn stop(&self) -> Result<(), AppiumError> {
        let Some(mut child) = self.child.lock().await.take() else {
            debug!("no spawned Appium server to stop");
            return Ok(());
        };
        child
            .kill()
            .await
            .map_err(|e| AppiumError::ServerNotStopping(e.to_string()))?;
        info!("Appium server stopped");
        Ok(())
    }
}
