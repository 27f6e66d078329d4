//! Command-line companion for mobilis test suites.
//!
//! Inspects the configuration file, previews the capabilities a device
//! session would be created with, and runs a managed Appium server.
//!
//! # Usage
//!
//! ```bash
//! # List configured devices
//! mobilis devices
//!
//! # Show the new-session payload for a device
//! mobilis capabilities pixel
//! mobilis -f json capabilities pixel
//!
//! # Check whether the configured server is up
//! mobilis status
//! mobilis status --url http://127.0.0.1:4723/wd/hub
//!
//! # Run a managed Appium server until Ctrl+C
//! mobilis --config ci/mobilis.json server
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mobilis_core::capabilities::build_capabilities;
use mobilis_core::config::{logs_dir, AppiumSetting, ConfigError};
use mobilis_core::error::AppiumError;
use mobilis_core::server::AppiumServer;
use mobilis_core::webdriver::WebDriverClient;
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Timeout for the `status` command's request.
const STATUS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Inspect mobilis configuration and manage an Appium server.
#[derive(Parser)]
#[command(name = "mobilis")]
#[command(about = "Inspect mobilis configuration and manage an Appium server")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $MOBILIS_CONFIG, ./mobilis.json, ~/.mobilis/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List configured devices
    Devices,

    /// Print the capabilities a session for DEVICE would request
    Capabilities {
        /// Device name as configured
        device: String,
    },

    /// Query the Appium server status
    Status {
        /// Server URL, including any base path (defaults to the configured server)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Start the configured Appium server and keep it running until interrupted
    Server,
}

#[derive(Debug)]
enum CliError {
    Config(String),
    Connection(String),
    Failed(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Failed(_) => 1,
            CliError::Connection(_) => 2,
            CliError::Config(_) => 3,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<AppiumError> for CliError {
    fn from(err: AppiumError) -> Self {
        match err {
            AppiumError::Config(e) => e.into(),
            e @ (AppiumError::ServerStopped(_)
            | AppiumError::ServerNotStarting(_)
            | AppiumError::ServerAlreadyRunning(_)) => CliError::Connection(e.to_string()),
            e => CliError::Failed(e.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(&cli.command);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Stderr logging for one-shot commands; the long-running server command
/// also writes a file log under `~/.mobilis/logs`.
fn init_logging(command: &Command) -> Option<WorkerGuard> {
    match command {
        Command::Server => {
            let file_appender = tracing_appender::rolling::daily(logs_dir(), "mobilis-server.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<AppiumSetting, CliError> {
    let settings = match path {
        Some(path) => AppiumSetting::load_from(path)?,
        None => AppiumSetting::load()?,
    };
    debug!(devices = settings.devices.len(), "configuration loaded");
    Ok(settings)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Devices => list_devices(&cli),
        Command::Capabilities { ref device } => show_capabilities(&cli, device),
        Command::Status { ref url } => server_status(&cli, url.clone()).await,
        Command::Server => run_server(&cli).await,
    }
}

fn list_devices(cli: &Cli) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_deref())?;

    if cli.format == OutputFormat::Json {
        let devices: Vec<_> = settings
            .devices
            .iter()
            .map(|(name, device)| {
                json!({
                    "name": name,
                    "platform": device.platform_type.capability_name(),
                    "device_type": device.device_type,
                    "app_type": device.app_type,
                    "device_name": device.device_name,
                })
            })
            .collect();
        println!("{}", json!({ "devices": devices }));
    } else if settings.devices.is_empty() {
        eprintln!("No devices configured");
    } else {
        for (name, device) in &settings.devices {
            let model = device.device_name.as_deref().unwrap_or("-");
            println!("{} -- {} {}", name, device.platform_type, model);
        }
    }
    Ok(())
}

fn show_capabilities(cli: &Cli, device: &str) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_deref())?;
    let setting = settings.device(device)?;
    let caps = build_capabilities(setting, &settings.resources_dir)?;

    if cli.format == OutputFormat::Json {
        let payload = serde_json::to_string_pretty(&caps.to_w3c())
            .map_err(|e| CliError::Failed(e.to_string()))?;
        println!("{}", payload);
    } else {
        for (key, value) in caps.always_match() {
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}

async fn server_status(cli: &Cli, url: Option<String>) -> Result<(), CliError> {
    let url = match url {
        Some(url) => url,
        None => {
            let settings = load_settings(cli.config.as_deref())?;
            AppiumServer::new(settings.server).service_url()
        }
    };

    let client = WebDriverClient::with_timeout(url.clone(), STATUS_TIMEOUT)
        .map_err(|e| CliError::Failed(e.to_string()))?;
    let status = client
        .status()
        .await
        .map_err(|e| CliError::Connection(format!("Appium server at {} is not reachable: {}", url, e)))?;

    if cli.format == OutputFormat::Json {
        println!(
            "{}",
            json!({
                "url": url,
                "ready": status.ready,
                "version": status.version(),
                "message": status.message,
            })
        );
    } else {
        let state = if status.ready { "ready" } else { "not ready" };
        match status.version() {
            Some(version) => println!("{} -- {} (Appium {})", url, state, version),
            None => println!("{} -- {}", url, state),
        }
    }

    if status.ready {
        Ok(())
    } else {
        Err(CliError::Connection(format!("Appium server at {} is not ready", url)))
    }
}

async fn run_server(cli: &Cli) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_deref())?;
    let server = AppiumServer::new(settings.server);
    let url = server.service_url();

    server.start().await?;
    info!(%url, managed = server.is_managed().await, "Appium server ready");
    if !cli.quiet {
        eprintln!("Appium server ready at {} (Ctrl+C to stop)", url);
    }

    wait_for_shutdown().await;

    server.stop().await?;
    if !cli.quiet {
        eprintln!("Server stopped");
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C");
}
