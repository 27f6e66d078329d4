//! # mobilis-core
//!
//! Core library for mobile UI test automation against an Appium server.
//!
//! This crate lets tests declare the element hierarchy of each screen of an
//! Android or iOS app, resolve elements with wait strategies, perform gestures,
//! and assert UI state. It also manages the Appium server process and builds
//! driver capabilities from a JSON configuration file.
//!
//! ## Modules
//!
//! - [`config`] - Configuration file model and lookup
//! - [`capabilities`] - Desired capabilities built from device settings
//! - [`server`] - Appium server process lifecycle
//! - [`device`] - Devices and their driver sessions
//! - [`activity`] - Screen element trees and element resolution
//! - [`element_actions`] / [`verify`] - Actions and assertions on elements
//! - [`actions`], [`android`], [`ios`] - Device-level actions
//! - [`driver`] - The [`MobileDriver`](driver::MobileDriver) session trait
//! - [`session`] / [`webdriver`] - W3C WebDriver implementation over HTTP
//!
//! ## External Dependencies
//!
//! A running Appium 2 server (or the `appium` executable on `PATH` for
//! managed servers) with the UiAutomator2 or XCUITest driver installed.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobilis_core::activity::{Activity, DeviceActivity};
//! use mobilis_core::config::AppiumSetting;
//! use mobilis_core::device::Device;
//! use mobilis_core::element::DeviceElement;
//! use mobilis_core::locator::By;
//! use mobilis_core::server::AppiumServer;
//!
//! struct MainActivity;
//!
//! impl Activity for MainActivity {
//!     fn prepare(&self) -> DeviceElement {
//!         DeviceElement::new("Main", By::id("android:id/content"))
//!             .child(DeviceElement::new("Login", By::accessibility_id("login")))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = AppiumSetting::load()?;
//! let server = Arc::new(AppiumServer::new(settings.server.clone()));
//! server.start().await?;
//!
//! let mut device = Device::new(server.clone(), &settings, "pixel")?;
//! device.start().await?;
//!
//! let main = DeviceActivity::new(&device, &MainActivity)?;
//! main.on_element("Login").await?.click().await?;
//!
//! device.stop().await?;
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod activity;
pub mod android;
pub mod capabilities;
pub mod config;
pub mod device;
pub mod driver;
pub mod element;
pub mod element_actions;
pub mod error;
pub mod gesture;
pub mod ios;
pub mod locator;
pub mod server;
pub mod session;
pub mod verify;
pub mod wait;
pub mod webdriver;
