//! Shared test helpers for mobilis-core integration tests.
//!
//! Provides an in-memory [`MockDriver`] with a scripted element hierarchy, a
//! connector handing it to [`Device`], and a raw TCP mock of an Appium
//! server's HTTP endpoints.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use mobilis_core::capabilities::Capabilities;
use mobilis_core::config::{
    AndroidDeviceSetting, AutomationName, DeviceSetting, PlatformType, PlaybackSetting,
    ServerSetting,
};
use mobilis_core::device::{Device, DriverConnector};
use mobilis_core::driver::{DriverError, ElementId, MobileDriver, Rect};
use mobilis_core::gesture::ActionSequence;
use mobilis_core::locator::By;
use mobilis_core::server::AppiumServer;

/// Bytes returned by [`MockDriver::screenshot`].
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nmock";

// ---------------------------------------------------------------------------
// In-memory driver
// ---------------------------------------------------------------------------

/// One element of the mock hierarchy.
#[derive(Debug, Clone)]
pub struct MockNode {
    pub id: ElementId,
    pub by: By,
    pub parent: Option<ElementId>,
    pub displayed: bool,
    pub enabled: bool,
    pub selected: bool,
    pub text: String,
    pub rect: Rect,
    pub attributes: HashMap<String, String>,
    /// Number of `is_displayed` checks answered `false` before `displayed` applies.
    pub hidden_polls: u32,
}

/// Failure a mock operation can be scripted to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    SessionLost,
    ConnectionLost,
    InvalidSelector,
    NotInteractable,
    Unknown,
}

impl Failure {
    fn error(self, op: &str) -> DriverError {
        match self {
            Failure::SessionLost => DriverError::InvalidSession(format!("{op}: session terminated")),
            Failure::ConnectionLost => DriverError::ConnectionLost(format!("{op}: refused")),
            Failure::InvalidSelector => DriverError::InvalidSelector(format!("{op}: unsupported")),
            Failure::NotInteractable => DriverError::NotInteractable(format!("{op}: covered")),
            Failure::Unknown => DriverError::CommandFailed {
                error: "unknown error".into(),
                message: format!("{op}: boom"),
            },
        }
    }
}

#[derive(Default)]
struct MockState {
    nodes: Vec<MockNode>,
    next_id: u32,
    calls: Vec<String>,
    actions: Vec<Vec<ActionSequence>>,
    alert: Option<String>,
    failures: HashMap<String, Failure>,
    implicit_wait: Option<Duration>,
}

/// A [`MobileDriver`] over a scripted element hierarchy.
///
/// Child lookups only match nodes whose `parent` is the searched element.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a displayed, enabled node and return its id.
    pub fn add(&self, by: By, parent: Option<&ElementId>) -> ElementId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = ElementId::new(format!("el-{}", state.next_id));
        state.nodes.push(MockNode {
            id: id.clone(),
            by,
            parent: parent.cloned(),
            displayed: true,
            enabled: true,
            selected: false,
            text: String::new(),
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            attributes: HashMap::new(),
            hidden_polls: 0,
        });
        id
    }

    pub fn update(&self, id: &ElementId, f: impl FnOnce(&mut MockNode)) {
        let mut state = self.state.lock().unwrap();
        let node = state
            .nodes
            .iter_mut()
            .find(|n| &n.id == id)
            .expect("unknown mock element");
        f(node);
    }

    /// Make `op` fail until [`clear_failure`](Self::clear_failure) is called.
    pub fn fail(&self, op: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op.to_string(), failure);
    }

    pub fn clear_failure(&self, op: &str) {
        self.state.lock().unwrap().failures.remove(op);
    }

    pub fn show_alert(&self, text: &str) {
        self.state.lock().unwrap().alert = Some(text.to_string());
    }

    pub fn alert(&self) -> Option<String> {
        self.state.lock().unwrap().alert.clone()
    }

    /// Every recorded call, e.g. `"click el-3"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn performed(&self) -> Vec<Vec<ActionSequence>> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn implicit_wait(&self) -> Option<Duration> {
        self.state.lock().unwrap().implicit_wait
    }

    fn record(&self, op: &str, detail: String) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{op} {detail}")
        });
        match state.failures.get(op) {
            Some(failure) => Err(failure.error(op)),
            None => Ok(()),
        }
    }

    fn with_node<T>(
        &self,
        id: &ElementId,
        f: impl FnOnce(&mut MockNode) -> T,
    ) -> Result<T, DriverError> {
        let mut state = self.state.lock().unwrap();
        state
            .nodes
            .iter_mut()
            .find(|n| &n.id == id)
            .map(f)
            .ok_or_else(|| DriverError::StaleElement(id.to_string()))
    }
}

#[async_trait]
impl MobileDriver for MockDriver {
    fn session_id(&self) -> &str {
        "mock-session"
    }

    async fn find_elements(
        &self,
        locator: &By,
        parent: Option<&ElementId>,
    ) -> Result<Vec<ElementId>, DriverError> {
        let scope = parent.map(ToString::to_string).unwrap_or_default();
        self.record("find_elements", format!("{locator} in [{scope}]"))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .iter()
            .filter(|n| &n.by == locator && n.parent.as_ref() == parent)
            .map(|n| n.id.clone())
            .collect())
    }

    async fn click(&self, element: &ElementId) -> Result<(), DriverError> {
        self.record("click", element.to_string())?;
        self.with_node(element, |_| ())
    }

    async fn clear(&self, element: &ElementId) -> Result<(), DriverError> {
        self.record("clear", element.to_string())?;
        self.with_node(element, |n| n.text.clear())
    }

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError> {
        self.record("send_keys", format!("{element} {text}"))?;
        self.with_node(element, |n| n.text.push_str(text))
    }

    async fn text(&self, element: &ElementId) -> Result<String, DriverError> {
        self.record("text", element.to_string())?;
        self.with_node(element, |n| n.text.clone())
    }

    async fn attribute(
        &self,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.record("attribute", format!("{element} {name}"))?;
        self.with_node(element, |n| n.attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &ElementId) -> Result<bool, DriverError> {
        self.record("is_displayed", element.to_string())?;
        self.with_node(element, |n| {
            if n.hidden_polls > 0 {
                n.hidden_polls -= 1;
                false
            } else {
                n.displayed
            }
        })
    }

    async fn is_enabled(&self, element: &ElementId) -> Result<bool, DriverError> {
        self.record("is_enabled", element.to_string())?;
        self.with_node(element, |n| n.enabled)
    }

    async fn is_selected(&self, element: &ElementId) -> Result<bool, DriverError> {
        self.record("is_selected", element.to_string())?;
        self.with_node(element, |n| n.selected)
    }

    async fn rect(&self, element: &ElementId) -> Result<Rect, DriverError> {
        self.record("rect", element.to_string())?;
        self.with_node(element, |n| n.rect)
    }

    async fn window_rect(&self) -> Result<Rect, DriverError> {
        self.record("window_rect", String::new())?;
        Ok(Rect::new(0.0, 0.0, 1080.0, 1920.0))
    }

    async fn perform_actions(&self, actions: &[ActionSequence]) -> Result<(), DriverError> {
        self.record("perform_actions", format!("{} pointer(s)", actions.len()))?;
        self.state.lock().unwrap().actions.push(actions.to_vec());
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.record("screenshot", String::new())?;
        Ok(FAKE_PNG.to_vec())
    }

    async fn alert_text(&self) -> Result<String, DriverError> {
        self.record("alert_text", String::new())?;
        self.alert()
            .ok_or_else(|| DriverError::NoSuchAlert("no alert open".into()))
    }

    async fn accept_alert(&self) -> Result<(), DriverError> {
        self.record("accept_alert", String::new())?;
        self.state.lock().unwrap().alert = None;
        Ok(())
    }

    async fn dismiss_alert(&self) -> Result<(), DriverError> {
        self.record("dismiss_alert", String::new())?;
        self.state.lock().unwrap().alert = None;
        Ok(())
    }

    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), DriverError> {
        self.record("set_implicit_wait", format!("{}ms", wait.as_millis()))?;
        self.state.lock().unwrap().implicit_wait = Some(wait);
        Ok(())
    }

    async fn back(&self) -> Result<(), DriverError> {
        self.record("back", String::new())
    }

    async fn execute_mobile(&self, command: &str, args: Value) -> Result<Value, DriverError> {
        self.record("execute_mobile", format!("{command} {args}"))?;
        Ok(Value::Null)
    }

    async fn close_app(&self) -> Result<(), DriverError> {
        self.record("close_app", String::new())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.record("quit", String::new())
    }
}

/// Hands out a shared [`MockDriver`] as the device session.
pub struct MockConnector {
    pub driver: Arc<MockDriver>,
    pub failure: Option<Failure>,
    pub connected: Mutex<Vec<(String, Capabilities)>>,
}

impl MockConnector {
    pub fn new(driver: Arc<MockDriver>) -> Arc<Self> {
        Arc::new(Self {
            driver,
            failure: None,
            connected: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(driver: Arc<MockDriver>, failure: Failure) -> Arc<Self> {
        Arc::new(Self {
            driver,
            failure: Some(failure),
            connected: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DriverConnector for MockConnector {
    async fn connect(
        &self,
        url: &str,
        caps: &Capabilities,
    ) -> Result<Arc<dyn MobileDriver>, DriverError> {
        self.connected
            .lock()
            .unwrap()
            .push((url.to_string(), caps.clone()));
        if let Some(failure) = self.failure {
            return Err(failure.error("connect"));
        }
        let driver: Arc<dyn MobileDriver> = self.driver.clone();
        Ok(driver)
    }
}

// ---------------------------------------------------------------------------
// Mock HTTP server
// ---------------------------------------------------------------------------

/// A request received by [`mock_http`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Value,
}

pub struct MockHttp {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockHttp {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start an HTTP server answering every request through `route`, which maps
/// `(method, path, body)` to `(status, json)`. Each connection serves one
/// request and is then closed.
pub async fn mock_http<F>(route: F) -> MockHttp
where
    F: Fn(&str, &str, &Value) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let route = Arc::new(route);

    let log = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let route = route.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let _ = serve_one(stream, route.as_ref(), &log).await;
            });
        }
    });

    MockHttp { addr, requests }
}

/// A mock Appium server whose `/status` reports ready and everything else 404s.
pub async fn mock_appium_status() -> MockHttp {
    mock_http(|method, path, _| match (method, path) {
        ("GET", "/status") => (
            200,
            json!({ "value": { "ready": true, "message": "ready", "build": { "version": "2.5.1" } } }),
        ),
        _ => (
            404,
            json!({ "value": { "error": "unknown command", "message": "not mocked" } }),
        ),
    })
    .await
}

async fn serve_one<F>(
    mut stream: TcpStream,
    route: &F,
    log: &Mutex<Vec<Recorded>>,
) -> std::io::Result<()>
where
    F: Fn(&str, &str, &Value) -> (u16, Value),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);

    let (status, response) = route(&method, &path, &body);
    log.lock().unwrap().push(Recorded { method, path, body });

    let payload = response.to_string();
    let reply = format!(
        "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Device fixtures
// ---------------------------------------------------------------------------

/// Playback settings with short waits so timeouts resolve quickly.
pub fn fast_playback() -> PlaybackSetting {
    PlaybackSetting {
        wait_for_element_until: 1,
        poll_interval_ms: 20,
        swipe_duration_ms: 300,
        ..Default::default()
    }
}

/// A real Android device running an installed package.
pub fn android_setting() -> DeviceSetting {
    DeviceSetting {
        platform_type: PlatformType::Android,
        device_type: mobilis_core::config::DeviceType::Real,
        device_name: Some("Pixel 7".into()),
        automation_name: Some(AutomationName::UiAutomator2),
        android: Some(AndroidDeviceSetting {
            app_package: Some("com.vodqareactnative".into()),
            app_activity: Some(".MainActivity".into()),
            ..Default::default()
        }),
        playback: fast_playback(),
        ..Default::default()
    }
}

pub fn ios_setting() -> DeviceSetting {
    DeviceSetting {
        platform_type: PlatformType::Ios,
        device_name: Some("iPhone 15".into()),
        automation_name: Some(AutomationName::XcuiTest),
        ios: Some(mobilis_core::config::IosDeviceSetting {
            bundle_id: Some("com.example.app".into()),
            ..Default::default()
        }),
        playback: fast_playback(),
        ..Default::default()
    }
}

/// An external server handle pointing at `http`.
pub fn server_for(http: &MockHttp) -> Arc<AppiumServer> {
    Arc::new(AppiumServer::new(ServerSetting {
        host: http.addr.ip().to_string(),
        port: http.addr.port(),
        external: true,
        ..Default::default()
    }))
}

/// A device backed by `driver`, not yet started, behind a ready mock server.
pub async fn mock_device(driver: Arc<MockDriver>, setting: DeviceSetting) -> (Device, MockHttp) {
    let http = mock_appium_status().await;
    let device = Device::from_setting(server_for(&http), "mock", setting, Path::new("."))
        .unwrap()
        .with_connector(MockConnector::new(driver));
    (device, http)
}

/// Like [`mock_device`], already started.
pub async fn started_device(driver: Arc<MockDriver>, setting: DeviceSetting) -> (Device, MockHttp) {
    let (mut device, http) = mock_device(driver, setting).await;
    device.start().await.unwrap();
    (device, http)
}
