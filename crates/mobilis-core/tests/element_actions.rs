//! Integration tests for element actions, gestures and verification.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{android_setting, started_device, Failure, MockDriver};

use mobilis_core::activity::{Activity, DeviceActivity};
use mobilis_core::driver::{ElementId, Rect};
use mobilis_core::element::DeviceElement;
use mobilis_core::error::AppiumError;
use mobilis_core::gesture::{PointerAction, SwipeDirection, SwipeStartPosition};
use mobilis_core::locator::By;

/// A drag-and-drop screen with a slider and a text field.
struct Playground;

impl Activity for Playground {
    fn prepare(&self) -> DeviceElement {
        DeviceElement::new("Main", By::id("android:id/content")).children([
            DeviceElement::new("Drag me", By::accessibility_id("dragMe")),
            DeviceElement::new("Drop zone", By::accessibility_id("dropzone")),
            DeviceElement::new("Success", By::xpath("//*[@text='Circle dropped']")),
            DeviceElement::new("Slider", By::accessibility_id("slider")),
            DeviceElement::new("Username", By::accessibility_id("username")),
            DeviceElement::new("Login", By::accessibility_id("login")),
        ])
    }
}

struct Screen {
    driver: Arc<MockDriver>,
    drag: ElementId,
    drop_zone: ElementId,
    success: ElementId,
    slider: ElementId,
    username: ElementId,
    login: ElementId,
}

fn screen() -> Screen {
    let driver = MockDriver::new();
    let main = driver.add(By::id("android:id/content"), None);
    let drag = driver.add(By::accessibility_id("dragMe"), Some(&main));
    let drop_zone = driver.add(By::accessibility_id("dropzone"), Some(&main));
    let success = driver.add(By::xpath("//*[@text='Circle dropped']"), Some(&main));
    let slider = driver.add(By::accessibility_id("slider"), Some(&main));
    let username = driver.add(By::accessibility_id("username"), Some(&main));
    let login = driver.add(By::accessibility_id("login"), Some(&main));

    driver.update(&drag, |n| n.rect = Rect::new(100.0, 200.0, 100.0, 100.0));
    driver.update(&drop_zone, |n| n.rect = Rect::new(400.0, 1000.0, 200.0, 200.0));
    driver.update(&success, |n| n.text = "Circle dropped".into());
    driver.update(&slider, |n| n.rect = Rect::new(0.0, 500.0, 1000.0, 40.0));
    Screen {
        driver,
        drag,
        drop_zone,
        success,
        slider,
        username,
        login,
    }
}

fn moves(actions: &[PointerAction]) -> Vec<(i64, i64)> {
    actions
        .iter()
        .filter_map(|a| match a {
            PointerAction::PointerMove { x, y, .. } => Some((*x, *y)),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Basic actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_click_and_enter_text() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    let username = playground.on_element("Username").await.unwrap();
    username.enter_text("admin").await.unwrap();
    assert_eq!(username.text().await.unwrap(), "admin");
    username.clear().await.unwrap();
    assert_eq!(username.text().await.unwrap(), "");

    playground.on_element("Login").await.unwrap().click().await.unwrap();
    assert!(s.driver.calls().contains(&format!("click {}", s.login)));
    assert!(s.driver.calls().contains(&format!("send_keys {} admin", s.username)));
}

#[tokio::test]
async fn test_state_queries() {
    let s = screen();
    s.driver.update(&s.login, |n| {
        n.selected = true;
        n.attributes.insert("content-desc".into(), "login".into());
    });
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    let login = playground.on_element("Login").await.unwrap();
    assert!(login.enabled().await.unwrap());
    assert!(login.visible().await.unwrap());
    assert!(login.selected().await.unwrap());
    assert_eq!(login.attribute("content-desc").await.unwrap().as_deref(), Some("login"));
    assert_eq!(login.attribute("checked").await.unwrap(), None);
    assert_eq!(login.name(), "Login");
}

#[tokio::test]
async fn test_action_failure_names_element_and_action() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();
    let login = playground.on_element("Login").await.unwrap();

    s.driver.fail("click", Failure::NotInteractable);
    let err = login.click().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error occurred while performing [click] on element [Login]"
    );

    s.driver.fail("click", Failure::SessionLost);
    let err = login.click().await.unwrap_err();
    assert!(matches!(err, AppiumError::ServerStopped(Some(_))));
}

// ---------------------------------------------------------------------------
// 2. Gestures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_tap_touches_center() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    playground.on_element("Drag me").await.unwrap().tap().await.unwrap();

    let performed = s.driver.performed();
    assert_eq!(performed.len(), 1);
    assert_eq!(moves(&performed[0][0].actions), vec![(150, 250)]);
}

#[tokio::test]
async fn test_swipe_slider_right() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    playground
        .on_element("Slider")
        .await
        .unwrap()
        .swipe(SwipeDirection::Right, SwipeStartPosition::Left, 50)
        .await
        .unwrap();

    let performed = s.driver.performed();
    let finger = &performed[0][0];
    assert_eq!(finger.id, "finger1");
    assert_eq!(moves(&finger.actions), vec![(100, 520), (600, 520)]);
    assert_eq!(
        finger.actions[2],
        PointerAction::PointerMove { duration: 300, x: 600, y: 520, origin: "viewport" }
    );
}

#[tokio::test]
async fn test_swipe_rejects_zero_distance() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    let err = playground
        .on_element("Slider")
        .await
        .unwrap()
        .swipe(SwipeDirection::Left, SwipeStartPosition::Right, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppiumError::InvalidGesture(_)));
    assert!(s.driver.performed().is_empty());
}

#[tokio::test]
async fn test_drag_drop_moves_between_centers() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    let target = playground.get_element("Drop zone").await.unwrap();
    assert_eq!(target, s.drop_zone);
    playground
        .on_element("Drag me")
        .await
        .unwrap()
        .drag_drop(&target)
        .await
        .unwrap();

    let performed = s.driver.performed();
    assert_eq!(moves(&performed[0][0].actions), vec![(150, 250), (500, 1100)]);
    assert!(s.driver.calls().contains(&format!("rect {}", s.drag)));

    playground
        .on_element("Success")
        .await
        .unwrap()
        .verify_that()
        .text_should_be_equal_to("Circle dropped")
        .await
        .unwrap();
    assert!(s.driver.calls().contains(&format!("text {}", s.success)));
}

#[tokio::test]
async fn test_zoom_and_pinch_use_two_fingers() {
    let s = screen();
    s.driver.update(&s.drop_zone, |n| n.rect = Rect::new(0.0, 0.0, 400.0, 400.0));
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();
    let zone = playground.on_element("Drop zone").await.unwrap();

    zone.zoom(50).await.unwrap();
    zone.pinch(50).await.unwrap();

    let performed = s.driver.performed();
    assert_eq!(performed.len(), 2);

    let zoom = &performed[0];
    assert_eq!(zoom.len(), 2);
    assert_eq!(moves(&zoom[0].actions), vec![(200, 190), (200, 100)]);
    assert_eq!(moves(&zoom[1].actions), vec![(200, 210), (200, 300)]);

    let pinch = &performed[1];
    assert_eq!(moves(&pinch[0].actions), vec![(200, 100), (200, 190)]);
    assert_eq!(moves(&pinch[1].actions), vec![(200, 300), (200, 210)]);
}

#[tokio::test]
async fn test_long_press_holds() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();
    let drag = playground.on_element("Drag me").await.unwrap();

    drag.long_press().await.unwrap();
    drag.long_press_for(Duration::from_secs(3)).await.unwrap();

    let performed = s.driver.performed();
    assert!(performed[0][0].actions.contains(&PointerAction::Pause { duration: 1500 }));
    assert!(performed[1][0].actions.contains(&PointerAction::Pause { duration: 3000 }));
}

// ---------------------------------------------------------------------------
// 3. Verification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_verifications_chain() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();
    let success = playground.on_element("Success").await.unwrap();

    success
        .verify_that()
        .should_be_displayed()
        .await
        .unwrap()
        .should_be_enabled()
        .await
        .unwrap()
        .text_should_contain("dropped")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_verification_reports_actual() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();
    let success = playground.on_element("Success").await.unwrap();

    let err = success
        .verify_that()
        .text_should_be_equal_to("Circle missed")
        .await
        .err()
        .unwrap();
    match err {
        AppiumError::VerificationFailed { element, expected, actual } => {
            assert_eq!(element, "Success");
            assert_eq!(expected, "text [Circle missed]");
            assert_eq!(actual, "[Circle dropped]");
        }
        other => panic!("expected VerificationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disabled_and_hidden_checks() {
    let s = screen();
    let (device, _http) = started_device(s.driver.clone(), android_setting()).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();
    let login = playground.on_element("Login").await.unwrap();

    s.driver.update(&s.login, |n| {
        n.enabled = false;
        n.displayed = false;
    });
    login
        .verify_that()
        .should_be_disabled()
        .await
        .unwrap()
        .should_not_be_displayed()
        .await
        .unwrap();
    assert!(login.verify_that().should_be_displayed().await.is_err());
}

// ---------------------------------------------------------------------------
// 4. Screenshot on error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_lookup_failure_captures_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let s = screen();
    let mut setting = android_setting();
    setting.playback.screenshot_on_error = true;
    setting.playback.screenshot_path = dir.path().to_path_buf();
    let (device, _http) = started_device(s.driver.clone(), setting).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    s.driver.update(&s.slider, |n| n.displayed = false);
    let err = playground.on_element("Slider").await.err().unwrap();
    assert!(matches!(err, AppiumError::ElementFindTimedOut { .. }));

    let shots: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(shots.len(), 1);
    assert_eq!(s.driver.count("screenshot"), 1);
}

#[tokio::test]
async fn test_screenshot_failure_keeps_lookup_error() {
    let dir = tempfile::tempdir().unwrap();
    let s = screen();
    let mut setting = android_setting();
    setting.playback.screenshot_on_error = true;
    setting.playback.screenshot_path = dir.path().to_path_buf();
    let (device, _http) = started_device(s.driver.clone(), setting).await;
    let playground = DeviceActivity::new(&device, &Playground).unwrap();

    s.driver.fail("screenshot", Failure::Unknown);
    let err = playground.on_element_at("Login", 3).await.err().unwrap();
    assert!(matches!(err, AppiumError::ElementNotFound { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
