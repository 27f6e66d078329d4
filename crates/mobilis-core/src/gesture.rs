//! Touch gestures as W3C pointer action sequences.
//!
//! Every gesture is expressed as one [`ActionSequence`] per finger and sent in
//! a single `POST /session/{id}/actions` call. Geometry is computed from the
//! target's [`Rect`]: swipes start 10 % inside the named edge and travel a
//! percentage of the element's extent; zoom and pinch move two fingers
//! apart or together about the centre.

use std::time::Duration;

use serde::Serialize;

use crate::driver::{Point, Rect};
use crate::error::AppiumError;

/// Inset of swipe start points from the element edge, as a fraction.
const EDGE_INSET: f64 = 0.1;

/// Half the gap between two fingers at the inner end of a zoom or pinch.
const INNER_OFFSET: i64 = 10;

/// Default press duration of a long press.
pub const LONG_PRESS: Duration = Duration::from_millis(1500);

/// Hold and travel time used when dragging.
pub const DRAG_STEP: Duration = Duration::from_millis(500);

const TAP_HOLD: Duration = Duration::from_millis(100);

/// A single step of a pointer input source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerAction {
    PointerMove {
        duration: u64,
        x: i64,
        y: i64,
        origin: &'static str,
    },
    PointerDown {
        button: u8,
    },
    PointerUp {
        button: u8,
    },
    Pause {
        duration: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct PointerParameters {
    pointer_type: &'static str,
}

/// The actions of one touch pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSequence {
    #[serde(rename = "type")]
    kind: &'static str,
    pub id: String,
    parameters: PointerParameters,
    pub actions: Vec<PointerAction>,
}

impl ActionSequence {
    /// The body of a perform-actions request.
    pub fn to_request(sequences: &[ActionSequence]) -> serde_json::Value {
        serde_json::json!({ "actions": sequences })
    }
}

/// Builder for a touch pointer sequence.
#[derive(Debug, Clone)]
pub struct Finger {
    id: String,
    actions: Vec<PointerAction>,
}

impl Finger {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: Vec::new(),
        }
    }

    pub fn move_to(mut self, point: Point, duration: Duration) -> Self {
        self.actions.push(PointerAction::PointerMove {
            duration: duration.as_millis() as u64,
            x: point.x,
            y: point.y,
            origin: "viewport",
        });
        self
    }

    pub fn press(mut self) -> Self {
        self.actions.push(PointerAction::PointerDown { button: 0 });
        self
    }

    pub fn release(mut self) -> Self {
        self.actions.push(PointerAction::PointerUp { button: 0 });
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.actions.push(PointerAction::Pause {
            duration: duration.as_millis() as u64,
        });
        self
    }

    pub fn build(self) -> ActionSequence {
        ActionSequence {
            kind: "pointer",
            id: self.id,
            parameters: PointerParameters {
                pointer_type: "touch",
            },
            actions: self.actions,
        }
    }
}

/// Direction a swipe travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Where on the element a swipe begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeStartPosition {
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

fn fraction(distance: u8) -> Result<f64, AppiumError> {
    if distance == 0 || distance > 100 {
        return Err(AppiumError::InvalidGesture(format!(
            "distance must be between 1 and 100 percent, got {distance}"
        )));
    }
    Ok(f64::from(distance) / 100.0)
}

/// Start and end points of a swipe across `rect`.
pub fn swipe_points(
    rect: &Rect,
    direction: SwipeDirection,
    start: SwipeStartPosition,
    distance: u8,
) -> Result<(Point, Point), AppiumError> {
    let fraction = fraction(distance)?;
    let center = rect.center();
    let from = match start {
        SwipeStartPosition::Top => Point::new(center.x, inset(rect.y, rect.height, EDGE_INSET)),
        SwipeStartPosition::Bottom => {
            Point::new(center.x, inset(rect.y, rect.height, 1.0 - EDGE_INSET))
        }
        SwipeStartPosition::Left => Point::new(inset(rect.x, rect.width, EDGE_INSET), center.y),
        SwipeStartPosition::Right => {
            Point::new(inset(rect.x, rect.width, 1.0 - EDGE_INSET), center.y)
        }
        SwipeStartPosition::Center => center,
    };
    let vertical = (rect.height * fraction).round() as i64;
    let horizontal = (rect.width * fraction).round() as i64;
    let to = match direction {
        SwipeDirection::Up => Point::new(from.x, from.y - vertical),
        SwipeDirection::Down => Point::new(from.x, from.y + vertical),
        SwipeDirection::Left => Point::new(from.x - horizontal, from.y),
        SwipeDirection::Right => Point::new(from.x + horizontal, from.y),
    };
    Ok((from, to))
}

fn inset(origin: f64, extent: f64, fraction: f64) -> i64 {
    (origin + extent * fraction).round() as i64
}

/// One-finger swipe from `from` to `to` taking `duration`.
pub fn swipe(from: Point, to: Point, duration: Duration) -> Vec<ActionSequence> {
    vec![Finger::new("finger1")
        .move_to(from, Duration::ZERO)
        .press()
        .move_to(to, duration)
        .release()
        .build()]
}

/// A short press at `point`.
pub fn tap(point: Point) -> Vec<ActionSequence> {
    press_for(point, TAP_HOLD)
}

/// A press at `point` held for `hold`.
pub fn press_for(point: Point, hold: Duration) -> Vec<ActionSequence> {
    vec![Finger::new("finger1")
        .move_to(point, Duration::ZERO)
        .press()
        .pause(hold)
        .release()
        .build()]
}

/// Drag from the centre of `source` to the centre of `target`.
pub fn drag_drop(source: &Rect, target: &Rect) -> Vec<ActionSequence> {
    vec![Finger::new("finger1")
        .move_to(source.center(), Duration::ZERO)
        .press()
        .pause(DRAG_STEP)
        .move_to(target.center(), DRAG_STEP)
        .release()
        .build()]
}

/// Inner and outer points of the two fingers of a zoom or pinch.
fn spread(rect: &Rect, distance: u8) -> Result<[(Point, Point); 2], AppiumError> {
    let fraction = fraction(distance)?;
    let center = rect.center();
    let outer = ((rect.height / 2.0) * fraction).round() as i64;
    let outer = outer.max(INNER_OFFSET);
    Ok([
        (
            Point::new(center.x, center.y - INNER_OFFSET),
            Point::new(center.x, center.y - outer),
        ),
        (
            Point::new(center.x, center.y + INNER_OFFSET),
            Point::new(center.x, center.y + outer),
        ),
    ])
}

fn two_fingers(paths: [(Point, Point); 2], duration: Duration) -> Vec<ActionSequence> {
    paths
        .into_iter()
        .enumerate()
        .map(|(i, (from, to))| {
            Finger::new(format!("finger{}", i + 1))
                .move_to(from, Duration::ZERO)
                .press()
                .move_to(to, duration)
                .release()
                .build()
        })
        .collect()
}

/// Two fingers moving apart from the centre of `rect`.
pub fn zoom(rect: &Rect, distance: u8, duration: Duration) -> Result<Vec<ActionSequence>, AppiumError> {
    Ok(two_fingers(spread(rect, distance)?, duration))
}

/// Two fingers moving together towards the centre of `rect`.
pub fn pinch(rect: &Rect, distance: u8, duration: Duration) -> Result<Vec<ActionSequence>, AppiumError> {
    let [a, b] = spread(rect, distance)?;
    Ok(two_fingers([(a.1, a.0), (b.1, b.0)], duration))
}
