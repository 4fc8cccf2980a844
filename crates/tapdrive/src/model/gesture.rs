//! Gesture events and the scripted drag sequence.

use serde::{Deserialize, Serialize};

/// The three phases of a touch gesture, serialized with their wire names.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum GestureKind {
    #[serde(rename = "ActionDown")]
    Down,
    #[serde(rename = "ActionMove")]
    Move,
    #[serde(rename = "ActionUp")]
    Up,
}

/// A single touch event: gesture phase plus screen coordinates.
///
/// Coordinates are passed through verbatim; the mirror process is the
/// authority on acceptance, so no bounds are enforced here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub x: i32,
    pub y: i32,
}

impl GestureEvent {
    #[must_use]
    pub fn new(kind: GestureKind, x: i32, y: i32) -> Self {
        Self { kind, x, y }
    }
}

/// A scripted drag: one Down at the origin, `moves` Moves each shifted by
/// the step, and one Up at the final coordinate.
///
/// `moves == 0` is legal and produces Down immediately followed by Up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GestureScript {
    pub origin_x: i32,
    pub origin_y: i32,
    /// Number of Move events between Down and Up.
    pub moves: u32,
    pub step_x: i32,
    pub step_y: i32,
    /// Delay between consecutive event writes, emulating a human-paced drag.
    pub pacing_ms: u64,
    /// Fixed delay after spawn before the first event is written.
    pub warmup_ms: u64,
    /// Fixed delay after the last event so effects propagate into the logs.
    pub settle_ms: u64,
}

impl Default for GestureScript {
    /// The reference drag: a leftward swipe from (500, 1200).
    fn default() -> Self {
        Self {
            origin_x: 500,
            origin_y: 1200,
            moves: 10,
            step_x: -50,
            step_y: 0,
            pacing_ms: 10,
            warmup_ms: 5000,
            settle_ms: 5000,
        }
    }
}

impl GestureScript {
    /// Total number of protocol lines one run of this script writes.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.moves as usize + 2
    }

    /// The full event sequence in program order.
    #[must_use]
    pub fn events(&self) -> Vec<GestureEvent> {
        let mut events = Vec::with_capacity(self.event_count());
        let mut x = self.origin_x;
        let mut y = self.origin_y;
        events.push(GestureEvent::new(GestureKind::Down, x, y));
        for _ in 0..self.moves {
            x = x.wrapping_add(self.step_x);
            y = y.wrapping_add(self.step_y);
            events.push(GestureEvent::new(GestureKind::Move, x, y));
        }
        events.push(GestureEvent::new(GestureKind::Up, x, y));
        events
    }
}
