use crate::math::smoothing;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Scroll tuning in logical canvas units (one unit is one terminal row or
/// column at dpr 1).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ScrollTuning {
    pub(crate) wheel_sensitivity: f32,
    /// Extra room past the end of the content.
    pub(crate) slack: f32,
    /// Release speed (units/s) above which a drag turns into a fling.
    pub(crate) fling_threshold: f32,
    /// Seconds of release velocity projected into the fling target.
    pub(crate) fling_projection: f32,
    pub(crate) follow_rate: f32,
    pub(crate) swipe_threshold: f32,
}

impl Default for ScrollTuning {
    fn default() -> Self {
        Self {
            wheel_sensitivity: 0.6,
            slack: 4.0,
            fling_threshold: 3.0,
            fling_projection: 0.3,
            follow_rate: 10.0,
            swipe_threshold: 12.0,
        }
    }
}

fn clamp_or(v: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v.clamp(lo, hi)
    } else {
        fallback
    }
}

impl ScrollTuning {
    /// Pulls hand-edited values back into ranges where scrolling still
    /// converges and a swipe needs a deliberate drag.
    pub(crate) fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            wheel_sensitivity: clamp_or(self.wheel_sensitivity, 0.05, 5.0, d.wheel_sensitivity),
            slack: clamp_or(self.slack, 0.0, 40.0, d.slack),
            fling_threshold: clamp_or(self.fling_threshold, 0.5, 200.0, d.fling_threshold),
            fling_projection: clamp_or(self.fling_projection, 0.0, 2.0, d.fling_projection),
            follow_rate: clamp_or(self.follow_rate, 1.0, 60.0, d.follow_rate),
            swipe_threshold: clamp_or(self.swipe_threshold, 2.0, 80.0, d.swipe_threshold),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PointerEvent {
    Wheel { delta_y: f32 },
    Down { x: f32, y: f32, t: f32 },
    Move { x: f32, y: f32, t: f32 },
    Up { t: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Swipe {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GesturePhase {
    Idle,
    Dragging,
    Flinging,
}

/* -----------------------------
   Per-frame input queue
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct QueuedEvent {
    pub(crate) section: usize,
    pub(crate) event: PointerEvent,
}

/// Pointer events collected between frames, tagged with the section that was
/// active when they arrived. Drained once per frame.
#[derive(Default)]
pub(crate) struct InputQueue {
    events: VecDeque<QueuedEvent>,
}

impl InputQueue {
    pub(crate) fn push(&mut self, section: usize, event: PointerEvent) {
        self.events.push_back(QueuedEvent { section, event });
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = QueuedEvent> + '_ {
        self.events.drain(..)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/* -----------------------------
   Controller
------------------------------ */

#[derive(Clone, Copy, Debug, Default)]
struct Gesture {
    start_x: f32,
    start_y: f32,
    last_y: f32,
    last_t: f32,
    velocity: f32,
    swiped: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct ScrollController {
    tuning: ScrollTuning,
    current: f32,
    target: f32,
    phase: GesturePhase,
    content_height: f32,
    visible_height: f32,
    gesture: Option<Gesture>,
}

impl ScrollController {
    pub(crate) fn new(tuning: ScrollTuning) -> Self {
        Self {
            tuning,
            current: 0.0,
            target: 0.0,
            phase: GesturePhase::Idle,
            content_height: 0.0,
            visible_height: 0.0,
            gesture: None,
        }
    }

    pub(crate) fn current(&self) -> f32 {
        self.current
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> f32 {
        self.target
    }

    pub(crate) fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// Offset the canvas is drawn at.
    pub(crate) fn drawn_offset(&self) -> i32 {
        self.current.round() as i32
    }

    pub(crate) fn content_height(&self) -> f32 {
        self.content_height
    }

    pub(crate) fn visible_height(&self) -> f32 {
        self.visible_height
    }

    pub(crate) fn max_scroll(&self) -> f32 {
        (self.content_height - self.visible_height + self.tuning.slack).max(0.0)
    }

    pub(crate) fn scrollable(&self) -> bool {
        self.content_height > self.visible_height
    }

    fn clamp(&self, v: f32) -> f32 {
        v.clamp(0.0, self.max_scroll())
    }

    /// Updates the extents and re-clamps both offsets.
    pub(crate) fn set_extent(&mut self, content_height: f32, visible_height: f32) {
        self.content_height = content_height.max(0.0);
        self.visible_height = visible_height.max(0.0);
        self.current = self.clamp(self.current);
        self.target = self.clamp(self.target);
    }

    pub(crate) fn reset(&mut self) {
        self.current = 0.0;
        self.target = 0.0;
        self.phase = GesturePhase::Idle;
        self.gesture = None;
    }

    /// Applies one pointer event. Returns a swipe at most once per gesture.
    pub(crate) fn handle(&mut self, ev: PointerEvent) -> Option<Swipe> {
        match ev {
            PointerEvent::Wheel { delta_y } => {
                self.target = self.clamp(self.target + delta_y * self.tuning.wheel_sensitivity);
                None
            }
            PointerEvent::Down { x, y, t } => {
                self.phase = GesturePhase::Dragging;
                self.target = self.current;
                self.gesture = Some(Gesture {
                    start_x: x,
                    start_y: y,
                    last_y: y,
                    last_t: t,
                    velocity: 0.0,
                    swiped: false,
                });
                None
            }
            PointerEvent::Move { x, y, t } => self.drag_to(x, y, t),
            PointerEvent::Up { t } => {
                self.release(t);
                None
            }
        }
    }

    fn drag_to(&mut self, x: f32, y: f32, t: f32) -> Option<Swipe> {
        if self.phase != GesturePhase::Dragging {
            return None;
        }
        let mut g = self.gesture?;
        let dx = x - g.start_x;
        let dy = y - g.start_y;
        let horizontal = dx.abs() > dy.abs();

        let mut swipe = None;
        if !g.swiped && horizontal && dx.abs() > self.tuning.swipe_threshold {
            g.swiped = true;
            swipe = Some(if dx < 0.0 { Swipe::Left } else { Swipe::Right });
        }

        // Horizontal-dominant movement never scrolls, so a swipe leaves the
        // offset where it was.
        if !g.swiped && !horizontal {
            let delta = g.last_y - y;
            let next = self.clamp(self.current + delta);
            self.current = next;
            self.target = next;
            let elapsed = t - g.last_t;
            if elapsed > 1e-4 {
                let v = delta / elapsed;
                g.velocity = g.velocity * 0.2 + v * 0.8;
            }
        }
        g.last_y = y;
        g.last_t = t;
        self.gesture = Some(g);
        swipe
    }

    fn release(&mut self, t: f32) {
        let Some(g) = self.gesture.take() else {
            return;
        };
        if self.phase != GesturePhase::Dragging {
            return;
        }
        let stale = t - g.last_t > 0.1;
        if !g.swiped && !stale && g.velocity.abs() > self.tuning.fling_threshold {
            self.target = self.clamp(self.current + g.velocity * self.tuning.fling_projection);
            self.phase = GesturePhase::Flinging;
        } else {
            self.phase = GesturePhase::Idle;
        }
    }

    /// Moves the drawn offset toward the target. Returns true when the
    /// whole-pixel offset changed.
    pub(crate) fn update(&mut self, dt: f32) -> bool {
        let before = self.drawn_offset();
        if self.phase != GesturePhase::Dragging {
            let a = smoothing(self.tuning.follow_rate, dt);
            self.current += (self.target - self.current) * a;
            if (self.target - self.current).abs() < 0.01 {
                self.current = self.target;
            }
            if self.phase == GesturePhase::Flinging && (self.target - self.current).abs() < 0.5 {
                self.phase = GesturePhase::Idle;
            }
        }
        self.current = self.clamp(self.current);
        self.drawn_offset() != before
    }
}
