//! Single-touch gesture state machine
//!
//! The tracker follows one contact from begin to end (or cancel), records its
//! path and timing, and on lift hands the contact to the classifiers. Only the
//! first touch is tracked; concurrent touches are rejected.
//!
//! A tracker that reached a terminal state (`Failed`, `Ended`, `Cancelled`)
//! stays there until [`GestureTracker::reset`] recycles it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::classifier::{self, ForceReading, StrokeContext, TapContext};
use crate::config::TrackerConfig;
use crate::geometry::{Point, Rect};
use crate::stopwatch::{Stopwatch, Uptime};
use crate::target::TargetLookup;
use crate::types::Measurement;

/// Identifier the input system assigns to a contact
pub type TouchId = u64;

/// One contact as reported with a touch phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub id: TouchId,
    pub location: Point,
    pub force: Option<ForceReading>,
    pub major_radius: Option<f64>,
}

impl Touch {
    pub fn new(id: TouchId, location: Point) -> Self {
        Self {
            id,
            location,
            force: None,
            major_radius: None,
        }
    }

    pub fn with_force(mut self, force: f64, maximum_possible: Option<f64>) -> Self {
        self.force = Some(ForceReading {
            force,
            maximum_possible,
        });
        self
    }

    pub fn with_major_radius(mut self, radius: f64) -> Self {
        self.major_radius = Some(radius);
        self
    }
}

/// When a touch phase happened: monotonic for durations, wall clock for
/// measurement timestamps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTime {
    pub uptime: Uptime,
    pub timestamp: DateTime<Utc>,
}

impl EventTime {
    pub fn new(uptime: Uptime, timestamp: DateTime<Utc>) -> Self {
        Self { uptime, timestamp }
    }

    pub fn now() -> Self {
        Self {
            uptime: Uptime::now(),
            timestamp: Utc::now(),
        }
    }
}

/// Progress of the current stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokePhase {
    NotStarted,
    InitialPoint,
    Moved,
}

/// Recognizer-level state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    Possible,
    Failed,
    Ended,
    Cancelled,
}

impl GestureState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GestureState::Possible)
    }
}

/// Protocol violation reported by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GestureFailure {
    #[error("{0} simultaneous touches; only single-touch gestures are tracked")]
    MultipleTouches(usize),

    #[error("touch {0} is not the tracked touch")]
    UntrackedTouch(TouchId),

    #[error("touch phase reported without any touch")]
    NoTouch,

    #[error("no touch is being tracked")]
    NotTracking,

    #[error("tracker is {0:?} and must be reset first")]
    AwaitingReset(GestureState),
}

type GestureEndedFn = Box<dyn FnMut(&[Point]) + Send>;
type FingerMovedFn = Box<dyn FnMut(Point, Point) + Send>;

/// Touch-event state machine producing measurements on stroke completion
pub struct GestureTracker {
    config: TrackerConfig,
    state: GestureState,
    phase: StrokePhase,
    tracked: Option<TouchId>,
    initial_point: Point,
    path: Vec<Point>,
    tap_watch: Stopwatch,
    stroke_watch: Stopwatch,
    target_lookup: Option<Box<dyn TargetLookup>>,
    on_gesture_ended: Option<GestureEndedFn>,
    on_finger_moved: Option<FingerMovedFn>,
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl std::fmt::Debug for GestureTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureTracker")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("tracked", &self.tracked)
            .field("initial_point", &self.initial_point)
            .field("path_len", &self.path.len())
            .finish()
    }
}

impl GestureTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: GestureState::Possible,
            phase: StrokePhase::NotStarted,
            tracked: None,
            initial_point: Point::ORIGIN,
            path: Vec::new(),
            tap_watch: Stopwatch::new(),
            stroke_watch: Stopwatch::new(),
            target_lookup: None,
            on_gesture_ended: None,
            on_finger_moved: None,
        }
    }

    /// Install the lookup used for relative tap directions
    pub fn set_target_lookup(&mut self, lookup: impl TargetLookup + 'static) {
        self.target_lookup = Some(Box::new(lookup));
    }

    /// Called with the recorded path whenever a contact ends or is cancelled
    pub fn set_on_gesture_ended(&mut self, f: impl FnMut(&[Point]) + Send + 'static) {
        self.on_gesture_ended = Some(Box::new(f));
    }

    /// Called with `(start, end)` when a moved contact lifts
    pub fn set_on_finger_moved(&mut self, f: impl FnMut(Point, Point) + Send + 'static) {
        self.on_finger_moved = Some(Box::new(f));
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn phase(&self) -> StrokePhase {
        self.phase
    }

    pub fn tracked_touch(&self) -> Option<TouchId> {
        self.tracked
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    pub fn on_touch_begin(&mut self, touches: &[Touch], at: EventTime) -> Result<(), GestureFailure> {
        self.ensure_active()?;

        if touches.len() > 1 {
            return Err(self.fail(GestureFailure::MultipleTouches(touches.len())));
        }
        let touch = touches.first().ok_or(GestureFailure::NoTouch)?;

        if let Some(tracked) = self.tracked {
            trace!(tracked, ignored = touch.id, "ignoring additional touch");
            return Ok(());
        }

        self.tracked = Some(touch.id);
        self.phase = StrokePhase::InitialPoint;
        self.initial_point = touch.location;
        self.path.clear();
        self.path.push(touch.location);
        self.tap_watch.start(at.uptime);
        self.stroke_watch.start(at.uptime);

        trace!(touch = touch.id, x = touch.location.x, y = touch.location.y, "touch began");
        Ok(())
    }

    pub fn on_touch_move(&mut self, touches: &[Touch], _at: EventTime) -> Result<(), GestureFailure> {
        self.ensure_active()?;
        let touch = self.tracked_in(touches)?;

        if self.phase == StrokePhase::InitialPoint {
            self.phase = StrokePhase::Moved;
        }
        self.path.push(touch.location);

        Ok(())
    }

    /// Finish the contact and return the measurements it produced
    pub fn on_touch_end(
        &mut self,
        touches: &[Touch],
        at: EventTime,
    ) -> Result<Vec<Measurement>, GestureFailure> {
        self.on_touch_end_at_target(touches, at, None)
    }

    /// Like [`on_touch_end`](Self::on_touch_end), with the touched element's
    /// frame already known (recorded streams carry it). `None` falls back to
    /// the installed lookup.
    pub fn on_touch_end_at_target(
        &mut self,
        touches: &[Touch],
        at: EventTime,
        target: Option<Rect>,
    ) -> Result<Vec<Measurement>, GestureFailure> {
        self.ensure_active()?;

        self.tap_watch.stop(at.uptime);
        let stroke_ms = self.stroke_watch.stop(at.uptime);
        let tap_us = self.tap_watch.microseconds();

        let touch = self.tracked_in(touches)?;
        let end_point = touch.location;

        let measurements = match self.phase {
            StrokePhase::InitialPoint => {
                debug!(touch = touch.id, "tap ended");
                self.tap(&touch, tap_us, target, at.timestamp)
            }
            StrokePhase::Moved => {
                let distance = self.initial_point.distance_to(&end_point);
                if distance < self.config.short_stroke_threshold {
                    debug!(touch = touch.id, distance, "short stroke measured as tap");
                    self.tap(&touch, tap_us, target, at.timestamp)
                } else {
                    if let Some(f) = self.on_finger_moved.as_mut() {
                        f(self.initial_point, end_point);
                    }

                    let stroke = StrokeContext {
                        start: self.initial_point,
                        end: end_point,
                        path: &self.path,
                        duration_ms: stroke_ms,
                    };
                    classifier::stroke_measurements(&stroke, at.timestamp)
                }
            }
            StrokePhase::NotStarted => Vec::new(),
        };

        self.notify_ended();
        self.path.clear();
        self.state = GestureState::Ended;

        Ok(measurements)
    }

    /// Abort the contact; no measurements are produced
    pub fn on_touch_cancel(&mut self, _at: EventTime) {
        debug!(tracked = ?self.tracked, "gesture cancelled");
        self.notify_ended();
        self.clear_stroke();
        self.state = GestureState::Cancelled;
    }

    /// Return to the idle state so the next contact can be tracked
    pub fn reset(&mut self) {
        self.clear_stroke();
        self.state = GestureState::Possible;
    }

    fn clear_stroke(&mut self) {
        self.initial_point = Point::ORIGIN;
        self.phase = StrokePhase::NotStarted;
        self.tracked = None;
        self.path.clear();
        self.tap_watch.reset();
        self.stroke_watch.reset();
    }

    fn ensure_active(&self) -> Result<(), GestureFailure> {
        if self.state.is_terminal() {
            return Err(GestureFailure::AwaitingReset(self.state));
        }
        Ok(())
    }

    fn tracked_in(&mut self, touches: &[Touch]) -> Result<Touch, GestureFailure> {
        let Some(tracked) = self.tracked else {
            return Err(self.fail(GestureFailure::NotTracking));
        };

        match touches.first() {
            Some(touch) if touch.id == tracked => Ok(*touch),
            Some(touch) => Err(self.fail(GestureFailure::UntrackedTouch(touch.id))),
            None => Err(self.fail(GestureFailure::NoTouch)),
        }
    }

    fn fail(&mut self, failure: GestureFailure) -> GestureFailure {
        debug!(%failure, "gesture failed");
        self.state = GestureState::Failed;
        failure
    }

    fn tap(
        &self,
        touch: &Touch,
        duration_us: Option<f64>,
        target: Option<Rect>,
        at: DateTime<Utc>,
    ) -> Vec<Measurement> {
        let target = target.or_else(|| {
            self.target_lookup
                .as_ref()
                .and_then(|lookup| lookup.target_frame(&touch.location))
        });

        let tap = TapContext {
            location: touch.location,
            force: touch.force,
            major_radius: touch.major_radius,
            duration_us,
            target,
            min_target_size: self.config.min_target_size,
        };
        classifier::tap_measurements(&tap, at)
    }

    fn notify_ended(&mut self) {
        if let Some(f) = self.on_gesture_ended.as_mut() {
            f(&self.path);
        }
    }
}
