//! Monotonic interval timing
//!
//! Touch events carry an uptime stamp from the input system; the stopwatch
//! measures intervals on that timeline so wall-clock adjustments never
//! distort tap or stroke durations.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Process-wide origin for [`Uptime::now`]
static PROCESS_ORIGIN: OnceLock<Instant> = OnceLock::new();

/// A point on a monotonic timeline, stored as the offset from an arbitrary
/// fixed origin (device boot for input-system stamps, process start for
/// [`Uptime::now`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Uptime(Duration);

impl Uptime {
    pub fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// Build from fractional milliseconds; negative or NaN input clamps to
    /// zero and values past the `Duration` range saturate at `Duration::MAX`
    pub fn from_millis_f64(ms: f64) -> Self {
        if ms.is_nan() || ms <= 0.0 {
            return Self(Duration::ZERO);
        }
        Self(Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX))
    }

    /// Current uptime relative to the first call in this process
    pub fn now() -> Self {
        let origin = PROCESS_ORIGIN.get_or_init(Instant::now);
        Self(origin.elapsed())
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Elapsed time since `earlier`, saturating at zero
    pub fn saturating_since(&self, earlier: Uptime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Start/stop interval timer
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    start: Option<Uptime>,
    end: Option<Uptime>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start; restarting overwrites the previous start and
    /// discards any captured interval.
    pub fn start(&mut self, at: Uptime) {
        self.start = Some(at);
        self.end = None;
    }

    /// Record the end and return elapsed milliseconds, or `None` when the
    /// stopwatch was never started.
    pub fn stop(&mut self, at: Uptime) -> Option<f64> {
        self.start?;
        self.end = Some(at);
        self.milliseconds()
    }

    /// Forget both instants
    pub fn reset(&mut self) {
        self.start = None;
        self.end = None;
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    /// The captured interval, `None` until both start and stop happened
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end.saturating_since(start)),
            _ => None,
        }
    }

    pub fn milliseconds(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn microseconds(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_nanos() as f64 / 1_000.0)
    }

    pub fn nanoseconds(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_nanos() as f64)
    }
}
