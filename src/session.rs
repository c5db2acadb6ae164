//! Enrolment session
//!
//! A session owns one tracker and one measurement log. It starts in the
//! enrolment phase and flips to verification once the configured window has
//! elapsed, judged from the timestamps of the events it is fed. There is no
//! background timer; the caller's clock drives the transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::TouchError;
use crate::measurements::MeasurementLog;
use crate::replay::{TouchPhase, TouchSample};
use crate::sensors::{ActivitySample, TiltSample};
use crate::stats::AggregateSummary;
use crate::tracker::{GestureFailure, GestureState, GestureTracker};
use crate::types::Measurement;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Enrolment,
    Verification,
}

/// What a single touch sample did to the session
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    /// Measurements the sample produced and the log accepted
    pub recorded: Vec<Measurement>,
    /// Protocol violation, if the tracker rejected the sample
    pub failure: Option<GestureFailure>,
    /// Tracker state right after the sample, before recycling
    pub state: GestureState,
}

/// Serializable overview of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    pub measurement_count: usize,
    pub dropped_count: u64,
    pub summary: AggregateSummary,
}

#[derive(Debug)]
struct Window {
    phase: SessionPhase,
    started_at: DateTime<Utc>,
    dropped: u64,
}

/// Phase-gated recording handle shared by the touch path and sensor threads.
///
/// Clones share the session's log and enrolment window, so a handle taken
/// before [`Session::enroll`] keeps recording into the restarted window.
/// The window lock is held across the append; a log listener must not call
/// back into a recorder of the same session.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    session: Uuid,
    length: chrono::Duration,
    window: Arc<Mutex<Window>>,
    log: Arc<MeasurementLog>,
}

impl SessionRecorder {
    fn new(session: Uuid, length: chrono::Duration, now: DateTime<Utc>) -> Self {
        Self {
            session,
            length,
            window: Arc::new(Mutex::new(Window {
                phase: SessionPhase::Enrolment,
                started_at: now,
                dropped: 0,
            })),
            log: Arc::new(MeasurementLog::new()),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.lock().started_at
    }

    /// Measurements discarded because they arrived outside enrolment
    pub fn dropped_count(&self) -> u64 {
        self.lock().dropped
    }

    /// Read access to the session log
    pub fn log(&self) -> Arc<MeasurementLog> {
        Arc::clone(&self.log)
    }

    /// Advance the phase according to `now`
    pub fn observe(&self, now: DateTime<Utc>) -> SessionPhase {
        let mut window = self.lock();
        self.advance(&mut window, now)
    }

    /// Record a measurement if the session is enrolling; returns whether it was kept
    pub fn record(&self, measurement: Measurement) -> bool {
        let mut window = self.lock();
        match self.advance(&mut window, measurement.timestamp()) {
            SessionPhase::Enrolment => {
                self.log.append(measurement);
                true
            }
            SessionPhase::Verification => {
                window.dropped += 1;
                debug!(kind = %measurement.kind(), "measurement outside enrolment dropped");
                false
            }
        }
    }

    pub fn record_tilt(&self, sample: &TiltSample) -> Result<bool, TouchError> {
        let measurement = sample.to_measurement()?;
        Ok(self.record(measurement))
    }

    /// Record an activity sample; discarded samples return `false`
    pub fn record_activity(&self, sample: &ActivitySample) -> bool {
        match sample.to_measurement() {
            Some(measurement) => self.record(measurement),
            None => false,
        }
    }

    fn restart(&self, now: DateTime<Utc>) {
        let mut window = self.lock();
        self.log.clear();
        *window = Window {
            phase: SessionPhase::Enrolment,
            started_at: now,
            dropped: 0,
        };
    }

    fn advance(&self, window: &mut Window, now: DateTime<Utc>) -> SessionPhase {
        if window.phase == SessionPhase::Enrolment && now - window.started_at >= self.length {
            window.phase = SessionPhase::Verification;
            info!(
                session = %self.session,
                measurements = self.log.len(),
                "enrolment window elapsed, switching to verification"
            );
        }
        window.phase
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One enrolment/verification window over a tracker and its log
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    config: SessionConfig,
    tracker: GestureTracker,
    recorder: SessionRecorder,
}

impl Session {
    /// Start a session in the enrolment phase at `now`
    pub fn new(config: SessionConfig, now: DateTime<Utc>) -> Result<Self, TouchError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let session = Self {
            id,
            tracker: GestureTracker::new(config.tracker),
            recorder: SessionRecorder::new(id, config.enrolment_window(), now),
            config,
        };
        info!(session = %session.id, started_at = %now, "enrolment started");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.recorder.phase()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.recorder.started_at()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Shared handle to the log, for reading and installing a listener.
    /// Sensor sources record through [`recorder`](Self::recorder).
    pub fn log(&self) -> Arc<MeasurementLog> {
        self.recorder.log()
    }

    /// Phase-gated recording handle for sensor sources on other threads
    pub fn recorder(&self) -> SessionRecorder {
        self.recorder.clone()
    }

    pub fn tracker(&self) -> &GestureTracker {
        &self.tracker
    }

    /// Mutable tracker access, e.g. to install observers or a target lookup
    pub fn tracker_mut(&mut self) -> &mut GestureTracker {
        &mut self.tracker
    }

    /// Measurements discarded because they arrived outside enrolment
    pub fn dropped_count(&self) -> u64 {
        self.recorder.dropped_count()
    }

    /// Advance the phase according to `now`
    pub fn observe(&self, now: DateTime<Utc>) -> SessionPhase {
        self.recorder.observe(now)
    }

    /// Discard the log and begin a fresh enrolment window at `now`.
    ///
    /// The log is cleared in place, so its listener and every handed-out
    /// log or recorder handle stay attached.
    pub fn enroll(&mut self, now: DateTime<Utc>) {
        self.recorder.restart(now);
        self.tracker.reset();
        info!(session = %self.id, started_at = %now, "enrolment restarted");
    }

    /// Record a measurement if the session is enrolling; returns whether it was kept
    pub fn record(&self, measurement: Measurement) -> bool {
        self.recorder.record(measurement)
    }

    /// Feed one touch sample through the tracker.
    ///
    /// Terminal tracker states are recycled right away, the way a gesture
    /// framework resets its recognizer, so the next contact can be tracked.
    pub fn handle_sample(&mut self, sample: &TouchSample) -> Result<SampleOutcome, TouchError> {
        sample.validate()?;
        self.observe(sample.timestamp);

        let at = sample.event_time();
        let touches = sample.touches();

        let result = match sample.phase {
            TouchPhase::Begin => self.tracker.on_touch_begin(&touches, at).map(|_| Vec::new()),
            TouchPhase::Move => self.tracker.on_touch_move(&touches, at).map(|_| Vec::new()),
            TouchPhase::End => self.tracker.on_touch_end_at_target(&touches, at, sample.target),
            TouchPhase::Cancel => {
                self.tracker.on_touch_cancel(at);
                Ok(Vec::new())
            }
        };

        let state = self.tracker.state();
        let (measurements, failure) = match result {
            Ok(measurements) => (measurements, None),
            Err(failure) => (Vec::new(), Some(failure)),
        };

        let recorded = measurements
            .into_iter()
            .filter(|m| self.record(*m))
            .collect();

        if state.is_terminal() {
            self.tracker.reset();
        }

        Ok(SampleOutcome {
            recorded,
            failure,
            state,
        })
    }

    /// Replay a whole recorded stream; returns the number of measurements kept
    pub fn replay(&mut self, samples: &[TouchSample]) -> Result<usize, TouchError> {
        let mut kept = 0;
        for sample in samples {
            kept += self.handle_sample(sample)?.recorded.len();
        }
        Ok(kept)
    }

    pub fn record_tilt(&self, sample: &TiltSample) -> Result<bool, TouchError> {
        self.recorder.record_tilt(sample)
    }

    /// Record an activity sample; discarded samples return `false`
    pub fn record_activity(&self, sample: &ActivitySample) -> bool {
        self.recorder.record_activity(sample)
    }

    pub fn snapshot_json(&self) -> Result<String, TouchError> {
        self.recorder.log.snapshot_json()
    }

    pub fn report(&self) -> SessionReport {
        let window = self.recorder.lock();
        SessionReport {
            session_id: self.id,
            phase: window.phase,
            started_at: window.started_at,
            measurement_count: self.recorder.log.len(),
            dropped_count: window.dropped,
            summary: self.recorder.log.summary(),
        }
    }
}
