//! Synheart Touch - On-device behavioral touch measurements
//!
//! Touch turns single-finger touch streams and periodic device-motion samples
//! into a typed, timestamped measurement log with running aggregates:
//! touch events → gesture tracking → tap/stroke classification → log.
//!
//! ## Modules
//!
//! - **Tracking**: [`tracker`] follows one contact and hands it to [`classifier`]
//! - **Log**: [`measurements`] stores measurements and folds them into [`stats`]
//! - **Sessions**: [`session`] runs the enrolment window over a tracker and log
//! - **Replay**: [`replay`] reads recorded `touch.sample.v1` streams

pub mod classifier;
pub mod config;
pub mod error;
pub mod geometry;
pub mod measurements;
pub mod replay;
pub mod sensors;
pub mod session;
pub mod stats;
pub mod stopwatch;
pub mod target;
pub mod tracker;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{SessionConfig, TrackerConfig};
pub use error::TouchError;
pub use geometry::{Point, Rect};
pub use measurements::{MeasurementListener, MeasurementLog};
pub use session::{SampleOutcome, Session, SessionPhase, SessionRecorder, SessionReport};
pub use tracker::{EventTime, GestureFailure, GestureState, GestureTracker, StrokePhase, Touch};
pub use types::{Direction, Measurement, MeasurementKind, MeasurementValue, MotionType};

// Replay exports
pub use replay::{SampleParser, TouchPhase, TouchSample, SAMPLE_SCHEMA_VERSION};

/// Library version
pub const TOUCH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "synheart-touch";
