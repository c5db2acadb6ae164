//! touch.sample.v1 schema for recorded touch streams
//!
//! One record per touch phase, as NDJSON (one record per line) or a JSON
//! array. Recorded streams let a session be replayed offline with the same
//! classification the device would have produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TouchError;
use crate::geometry::{Point, Rect};
use crate::stopwatch::Uptime;
use crate::tracker::{EventTime, Touch, TouchId};

/// Current sample schema version
pub const SAMPLE_SCHEMA_VERSION: &str = "touch.sample.v1";

/// Phase of a touch sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPhase {
    Begin,
    Move,
    End,
    Cancel,
}

/// Largest simultaneous touch count a sample may report
pub const MAX_TOUCH_COUNT: usize = 32;

fn default_touch_count() -> usize {
    1
}

/// One recorded touch phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub phase: TouchPhase,
    pub touch_id: TouchId,
    /// Location; may be omitted for cancel records
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Raw pressure, when the hardware reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<f64>,
    /// Maximum pressure the hardware can report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_force: Option<f64>,
    /// Major radius of the contact ellipse, in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_radius: Option<f64>,
    /// Monotonic event time (milliseconds since boot)
    pub uptime_ms: f64,
    /// Wall-clock event time
    pub timestamp: DateTime<Utc>,
    /// Number of touches the input system reported in this phase
    #[serde(default = "default_touch_count")]
    pub touch_count: usize,
    /// Frame of the element under the touch, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Rect>,
}

impl TouchSample {
    pub fn new(phase: TouchPhase, touch_id: TouchId, x: f64, y: f64, uptime_ms: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            phase,
            touch_id,
            x,
            y,
            force: None,
            max_force: None,
            major_radius: None,
            uptime_ms,
            timestamp,
            touch_count: 1,
            target: None,
        }
    }

    /// Check the record against the schema's value constraints
    pub fn validate(&self) -> Result<(), TouchError> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(TouchError::InvalidSample(format!(
                "location must be finite, got ({}, {})",
                self.x, self.y
            )));
        }

        if !self.uptime_ms.is_finite() || self.uptime_ms < 0.0 {
            return Err(TouchError::InvalidSample(format!(
                "uptime_ms must be a non-negative number, got {}",
                self.uptime_ms
            )));
        }

        for (name, value) in [
            ("force", self.force),
            ("max_force", self.max_force),
            ("major_radius", self.major_radius),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(TouchError::InvalidSample(format!(
                        "{} must be a non-negative number, got {}",
                        name, v
                    )));
                }
            }
        }

        if self.touch_count == 0 || self.touch_count > MAX_TOUCH_COUNT {
            return Err(TouchError::InvalidSample(format!(
                "touch_count must be between 1 and {}, got {}",
                MAX_TOUCH_COUNT, self.touch_count
            )));
        }

        if let Some(target) = &self.target {
            if !(target.width >= 0.0 && target.height >= 0.0) {
                return Err(TouchError::InvalidSample(
                    "target width and height must be non-negative".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn touch(&self) -> Touch {
        let mut touch = Touch::new(self.touch_id, self.location());
        if let Some(force) = self.force {
            touch = touch.with_force(force, self.max_force);
        }
        if let Some(radius) = self.major_radius {
            touch = touch.with_major_radius(radius);
        }
        touch
    }

    /// The reported touch set: this touch first, then placeholders for any
    /// additional simultaneous contacts
    pub fn touches(&self) -> Vec<Touch> {
        let primary = self.touch();
        let count = self.touch_count.clamp(1, MAX_TOUCH_COUNT);
        let mut touches = Vec::with_capacity(count);
        touches.push(primary);
        for extra in 1..count {
            let id = self.touch_id.wrapping_add(extra as TouchId);
            touches.push(Touch::new(id, primary.location));
        }
        touches
    }

    pub fn event_time(&self) -> EventTime {
        EventTime::new(Uptime::from_millis_f64(self.uptime_ms), self.timestamp)
    }
}

/// Parsers for recorded touch streams
pub struct SampleParser;

impl SampleParser {
    /// Parse newline-delimited JSON; blank lines are skipped
    pub fn parse_ndjson(input: &str) -> Result<Vec<TouchSample>, TouchError> {
        input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line.trim()).map_err(|e| {
                    TouchError::ParseError(format!("line {}: {}", index + 1, e))
                })
            })
            .collect()
    }

    /// Parse a JSON array of samples
    pub fn parse_array(input: &str) -> Result<Vec<TouchSample>, TouchError> {
        Ok(serde_json::from_str(input)?)
    }
}
