//! Tracker and session configuration
//!
//! Both structs deserialize with defaults for any missing field, so a
//! partial JSON document (or `{}`) is a valid configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::TouchError;

/// Net displacement (points) below which a moved contact is measured as a tap
pub const DEFAULT_SHORT_STROKE_THRESHOLD: f64 = 40.0;

/// Both sides of the touched element must exceed this (points) for a
/// relative tap direction to be meaningful
pub const DEFAULT_MIN_TARGET_SIZE: f64 = 50.0;

/// Default enrolment window (4 hours)
pub const DEFAULT_ENROLMENT_WINDOW_SECS: u64 = 4 * 60 * 60;

/// Classification thresholds for the gesture tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub short_stroke_threshold: f64,
    pub min_target_size: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            short_stroke_threshold: DEFAULT_SHORT_STROKE_THRESHOLD,
            min_target_size: DEFAULT_MIN_TARGET_SIZE,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TouchError> {
        for (name, value) in [
            ("short_stroke_threshold", self.short_stroke_threshold),
            ("min_target_size", self.min_target_size),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TouchError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Session-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of the enrolment phase, in seconds from session start
    pub enrolment_window_secs: u64,
    pub tracker: TrackerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enrolment_window_secs: DEFAULT_ENROLMENT_WINDOW_SECS,
            tracker: TrackerConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, TouchError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TouchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), TouchError> {
        if self.enrolment_window_secs > i64::MAX as u64 / 1000 {
            return Err(TouchError::InvalidConfig(format!(
                "enrolment_window_secs out of range: {}",
                self.enrolment_window_secs
            )));
        }
        self.tracker.validate()
    }

    pub fn enrolment_window(&self) -> Duration {
        Duration::seconds(self.enrolment_window_secs.min(i64::MAX as u64 / 1000) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.enrolment_window_secs, 14_400);
        assert_eq!(config.tracker.short_stroke_threshold, 40.0);
        assert_eq!(config.tracker.min_target_size, 50.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = SessionConfig::from_json(r#"{"tracker": {"short_stroke_threshold": 25.0}}"#)
            .unwrap();
        assert_eq!(config.tracker.short_stroke_threshold, 25.0);
        assert_eq!(config.tracker.min_target_size, DEFAULT_MIN_TARGET_SIZE);
        assert_eq!(config.enrolment_window_secs, DEFAULT_ENROLMENT_WINDOW_SECS);
    }

    #[test]
    fn test_round_trip() {
        let config = SessionConfig {
            enrolment_window_secs: 900,
            tracker: TrackerConfig {
                short_stroke_threshold: 30.0,
                min_target_size: 44.0,
            },
        };
        let loaded = SessionConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.enrolment_window(), Duration::minutes(15));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let result = SessionConfig::from_json(r#"{"tracker": {"min_target_size": -1.0}}"#);
        assert!(matches!(result, Err(TouchError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            SessionConfig::from_json("not json"),
            Err(TouchError::JsonError(_))
        ));
    }
}
