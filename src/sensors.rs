//! Periodic device-motion and activity samples
//!
//! Sensor sources run on their own timer and hand samples in here; this
//! module only turns them into `Tilt` and `Motion` measurements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TouchError;
use crate::types::{Measurement, MeasurementKind, MotionType};

/// Device tilt reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltSample {
    /// Angle of the screen plane from horizontal, in radians
    pub angle_rad: f64,
    pub timestamp: DateTime<Utc>,
}

impl TiltSample {
    /// Derive tilt from a gravity (or low-passed acceleration) vector in
    /// device coordinates, z pointing out of the screen.
    ///
    /// Returns `None` for a zero or non-finite vector.
    pub fn from_gravity(x: f64, y: f64, z: f64, timestamp: DateTime<Utc>) -> Option<Self> {
        let magnitude = (x * x + y * y + z * z).sqrt();
        if !magnitude.is_finite() || magnitude == 0.0 {
            return None;
        }

        Some(Self {
            angle_rad: x.hypot(y).atan2(z.abs()),
            timestamp,
        })
    }

    pub fn to_measurement(&self) -> Result<Measurement, TouchError> {
        Measurement::numeric(MeasurementKind::Tilt, self.angle_rad, self.timestamp)
    }
}

/// Classifier confidence reported with an activity sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityConfidence {
    Low,
    Medium,
    High,
}

/// Activity classification from the platform's motion coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivitySample {
    #[serde(default)]
    pub stationary: bool,
    #[serde(default)]
    pub walking: bool,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub automotive: bool,
    #[serde(default)]
    pub cycling: bool,
    #[serde(default)]
    pub unknown: bool,
    pub confidence: ActivityConfidence,
    pub timestamp: DateTime<Utc>,
}

impl ActivitySample {
    /// Map the sample to a motion state.
    ///
    /// Low-confidence and unknown samples are discarded. Self-propelled
    /// activities win over automotive, which wins over stationary.
    pub fn motion_type(&self) -> Option<MotionType> {
        if self.unknown || self.confidence == ActivityConfidence::Low {
            return None;
        }

        if self.walking || self.running || self.cycling {
            Some(MotionType::InMotion)
        } else if self.automotive {
            Some(MotionType::NotStationary)
        } else if self.stationary {
            Some(MotionType::Stationary)
        } else {
            None
        }
    }

    pub fn to_measurement(&self) -> Option<Measurement> {
        let motion = self.motion_type();
        if motion.is_none() {
            debug!(confidence = ?self.confidence, unknown = self.unknown, "activity sample discarded");
        }
        motion.map(|m| Measurement::motion(m, self.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::f64::consts::FRAC_PI_2;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn activity(confidence: ActivityConfidence) -> ActivitySample {
        ActivitySample {
            stationary: false,
            walking: false,
            running: false,
            automotive: false,
            cycling: false,
            unknown: false,
            confidence,
            timestamp: at(),
        }
    }

    #[test]
    fn test_tilt_from_gravity() {
        let flat = TiltSample::from_gravity(0.0, 0.0, -1.0, at()).unwrap();
        assert!(flat.angle_rad.abs() < 1e-12);

        let upright = TiltSample::from_gravity(0.0, -1.0, 0.0, at()).unwrap();
        assert!((upright.angle_rad - FRAC_PI_2).abs() < 1e-12);

        assert!(TiltSample::from_gravity(0.0, 0.0, 0.0, at()).is_none());
    }

    #[test]
    fn test_tilt_measurement() {
        let sample = TiltSample { angle_rad: 0.7, timestamp: at() };
        let m = sample.to_measurement().unwrap();
        assert_eq!(m.kind(), MeasurementKind::Tilt);
        assert_eq!(m.value().as_f64(), Some(0.7));

        let bad = TiltSample { angle_rad: f64::NAN, timestamp: at() };
        assert!(bad.to_measurement().is_err());
    }

    #[test]
    fn test_activity_mapping() {
        let mut walking = activity(ActivityConfidence::High);
        walking.walking = true;
        walking.stationary = true;
        assert_eq!(walking.motion_type(), Some(MotionType::InMotion));

        let mut driving = activity(ActivityConfidence::Medium);
        driving.automotive = true;
        driving.stationary = true;
        assert_eq!(driving.motion_type(), Some(MotionType::NotStationary));

        let mut still = activity(ActivityConfidence::High);
        still.stationary = true;
        assert_eq!(still.motion_type(), Some(MotionType::Stationary));
    }

    #[test]
    fn test_low_confidence_and_unknown_discarded() {
        let mut low = activity(ActivityConfidence::Low);
        low.running = true;
        assert!(low.to_measurement().is_none());

        let mut unknown = activity(ActivityConfidence::High);
        unknown.unknown = true;
        unknown.walking = true;
        assert!(unknown.to_measurement().is_none());

        assert!(activity(ActivityConfidence::High).motion_type().is_none());
    }
}
