//! Measurement data types
//!
//! A measurement is one tagged value: its kind fixes whether the payload is
//! numeric or categorical, so routing into aggregators is a match on the tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TouchError;

/// Every kind of measurement the engine produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MeasurementKind {
    // Numeric
    Force,
    TouchRadius,
    Tilt,
    LinearStrokeDeviance,
    StrokeSpeed,
    TapDuration,
    StrokeDistance,

    // Categorical
    Deflection,
    LinearStrokeDevianceDirection,
    RelativeTapDevianceDirection,
    Motion,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 11] = [
        MeasurementKind::Force,
        MeasurementKind::TouchRadius,
        MeasurementKind::Tilt,
        MeasurementKind::LinearStrokeDeviance,
        MeasurementKind::StrokeSpeed,
        MeasurementKind::TapDuration,
        MeasurementKind::StrokeDistance,
        MeasurementKind::Deflection,
        MeasurementKind::LinearStrokeDevianceDirection,
        MeasurementKind::RelativeTapDevianceDirection,
        MeasurementKind::Motion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Force => "Force",
            MeasurementKind::TouchRadius => "TouchRadius",
            MeasurementKind::Tilt => "Tilt",
            MeasurementKind::LinearStrokeDeviance => "LinearStrokeDeviance",
            MeasurementKind::StrokeSpeed => "StrokeSpeed",
            MeasurementKind::TapDuration => "TapDuration",
            MeasurementKind::StrokeDistance => "StrokeDistance",
            MeasurementKind::Deflection => "Deflection",
            MeasurementKind::LinearStrokeDevianceDirection => "LinearStrokeDevianceDirection",
            MeasurementKind::RelativeTapDevianceDirection => "RelativeTapDevianceDirection",
            MeasurementKind::Motion => "Motion",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            MeasurementKind::Force
                | MeasurementKind::TouchRadius
                | MeasurementKind::Tilt
                | MeasurementKind::LinearStrokeDeviance
                | MeasurementKind::StrokeSpeed
                | MeasurementKind::TapDuration
                | MeasurementKind::StrokeDistance
        )
    }

    /// Unit of a numeric kind, `None` for categorical kinds
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            MeasurementKind::Force => Some("normalized"),
            MeasurementKind::TouchRadius => Some("points"),
            MeasurementKind::Tilt => Some("radians"),
            MeasurementKind::LinearStrokeDeviance => Some("points"),
            MeasurementKind::StrokeSpeed => Some("points_per_ms"),
            MeasurementKind::TapDuration => Some("microseconds"),
            MeasurementKind::StrokeDistance => Some("points"),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementKind {
    type Err = TouchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeasurementKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TouchError::UnknownKind(s.to_string()))
    }
}

/// Compass direction on a y-down surface (north is up the screen)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    North,
    Northeast,
    None,
}

impl Direction {
    pub const ALL: [Direction; 9] = [
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
        Direction::North,
        Direction::Northeast,
        Direction::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::East => "east",
            Direction::Southeast => "southeast",
            Direction::South => "south",
            Direction::Southwest => "southwest",
            Direction::West => "west",
            Direction::Northwest => "northwest",
            Direction::North => "north",
            Direction::Northeast => "northeast",
            Direction::None => "none",
        }
    }
}

/// Ambulatory state derived from activity samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    Stationary,
    NotStationary,
    InMotion,
}

impl MotionType {
    pub const ALL: [MotionType; 3] = [
        MotionType::Stationary,
        MotionType::NotStationary,
        MotionType::InMotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionType::Stationary => "stationary",
            MotionType::NotStationary => "not_stationary",
            MotionType::InMotion => "in_motion",
        }
    }
}

/// Payload of a categorical measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Direction(Direction),
    Motion(MotionType),
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Direction(direction) => direction.as_str(),
            Category::Motion(motion) => motion.as_str(),
        }
    }
}

/// Value carried by a measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Numeric(f64),
    Category(Category),
}

impl MeasurementValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasurementValue::Numeric(v) => Some(*v),
            MeasurementValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<Category> {
        match self {
            MeasurementValue::Numeric(_) => None,
            MeasurementValue::Category(c) => Some(*c),
        }
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64 Display is the shortest representation that round-trips
            MeasurementValue::Numeric(v) => write!(f, "{}", v),
            MeasurementValue::Category(c) => f.write_str(c.label()),
        }
    }
}

/// An immutable, timestamped measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    kind: MeasurementKind,
    value: MeasurementValue,
    timestamp: DateTime<Utc>,
}

impl Measurement {
    /// Build a numeric measurement; rejects categorical kinds and non-finite values
    pub fn numeric(
        kind: MeasurementKind,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, TouchError> {
        if !kind.is_numeric() {
            return Err(TouchError::KindMismatch {
                kind: kind.to_string(),
                expected: "categorical",
            });
        }
        if !value.is_finite() {
            return Err(TouchError::NonFiniteValue {
                kind: kind.to_string(),
            });
        }

        Ok(Self {
            kind,
            value: MeasurementValue::Numeric(value),
            timestamp,
        })
    }

    /// Build a categorical measurement; the category family must match the kind
    pub fn categorical(
        kind: MeasurementKind,
        category: Category,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, TouchError> {
        let matches = match (kind, category) {
            (MeasurementKind::Motion, Category::Motion(_)) => true,
            (
                MeasurementKind::Deflection
                | MeasurementKind::LinearStrokeDevianceDirection
                | MeasurementKind::RelativeTapDevianceDirection,
                Category::Direction(_),
            ) => true,
            _ => false,
        };

        if !matches {
            let expected = if kind.is_numeric() {
                "numeric"
            } else if kind == MeasurementKind::Motion {
                "motion"
            } else {
                "direction"
            };
            return Err(TouchError::KindMismatch {
                kind: kind.to_string(),
                expected,
            });
        }

        Ok(Self {
            kind,
            value: MeasurementValue::Category(category),
            timestamp,
        })
    }

    pub fn direction(
        kind: MeasurementKind,
        direction: Direction,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, TouchError> {
        Self::categorical(kind, Category::Direction(direction), timestamp)
    }

    pub fn motion(motion: MotionType, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: MeasurementKind::Motion,
            value: MeasurementValue::Category(Category::Motion(motion)),
            timestamp,
        }
    }

    pub fn kind(&self) -> MeasurementKind {
        self.kind
    }

    pub fn value(&self) -> MeasurementValue {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Stringified export form of this measurement
    pub fn to_record(&self) -> SnapshotRecord {
        SnapshotRecord {
            kind: self.kind.as_str().to_string(),
            value: self.value.to_string(),
            timestamp: self.timestamp,
        }
    }
}

/// One exported log entry: kind name, stringified value, capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub kind: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

impl SnapshotRecord {
    /// Re-create the typed measurement this record was exported from
    pub fn to_measurement(&self) -> Result<Measurement, TouchError> {
        let kind: MeasurementKind = self.kind.parse()?;

        if kind.is_numeric() {
            let value: f64 = self.value.parse().map_err(|_| {
                TouchError::ParseError(format!("Invalid {} value: {:?}", kind, self.value))
            })?;
            return Measurement::numeric(kind, value, self.timestamp);
        }

        let category = if kind == MeasurementKind::Motion {
            MotionType::ALL
                .iter()
                .find(|m| m.as_str() == self.value)
                .map(|m| Category::Motion(*m))
        } else {
            Direction::ALL
                .iter()
                .find(|d| d.as_str() == self.value)
                .map(|d| Category::Direction(*d))
        };

        let category = category.ok_or_else(|| {
            TouchError::ParseError(format!("Invalid {} label: {:?}", kind, self.value))
        })?;

        Measurement::categorical(kind, category, self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_kind_names_parse_back() {
        for kind in MeasurementKind::ALL {
            assert_eq!(kind.as_str().parse::<MeasurementKind>().unwrap(), kind);
        }
        assert!("Pressure".parse::<MeasurementKind>().is_err());
    }

    #[test]
    fn test_numeric_rejects_categorical_kind() {
        let result = Measurement::numeric(MeasurementKind::Deflection, 1.0, at());
        assert!(matches!(result, Err(TouchError::KindMismatch { .. })));
    }

    #[test]
    fn test_numeric_rejects_non_finite() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = Measurement::numeric(MeasurementKind::StrokeSpeed, value, at());
            assert!(matches!(result, Err(TouchError::NonFiniteValue { .. })));
        }
    }

    #[test]
    fn test_categorical_family_must_match_kind() {
        assert!(Measurement::categorical(
            MeasurementKind::Motion,
            Category::Direction(Direction::East),
            at()
        )
        .is_err());
        assert!(Measurement::direction(MeasurementKind::Force, Direction::East, at()).is_err());
        assert!(Measurement::direction(MeasurementKind::Deflection, Direction::East, at()).is_ok());
    }

    #[test]
    fn test_value_display() {
        let m = Measurement::numeric(MeasurementKind::Force, 0.25, at()).unwrap();
        assert_eq!(m.value().to_string(), "0.25");

        let m = Measurement::motion(MotionType::NotStationary, at());
        assert_eq!(m.value().to_string(), "not_stationary");
    }

    #[test]
    fn test_record_reparses_to_same_measurement() {
        let measurements = [
            Measurement::numeric(MeasurementKind::StrokeSpeed, 0.1 + 0.2, at()).unwrap(),
            Measurement::direction(MeasurementKind::Deflection, Direction::Southwest, at()).unwrap(),
            Measurement::motion(MotionType::InMotion, at()),
        ];

        for m in measurements {
            assert_eq!(m.to_record().to_measurement().unwrap(), m);
        }
    }

    #[test]
    fn test_record_with_bad_label_fails() {
        let record = SnapshotRecord {
            kind: "Deflection".to_string(),
            value: "up".to_string(),
            timestamp: at(),
        };
        assert!(record.to_measurement().is_err());
    }
}
