//! Stroke and tap classifiers
//!
//! Stateless functions that turn a completed contact (its endpoints, path and
//! durations) into measurements. Values that would not be finite are dropped
//! here so nothing downstream ever sees a NaN.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::geometry::{max_deviation_point, Point, Rect};
use crate::types::{Direction, Measurement, MeasurementKind};

/// Pressure reading of a touch, as reported by the input system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceReading {
    pub force: f64,
    /// Maximum force the hardware can report; `None` when unknown
    pub maximum_possible: Option<f64>,
}

impl ForceReading {
    /// Force normalized to the hardware maximum.
    ///
    /// Falls back to the raw force when the ratio is not a number.
    /// Returns `None` for zero force, which means "no pressure sensor".
    pub fn normalized(&self) -> Option<f64> {
        if self.force == 0.0 || !self.force.is_finite() {
            return None;
        }

        let ratio = match self.maximum_possible {
            Some(max) => self.force / max,
            None => f64::NAN,
        };

        if ratio.is_finite() {
            Some(ratio)
        } else {
            Some(self.force)
        }
    }
}

/// Everything known about the lifted touch of a tap
#[derive(Debug, Clone, Copy)]
pub struct TapContext {
    pub location: Point,
    pub force: Option<ForceReading>,
    pub major_radius: Option<f64>,
    /// Tap stopwatch reading in microseconds
    pub duration_us: Option<f64>,
    /// Frame of the element under the touch
    pub target: Option<Rect>,
    /// Both target sides must exceed this to emit a relative direction
    pub min_target_size: f64,
}

/// Everything known about a completed stroke
#[derive(Debug, Clone, Copy)]
pub struct StrokeContext<'a> {
    pub start: Point,
    pub end: Point,
    pub path: &'a [Point],
    /// Stroke stopwatch reading in milliseconds
    pub duration_ms: Option<f64>,
}

/// 8-point compass bucket of the displacement from `start` to `end`.
///
/// Total over all slopes: vertical motion (`±inf`) and coincident points
/// (`NaN`) land in the north/south buckets, decided by the x comparison.
pub fn classify_deflection(start: &Point, end: &Point) -> Direction {
    let slope = start.slope_to(end);
    let forward = start.x <= end.x;

    let (ahead, behind) = if slope.is_nan() {
        (Direction::South, Direction::North)
    } else if slope < -2.0 {
        (Direction::North, Direction::South)
    } else if slope < -0.5 {
        (Direction::Northeast, Direction::Southwest)
    } else if slope < 0.5 {
        (Direction::East, Direction::West)
    } else if slope < 2.0 {
        (Direction::Southeast, Direction::Northwest)
    } else {
        (Direction::South, Direction::North)
    };

    if forward {
        ahead
    } else {
        behind
    }
}

/// Side of the directed stroke line on which `point` deviates
pub fn classify_deviance_direction(start: &Point, end: &Point, point: &Point) -> Direction {
    if start.y == end.y {
        return Direction::None;
    }

    let cross = point.cross_with_segment(start, end);
    let upward = start.y > end.y;

    if cross < 0.0 {
        if upward {
            Direction::West
        } else {
            Direction::East
        }
    } else if cross > 0.0 {
        if upward {
            Direction::East
        } else {
            Direction::West
        }
    } else {
        Direction::None
    }
}

/// Compass direction from the touch to the centre of the touched element
pub fn classify_relative_tap_direction(touch: &Point, target: &Rect) -> Direction {
    let center = target.center();
    if touch == &center {
        return Direction::None;
    }
    classify_deflection(touch, &center)
}

/// Speed in points per millisecond; `None` without a usable duration
pub fn stroke_speed(distance: f64, duration_ms: Option<f64>) -> Option<f64> {
    match duration_ms {
        Some(ms) if ms > 0.0 && ms.is_finite() => Some(distance / ms),
        _ => None,
    }
}

fn push_numeric(out: &mut Vec<Measurement>, kind: MeasurementKind, value: f64, at: DateTime<Utc>) {
    match Measurement::numeric(kind, value, at) {
        Ok(m) => out.push(m),
        Err(e) => debug!(kind = %kind, value, error = %e, "dropping measurement"),
    }
}

fn push_direction(
    out: &mut Vec<Measurement>,
    kind: MeasurementKind,
    direction: Direction,
    at: DateTime<Utc>,
) {
    match Measurement::direction(kind, direction, at) {
        Ok(m) => out.push(m),
        Err(e) => debug!(kind = %kind, error = %e, "dropping measurement"),
    }
}

/// Measurements for a tap (or a stroke too short to count as one)
pub fn tap_measurements(tap: &TapContext, at: DateTime<Utc>) -> Vec<Measurement> {
    let mut out = Vec::with_capacity(4);

    if let Some(force) = tap.force.and_then(|f| f.normalized()) {
        push_numeric(&mut out, MeasurementKind::Force, force, at);
    }

    if let Some(radius) = tap.major_radius {
        push_numeric(&mut out, MeasurementKind::TouchRadius, radius, at);
    }

    if let Some(duration) = tap.duration_us {
        push_numeric(&mut out, MeasurementKind::TapDuration, duration, at);
    }

    if let Some(target) = tap.target {
        if target.width > tap.min_target_size && target.height > tap.min_target_size {
            let direction = classify_relative_tap_direction(&tap.location, &target);
            push_direction(&mut out, MeasurementKind::RelativeTapDevianceDirection, direction, at);
        }
    }

    out
}

/// Measurements for a genuine stroke
pub fn stroke_measurements(stroke: &StrokeContext<'_>, at: DateTime<Utc>) -> Vec<Measurement> {
    let mut out = Vec::with_capacity(5);
    let (start, end) = (&stroke.start, &stroke.end);

    let deflection = classify_deflection(start, end);
    push_direction(&mut out, MeasurementKind::Deflection, deflection, at);

    if let Some((point, deviance)) = max_deviation_point(stroke.path, start, end) {
        push_numeric(&mut out, MeasurementKind::LinearStrokeDeviance, deviance, at);
        let direction = classify_deviance_direction(start, end, &point);
        push_direction(&mut out, MeasurementKind::LinearStrokeDevianceDirection, direction, at);
    }

    let distance = start.distance_to(end);
    push_numeric(&mut out, MeasurementKind::StrokeDistance, distance, at);

    if let Some(speed) = stroke_speed(distance, stroke.duration_ms) {
        push_numeric(&mut out, MeasurementKind::StrokeSpeed, speed, at);
    }

    debug!(
        deflection = deflection.as_str(),
        distance,
        points = stroke.path.len(),
        "stroke classified"
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn kinds(measurements: &[Measurement]) -> Vec<MeasurementKind> {
        measurements.iter().map(|m| m.kind()).collect()
    }

    #[test]
    fn test_deflection_table() {
        let o = p(0.0, 0.0);
        let cases = [
            (p(10.0, -30.0), Direction::North),
            (p(10.0, -10.0), Direction::Northeast),
            (p(10.0, 0.0), Direction::East),
            (p(10.0, 10.0), Direction::Southeast),
            (p(10.0, 30.0), Direction::South),
            (p(-10.0, 30.0), Direction::South),
            (p(-10.0, 10.0), Direction::Southwest),
            (p(-10.0, 0.0), Direction::West),
            (p(-10.0, -10.0), Direction::Northwest),
            (p(-10.0, -30.0), Direction::North),
        ];

        for (end, expected) in cases {
            assert_eq!(classify_deflection(&o, &end), expected, "end = {:?}", end);
        }
    }

    #[test]
    fn test_deflection_bucket_boundaries() {
        let o = p(0.0, 0.0);
        // slope exactly -2, -0.5, 0.5, 2 falls into the upper bucket
        assert_eq!(classify_deflection(&o, &p(10.0, -20.0)), Direction::Northeast);
        assert_eq!(classify_deflection(&o, &p(10.0, -5.0)), Direction::East);
        assert_eq!(classify_deflection(&o, &p(10.0, 5.0)), Direction::Southeast);
        assert_eq!(classify_deflection(&o, &p(10.0, 20.0)), Direction::South);
    }

    #[test]
    fn test_deflection_is_total_for_vertical_motion() {
        let o = p(5.0, 5.0);
        // +inf: start.x <= end.x
        assert_eq!(classify_deflection(&o, &p(5.0, 50.0)), Direction::South);
        // -inf is below -2
        assert_eq!(classify_deflection(&o, &p(5.0, -50.0)), Direction::North);
        // NaN, resolved like the steep buckets
        assert_eq!(classify_deflection(&o, &o), Direction::South);
    }

    #[test]
    fn test_deflection_translation_invariant() {
        let pairs = [(p(0.0, 0.0), p(40.0, 60.0)), (p(10.0, 10.0), p(-30.0, 5.0))];
        for (a, b) in pairs {
            let base = classify_deflection(&a, &b);
            for (dx, dy) in [(100.0, 0.0), (-250.0, 75.0), (0.0, -1000.0)] {
                let ta = p(a.x + dx, a.y + dy);
                let tb = p(b.x + dx, b.y + dy);
                assert_eq!(classify_deflection(&ta, &tb), base);
            }
        }
    }

    #[test]
    fn test_deviance_direction() {
        // downward stroke
        let start = p(0.0, 0.0);
        let end = p(0.0, 100.0);
        assert_eq!(classify_deviance_direction(&start, &end, &p(10.0, 50.0)), Direction::East);
        assert_eq!(classify_deviance_direction(&start, &end, &p(-10.0, 50.0)), Direction::West);

        // upward stroke
        let end_up = p(0.0, -100.0);
        assert_eq!(classify_deviance_direction(&start, &end_up, &p(10.0, -50.0)), Direction::East);
        assert_eq!(classify_deviance_direction(&start, &end_up, &p(-10.0, -50.0)), Direction::West);
    }

    #[test]
    fn test_deviance_direction_none_cases() {
        let start = p(0.0, 0.0);
        assert_eq!(
            classify_deviance_direction(&start, &p(100.0, 0.0), &p(50.0, 20.0)),
            Direction::None
        );
        assert_eq!(
            classify_deviance_direction(&start, &p(100.0, 100.0), &p(50.0, 50.0)),
            Direction::None
        );
    }

    #[test]
    fn test_force_normalization() {
        let reading = ForceReading { force: 2.0, maximum_possible: Some(8.0) };
        assert_eq!(reading.normalized(), Some(0.25));

        let no_max = ForceReading { force: 2.0, maximum_possible: Some(0.0) };
        assert_eq!(no_max.normalized(), Some(2.0));

        let unknown = ForceReading { force: 1.5, maximum_possible: None };
        assert_eq!(unknown.normalized(), Some(1.5));

        let zero = ForceReading { force: 0.0, maximum_possible: Some(6.0) };
        assert_eq!(zero.normalized(), None);
    }

    #[test]
    fn test_stroke_speed_requires_positive_duration() {
        assert_eq!(stroke_speed(100.0, Some(50.0)), Some(2.0));
        assert_eq!(stroke_speed(100.0, Some(0.0)), None);
        assert_eq!(stroke_speed(100.0, None), None);
    }

    #[test]
    fn test_tap_measurements_full_set() {
        let tap = TapContext {
            location: p(20.0, 20.0),
            force: Some(ForceReading { force: 1.0, maximum_possible: Some(4.0) }),
            major_radius: Some(12.5),
            duration_us: Some(95_000.0),
            target: Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
            min_target_size: 50.0,
        };

        let out = tap_measurements(&tap, at());
        assert_eq!(
            kinds(&out),
            vec![
                MeasurementKind::Force,
                MeasurementKind::TouchRadius,
                MeasurementKind::TapDuration,
                MeasurementKind::RelativeTapDevianceDirection,
            ]
        );
        assert_eq!(out[3].value().to_string(), "southeast");
    }

    #[test]
    fn test_tap_measurements_small_target_and_missing_data() {
        let tap = TapContext {
            location: p(20.0, 20.0),
            force: None,
            major_radius: None,
            duration_us: Some(80_000.0),
            target: Some(Rect::new(0.0, 0.0, 100.0, 50.0)),
            min_target_size: 50.0,
        };

        let out = tap_measurements(&tap, at());
        assert_eq!(kinds(&out), vec![MeasurementKind::TapDuration]);
    }

    #[test]
    fn test_stroke_measurements_straight_diagonal() {
        let path = [p(0.0, 0.0), p(50.0, 50.0), p(100.0, 100.0)];
        let stroke = StrokeContext {
            start: p(0.0, 0.0),
            end: p(100.0, 100.0),
            path: &path,
            duration_ms: Some(200.0),
        };

        let out = stroke_measurements(&stroke, at());
        assert_eq!(
            kinds(&out),
            vec![
                MeasurementKind::Deflection,
                MeasurementKind::LinearStrokeDeviance,
                MeasurementKind::LinearStrokeDevianceDirection,
                MeasurementKind::StrokeDistance,
                MeasurementKind::StrokeSpeed,
            ]
        );
        assert_eq!(out[0].value().to_string(), "southeast");
        assert!(out[1].value().as_f64().unwrap().abs() < 1e-9);
        assert_eq!(out[2].value().to_string(), "none");
        assert!((out[3].value().as_f64().unwrap() - 141.421356).abs() < 1e-5);
        assert!((out[4].value().as_f64().unwrap() - 0.707106).abs() < 1e-5);
    }

    #[test]
    fn test_stroke_without_duration_omits_speed() {
        let path = [p(0.0, 0.0), p(60.0, 8.0), p(120.0, 0.0)];
        let stroke = StrokeContext {
            start: p(0.0, 0.0),
            end: p(120.0, 0.0),
            path: &path,
            duration_ms: None,
        };

        let out = stroke_measurements(&stroke, at());
        assert!(!kinds(&out).contains(&MeasurementKind::StrokeSpeed));
        assert!((out[1].value().as_f64().unwrap() - 8.0).abs() < 1e-9);
    }
}
