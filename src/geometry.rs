//! Planar geometry helpers for stroke analysis
//!
//! All functions are pure. Coordinates live in the surface space of the
//! delivering view (y grows downwards, as on touch screens).

use serde::{Deserialize, Serialize};

/// A location on the touch surface
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin, used as the idle initial point of a tracker
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Slope of the line from `self` to `to`.
    ///
    /// Vertical motion yields `±inf`, coincident points yield `NaN`; callers
    /// decide how to bucket those.
    pub fn slope_to(&self, to: &Point) -> f64 {
        (to.y - self.y) / (to.x - self.x)
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Distance to the segment `[start, end]`, projecting onto the segment
    /// with the projection parameter clamped to `[0, 1]`.
    ///
    /// A zero-length segment degenerates to the distance to `start`.
    pub fn distance_to_segment(&self, start: &Point, end: &Point) -> f64 {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let length_sq = dx * dx + dy * dy;

        if length_sq == 0.0 {
            return self.distance_to(start);
        }

        let t = (((self.x - start.x) * dx + (self.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
        let projection = Point::new(start.x + t * dx, start.y + t * dy);

        self.distance_to(&projection)
    }

    /// Cross product of `(end - start)` and `(self - start)`.
    ///
    /// The sign tells which side of the directed line `self` lies on; zero
    /// means the point is on the line.
    pub fn cross_with_segment(&self, start: &Point, end: &Point) -> f64 {
        (end.x - start.x) * (self.y - start.y) - (end.y - start.y) * (self.x - start.x)
    }
}

/// Axis-aligned bounding box of an interactive element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Half-open containment: the maximum edges are exclusive
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// Find the path point farthest from the segment `[start, end]`.
///
/// Ties resolve to the earliest point in path order. Returns the point with
/// its distance, or `None` for an empty path.
pub fn max_deviation_point(path: &[Point], start: &Point, end: &Point) -> Option<(Point, f64)> {
    let mut best: Option<(Point, f64)> = None;

    for point in path {
        let distance = point.distance_to_segment(start, end);
        match best {
            Some((_, best_distance)) if distance <= best_distance => {}
            _ => best = Some((*point, distance)),
        }
    }

    best
}
