use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn squared_distance_to(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Bounds {
    #[must_use]
    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Builds bounds from an x range and a y range, normalizing order.
    #[must_use]
    pub fn from_ranges(x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            top_left: Point::new(x_range.0.min(x_range.1), y_range.0.min(y_range.1)),
            bottom_right: Point::new(x_range.0.max(x_range.1), y_range.0.max(y_range.1)),
        }
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    #[must_use]
    pub fn height(self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }

    #[must_use]
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.top_left.x
            && point.x <= self.bottom_right.x
            && point.y >= self.top_left.y
            && point.y <= self.bottom_right.y
    }

    #[must_use]
    pub fn intersects(self, other: Bounds) -> bool {
        self.top_left.x <= other.bottom_right.x
            && self.bottom_right.x >= other.top_left.x
            && self.top_left.y <= other.bottom_right.y
            && self.bottom_right.y >= other.top_left.y
    }

    #[must_use]
    pub fn corners(self) -> [Point; 4] {
        [
            self.top_left,
            Point::new(self.bottom_right.x, self.top_left.y),
            self.bottom_right,
            Point::new(self.top_left.x, self.bottom_right.y),
        ]
    }
}

/// Pixel-space footprint of one rendered mark, used for hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityGeometry {
    Point(Point),
    Rect(Bounds),
    Segment { start: Point, end: Point },
}

impl EntityGeometry {
    /// The representative position used for nearest-entity queries.
    #[must_use]
    pub fn position(&self) -> Point {
        match self {
            Self::Point(point) => *point,
            Self::Rect(bounds) => Point::new(
                (bounds.top_left.x + bounds.bottom_right.x) / 2.0,
                (bounds.top_left.y + bounds.bottom_right.y) / 2.0,
            ),
            Self::Segment { start, end } => {
                Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0)
            }
        }
    }

    /// Whether the geometry intersects a query rectangle.
    ///
    /// Segments are tested edge-by-edge so that a segment whose endpoints
    /// both lie outside the box is still reported when it crosses through.
    #[must_use]
    pub fn intersects(&self, bounds: Bounds) -> bool {
        match self {
            Self::Point(point) => bounds.contains(*point),
            Self::Rect(rect) => rect.intersects(bounds),
            Self::Segment { start, end } => {
                if bounds.contains(*start) || bounds.contains(*end) {
                    return true;
                }
                let corners = bounds.corners();
                (0..4).any(|edge| {
                    segments_intersect(*start, *end, corners[edge], corners[(edge + 1) % 4])
                })
            }
        }
    }

    /// Whether the geometry contains a query point.
    ///
    /// Rectangles use exact containment; points and segments use a pixel
    /// tolerance ("nearest within tolerance" for line-like plots).
    #[must_use]
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Self::Point(center) => center.squared_distance_to(point) <= tolerance * tolerance,
            Self::Rect(bounds) => bounds.contains(point),
            Self::Segment { start, end } => {
                squared_distance_to_segment(point, *start, *end) <= tolerance * tolerance
            }
        }
    }
}

/// Squared distance from a point to a line segment.
#[must_use]
pub fn squared_distance_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let length_squared = start.squared_distance_to(end);
    if length_squared == 0.0 {
        return point.squared_distance_to(start);
    }
    let t = ((point.x - start.x) * (end.x - start.x) + (point.y - start.y) * (end.y - start.y))
        / length_squared;
    let t = t.clamp(0.0, 1.0);
    let projection = Point::new(
        start.x + t * (end.x - start.x),
        start.y + t * (end.y - start.y),
    );
    point.squared_distance_to(projection)
}

/// Segment intersection via the orientation (cross-product sign) test,
/// including the collinear-overlap cases.
#[must_use]
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let o1 = orientation(p1, p2, q1);
    let o2 = orientation(p1, p2, q2);
    let o3 = orientation(q1, q2, p1);
    let o4 = orientation(q1, q2, p2);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == 0 && on_segment(p1, p2, q1))
        || (o2 == 0 && on_segment(p1, p2, q2))
        || (o3 == 0 && on_segment(q1, q2, p1))
        || (o4 == 0 && on_segment(q1, q2, p2))
}

fn orientation(a: Point, b: Point, c: Point) -> i8 {
    let cross = (b.y - a.y) * (c.x - b.x) - (b.x - a.x) * (c.y - b.y);
    if cross > 0.0 {
        1
    } else if cross < 0.0 {
        -1
    } else {
        0
    }
}

fn on_segment(a: Point, b: Point, c: Point) -> bool {
    c.x >= a.x.min(b.x) && c.x <= a.x.max(b.x) && c.y >= a.y.min(b.y) && c.y <= a.y.max(b.y)
}
