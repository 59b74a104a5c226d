//! Value types shared by every stage: source spans, points, bounding boxes,
//! relative values, layout directions and compass points.
//!
//! All geometry is in inches with y growing upward. Conversion to SVG pixels
//! (and the y flip) happens only in the render pass.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use glam::DVec2;
use miette::SourceSpan;

// ============================================================================
// Span
// ============================================================================

/// A byte range in the original source text.
///
/// Tokens produced by macro expansion still point into the original text,
/// so a span is always meaningful for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub const fn end(self) -> usize {
        self.start + self.len
    }

    /// The source text covered by this span. Out-of-range spans yield "".
    pub fn text(self, source: &str) -> &str {
        source.get(self.start..self.end()).unwrap_or("")
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len)
    }
}

// ============================================================================
// Point
// ============================================================================

/// A coordinate in inches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        self.to_dvec2().distance(other.to_dvec2())
    }

    pub fn to_dvec2(self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }
}

impl From<DVec2> for Point {
    fn from(v: DVec2) -> Self {
        Point::new(v.x, v.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

// ============================================================================
// Bounding box
// ============================================================================

/// Axis-aligned bounding box. Empty is encoded as `sw.x > ne.x`, and an
/// empty operand is absorptive in every merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub sw: Point,
    pub ne: Point,
}

impl Default for BBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BBox {
    pub const EMPTY: BBox = BBox {
        sw: Point::new(1.0, 1.0),
        ne: Point::new(0.0, 0.0),
    };

    pub fn is_empty(&self) -> bool {
        self.sw.x > self.ne.x
    }

    pub fn add_point(&mut self, x: f64, y: f64) {
        if self.is_empty() {
            self.sw = Point::new(x, y);
            self.ne = Point::new(x, y);
            return;
        }
        self.sw.x = self.sw.x.min(x);
        self.sw.y = self.sw.y.min(y);
        self.ne.x = self.ne.x.max(x);
        self.ne.y = self.ne.y.max(y);
    }

    pub fn add_box(&mut self, other: &BBox) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.add_point(other.sw.x, other.sw.y);
        self.add_point(other.ne.x, other.ne.y);
    }

    pub fn add_ellipse(&mut self, center: Point, rx: f64, ry: f64) {
        self.add_point(center.x - rx, center.y - ry);
        self.add_point(center.x + rx, center.y + ry);
    }

    pub fn contains(&self, pt: Point) -> bool {
        !self.is_empty()
            && pt.x >= self.sw.x
            && pt.x <= self.ne.x
            && pt.y >= self.sw.y
            && pt.y <= self.ne.y
    }

    pub fn width(&self) -> f64 {
        self.ne.x - self.sw.x
    }

    pub fn height(&self) -> f64 {
        self.ne.y - self.sw.y
    }

    pub fn center(&self) -> Point {
        self.sw.midpoint(self.ne)
    }

    pub fn translate(&mut self, delta: Point) {
        if !self.is_empty() {
            self.sw += delta;
            self.ne += delta;
        }
    }
}

// ============================================================================
// Relative value
// ============================================================================

/// `new = old * rel + abs`. A plain number is `{abs: n, rel: 0}` and `50%`
/// is `{abs: 0, rel: 0.5}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelValue {
    pub abs: f64,
    pub rel: f64,
}

impl RelValue {
    pub const fn absolute(abs: f64) -> Self {
        Self { abs, rel: 0.0 }
    }

    pub fn percent(pct: f64) -> Self {
        Self { abs: 0.0, rel: pct / 100.0 }
    }

    pub fn apply(self, old: f64) -> f64 {
        old * self.rel + self.abs
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Layout direction. The discriminants match the rotation order used by
/// `arc` (clockwise turns add one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Right = 0,
    Down = 1,
    Left = 2,
    Up = 3,
}

impl Direction {
    pub fn from_index(i: u8) -> Direction {
        match i % 4 {
            0 => Direction::Right,
            1 => Direction::Down,
            2 => Direction::Left,
            _ => Direction::Up,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn opposite(self) -> Direction {
        Direction::from_index(self.index() + 2)
    }

    /// The compass point an object exits through when travelling this way.
    pub fn exit_compass(self) -> Compass {
        match self {
            Direction::Right => Compass::E,
            Direction::Down => Compass::S,
            Direction::Left => Compass::W,
            Direction::Up => Compass::N,
        }
    }

    /// Unit step in this direction.
    pub fn unit(self) -> Point {
        match self {
            Direction::Right => Point::new(1.0, 0.0),
            Direction::Down => Point::new(0.0, -1.0),
            Direction::Left => Point::new(-1.0, 0.0),
            Direction::Up => Point::new(0.0, 1.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Right | Direction::Left)
    }
}

// ============================================================================
// Compass points and edges
// ============================================================================

/// One of the nine named anchor locations on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    C,
}

impl Compass {
    /// Heading in degrees, clockwise from north. Center maps to 0.
    pub fn heading(self) -> f64 {
        match self {
            Compass::N | Compass::C => 0.0,
            Compass::NE => 45.0,
            Compass::E => 90.0,
            Compass::SE => 135.0,
            Compass::S => 180.0,
            Compass::SW => 225.0,
            Compass::W => 270.0,
            Compass::NW => 315.0,
        }
    }
}

/// An edge reference: a compass point, or the start/end of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Compass(Compass),
    Start,
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==== BBox tests ====

    #[test]
    fn empty_box_is_absorptive() {
        let mut a = BBox::EMPTY;
        let mut b = BBox::EMPTY;
        b.add_point(1.0, 2.0);
        b.add_point(3.0, -1.0);
        a.add_box(&b);
        assert_eq!(a, b);

        let before = b;
        b.add_box(&BBox::EMPTY);
        assert_eq!(b, before);
    }

    #[test]
    fn first_point_initializes_box() {
        let mut b = BBox::EMPTY;
        assert!(b.is_empty());
        b.add_point(-2.0, 5.0);
        assert!(!b.is_empty());
        assert_eq!(b.sw, Point::new(-2.0, 5.0));
        assert_eq!(b.ne, Point::new(-2.0, 5.0));
    }

    #[test]
    fn contains_is_inclusive() {
        let mut b = BBox::EMPTY;
        b.add_ellipse(Point::ORIGIN, 1.0, 0.5);
        assert!(b.contains(Point::new(1.0, 0.5)));
        assert!(b.contains(Point::ORIGIN));
        assert!(!b.contains(Point::new(1.01, 0.0)));
        assert!(!BBox::EMPTY.contains(Point::ORIGIN));
    }

    // ==== RelValue tests ====

    #[test]
    fn relative_values() {
        assert_eq!(RelValue::absolute(2.0).apply(7.0), 2.0);
        assert_eq!(RelValue::percent(200.0).apply(0.5), 1.0);
    }

    // ==== Direction tests ====

    #[test]
    fn direction_rotation() {
        assert_eq!(Direction::Right.opposite(), Direction::Left);
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::from_index(Direction::Up.index() + 1), Direction::Right);
    }
}
