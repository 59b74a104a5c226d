//! Path builder for line-like objects.
//!
//! Movements in an attribute list accumulate into a relative path before the
//! object is finalized. The builder tracks which coordinates of the last
//! point have already been moved so that `right 1 up 1` produces a single
//! diagonal segment while `right 1 right 1` or `right 1 then up 1` produce
//! two.
//!
//! # Key Concepts
//!
//! - **Coordinate flags**: bit 0 means the x of the last point was moved,
//!   bit 1 the y. Both set means the point came from an absolute position
//!   (`from`, `to`, `same`) and the next movement must start a new point.
//! - **then**: forces the next movement to start a new point.
//! - **same-path**: a path copied by `same` is discarded by the first
//!   explicit movement.

use crate::errors::{CompileError, ErrorKind};
use crate::types::{Direction, Point, Span};

/// Most points a single line may have.
pub const MAX_PATH_POINTS: usize = 1000;

/// Which coordinates of the current point have been set.
#[derive(Debug, Clone, Copy, Default)]
struct CoordFlags {
    value: u8,
}

impl CoordFlags {
    const X_SET: u8 = 1;
    const Y_SET: u8 = 2;
    const BOTH_SET: u8 = 3;

    fn x_is_set(self) -> bool {
        self.value & Self::X_SET != 0
    }

    fn y_is_set(self) -> bool {
        self.value & Self::Y_SET != 0
    }

    fn both_set(self) -> bool {
        self.value == Self::BOTH_SET
    }

    fn mark_x_set(&mut self) {
        self.value |= Self::X_SET;
    }

    fn mark_y_set(&mut self) {
        self.value |= Self::Y_SET;
    }

    fn reset(&mut self) {
        self.value = 0;
    }

    fn set_both(&mut self) {
        self.value = Self::BOTH_SET;
    }

    fn set_y_only(&mut self) {
        self.value = Self::Y_SET;
    }
}

/// The in-progress path of the current object.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    /// Never empty: the first point is the line's start.
    points: Vec<Point>,
    coord_flags: CoordFlags,
    then_flag: bool,
    /// The points after the first were copied by `same`.
    same_path: bool,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new(Point::ORIGIN)
    }
}

impl PathBuilder {
    pub fn new(start: Point) -> Self {
        Self {
            points: vec![start],
            coord_flags: CoordFlags::default(),
            then_flag: false,
            same_path: false,
        }
    }

    /// Start over for a new object anchored at `start`.
    pub fn reset(&mut self, start: Point) {
        *self = Self::new(start);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Index of the last point.
    fn last_index(&self) -> usize {
        self.points.len() - 1
    }

    /// Append a copy of the last point and return its index.
    pub fn next_point(&mut self, span: Span) -> Result<usize, CompileError> {
        if self.points.len() >= MAX_PATH_POINTS {
            return Err(CompileError::new(ErrorKind::TooManyPathElements, span));
        }
        let last = self.points[self.last_index()];
        self.points.push(last);
        self.coord_flags.reset();
        Ok(self.last_index())
    }

    /// `then`: the next movement starts a new segment.
    pub fn mark_then(&mut self) {
        self.then_flag = true;
    }

    /// Drop a path copied by `same` so explicit movements start fresh.
    fn reset_same_path(&mut self) {
        if self.same_path {
            self.same_path = false;
            self.points.truncate(1);
        }
    }

    /// The point a relative movement applies to, creating it when needed.
    fn movement_point(&mut self, span: Span) -> Result<usize, CompileError> {
        self.reset_same_path();
        let mut n = self.last_index();
        if self.then_flag || self.coord_flags.both_set() || n == 0 {
            n = self.next_point(span)?;
            self.then_flag = false;
        }
        Ok(n)
    }

    /// Move `distance` in `dir`. A second move along an axis already moved
    /// on the current point starts a new point.
    pub fn add_direction(
        &mut self,
        dir: Direction,
        distance: f64,
        span: Span,
    ) -> Result<(), CompileError> {
        let mut n = self.movement_point(span)?;
        if dir.is_horizontal() {
            if self.coord_flags.x_is_set() {
                n = self.next_point(span)?;
            }
            self.points[n].x += dir.unit().x * distance;
            self.coord_flags.mark_x_set();
        } else {
            if self.coord_flags.y_is_set() {
                n = self.next_point(span)?;
            }
            self.points[n].y += dir.unit().y * distance;
            self.coord_flags.mark_y_set();
        }
        Ok(())
    }

    /// `dir until even with P`: set one coordinate absolutely.
    pub fn even_with(
        &mut self,
        dir: Direction,
        target: Point,
        span: Span,
    ) -> Result<(), CompileError> {
        let mut n = self.movement_point(span)?;
        if dir.is_horizontal() {
            if self.coord_flags.x_is_set() {
                n = self.next_point(span)?;
            }
            self.points[n].x = target.x;
            self.coord_flags.mark_x_set();
        } else {
            if self.coord_flags.y_is_set() {
                n = self.next_point(span)?;
            }
            self.points[n].y = target.y;
            self.coord_flags.mark_y_set();
        }
        Ok(())
    }

    /// `go D heading H`: always a new point. Returns the exit direction the
    /// heading falls closest to.
    pub fn move_heading(
        &mut self,
        heading: f64,
        distance: f64,
        span: Span,
    ) -> Result<Direction, CompileError> {
        self.reset_same_path();
        let n = self.next_point(span)?;
        self.then_flag = false;
        let heading = heading % 360.0;
        let out = if heading <= 45.0 {
            Direction::Up
        } else if heading <= 135.0 {
            Direction::Right
        } else if heading <= 225.0 {
            Direction::Down
        } else if heading <= 315.0 {
            Direction::Left
        } else {
            Direction::Up
        };
        let rad = heading.to_radians();
        self.points[n].x += distance * rad.sin();
        self.points[n].y += distance * rad.cos();
        self.coord_flags.set_y_only();
        Ok(out)
    }

    /// `from P`: move the whole path so that it starts at `pt`.
    pub fn set_from(&mut self, pt: Point) {
        let delta = pt - self.points[0];
        for p in self.points.iter_mut().skip(1) {
            *p += delta;
        }
        self.points[0] = pt;
        self.coord_flags.set_both();
    }

    /// `to P`: an absolute vertex.
    pub fn add_to(&mut self, pt: Point, span: Span) -> Result<(), CompileError> {
        self.reset_same_path();
        let mut n = self.last_index();
        if n == 0 || self.coord_flags.both_set() || self.then_flag {
            n = self.next_point(span)?;
        }
        self.then_flag = false;
        self.points[n] = pt;
        self.coord_flags.set_both();
        Ok(())
    }

    /// Overwrite the last point.
    pub fn set_last(&mut self, pt: Point) {
        let n = self.last_index();
        self.points[n] = pt;
    }

    /// `same as L`: copy another line's shape, translated to our start.
    pub fn copy_shape(&mut self, other: &[Point]) {
        let Some(&first) = other.first() else {
            return;
        };
        let delta = self.points[0] - first;
        self.points.truncate(1);
        self.points.extend(other.iter().skip(1).map(|p| *p + delta));
        self.coord_flags.set_both();
        self.same_path = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: Span = Span::new(0, 1);

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn perpendicular_moves_share_a_point() {
        let mut b = PathBuilder::new(Point::ORIGIN);
        b.add_direction(Direction::Right, 2.0, S).unwrap();
        b.add_direction(Direction::Up, 1.0, S).unwrap();
        assert_eq!(b.points(), &[pt(0.0, 0.0), pt(2.0, 1.0)]);
    }

    #[test]
    fn repeated_axis_starts_a_new_point() {
        let mut b = PathBuilder::new(Point::ORIGIN);
        b.add_direction(Direction::Right, 1.0, S).unwrap();
        b.add_direction(Direction::Right, 1.0, S).unwrap();
        assert_eq!(b.points(), &[pt(0.0, 0.0), pt(1.0, 0.0), pt(2.0, 0.0)]);
    }

    #[test]
    fn then_forces_a_new_point() {
        let mut b = PathBuilder::new(Point::ORIGIN);
        b.add_direction(Direction::Right, 1.0, S).unwrap();
        b.mark_then();
        b.add_direction(Direction::Down, 1.0, S).unwrap();
        assert_eq!(b.points(), &[pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, -1.0)]);
    }

    #[test]
    fn from_translates_existing_points() {
        let mut b = PathBuilder::new(Point::ORIGIN);
        b.add_direction(Direction::Right, 1.0, S).unwrap();
        b.set_from(pt(5.0, 5.0));
        assert_eq!(b.points(), &[pt(5.0, 5.0), pt(6.0, 5.0)]);
    }

    #[test]
    fn to_after_to_appends() {
        let mut b = PathBuilder::new(Point::ORIGIN);
        b.add_to(pt(1.0, 1.0), S).unwrap();
        b.add_to(pt(2.0, 0.0), S).unwrap();
        assert_eq!(b.len(), 3);
        b.add_direction(Direction::Up, 1.0, S).unwrap();
        assert_eq!(b.points()[3], pt(2.0, 1.0));
    }

    #[test]
    fn heading_moves_by_compass_angle() {
        let mut b = PathBuilder::new(Point::ORIGIN);
        let out = b.move_heading(90.0, 2.0, S).unwrap();
        assert_eq!(out, Direction::Right);
        let p = b.points()[1];
        assert!((p.x - 2.0).abs() < 1e-12 && p.y.abs() < 1e-12);
        assert_eq!(b.move_heading(180.0, 1.0, S).unwrap(), Direction::Down);
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn even_with_sets_coordinate() {
        let mut b = PathBuilder::new(pt(1.0, 1.0));
        b.even_with(Direction::Down, pt(9.0, -3.0), S).unwrap();
        assert_eq!(b.points()[1], pt(1.0, -3.0));
    }

    #[test]
    fn same_path_is_replaced_by_movement() {
        let mut b = PathBuilder::new(pt(1.0, 0.0));
        b.copy_shape(&[pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0)]);
        assert_eq!(b.points(), &[pt(1.0, 0.0), pt(1.0, 1.0), pt(2.0, 1.0)]);
        b.add_direction(Direction::Left, 1.0, S).unwrap();
        assert_eq!(b.points(), &[pt(1.0, 0.0), pt(0.0, 0.0)]);
    }

    #[test]
    fn path_length_is_capped() {
        let mut b = PathBuilder::new(Point::ORIGIN);
        for _ in 1..MAX_PATH_POINTS {
            b.next_point(S).unwrap();
        }
        let err = b.next_point(S).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyPathElements);
    }
}
