//! The diagram object.
//!
//! Objects live in an arena owned by the render context and refer to each
//! other through [`ObjId`]. A `[...]` group owns its children by id.

use crate::ast::TextFlags;
use crate::types::{BBox, Compass, Direction, Point, Span};

use super::shapes::{Class, Shape};

/// Index of an object in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(pub usize);

/// Properties a script may set at most once per object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropMask(pub u8);

impl PropMask {
    pub const WIDTH: u8 = 0x01;
    pub const HEIGHT: u8 = 0x02;
    pub const RADIUS: u8 = 0x04;
    pub const THICKNESS: u8 = 0x08;
    pub const AT: u8 = 0x10;
    pub const FROM: u8 = 0x20;
    pub const FIT: u8 = 0x40;

    pub fn has(self, bits: u8) -> bool {
        self.0 & bits != 0
    }

    pub fn insert(&mut self, bits: u8) {
        self.0 |= bits;
    }
}

/// Which attribute just changed, for classes that keep derived values in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Height,
    Width,
    Radius,
    Diameter,
    Thickness,
    Fill,
    Color,
}

impl PropKind {
    /// The set-once bit guarding this property, if any.
    pub fn mask(self) -> Option<u8> {
        match self {
            PropKind::Height => Some(PropMask::HEIGHT),
            PropKind::Width => Some(PropMask::WIDTH),
            PropKind::Radius | PropKind::Diameter => Some(PropMask::RADIUS),
            PropKind::Thickness => Some(PropMask::THICKNESS),
            PropKind::Fill | PropKind::Color => None,
        }
    }
}

/// A quoted string attached to an object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    /// The text between the quotes, escapes not yet processed.
    pub text: String,
    pub span: Span,
    pub flags: TextFlags,
}

/// One diagram primitive.
#[derive(Debug, Clone)]
pub struct Object {
    pub class: Class,
    /// Token used to locate errors about this object.
    pub span: Span,
    pub name: Option<String>,

    /// Center.
    pub at: Point,
    pub enter: Point,
    pub exit: Point,
    /// The point the `with_edge` of the object is placed on.
    pub with: Point,
    pub with_edge: Compass,

    pub w: f64,
    pub h: f64,
    pub rad: f64,
    /// Stroke width. Negative means invisible.
    pub sw: f64,
    pub dashed: f64,
    pub dotted: f64,
    /// Colors are 0xRRGGBB; negative means none.
    pub fill: f64,
    pub color: f64,

    pub in_dir: Direction,
    pub out_dir: Direction,
    pub cw: bool,
    pub larrow: bool,
    pub rarrow: bool,
    pub closed: bool,
    pub chop: bool,

    pub texts: Vec<TextLabel>,
    /// Properties set explicitly.
    pub set: PropMask,
    /// Properties derived from other constraints.
    pub fixed: PropMask,
    pub layer: i32,

    /// Vertices of a line, empty for blocks.
    pub path: Vec<Point>,
    /// Objects named by `from`/`to`, consulted first when chopping.
    pub from: Option<ObjId>,
    pub to: Option<ObjId>,
    /// Children of a `[...]` group.
    pub children: Vec<ObjId>,
    pub bbox: BBox,
}

impl Object {
    pub fn new(class: Class, span: Span, at: Point, dir: Direction) -> Self {
        Self {
            class,
            span,
            name: None,
            at,
            enter: at,
            exit: at,
            with: at,
            with_edge: Compass::C,
            w: 0.0,
            h: 0.0,
            rad: 0.0,
            sw: 0.0,
            dashed: 0.0,
            dotted: 0.0,
            fill: -1.0,
            color: 0.0,
            in_dir: dir,
            out_dir: dir,
            cw: false,
            larrow: false,
            rarrow: false,
            closed: false,
            chop: false,
            texts: Vec::new(),
            set: PropMask::default(),
            fixed: PropMask::default(),
            layer: 1000,
            path: Vec::new(),
            from: None,
            to: None,
            children: Vec::new(),
            bbox: BBox::EMPTY,
        }
    }

    pub fn is_line(&self) -> bool {
        self.class.is_line()
    }

    /// Offset of a compass point from the center.
    pub fn offset(&self, cp: Compass) -> Point {
        self.class.offset(self, cp)
    }

    /// Translate this object alone. Children are moved by the context.
    pub fn shift(&mut self, delta: Point) {
        self.at += delta;
        self.enter += delta;
        self.exit += delta;
        self.with += delta;
        self.bbox.translate(delta);
        for p in &mut self.path {
            *p += delta;
        }
    }

    /// Point the exit at the side facing `dir`. Lines keep their last
    /// vertex unless closed.
    pub fn set_exit(&mut self, dir: Direction) {
        self.out_dir = dir;
        if !self.is_line() || self.closed {
            self.exit = self.at + self.half_extent(dir);
        }
    }

    /// Vector from the center to the middle of the side facing `dir`.
    pub fn half_extent(&self, dir: Direction) -> Point {
        let u = dir.unit();
        Point::new(u.x * self.w * 0.5, u.y * self.h * 0.5)
    }

    /// Does a label's raw text match `name` exactly?
    pub fn has_text(&self, name: &str) -> bool {
        self.texts.iter().any(|t| t.text == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shapes::BoxClass;

    fn boxed() -> Object {
        let mut obj = Object::new(Class::from(BoxClass), Span::default(), Point::ORIGIN, Direction::Right);
        obj.w = 2.0;
        obj.h = 1.0;
        obj
    }

    #[test]
    fn exit_follows_direction() {
        let mut obj = boxed();
        obj.set_exit(Direction::Down);
        assert_eq!(obj.exit, Point::new(0.0, -0.5));
        obj.set_exit(Direction::Left);
        assert_eq!(obj.exit, Point::new(-1.0, 0.0));
    }

    #[test]
    fn shift_moves_every_point() {
        let mut obj = boxed();
        obj.bbox.add_ellipse(obj.at, 1.0, 0.5);
        obj.shift(Point::new(1.0, 1.0));
        assert_eq!(obj.at, Point::new(1.0, 1.0));
        assert_eq!(obj.bbox.sw, Point::new(0.0, 0.5));
    }
}
