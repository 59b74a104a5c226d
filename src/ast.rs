//! Syntax pieces built by the parser and evaluated by the render context.
//!
//! Statements are executed as soon as they are parsed, so only the parts
//! that need evaluating (expressions, positions, object references) are
//! represented as trees. Every node keeps the span used in error reports.

use crate::keywords::{ClassName, Function};
use crate::lexer::AssignOp;
use crate::types::{Compass, Direction, Edge, Span};

/// Binary operators, in increasing precedence groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Numeric properties readable through `object.prop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Width,
    Height,
    Radius,
    Diameter,
    Thickness,
    Dashed,
    Dotted,
    Fill,
    Color,
    X,
    Y,
    Top,
    Bottom,
    Left,
    Right,
}

/// `.x` or `.y`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A numeric expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// An identifier, looked up as a variable and then as a color.
    Variable { name: String, span: Span },
    Neg(Box<Expr>),
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
        /// The operator token.
        span: Span,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
        span: Span,
    },
    Dist(Box<Position>, Box<Position>),
    /// `place.x` / `place.y`
    Coord(Box<Place>, Axis),
    /// `object.wid`, `object.top`, ...
    Property(ObjectRef, Property),
}

/// A relative value: an expression optionally followed by `%`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelExpr {
    pub expr: Expr,
    pub percent: bool,
}

/// An expression that names a point.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// `x, y`
    Coords(Expr, Expr),
    Place(Place),
    /// `place + dx, dy` (or `-`)
    Offset {
        place: Place,
        subtract: bool,
        dx: Expr,
        dy: Expr,
    },
    /// `(p1, p2)`: x from the first, y from the second
    Pair(Box<Position>, Box<Position>),
    /// `f of the way between p1 and p2`, `f <p1, p2>`
    Between(Expr, Box<Position>, Box<Position>),
    /// `d above p`, `d left of p`, ...
    Shift(Expr, Direction, Box<Position>),
    /// `d heading h from p`
    Heading(Expr, Expr, Box<Position>),
    /// `d ne of p`
    CompassShift(Expr, Compass, Box<Position>),
}

/// A point on an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    /// The object's center.
    Object(ObjectRef),
    Edge(ObjectRef, Edge),
    /// `2nd vertex of L`
    Vertex {
        index: u64,
        span: Span,
        object: ObjectRef,
    },
}

/// Which objects an ordinal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NthClass {
    Any,
    Class(ClassName),
    Sublist,
}

/// A reference to an existing object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectRef {
    This(Span),
    /// `A` or `A.B.C`: each segment searched inside the previous one.
    Named(Vec<(String, Span)>),
    Nth {
        /// Positive counts from the first object, negative from the last.
        index: i64,
        class: NthClass,
        span: Span,
        within: Option<Box<ObjectRef>>,
    },
}

impl ObjectRef {
    pub fn span(&self) -> Span {
        match self {
            ObjectRef::This(span) => *span,
            ObjectRef::Named(parts) => parts.last().map_or(Span::default(), |(_, s)| *s),
            ObjectRef::Nth { span, .. } => *span,
        }
    }
}

/// The right-hand side of an assignment or a color attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Rvalue {
    Expr(Expr),
    /// A capitalized word: only a color name makes sense here.
    Color { name: String, span: Span },
}

/// Size attributes taking a relative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeProp {
    Height,
    Width,
    Radius,
    Diameter,
    Thickness,
}

/// The direction part of `go ... heading`.
#[derive(Debug, Clone, PartialEq)]
pub enum Heading {
    Angle(Expr),
    Compass(Compass),
}

/// A quoted string with its position keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    /// Text between the quotes.
    pub text: String,
    pub span: Span,
    pub flags: TextFlags,
}

/// Attributes that only flip a style bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleFlag {
    Cw,
    Ccw,
    LArrow,
    RArrow,
    LRArrow,
    Invis,
    Thick,
    Thin,
    Solid,
}

/// One element of an object's attribute list, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Size {
        prop: SizeProp,
        value: RelExpr,
        span: Span,
    },
    /// `dashed` / `dotted`, with an optional spacing.
    Dash { dotted: bool, value: Option<Expr> },
    Color {
        fill: bool,
        value: Rvalue,
        span: Span,
    },
    /// `go right 2`, `up`
    Go {
        dir: Direction,
        dist: Option<RelExpr>,
        span: Span,
    },
    /// `right until even with P`
    EvenWith {
        dir: Direction,
        position: Position,
        span: Span,
    },
    /// `go 1 heading 45`, `then ne`
    Heading {
        dist: Option<RelExpr>,
        heading: Heading,
        span: Span,
    },
    Then(Span),
    Close(Span),
    Chop,
    From(Position, Span),
    To(Position, Span),
    /// `at P` or `with .edge at P`
    At {
        edge: Option<Edge>,
        position: Position,
        span: Span,
    },
    Same {
        other: Option<ObjectRef>,
        span: Span,
    },
    Text(TextSpec),
    Fit(Span),
    Behind(ObjectRef),
    Style(StyleFlag),
}

/// What a new object is made from.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseType {
    Class(ClassName),
    Text(TextSpec),
    /// `[ ... ]`; its statements have already run.
    Sublist,
}

/// An object statement after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStmt {
    pub name: Option<String>,
    pub base: BaseType,
    /// The class name, string or closing bracket.
    pub span: Span,
    /// A bare distance right after the base type, with the span of its
    /// first token.
    pub leading: Option<(RelExpr, Span)>,
    pub attributes: Vec<Attribute>,
}

/// One `print` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintItem {
    Text(String),
    Value(Rvalue),
    /// A comma between arguments.
    Separator,
}

/// A statement other than `define`, which the token stream handles itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign {
        name: String,
        op: AssignOp,
        value: Rvalue,
        span: Span,
    },
    /// `Name: position`
    Place {
        name: String,
        position: Position,
        span: Span,
    },
    Print(Vec<PrintItem>),
    AssertEqual {
        lhs: Expr,
        rhs: Expr,
        span: Span,
    },
    AssertSamePlace {
        lhs: Position,
        rhs: Position,
        span: Span,
    },
}

/// Text label flags, a bit set mirroring the keywords after a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFlags(pub u16);

impl TextFlags {
    pub const LJUST: u16 = 0x0001;
    pub const RJUST: u16 = 0x0002;
    pub const ABOVE2: u16 = 0x0004;
    pub const ABOVE: u16 = 0x0008;
    pub const CENTER: u16 = 0x0010;
    pub const BELOW: u16 = 0x0020;
    pub const BELOW2: u16 = 0x0040;
    pub const BIG: u16 = 0x0080;
    pub const SMALL: u16 = 0x0100;
    pub const XTRA: u16 = 0x0200;
    pub const ITALIC: u16 = 0x0400;
    pub const BOLD: u16 = 0x0800;
    pub const MONO: u16 = 0x1000;
    pub const ALIGNED: u16 = 0x2000;

    pub const JUSTIFY: u16 = Self::LJUST | Self::RJUST;
    pub const VERTICAL: u16 = Self::ABOVE2 | Self::ABOVE | Self::CENTER | Self::BELOW | Self::BELOW2;
    pub const SIZE: u16 = Self::BIG | Self::SMALL | Self::XTRA;

    pub fn has(self, bits: u16) -> bool {
        self.0 & bits != 0
    }

    pub fn vertical(self) -> u16 {
        self.0 & Self::VERTICAL
    }

    pub fn justify(self) -> u16 {
        self.0 & Self::JUSTIFY
    }

    pub fn set_vertical(&mut self, slot: u16) {
        self.0 = (self.0 & !Self::VERTICAL) | slot;
    }

    pub fn set_justify(&mut self, bits: u16) {
        self.0 = (self.0 & !Self::JUSTIFY) | bits;
    }

    /// `big`/`small`: a repeat of the same modifier adds `XTRA`.
    pub fn set_size(&mut self, bit: u16) {
        if self.has(bit) {
            self.0 |= Self::XTRA;
        } else {
            self.0 = (self.0 & !Self::SIZE) | bit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_size_modifier_escalates() {
        let mut f = TextFlags::default();
        f.set_size(TextFlags::BIG);
        assert!(!f.has(TextFlags::XTRA));
        f.set_size(TextFlags::BIG);
        assert!(f.has(TextFlags::BIG | TextFlags::XTRA));
        f.set_size(TextFlags::SMALL);
        assert_eq!(f.0 & TextFlags::SIZE, TextFlags::SMALL);
    }

    #[test]
    fn slots_replace_each_other() {
        let mut f = TextFlags(TextFlags::LJUST | TextFlags::ABOVE);
        f.set_vertical(TextFlags::BELOW);
        assert_eq!(f.vertical(), TextFlags::BELOW);
        assert_eq!(f.justify(), TextFlags::LJUST);
        f.set_justify(TextFlags::RJUST);
        assert_eq!(f.justify(), TextFlags::RJUST);
    }
}
