//! Expression evaluation
//!
//! Expressions are evaluated the moment their statement runs, against the
//! objects built so far. Lengths are plain inches; colors are numbers too.

use crate::ast::{Axis, BinaryOp, Expr, NthClass, ObjectRef, Place, Position, Property, RelExpr, Rvalue};
use crate::errors::{CompileError, ErrorKind};
use crate::keywords::Function;
use crate::types::{Compass, Direction, Edge, Point, RelValue, Span};

use super::colors::lookup_color;
use super::context::RenderContext;
use super::object::{ObjId, Object};
use super::shapes::Class;

type Result<T> = std::result::Result<T, CompileError>;

fn error<T>(kind: ErrorKind, span: Span) -> Result<T> {
    Err(CompileError::new(kind, span))
}

impl RenderContext {
    pub fn eval_expr(&self, expr: &Expr) -> Result<f64> {
        let value = match expr {
            Expr::Number(v) => *v,
            Expr::Variable { name, span } => self.variable(name, *span)?,
            Expr::Neg(inner) => -self.eval_expr(inner)?,
            Expr::Binary { lhs, op, rhs, span } => {
                let a = self.eval_expr(lhs)?;
                let b = self.eval_expr(rhs)?;
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
                        return error(ErrorKind::DivisionByZero, *span);
                    }
                    BinaryOp::Div => a / b,
                    BinaryOp::Rem => a % b,
                }
            }
            Expr::Call { func, args, span } => {
                let x = match args.first() {
                    Some(e) => self.eval_expr(e)?,
                    None => 0.0,
                };
                let y = match args.get(1) {
                    Some(e) => self.eval_expr(e)?,
                    None => 0.0,
                };
                call(*func, x, y, *span)?
            }
            Expr::Dist(a, b) => {
                let a = self.eval_position(a)?;
                let b = self.eval_position(b)?;
                a.distance(b)
            }
            Expr::Coord(place, axis) => {
                let p = self.eval_place(place)?;
                match axis {
                    Axis::X => p.x,
                    Axis::Y => p.y,
                }
            }
            Expr::Property(obj, prop) => {
                let id = self.resolve(obj)?;
                property(self.object(id), *prop)
            }
        };
        Ok(value)
    }

    /// `expr` or `expr%`.
    pub fn eval_rel(&self, rel: &RelExpr) -> Result<RelValue> {
        let v = self.eval_expr(&rel.expr)?;
        Ok(if rel.percent {
            RelValue::percent(v)
        } else {
            RelValue::absolute(v)
        })
    }

    pub fn eval_rvalue(&self, value: &Rvalue) -> Result<f64> {
        match value {
            Rvalue::Expr(e) => self.eval_expr(e),
            Rvalue::Color { name, span } => {
                lookup_color(name).ok_or_else(|| CompileError::new(ErrorKind::UnknownColor, *span))
            }
        }
    }

    /// A variable, then a color name.
    fn variable(&self, name: &str, span: Span) -> Result<f64> {
        self.vars
            .lookup(name)
            .or_else(|| lookup_color(name))
            .ok_or_else(|| CompileError::new(ErrorKind::NoSuchVariable, span))
    }

    // ========================================================================
    // Positions
    // ========================================================================

    pub fn eval_position(&self, pos: &Position) -> Result<Point> {
        let p = match pos {
            Position::Coords(x, y) => Point::new(self.eval_expr(x)?, self.eval_expr(y)?),
            Position::Place(place) => self.eval_place(place)?,
            Position::Offset {
                place,
                subtract,
                dx,
                dy,
            } => {
                let base = self.eval_place(place)?;
                let d = Point::new(self.eval_expr(dx)?, self.eval_expr(dy)?);
                if *subtract { base - d } else { base + d }
            }
            Position::Pair(a, b) => {
                let a = self.eval_position(a)?;
                let b = self.eval_position(b)?;
                Point::new(a.x, b.y)
            }
            Position::Between(frac, a, b) => {
                let f = self.eval_expr(frac)?;
                let a = self.eval_position(a)?;
                let b = self.eval_position(b)?;
                Point::new(b.x * f + a.x * (1.0 - f), b.y * f + a.y * (1.0 - f))
            }
            Position::Shift(dist, dir, base) => {
                let d = self.eval_expr(dist)?;
                let mut p = self.eval_position(base)?;
                match dir {
                    Direction::Up => p.y += d,
                    Direction::Down => p.y -= d,
                    Direction::Left => p.x -= d,
                    Direction::Right => p.x += d,
                }
                p
            }
            Position::Heading(dist, angle, base) => {
                let d = self.eval_expr(dist)?;
                let a = self.eval_expr(angle)?;
                at_heading(d, a, self.eval_position(base)?)
            }
            Position::CompassShift(dist, cp, base) => {
                let d = self.eval_expr(dist)?;
                at_heading(d, cp.heading(), self.eval_position(base)?)
            }
        };
        Ok(p)
    }

    pub fn eval_place(&self, place: &Place) -> Result<Point> {
        match place {
            Place::Object(r) => Ok(self.object(self.resolve(r)?).at),
            Place::Edge(r, edge) => Ok(edge_point(self.object(self.resolve(r)?), *edge)),
            Place::Vertex {
                index,
                span,
                object,
            } => {
                let obj = self.object(self.resolve(object)?);
                usize::try_from(*index)
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| obj.path.get(i))
                    .copied()
                    .ok_or_else(|| CompileError::new(ErrorKind::NoSuchVertex, *span))
            }
        }
    }

    // ========================================================================
    // Object lookup
    // ========================================================================

    pub fn resolve(&self, r: &ObjectRef) -> Result<ObjId> {
        match r {
            ObjectRef::This(span) => self
                .current
                .ok_or_else(|| CompileError::new(ErrorKind::NoSuchObject, *span)),
            ObjectRef::Named(parts) => {
                let mut parts = parts.iter();
                let Some((first, span)) = parts.next() else {
                    return error(ErrorKind::NoSuchObject, r.span());
                };
                let mut found = self
                    .lists
                    .iter()
                    .rev()
                    .find_map(|list| self.find_in(list, first))
                    .ok_or_else(|| CompileError::new(ErrorKind::NoSuchObject, *span))?;
                for (name, span) in parts {
                    found = self
                        .find_in(&self.object(found).children, name)
                        .ok_or_else(|| CompileError::new(ErrorKind::NoSuchObject, *span))?;
                }
                Ok(found)
            }
            ObjectRef::Nth {
                index,
                class,
                span,
                within,
            } => {
                let list: &[ObjId] = match within {
                    Some(outer) => &self.object(self.resolve(outer)?).children,
                    None => self.list(),
                };
                self.find_nth(list, *index, *class)
                    .ok_or_else(|| CompileError::new(ErrorKind::NoSuchObject, *span))
            }
        }
    }

    /// Most recent object named `name`, else the most recent whose label
    /// reads exactly `name`.
    fn find_in(&self, list: &[ObjId], name: &str) -> Option<ObjId> {
        list.iter()
            .rev()
            .find(|id| self.object(**id).name.as_deref() == Some(name))
            .or_else(|| list.iter().rev().find(|id| self.object(**id).has_text(name)))
            .copied()
    }

    fn find_nth(&self, list: &[ObjId], index: i64, class: NthClass) -> Option<ObjId> {
        let selected = |id: &&ObjId| {
            let obj = self.object(**id);
            match class {
                NthClass::Any => true,
                NthClass::Class(name) => obj.class.matches(name),
                NthClass::Sublist => matches!(obj.class, Class::SublistClass(_)),
            }
        };
        let n = usize::try_from(index.unsigned_abs()).ok()?.max(1);
        if index < 0 {
            list.iter().rev().filter(selected).nth(n - 1).copied()
        } else {
            list.iter().filter(selected).nth(n - 1).copied()
        }
    }
}

fn call(func: Function, x: f64, y: f64, span: Span) -> Result<f64> {
    let v = match func {
        Function::Abs => x.abs(),
        Function::Cos => x.to_radians().cos(),
        Function::Sin => x.to_radians().sin(),
        Function::Int => x.trunc(),
        Function::Max => x.max(y),
        Function::Min => x.min(y),
        Function::Sqrt if x < 0.0 => return error(ErrorKind::NegativeSqrt, span),
        Function::Sqrt => x.sqrt(),
    };
    Ok(v)
}

fn property(obj: &Object, prop: Property) -> f64 {
    match prop {
        Property::Width => obj.w,
        Property::Height => obj.h,
        Property::Radius => obj.rad,
        Property::Diameter => obj.rad * 2.0,
        Property::Thickness => obj.sw,
        Property::Dashed => obj.dashed,
        Property::Dotted => obj.dotted,
        Property::Fill => obj.fill,
        Property::Color => obj.color,
        Property::X => obj.at.x,
        Property::Y => obj.at.y,
        Property::Top => obj.bbox.ne.y,
        Property::Bottom => obj.bbox.sw.y,
        Property::Left => obj.bbox.sw.x,
        Property::Right => obj.bbox.ne.x,
    }
}

/// A compass point of an object, or its entry/exit point.
pub(super) fn edge_point(obj: &Object, edge: Edge) -> Point {
    match edge {
        Edge::Compass(Compass::C) => obj.at,
        Edge::Compass(cp) => obj.at + obj.offset(cp),
        Edge::Start => obj.enter,
        Edge::End => obj.exit,
    }
}

/// `pt` moved `dist` along compass heading `degrees`.
fn at_heading(dist: f64, degrees: f64, pt: Point) -> Point {
    let r = degrees.to_radians();
    Point::new(pt.x + dist * r.sin(), pt.y + dist * r.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BaseType, ObjectStmt};
    use crate::keywords::ClassName;

    const S: Span = Span::new(0, 1);

    fn num(v: f64) -> Box<Expr> {
        Box::new(Expr::Number(v))
    }

    fn binary(a: f64, op: BinaryOp, b: f64) -> Expr {
        Expr::Binary {
            lhs: num(a),
            op,
            rhs: num(b),
            span: S,
        }
    }

    fn add_box(ctx: &mut RenderContext, name: Option<&str>) {
        let stmt = ObjectStmt {
            name: name.map(String::from),
            base: BaseType::Class(ClassName::Box),
            span: S,
            leading: None,
            attributes: Vec::new(),
        };
        ctx.build_object(&stmt, Vec::new()).unwrap();
    }

    #[test]
    fn arithmetic_and_errors() {
        let ctx = RenderContext::new();
        assert_eq!(ctx.eval_expr(&binary(7.0, BinaryOp::Rem, 4.0)).unwrap(), 3.0);
        assert_eq!(ctx.eval_expr(&binary(1.0, BinaryOp::Sub, 4.0)).unwrap(), -3.0);
        let err = ctx.eval_expr(&binary(1.0, BinaryOp::Div, 0.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn identifiers_fall_back_to_colors() {
        let ctx = RenderContext::new();
        let var = |name: &str| Expr::Variable {
            name: name.into(),
            span: S,
        };
        assert_eq!(ctx.eval_expr(&var("boxwid")).unwrap(), 0.75);
        assert_eq!(ctx.eval_expr(&var("red")).unwrap(), f64::from(0xff0000));
        let err = ctx.eval_expr(&var("nosuch")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchVariable);
    }

    #[test]
    fn functions_use_degrees() {
        let v = call(Function::Sin, 90.0, 0.0, S).unwrap();
        assert!((v - 1.0).abs() < 1e-12);
        assert_eq!(call(Function::Int, -2.7, 0.0, S).unwrap(), -2.0);
        assert_eq!(call(Function::Max, 1.0, 3.0, S).unwrap(), 3.0);
        let err = call(Function::Sqrt, -1.0, 0.0, S).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NegativeSqrt);
    }

    #[test]
    fn between_interpolates() {
        let ctx = RenderContext::new();
        let p = ctx
            .eval_position(&Position::Between(
                Expr::Number(0.25),
                Box::new(Position::Coords(Expr::Number(0.0), Expr::Number(0.0))),
                Box::new(Position::Coords(Expr::Number(4.0), Expr::Number(8.0))),
            ))
            .unwrap();
        assert_eq!(p, Point::new(1.0, 2.0));
    }

    #[test]
    fn names_and_ordinals() {
        let mut ctx = RenderContext::new();
        add_box(&mut ctx, Some("A"));
        add_box(&mut ctx, None);
        let named = ObjectRef::Named(vec![("A".into(), S)]);
        assert_eq!(ctx.resolve(&named).unwrap(), ObjId(0));
        let nth = |index| ObjectRef::Nth {
            index,
            class: NthClass::Class(ClassName::Box),
            span: S,
            within: None,
        };
        assert_eq!(ctx.resolve(&nth(2)).unwrap(), ObjId(1));
        assert_eq!(ctx.resolve(&nth(-2)).unwrap(), ObjId(0));
        assert_eq!(ctx.resolve(&nth(0)).unwrap(), ObjId(0));
        assert_eq!(ctx.resolve(&nth(3)).unwrap_err().kind, ErrorKind::NoSuchObject);
        let missing = ObjectRef::Named(vec![("B".into(), S)]);
        assert_eq!(ctx.resolve(&missing).unwrap_err().kind, ErrorKind::NoSuchObject);
    }

    #[test]
    fn properties_and_edges() {
        let mut ctx = RenderContext::new();
        add_box(&mut ctx, Some("A"));
        let a = ObjectRef::Named(vec![("A".into(), S)]);
        let w = ctx.eval_expr(&Expr::Property(a.clone(), Property::Width)).unwrap();
        assert_eq!(w, 0.75);
        let top = ctx.eval_expr(&Expr::Property(a.clone(), Property::Top)).unwrap();
        assert_eq!(top, 0.25);
        let ne = ctx
            .eval_place(&Place::Edge(a, Edge::Compass(Compass::NE)))
            .unwrap();
        assert_eq!(ne, Point::new(0.375, 0.25));
    }
}
