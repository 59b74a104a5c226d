//! Object construction and layout
//!
//! An object statement runs in three steps:
//! 1. [`RenderContext::build_object`] creates the object from its base type,
//!    anchored at the previous object's exit.
//! 2. Each attribute is applied in source order. Line movements accumulate
//!    in the context's [`PathBuilder`](super::path_builder::PathBuilder).
//! 3. The layout resolver sizes blocks to their text, moves them onto their
//!    `with` point, freezes line paths, trims chopped ends and computes the
//!    entry, exit and bounding box.

use crate::ast::{Attribute, BaseType, Heading, ObjectRef, ObjectStmt, Place, Position, SizeProp, StyleFlag, TextSpec};
use crate::errors::{CompileError, ErrorKind};
use crate::types::{BBox, Compass, Direction, Edge, Point, RelValue, Span};

use super::context::RenderContext;
use super::object::{ObjId, Object, PropKind, PropMask, TextLabel};
use super::shapes::{Class, NoopClass, Shape, SublistClass, TextClass};
use super::svg::Settings;
use super::text::{MAX_TEXTS, assign_slots, text_bbox};

type Result<T> = std::result::Result<T, CompileError>;

fn error<T>(kind: ErrorKind, span: Span) -> Result<T> {
    Err(CompileError::new(kind, span))
}

/// Which dimensions `fit` may change.
const FIT_WIDTH: u8 = 1;
const FIT_HEIGHT: u8 = 2;
const FIT_BOTH: u8 = FIT_WIDTH | FIT_HEIGHT;

/// An unspecified movement distance: 100% of the object's default size.
const FULL_STEP: RelValue = RelValue { abs: 0.0, rel: 1.0 };

/// Displacement of one default-sized step in `dir`.
fn step(dir: Direction, w: f64, h: f64) -> Point {
    match dir {
        Direction::Right => Point::new(w, 0.0),
        Direction::Down => Point::new(0.0, -h),
        Direction::Left => Point::new(-w, 0.0),
        Direction::Up => Point::new(0.0, h),
    }
}

fn label(spec: &TextSpec) -> TextLabel {
    TextLabel {
        text: spec.text.clone(),
        span: spec.span,
        flags: spec.flags,
    }
}

/// The object a `from`/`to` position names outright, if any.
fn named_endpoint(pos: &Position) -> Option<&ObjectRef> {
    match pos {
        Position::Place(Place::Object(r)) => Some(r),
        _ => None,
    }
}

impl RenderContext {
    /// Create, configure and lay out one object, then append it to the
    /// current list. `children` are the members of a `[...]` base.
    pub fn build_object(&mut self, stmt: &ObjectStmt, children: Vec<ObjId>) -> Result<ObjId> {
        let id = self.new_object(&stmt.base, stmt.span, children);
        let leading = match &stmt.leading {
            Some((rel, span)) => Some((self.eval_rel(rel)?, *span)),
            None => None,
        };
        for attr in &stmt.attributes {
            self.apply(id, attr)?;
        }
        if let Some((value, span)) = leading {
            self.go(id, None, value, span)?;
        }
        self.resolve_layout(id)?;

        let obj = self.object_mut(id);
        obj.name.clone_from(&stmt.name);
        crate::log::debug!(
            class = obj.class.name(),
            name = ?obj.name,
            x = obj.at.x,
            y = obj.at.y,
            w = obj.w,
            h = obj.h,
            "object finished"
        );
        if let Some(list) = self.lists.last_mut() {
            list.push(id);
        }
        Ok(id)
    }

    fn new_object(&mut self, base: &BaseType, span: Span, children: Vec<ObjId>) -> ObjId {
        let (at, with_edge) = match self.list().last() {
            Some(&prior) => (
                self.object(prior).exit,
                self.direction.opposite().exit_compass(),
            ),
            None => (Point::ORIGIN, Compass::C),
        };
        let class = match base {
            BaseType::Class(name) => Class::for_name(*name),
            BaseType::Text(_) => TextClass.into(),
            BaseType::Sublist => SublistClass.into(),
        };

        let mut obj = Object::new(class, span, at, self.direction);
        obj.with_edge = with_edge;
        obj.layer = self.layer();
        obj.sw = self.vars.value("thickness");
        obj.fill = self.vars.value("fill");
        obj.color = self.vars.value("color");
        class.init(&mut obj, &self.vars);

        match base {
            BaseType::Class(_) => {}
            BaseType::Text(spec) => obj.texts.push(label(spec)),
            BaseType::Sublist => {
                let mut bbox = BBox::EMPTY;
                for child in &children {
                    bbox.add_box(&self.object(*child).bbox);
                }
                obj.w = bbox.width();
                obj.h = bbox.height();
                obj.at = bbox.center();
                obj.fixed
                    .insert(PropMask::WIDTH | PropMask::HEIGHT | PropMask::RADIUS);
                obj.children = children;
            }
        }
        crate::log::debug!(class = class.name(), x = at.x, y = at.y, "new object");

        self.path.reset(at);
        let id = ObjId(self.objects.len());
        self.objects.push(obj);
        self.current = Some(id);
        id
    }

    /// `Name: position` makes an invisible marker object.
    pub(super) fn add_place(&mut self, name: &str, at: Point, span: Span) {
        let prior = self
            .list()
            .last()
            .map_or(Point::ORIGIN, |id| self.object(*id).exit);
        let mut obj = Object::new(NoopClass.into(), span, prior, self.direction);
        obj.at = at;
        obj.name = Some(name.to_string());
        obj.layer = self.layer();
        let id = ObjId(self.objects.len());
        self.objects.push(obj);
        self.current = Some(id);
        if let Some(list) = self.lists.last_mut() {
            list.push(id);
        }
    }

    fn layer(&self) -> i32 {
        self.vars.lookup("layer").map_or(1000, |v| (v as i32).max(0))
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    fn apply(&mut self, id: ObjId, attr: &Attribute) -> Result<()> {
        match attr {
            Attribute::Size { prop, value, span } => {
                let value = self.eval_rel(value)?;
                self.set_size(id, *prop, value, *span)
            }
            Attribute::Dash { dotted, value } => {
                let v = match value {
                    Some(e) => self.eval_expr(e)?,
                    None => self.vars.value("dashwid"),
                };
                let obj = self.object_mut(id);
                if *dotted {
                    obj.dotted = v;
                    obj.dashed = 0.0;
                } else {
                    obj.dashed = v;
                    obj.dotted = 0.0;
                }
                Ok(())
            }
            Attribute::Color { fill, value, .. } => {
                let v = self.eval_rvalue(value)?;
                let obj = self.object_mut(id);
                let prop = if *fill {
                    obj.fill = v;
                    PropKind::Fill
                } else {
                    obj.color = v;
                    PropKind::Color
                };
                let class = obj.class;
                class.on_prop(obj, prop);
                Ok(())
            }
            Attribute::Go { dir, dist, span } => {
                let value = match dist {
                    Some(rel) => self.eval_rel(rel)?,
                    None => FULL_STEP,
                };
                self.go(id, Some(*dir), value, *span)
            }
            Attribute::EvenWith { dir, position, span } => {
                let target = self.eval_position(position)?;
                self.require_line(id, *span)?;
                self.path.even_with(*dir, target, *span)?;
                self.object_mut(id).out_dir = *dir;
                Ok(())
            }
            Attribute::Heading { dist, heading, span } => {
                let value = match dist {
                    Some(rel) => self.eval_rel(rel)?,
                    None => FULL_STEP,
                };
                let angle = match heading {
                    Heading::Angle(e) => self.eval_expr(e)?,
                    Heading::Compass(cp) => cp.heading(),
                };
                self.require_line(id, *span)?;
                let distance = value.abs + self.vars.value("linewid") * value.rel;
                let out = self.path.move_heading(angle, distance, *span)?;
                self.object_mut(id).out_dir = out;
                Ok(())
            }
            Attribute::Then(span) => {
                self.require_line(id, *span)?;
                if self.path.len() < 2 && !self.object(id).set.has(PropMask::FROM) {
                    return error(ErrorKind::NoPriorPath, *span);
                }
                self.path.mark_then();
                Ok(())
            }
            Attribute::Close(span) => {
                if self.path.len() < 3 {
                    return error(ErrorKind::CloseNeedsThree, *span);
                }
                let obj = self.object_mut(id);
                if obj.closed {
                    return error(ErrorKind::AlreadyClosed, *span);
                }
                obj.closed = true;
                Ok(())
            }
            Attribute::Chop => {
                self.object_mut(id).chop = true;
                Ok(())
            }
            Attribute::From(position, span) => {
                let pt = self.eval_position(position)?;
                let target = named_endpoint(position).and_then(|r| self.resolve(r).ok());
                let obj = self.object_mut(id);
                if !obj.is_line() {
                    return error(ErrorKind::UseAt, *span);
                }
                if obj.set.has(PropMask::FROM) {
                    return error(ErrorKind::FromAlreadySet, *span);
                }
                if obj.closed {
                    return error(ErrorKind::PolygonClosed, *span);
                }
                obj.set.insert(PropMask::FROM);
                obj.from = target;
                self.path.set_from(pt);
                Ok(())
            }
            Attribute::To(position, span) => {
                let pt = self.eval_position(position)?;
                let target = named_endpoint(position).and_then(|r| self.resolve(r).ok());
                let obj = self.object_mut(id);
                if !obj.is_line() {
                    return error(ErrorKind::UseAt, *span);
                }
                if obj.closed {
                    return error(ErrorKind::PolygonClosed, *span);
                }
                obj.to = target;
                self.path.add_to(pt, *span)
            }
            Attribute::At {
                edge,
                position,
                span,
            } => {
                let pt = self.eval_position(position)?;
                let obj = self.object_mut(id);
                if obj.is_line() {
                    return error(ErrorKind::UseFromTo, *span);
                }
                if obj.set.has(PropMask::AT) {
                    return error(ErrorKind::AtAlreadySet, *span);
                }
                obj.set.insert(PropMask::AT);
                obj.with_edge = match edge {
                    None => Compass::C,
                    Some(Edge::Compass(cp)) => *cp,
                    Some(Edge::End) => obj.out_dir.exit_compass(),
                    Some(Edge::Start) => obj.in_dir.opposite().exit_compass(),
                };
                obj.with = pt;
                Ok(())
            }
            Attribute::Same { other, span } => self.same(id, other.as_ref(), *span),
            Attribute::Text(spec) => {
                let obj = self.object_mut(id);
                if obj.texts.len() >= MAX_TEXTS {
                    return error(ErrorKind::TooManyTextTerms, spec.span);
                }
                obj.texts.push(label(spec));
                Ok(())
            }
            Attribute::Fit(_) => {
                self.size_to_fit(id, FIT_BOTH);
                Ok(())
            }
            Attribute::Behind(other) => {
                let layer = self.object(self.resolve(other)?).layer;
                let obj = self.object_mut(id);
                if obj.layer >= layer {
                    obj.layer = layer - 1;
                }
                Ok(())
            }
            Attribute::Style(flag) => {
                let thickness = self.vars.value("thickness");
                let obj = self.object_mut(id);
                match flag {
                    StyleFlag::Cw => obj.cw = true,
                    StyleFlag::Ccw => obj.cw = false,
                    StyleFlag::LArrow => (obj.larrow, obj.rarrow) = (true, false),
                    StyleFlag::RArrow => (obj.larrow, obj.rarrow) = (false, true),
                    StyleFlag::LRArrow => (obj.larrow, obj.rarrow) = (true, true),
                    StyleFlag::Invis => obj.sw = -0.00001,
                    StyleFlag::Thick => obj.sw *= 1.5,
                    StyleFlag::Thin => obj.sw *= 0.67,
                    StyleFlag::Solid => {
                        obj.sw = thickness;
                        obj.dotted = 0.0;
                        obj.dashed = 0.0;
                    }
                }
                Ok(())
            }
        }
    }

    fn require_line(&self, id: ObjId, span: Span) -> Result<()> {
        if self.object(id).is_line() {
            Ok(())
        } else {
            error(ErrorKind::LineOnly, span)
        }
    }

    fn set_size(&mut self, id: ObjId, prop: SizeProp, value: RelValue, span: Span) -> Result<()> {
        let kind = match prop {
            SizeProp::Height => PropKind::Height,
            SizeProp::Width => PropKind::Width,
            SizeProp::Radius => PropKind::Radius,
            SizeProp::Diameter => PropKind::Diameter,
            SizeProp::Thickness => PropKind::Thickness,
        };
        let obj = self.object_mut(id);
        if let Some(mask) = kind.mask() {
            if obj.set.has(mask) {
                return error(ErrorKind::AlreadySet, span);
            }
            if obj.fixed.has(mask) {
                return error(ErrorKind::AlreadyFixed, span);
            }
            obj.set.insert(mask);
        }
        match prop {
            SizeProp::Height => obj.h = value.apply(obj.h),
            SizeProp::Width => obj.w = value.apply(obj.w),
            SizeProp::Radius => obj.rad = value.apply(obj.rad),
            SizeProp::Diameter => obj.rad = obj.rad * value.rel + 0.5 * value.abs,
            SizeProp::Thickness => obj.sw = value.apply(obj.sw),
        }
        let class = obj.class;
        class.on_prop(obj, kind);
        Ok(())
    }

    /// A relative movement. Without an explicit direction (a bare distance
    /// after the class name) the current direction is used.
    fn go(&mut self, id: ObjId, dir: Option<Direction>, value: RelValue, span: Span) -> Result<()> {
        let obj = self.object(id);
        if !obj.is_line() {
            let kind = if dir.is_some() {
                ErrorKind::LineOnly
            } else {
                ErrorKind::Syntax
            };
            return error(kind, span);
        }
        let dir = dir.unwrap_or(self.direction);
        let size = if dir.is_horizontal() { obj.w } else { obj.h };
        let distance = value.abs + size * value.rel;
        self.path.add_direction(dir, distance, span)?;
        self.object_mut(id).out_dir = dir;
        Ok(())
    }

    /// `same` / `same as X`: copy style, size and line shape.
    fn same(&mut self, id: ObjId, other: Option<&ObjectRef>, span: Span) -> Result<()> {
        let source = match other {
            Some(r) => self.resolve(r)?,
            None => {
                let class = self.object(id).class;
                self.list()
                    .iter()
                    .rev()
                    .copied()
                    .find(|o| self.object(*o).class == class)
                    .ok_or_else(|| CompileError::new(ErrorKind::NoPriorSame, span))?
            }
        };
        let src = self.object(source).clone();
        let is_line = self.object(id).is_line();
        if is_line && !src.path.is_empty() {
            self.path.copy_shape(&src.path);
        }
        let obj = self.object_mut(id);
        if !is_line {
            obj.w = src.w;
            obj.h = src.h;
        }
        obj.rad = src.rad;
        obj.sw = src.sw;
        obj.dashed = src.dashed;
        obj.dotted = src.dotted;
        obj.fill = src.fill;
        obj.color = src.color;
        obj.cw = src.cw;
        obj.larrow = src.larrow;
        obj.rarrow = src.rarrow;
        obj.closed = src.closed;
        obj.chop = src.chop;
        obj.layer = src.layer;
        Ok(())
    }

    /// Resize the object around its text. Objects without text or without a
    /// fitting rule are left alone.
    fn size_to_fit(&mut self, id: ObjId, which: u8) {
        let settings = Settings::from_vars(&self.vars);
        let obj = self.object_mut(id);
        let class = obj.class;
        if obj.texts.is_empty() || !class.fits() {
            return;
        }
        assign_slots(&mut obj.texts);
        let bbox = text_bbox(obj, &settings);
        let alt = class.alt_autofit();
        let w = if which & FIT_WIDTH != 0 || alt {
            bbox.width() + settings.char_width
        } else {
            0.0
        };
        let h = if which & FIT_HEIGHT != 0 || alt {
            let above = bbox.ne.y - obj.at.y;
            let below = obj.at.y - bbox.sw.y;
            2.0 * above.max(below) + 0.5 * settings.char_height
        } else {
            0.0
        };
        class.fit(obj, w, h);
        obj.set.insert(PropMask::FIT);
    }

    // ========================================================================
    // Layout
    // ========================================================================

    fn resolve_layout(&mut self, id: ObjId) -> Result<()> {
        let is_line = self.object(id).is_line();
        if !is_line {
            self.place_block(id);
        } else if self.path.len() < 2 {
            self.default_path(id)?;
        }

        let path = if is_line {
            self.path.points().to_vec()
        } else {
            Vec::new()
        };
        let obj = self.object_mut(id);
        obj.bbox = BBox::EMPTY;
        obj.path = path;
        let class = obj.class;
        class.check(obj)?;

        if is_line {
            self.autochop(id);
            let obj = self.object_mut(id);
            let (Some(&first), Some(&last)) = (obj.path.first(), obj.path.last()) else {
                return Ok(());
            };
            obj.enter = first;
            obj.exit = last;
            for p in &obj.path {
                obj.bbox.add_point(p.x, p.y);
            }
            obj.at = Point::new(
                (obj.bbox.ne.x + obj.bbox.sw.x) / 2.0,
                (obj.bbox.ne.y + obj.bbox.sw.y) / 2.0,
            );
            obj.w = obj.bbox.width();
            obj.h = obj.bbox.height();
            if obj.closed {
                obj.set_exit(obj.in_dir);
            }
        } else {
            let obj = self.object_mut(id);
            let (w2, h2) = (obj.w / 2.0, obj.h / 2.0);
            obj.enter = obj.at - obj.half_extent(obj.in_dir);
            obj.exit = obj.at + obj.half_extent(obj.out_dir);
            obj.bbox.add_point(obj.at.x - w2, obj.at.y - h2);
            obj.bbox.add_point(obj.at.x + w2, obj.at.y + h2);
        }

        let out = self.object(id).out_dir;
        self.direction = out;
        Ok(())
    }

    /// Autofit an unsized block, then move it so its `with` edge sits on
    /// its `with` point.
    fn place_block(&mut self, id: ObjId) {
        let obj = self.object_mut(id);
        let has_text = !obj.texts.is_empty();
        if obj.h <= 0.0 {
            if !has_text {
                obj.h = 0.0;
            } else if obj.w <= 0.0 {
                self.size_to_fit(id, FIT_BOTH);
            } else {
                self.size_to_fit(id, FIT_HEIGHT);
            }
        }
        let obj = self.object_mut(id);
        if obj.w <= 0.0 {
            if !has_text {
                obj.w = 0.0;
            } else {
                self.size_to_fit(id, FIT_WIDTH);
            }
        }

        let obj = self.object(id);
        let ofst = obj.offset(obj.with_edge);
        let delta = Point::new(
            (obj.with.x - ofst.x) - obj.at.x,
            (obj.with.y - ofst.y) - obj.at.y,
        );
        if delta.x != 0.0 || delta.y != 0.0 {
            self.move_object(id, delta);
        }
    }

    /// A line with no movement goes one default step in its direction. An
    /// arc also turns a quarter and takes a second step.
    fn default_path(&mut self, id: ObjId) -> Result<()> {
        let obj = self.object(id);
        let (dir, w, h, span) = (obj.in_dir, obj.w, obj.h, obj.span);
        let turn = matches!(obj.class, Class::ArcClass(_)).then(|| {
            Direction::from_index(dir.index() + if obj.cw { 1 } else { 3 })
        });
        let n = self.path.next_point(span)?;
        let mut end = self.path.points()[n] + step(dir, w, h);
        if let Some(out) = turn {
            self.direction = out;
            self.object_mut(id).out_dir = out;
            end += step(out, w, h);
        }
        self.path.set_last(end);
        Ok(())
    }

    /// Translate an object and everything inside it.
    fn move_object(&mut self, id: ObjId, delta: Point) {
        self.object_mut(id).shift(delta);
        for i in 0..self.object(id).children.len() {
            let child = self.object(id).children[i];
            self.move_object(child, delta);
        }
    }

    // ========================================================================
    // Chopping
    // ========================================================================

    /// Trim both ends of a `chop` line to the border of the object sitting
    /// on each end.
    fn autochop(&mut self, id: ObjId) {
        let obj = self.object(id);
        if !obj.chop || obj.path.len() < 2 {
            return;
        }
        let mut path = obj.path.clone();
        let (from, to) = (obj.from, obj.to);
        let n = path.len();
        if let Some(p) = self.chop_point(path[n - 2], path[n - 1], to) {
            path[n - 1] = p;
        }
        if let Some(p) = self.chop_point(path[1], path[0], from) {
            path[0] = p;
        }
        self.object_mut(id).path = path;
    }

    fn chop_point(&self, from: Point, to: Point, hint: Option<ObjId>) -> Option<Point> {
        let chopper = hint
            .filter(|h| self.object(*h).class.chops())
            .or_else(|| self.find_chopper(self.list(), to, from))?;
        let obj = self.object(chopper);
        let p = obj.class.chop(obj, from);
        crate::log::debug!(
            class = obj.class.name(),
            x = p.x,
            y = p.y,
            "chopped line end"
        );
        Some(p)
    }

    /// The most recent chop-capable object centered on `center` whose box
    /// does not contain `other`, searching into groups.
    fn find_chopper(&self, list: &[ObjId], center: Point, other: Point) -> Option<ObjId> {
        for &id in list.iter().rev() {
            let obj = self.object(id);
            if obj.class.chops() && obj.at == center && !obj.bbox.contains(other) {
                return Some(id);
            }
            if let Some(found) = self.find_chopper(&obj.children, center, other) {
                return Some(found);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::compile;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    fn build(source: &str) -> RenderContext {
        match compile(source) {
            Ok(ctx) => ctx,
            Err(e) => panic!("{source:?} failed: {}", e.kind),
        }
    }

    fn fails(source: &str) -> ErrorKind {
        match compile(source) {
            Ok(_) => panic!("{source:?} should fail"),
            Err(e) => e.kind,
        }
    }

    #[test]
    fn objects_chain_exit_to_entry() {
        let ctx = build("box; arrow; circle");
        let (b, a, c) = (&ctx.objects[0], &ctx.objects[1], &ctx.objects[2]);
        assert_eq!(b.at, Point::ORIGIN);
        assert_eq!(a.path, vec![Point::new(0.375, 0.0), Point::new(0.875, 0.0)]);
        assert!(close(c.enter, a.exit));
        assert!(close(c.at, Point::new(1.125, 0.0)));
    }

    #[test]
    fn direction_change_moves_previous_exit() {
        let ctx = build("box; down; line");
        assert_eq!(ctx.objects[0].exit, Point::new(0.0, -0.25));
        assert_eq!(ctx.objects[1].path[1], Point::new(0.0, -0.75));
    }

    #[test]
    fn percent_distance_scales_default() {
        let ctx = build("arrow right 200%");
        let a = &ctx.objects[0];
        assert_eq!(a.path, vec![Point::ORIGIN, Point::new(1.0, 0.0)]);
        assert!(a.rarrow && !a.larrow);
    }

    #[test]
    fn leading_distance_uses_current_direction() {
        let ctx = build("up; line 2");
        assert_eq!(ctx.objects[0].path[1], Point::new(0.0, 2.0));
        assert_eq!(fails("box 2"), ErrorKind::Syntax);
    }

    #[test]
    fn arc_turns_a_quarter() {
        let ctx = build("arc");
        let a = &ctx.objects[0];
        assert_eq!(a.path[1], Point::new(0.25, 0.25));
        assert_eq!(a.out_dir, Direction::Up);
        assert_eq!(ctx.direction, Direction::Up);
        let cw = build("arc cw");
        assert_eq!(cw.objects[0].path[1], Point::new(0.25, -0.25));
    }

    #[test]
    fn at_with_edge_places_block() {
        let ctx = build("box with .sw at (1,1)");
        let b = &ctx.objects[0];
        assert!(close(b.at, Point::new(1.375, 1.25)));
        assert!(close(b.bbox.sw, Point::new(1.0, 1.0)));
    }

    #[test]
    fn set_once_properties() {
        assert_eq!(fails("box wid 1 wid 2"), ErrorKind::AlreadySet);
        assert_eq!(fails("circle rad 1 diameter 3"), ErrorKind::AlreadySet);
        assert_eq!(fails("[box] wid 1"), ErrorKind::AlreadyFixed);
        assert_eq!(fails("box at (0,0) at (1,1)"), ErrorKind::AtAlreadySet);
        assert_eq!(fails("line from (0,0) from (1,1)"), ErrorKind::FromAlreadySet);
    }

    #[test]
    fn line_only_attributes() {
        assert_eq!(fails("box right"), ErrorKind::LineOnly);
        assert_eq!(fails("box from (1,1)"), ErrorKind::UseAt);
        assert_eq!(fails("line at (1,1)"), ErrorKind::UseFromTo);
        assert_eq!(fails("line then"), ErrorKind::NoPriorPath);
        assert_eq!(fails("line right close"), ErrorKind::CloseNeedsThree);
        assert_eq!(
            fails("line right then down close close"),
            ErrorKind::AlreadyClosed
        );
        assert_eq!(fails("line right then down close to (3,3)"), ErrorKind::PolygonClosed);
    }

    #[test]
    fn text_autofit() {
        let ctx = build(r#"box "Hi" fit"#);
        let b = &ctx.objects[0];
        assert!(b.w > 0.0 && b.w < 0.75);
        assert!(b.set.has(PropMask::FIT));
        let empty = build("box wid 0 ht 0");
        assert_eq!((empty.objects[0].w, empty.objects[0].h), (0.0, 0.0));
    }

    #[test]
    fn too_many_labels() {
        let kind = fails(r#"box "1" "2" "3" "4" "5" "6""#);
        assert_eq!(kind, ErrorKind::TooManyTextTerms);
    }

    #[test]
    fn chop_trims_to_circles() {
        let ctx = build("circle; C: circle at (2,0); arrow from 1st circle to C chop");
        let a = &ctx.objects[2];
        assert!(close(a.path[0], Point::new(0.25, 0.0)));
        assert!(close(a.path[1], Point::new(1.75, 0.0)));
    }

    #[test]
    fn sublist_moves_children() {
        let ctx = build("box; [circle; box]");
        let group = &ctx.objects[3];
        assert_eq!(group.children, vec![ObjId(1), ObjId(2)]);
        let circle = &ctx.objects[1];
        assert!(close(circle.at, Point::new(0.625, 0.0)));
        assert!(close(group.enter, Point::new(0.375, 0.0)));
    }

    #[test]
    fn same_copies_style_and_shape() {
        let ctx = build("line right then up dashed; line same");
        let second = &ctx.objects[1];
        assert_eq!(second.path.len(), 3);
        assert_eq!(second.dashed, 0.05);
        assert_eq!(fails("box; circle same"), ErrorKind::NoPriorSame);
    }

    #[test]
    fn behind_lowers_layer() {
        let ctx = build("A: box; circle behind A");
        assert_eq!(ctx.objects[1].layer, 999);
    }

    #[test]
    fn named_place_is_a_marker() {
        let ctx = build("box; P: (5,5); circle");
        assert_eq!(ctx.objects[1].at, Point::new(5.0, 5.0));
        assert!(ctx.objects[1].bbox.is_empty());
        assert!(close(ctx.objects[2].enter, ctx.objects[0].exit));
    }
}
