//! Per-class behavior.
//!
//! Every object class is a unit type implementing [`Shape`]. The hooks
//! cover the whole object life cycle:
//! - `init` seeds size and style from the script variables
//! - `on_prop` keeps derived values in sync after an attribute changes
//! - `check` validates the finished object and widens its bounding box
//! - `fit` sizes the object around its text
//! - `offset` and `chop` locate compass points and line endpoints
//! - `render` writes SVG
//!
//! [`Class`] dispatches to the unit types without boxing.

use enum_dispatch::enum_dispatch;

use crate::errors::{CompileError, ErrorKind};
use crate::keywords::ClassName;
use crate::types::{Compass, Point};

use super::object::{Object, PropKind};
use super::svg::SvgWriter;
use super::variables::Variables;

/// 1 - 1/sqrt(2): how far a rounded corner's compass point sits inside the
/// square corner, per unit of radius.
const ROUND_CORNER_INSET: f64 = 0.29289321881345252392;
const FRAC_1_SQRT_2: f64 = 0.70710678118654747608;

#[enum_dispatch]
pub trait Shape {
    fn name(&self) -> &'static str;

    /// Line-like objects are built from a path instead of a center and size.
    fn is_line(&self) -> bool {
        false
    }

    /// `ljust`/`rjust` text hugs the object's sides instead of its center.
    fn justified(&self) -> bool {
        false
    }

    /// Autofit always grows both dimensions.
    fn alt_autofit(&self) -> bool {
        false
    }

    fn init(&self, _obj: &mut Object, _vars: &Variables) {}

    /// Called after a numeric or color attribute is applied.
    fn on_prop(&self, _obj: &mut Object, _prop: PropKind) {}

    /// Validation run once all attributes are in. `obj.path` already holds
    /// the final vertices for lines.
    fn check(&self, _obj: &mut Object) -> Result<(), CompileError> {
        Ok(())
    }

    /// Whether lines ending at this object's center get trimmed to its border.
    fn chops(&self) -> bool {
        false
    }

    /// Where a line from `toward` to the center crosses the border.
    fn chop(&self, obj: &Object, _toward: Point) -> Point {
        obj.at
    }

    /// Offset of a compass point from the center.
    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        box_offset(obj, cp, 0.0)
    }

    fn fits(&self) -> bool {
        false
    }

    /// Resize around text measuring `w` by `h`. Non-positive means keep.
    fn fit(&self, _obj: &mut Object, _w: f64, _h: f64) {}

    fn render(&self, obj: &Object, out: &mut SvgWriter);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrowClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircleClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CylinderClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiamondClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EllipseClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvalClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplineClass;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextClass;
/// A `[...]` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SublistClass;
/// A named position (`Name: position`), never drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoopClass;

#[enum_dispatch(Shape)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    ArcClass,
    ArrowClass,
    BoxClass,
    CircleClass,
    CylinderClass,
    DiamondClass,
    DotClass,
    EllipseClass,
    FileClass,
    LineClass,
    MoveClass,
    OvalClass,
    SplineClass,
    TextClass,
    SublistClass,
    NoopClass,
}

impl Class {
    pub fn for_name(name: ClassName) -> Class {
        match name {
            ClassName::Arc => ArcClass.into(),
            ClassName::Arrow => ArrowClass.into(),
            ClassName::Box => BoxClass.into(),
            ClassName::Circle => CircleClass.into(),
            ClassName::Cylinder => CylinderClass.into(),
            ClassName::Diamond => DiamondClass.into(),
            ClassName::Dot => DotClass.into(),
            ClassName::Ellipse => EllipseClass.into(),
            ClassName::File => FileClass.into(),
            ClassName::Line => LineClass.into(),
            ClassName::Move => MoveClass.into(),
            ClassName::Oval => OvalClass.into(),
            ClassName::Spline => SplineClass.into(),
            ClassName::Text => TextClass.into(),
        }
    }

    /// Does `nth` counting with this class name select `self`?
    pub fn matches(self, name: ClassName) -> bool {
        self == Class::for_name(name)
    }
}

// ============================================================================
// Shared geometry
// ============================================================================

/// Compass points of a rectangle whose corners are rounded by `rad`.
fn box_offset(obj: &Object, cp: Compass, rad: f64) -> Point {
    let w2 = 0.5 * obj.w;
    let h2 = 0.5 * obj.h;
    let rx = if rad <= 0.0 {
        0.0
    } else {
        ROUND_CORNER_INSET * rad.min(w2).min(h2)
    };
    let (x, y) = match cp {
        Compass::C => (0.0, 0.0),
        Compass::N => (0.0, h2),
        Compass::NE => (w2 - rx, h2 - rx),
        Compass::E => (w2, 0.0),
        Compass::SE => (w2 - rx, rx - h2),
        Compass::S => (0.0, -h2),
        Compass::SW => (rx - w2, rx - h2),
        Compass::W => (-w2, 0.0),
        Compass::NW => (rx - w2, h2 - rx),
    };
    Point::new(x, y)
}

fn ellipse_offset(obj: &Object, cp: Compass) -> Point {
    let w = 0.5 * obj.w;
    let h = 0.5 * obj.h;
    let w2 = w * FRAC_1_SQRT_2;
    let h2 = h * FRAC_1_SQRT_2;
    let (x, y) = match cp {
        Compass::C => (0.0, 0.0),
        Compass::N => (0.0, h),
        Compass::NE => (w2, h2),
        Compass::E => (w, 0.0),
        Compass::SE => (w2, -h2),
        Compass::S => (0.0, -h),
        Compass::SW => (-w2, -h2),
        Compass::W => (-w, 0.0),
        Compass::NW => (-w2, h2),
    };
    Point::new(x, y)
}

/// Snap the direction toward `pt` to one of eight compass points, in a
/// space where the object is square, and return that point.
fn box_chop(obj: &Object, pt: Point) -> Point {
    if obj.w <= 0.0 || obj.h <= 0.0 {
        return obj.at;
    }
    let dx = (pt.x - obj.at.x) * obj.h / obj.w;
    let dy = pt.y - obj.at.y;
    let cp = if dx > 0.0 {
        if dy >= 2.414 * dx {
            Compass::N
        } else if dy >= 0.414 * dx {
            Compass::NE
        } else if dy >= -0.414 * dx {
            Compass::E
        } else if dy > -2.414 * dx {
            Compass::SE
        } else {
            Compass::S
        }
    } else if dy >= -2.414 * dx {
        Compass::N
    } else if dy >= -0.414 * dx {
        Compass::NW
    } else if dy >= 0.414 * dx {
        Compass::W
    } else if dy > 2.414 * dx {
        Compass::SW
    } else {
        Compass::S
    };
    obj.at + obj.offset(cp)
}

fn circle_chop(obj: &Object, pt: Point) -> Point {
    let d = pt - obj.at;
    let dist = d.x.hypot(d.y);
    if dist < obj.rad || dist <= 0.0 {
        return obj.at;
    }
    Point::new(obj.at.x + d.x * obj.rad / dist, obj.at.y + d.y * obj.rad / dist)
}

/// Control point of the quadratic curve drawing an arc from `f` to `t`.
/// `scale` 1 gives the rendered curve, 0.5 a point on it for the bbox.
pub(crate) fn arc_control_point(cw: bool, f: Point, t: Point, scale: f64) -> Point {
    let m = f.midpoint(t);
    let d = t - f;
    if cw {
        Point::new(m.x - 0.5 * scale * d.y, m.y + 0.5 * scale * d.x)
    } else {
        Point::new(m.x + 0.5 * scale * d.y, m.y - 0.5 * scale * d.x)
    }
}

/// A point `r` back from `t` toward `f`. When the two corners of a segment
/// would overlap, `r` is cut to half the segment and the flag is set.
fn radius_midpoint(f: Point, t: Point, r: f64) -> (Point, bool) {
    let d = t - f;
    let dist = d.x.hypot(d.y);
    if dist <= 0.0 {
        return (t, false);
    }
    let (ux, uy) = (d.x / dist, d.y / dist);
    let (r, is_mid) = if r > 0.5 * dist { (0.5 * dist, true) } else { (r, false) };
    (Point::new(t.x - r * ux, t.y - r * uy), is_mid)
}

/// Arrowheads at either end of a path. Each one pulls its endpoint back.
fn draw_arrows(obj: &Object, path: &mut [Point], out: &mut SvgWriter) {
    let n = path.len();
    if n < 2 {
        return;
    }
    if obj.larrow {
        let from = path[1];
        out.arrowhead(obj, from, &mut path[0]);
    }
    if obj.rarrow {
        let from = path[n - 2];
        out.arrowhead(obj, from, &mut path[n - 1]);
    }
}

/// Path ending: close the polygon or drop the fill.
fn finish_path(obj: &Object, out: &mut SvgWriter) {
    let fill = if obj.closed {
        out.push("Z");
        obj.fill
    } else {
        -1.0
    };
    out.push("\" ");
    out.style(obj, fill, if obj.closed { 3 } else { 0 });
    out.push("\" />\n");
}

/// A polyline whose corners are rounded with quadratic curves of radius `r`.
fn radius_path(obj: &Object, a: &[Point], r: f64, out: &mut SvgWriter) {
    let n = a.len();
    let last = if obj.closed { n } else { n - 1 };
    out.xy("<path d=\"M", a[0]);
    let (m, _) = radius_midpoint(a[0], a[1], r);
    out.xy(" L ", m);
    let mut an = a[n - 1];
    for i in 1..last {
        an = if i < n - 1 { a[i + 1] } else { a[0] };
        let (m, is_mid) = radius_midpoint(an, a[i], r);
        out.xy(" Q ", a[i]);
        out.xy(" ", m);
        if !is_mid {
            let (m, _) = radius_midpoint(a[i], an, r);
            out.xy(" L ", m);
        }
    }
    out.xy(" L ", an);
    finish_path(obj, out);
}

fn render_line(obj: &Object, out: &mut SvgWriter) {
    if obj.sw > 0.0 && obj.path.len() >= 2 {
        let mut path = obj.path.clone();
        draw_arrows(obj, &mut path, out);
        if obj.rad > 0.0 && path.len() > 2 {
            radius_path(obj, &path, obj.rad, out);
        } else {
            let mut cmd = "<path d=\"M";
            for p in &path {
                out.xy(cmd, *p);
                cmd = "L";
            }
            finish_path(obj, out);
        }
    }
    out.text(obj);
}

fn init_line(obj: &mut Object, vars: &Variables) {
    obj.w = vars.value("linewid");
    obj.h = vars.value("lineht");
    obj.rad = vars.value("linerad");
}

/// Rectangle outline shared by boxes and ovals.
fn render_box(obj: &Object, out: &mut SvgWriter) {
    if obj.sw >= 0.0 {
        let w2 = 0.5 * obj.w;
        let h2 = 0.5 * obj.h;
        let Point { x, y } = obj.at;
        let rad = obj.rad;
        if rad <= 0.0 {
            out.xy("<path d=\"M", Point::new(x - w2, y - h2));
            out.xy("L", Point::new(x + w2, y - h2));
            out.xy("L", Point::new(x + w2, y + h2));
            out.xy("L", Point::new(x - w2, y + h2));
        } else {
            let rad = rad.min(w2).min(h2);
            let x0 = x - w2;
            let x1 = x0 + rad;
            let x3 = x + w2;
            let x2 = x3 - rad;
            let y0 = y - h2;
            let y1 = y0 + rad;
            let y3 = y + h2;
            let y2 = y3 - rad;
            out.xy("<path d=\"M", Point::new(x1, y0));
            if x2 > x1 {
                out.xy("L", Point::new(x2, y0));
            }
            out.arc(rad, rad, Point::new(x3, y1));
            if y2 > y1 {
                out.xy("L", Point::new(x3, y2));
            }
            out.arc(rad, rad, Point::new(x2, y3));
            if x2 > x1 {
                out.xy("L", Point::new(x1, y3));
            }
            out.arc(rad, rad, Point::new(x0, y2));
            if y2 > y1 {
                out.xy("L", Point::new(x0, y1));
            }
            out.arc(rad, rad, Point::new(x1, y0));
        }
        out.push("Z\" ");
        out.style(obj, obj.fill, 3);
        out.push("\" />\n");
    }
    out.text(obj);
}

/// Box-like objects size themselves to whatever the text needs.
fn fit_box(obj: &mut Object, w: f64, h: f64) {
    if w > 0.0 {
        obj.w = w;
    }
    if h > 0.0 {
        obj.h = h;
    }
}

// ============================================================================
// Classes
// ============================================================================

impl Shape for ArcClass {
    fn name(&self) -> &'static str {
        "arc"
    }

    fn is_line(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = vars.value("arcrad");
        obj.h = obj.w;
    }

    fn check(&self, obj: &mut Object) -> Result<(), CompileError> {
        if obj.path.len() > 2 {
            return Err(CompileError::new(ErrorKind::ArcGeometry, obj.span));
        }
        if let [f, t] = obj.path[..] {
            let m = arc_control_point(obj.cw, f, t, 0.5);
            obj.bbox.add_point(m.x, m.y);
        }
        Ok(())
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        if obj.path.len() < 2 || obj.sw <= 0.0 {
            return;
        }
        let mut f = obj.path[0];
        let mut t = obj.path[1];
        let m = arc_control_point(obj.cw, f, t, 1.0);
        if obj.larrow {
            out.arrowhead(obj, m, &mut f);
        }
        if obj.rarrow {
            out.arrowhead(obj, m, &mut t);
        }
        out.xy("<path d=\"M", f);
        out.xy("Q", m);
        out.xy(" ", t);
        out.push("\" ");
        out.style(obj, obj.fill, 0);
        out.push("\" />\n");
        out.text(obj);
    }
}

impl Shape for ArrowClass {
    fn name(&self) -> &'static str {
        "arrow"
    }

    fn is_line(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        init_line(obj, vars);
        obj.rarrow = true;
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        render_line(obj, out);
    }
}

impl Shape for BoxClass {
    fn name(&self) -> &'static str {
        "box"
    }

    fn justified(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = vars.value("boxwid");
        obj.h = vars.value("boxht");
        obj.rad = vars.value("boxrad");
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        box_chop(obj, toward)
    }

    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        box_offset(obj, cp, obj.rad)
    }

    fn fits(&self) -> bool {
        true
    }

    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        fit_box(obj, w, h);
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        render_box(obj, out);
    }
}

impl Shape for CircleClass {
    fn name(&self) -> &'static str {
        "circle"
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = 2.0 * vars.value("circlerad");
        obj.h = obj.w;
        obj.rad = 0.5 * obj.w;
    }

    fn on_prop(&self, obj: &mut Object, prop: PropKind) {
        match prop {
            PropKind::Radius | PropKind::Diameter => {
                obj.w = 2.0 * obj.rad;
                obj.h = obj.w;
            }
            PropKind::Width => {
                obj.h = obj.w;
                obj.rad = 0.5 * obj.w;
            }
            PropKind::Height => {
                obj.w = obj.h;
                obj.rad = 0.5 * obj.w;
            }
            _ => {}
        }
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        circle_chop(obj, toward)
    }

    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        ellipse_offset(obj, cp)
    }

    fn fits(&self) -> bool {
        true
    }

    /// The smallest circle around a `w` by `h` text block.
    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        let mut mx = w.max(0.0).max(h);
        if w * h > 0.0 && w * w + h * h > mx * mx {
            mx = w.hypot(h);
        }
        if mx > 0.0 {
            obj.rad = 0.5 * mx;
            obj.w = mx;
            obj.h = mx;
        }
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        if obj.sw >= 0.0 {
            out.x_attr("<circle cx=\"", obj.at.x, "\"");
            out.y_attr(" cy=\"", obj.at.y, "\"");
            out.dis(" r=\"", obj.rad, "\"");
            out.style(obj, obj.fill, 3);
            out.push("\" />\n");
        }
        out.text(obj);
    }
}

impl Shape for CylinderClass {
    fn name(&self) -> &'static str {
        "cylinder"
    }

    fn justified(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = vars.value("cylwid");
        obj.h = vars.value("cylht");
        obj.rad = vars.value("cylrad");
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        box_chop(obj, toward)
    }

    /// Diagonal points sit where the side walls meet the end caps.
    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        let w2 = 0.5 * obj.w;
        let h1 = 0.5 * obj.h;
        let h2 = h1 - obj.rad;
        let (x, y) = match cp {
            Compass::C => (0.0, 0.0),
            Compass::N => (0.0, h1),
            Compass::NE => (w2, h2),
            Compass::E => (w2, 0.0),
            Compass::SE => (w2, -h2),
            Compass::S => (0.0, -h1),
            Compass::SW => (-w2, -h2),
            Compass::W => (-w2, 0.0),
            Compass::NW => (-w2, h2),
        };
        Point::new(x, y)
    }

    fn fits(&self) -> bool {
        true
    }

    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        if w > 0.0 {
            obj.w = w;
        }
        if h > 0.0 {
            obj.h = h + 0.25 * obj.rad + obj.sw;
        }
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        if obj.sw >= 0.0 {
            let w2 = 0.5 * obj.w;
            let h2 = 0.5 * obj.h;
            let rad = obj.rad.clamp(0.0, h2.max(0.0));
            let Point { x, y } = obj.at;
            out.xy("<path d=\"M", Point::new(x - w2, y + h2 - rad));
            out.xy("L", Point::new(x - w2, y - h2 + rad));
            out.arc(w2, rad, Point::new(x + w2, y - h2 + rad));
            out.xy("L", Point::new(x + w2, y + h2 - rad));
            out.arc(w2, rad, Point::new(x - w2, y + h2 - rad));
            out.arc(w2, rad, Point::new(x + w2, y + h2 - rad));
            out.push("\" ");
            out.style(obj, obj.fill, 3);
            out.push("\" />\n");
        }
        out.text(obj);
    }
}

impl Shape for DiamondClass {
    fn name(&self) -> &'static str {
        "diamond"
    }

    fn alt_autofit(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = vars.value("diamondwid");
        obj.h = vars.value("diamondht");
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        box_chop(obj, toward)
    }

    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        let w2 = 0.5 * obj.w;
        let w4 = 0.25 * obj.w;
        let h2 = 0.5 * obj.h;
        let h4 = 0.25 * obj.h;
        let (x, y) = match cp {
            Compass::C => (0.0, 0.0),
            Compass::N => (0.0, h2),
            Compass::NE => (w4, h4),
            Compass::E => (w2, 0.0),
            Compass::SE => (w4, -h4),
            Compass::S => (0.0, -h2),
            Compass::SW => (-w4, -h4),
            Compass::W => (-w2, 0.0),
            Compass::NW => (-w4, h4),
        };
        Point::new(x, y)
    }

    fn fits(&self) -> bool {
        true
    }

    /// Grow while keeping the aspect ratio so that the text's corners
    /// touch the diamond's sides.
    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        if obj.w <= 0.0 {
            obj.w = 1.5 * w;
        }
        if obj.h <= 0.0 {
            obj.h = 1.5 * h;
        }
        if obj.w > 0.0 && obj.h > 0.0 {
            let x = obj.w * h / obj.h + w;
            let y = obj.h * x / obj.w;
            obj.w = x;
            obj.h = y;
        }
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        if obj.sw >= 0.0 {
            let w2 = 0.5 * obj.w;
            let h2 = 0.5 * obj.h;
            let Point { x, y } = obj.at;
            out.xy("<path d=\"M", Point::new(x - w2, y));
            out.xy("L", Point::new(x, y - h2));
            out.xy("L", Point::new(x + w2, y));
            out.xy("L", Point::new(x, y + h2));
            out.push("Z\" ");
            out.style(obj, obj.fill, 3);
            out.push("\" />\n");
        }
        out.text(obj);
    }
}

impl Shape for DotClass {
    fn name(&self) -> &'static str {
        "dot"
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.rad = vars.value("dotrad");
        obj.w = 6.0 * obj.rad;
        obj.h = obj.w;
        obj.fill = obj.color;
    }

    /// A dot is a single color: setting either one sets both.
    fn on_prop(&self, obj: &mut Object, prop: PropKind) {
        match prop {
            PropKind::Color => obj.fill = obj.color,
            PropKind::Fill => obj.color = obj.fill,
            _ => {}
        }
    }

    fn check(&self, obj: &mut Object) -> Result<(), CompileError> {
        obj.w = 0.0;
        obj.h = 0.0;
        obj.bbox.add_ellipse(obj.at, obj.rad, obj.rad);
        Ok(())
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        circle_chop(obj, toward)
    }

    fn offset(&self, _obj: &Object, _cp: Compass) -> Point {
        Point::ORIGIN
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        if obj.sw >= 0.0 {
            out.x_attr("<circle cx=\"", obj.at.x, "\"");
            out.y_attr(" cy=\"", obj.at.y, "\"");
            out.dis(" r=\"", obj.rad, "\"");
            out.style(obj, obj.fill, 2);
            out.push("\" />\n");
        }
        out.text(obj);
    }
}

impl Shape for EllipseClass {
    fn name(&self) -> &'static str {
        "ellipse"
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = vars.value("ellipsewid");
        obj.h = vars.value("ellipseht");
    }

    fn chops(&self) -> bool {
        true
    }

    /// Scale to a circle of diameter `h`, intersect, and scale back.
    fn chop(&self, obj: &Object, toward: Point) -> Point {
        if obj.w <= 0.0 || obj.h <= 0.0 {
            return obj.at;
        }
        let d = toward - obj.at;
        let s = obj.h / obj.w;
        let dq = d.x * s;
        let dist = dq.hypot(d.y);
        if dist < obj.h {
            return obj.at;
        }
        Point::new(
            obj.at.x + 0.5 * dq * obj.h / (dist * s),
            obj.at.y + 0.5 * d.y * obj.h / dist,
        )
    }

    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        ellipse_offset(obj, cp)
    }

    fn fits(&self) -> bool {
        true
    }

    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        fit_box(obj, w, h);
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        if obj.sw >= 0.0 {
            out.x_attr("<ellipse cx=\"", obj.at.x, "\"");
            out.y_attr(" cy=\"", obj.at.y, "\"");
            out.dis(" rx=\"", 0.5 * obj.w, "\"");
            out.dis(" ry=\"", 0.5 * obj.h, "\"");
            out.style(obj, obj.fill, 3);
            out.push("\" />\n");
        }
        out.text(obj);
    }
}

/// The folded corner size of a file, kept between a quarter and all of the
/// smaller half-dimension.
fn file_fold(obj: &Object) -> f64 {
    let mn = (0.5 * obj.w).min(0.5 * obj.h);
    let rad = obj.rad.min(mn);
    if rad < 0.25 * mn { 0.25 * mn } else { rad }
}

impl Shape for FileClass {
    fn name(&self) -> &'static str {
        "file"
    }

    fn justified(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = vars.value("filewid");
        obj.h = vars.value("fileht");
        obj.rad = vars.value("filerad");
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        box_chop(obj, toward)
    }

    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        let w2 = 0.5 * obj.w;
        let h2 = 0.5 * obj.h;
        let rx = 0.5 * file_fold(obj);
        let (x, y) = match cp {
            Compass::C => (0.0, 0.0),
            Compass::N => (0.0, h2),
            Compass::NE => (w2 - rx, h2 - rx),
            Compass::E => (w2, 0.0),
            Compass::SE => (w2, -h2),
            Compass::S => (0.0, -h2),
            Compass::SW => (-w2, -h2),
            Compass::W => (-w2, 0.0),
            Compass::NW => (-w2, h2),
        };
        Point::new(x, y)
    }

    fn fits(&self) -> bool {
        true
    }

    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        if w > 0.0 {
            obj.w = w;
        }
        if h > 0.0 {
            obj.h = h + 2.0 * obj.rad;
        }
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        if obj.sw >= 0.0 {
            let w2 = 0.5 * obj.w;
            let h2 = 0.5 * obj.h;
            let rad = file_fold(obj);
            let Point { x, y } = obj.at;
            out.xy("<path d=\"M", Point::new(x - w2, y - h2));
            out.xy("L", Point::new(x + w2, y - h2));
            out.xy("L", Point::new(x + w2, y + (h2 - rad)));
            out.xy("L", Point::new(x + (w2 - rad), y + h2));
            out.xy("L", Point::new(x - w2, y + h2));
            out.push("Z\" ");
            out.style(obj, obj.fill, 1);
            out.push("\" />\n");
            out.xy("<path d=\"M", Point::new(x + (w2 - rad), y + h2));
            out.xy("L", Point::new(x + (w2 - rad), y + (h2 - rad)));
            out.xy("L", Point::new(x + w2, y + (h2 - rad)));
            out.push("\" ");
            out.style(obj, obj.fill, 0);
            out.push("\" />\n");
        }
        out.text(obj);
    }
}

impl Shape for LineClass {
    fn name(&self) -> &'static str {
        "line"
    }

    fn is_line(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        init_line(obj, vars);
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        render_line(obj, out);
    }
}

impl Shape for MoveClass {
    fn name(&self) -> &'static str {
        "move"
    }

    fn is_line(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.w = vars.value("movewid");
        obj.h = obj.w;
        obj.fill = -1.0;
        obj.color = -1.0;
        obj.sw = -1.0;
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        out.text(obj);
    }
}

impl Shape for OvalClass {
    fn name(&self) -> &'static str {
        "oval"
    }

    fn justified(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        obj.h = vars.value("ovalht");
        obj.w = vars.value("ovalwid");
        obj.rad = 0.5 * obj.w.min(obj.h);
    }

    /// The ends stay semicircular whatever changes.
    fn on_prop(&self, obj: &mut Object, _prop: PropKind) {
        obj.rad = 0.5 * obj.w.min(obj.h);
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        box_chop(obj, toward)
    }

    fn offset(&self, obj: &Object, cp: Compass) -> Point {
        box_offset(obj, cp, obj.rad)
    }

    fn fits(&self) -> bool {
        true
    }

    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        if h > 0.0 {
            obj.h = h;
        }
        if w > 0.0 {
            obj.w = w + obj.h;
        }
        if obj.w < obj.h {
            obj.w = obj.h;
        }
        obj.rad = 0.5 * obj.w.min(obj.h);
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        render_box(obj, out);
    }
}

impl Shape for SplineClass {
    fn name(&self) -> &'static str {
        "spline"
    }

    fn is_line(&self) -> bool {
        true
    }

    fn init(&self, obj: &mut Object, vars: &Variables) {
        init_line(obj, vars);
        obj.rad = 1000.0;
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        let n = obj.path.len();
        if obj.sw > 0.0 && (n < 3 || obj.rad <= 0.0) {
            render_line(obj, out);
            return;
        }
        if obj.sw > 0.0 {
            let mut path = obj.path.clone();
            draw_arrows(obj, &mut path, out);
            radius_path(obj, &path, obj.rad, out);
        }
        out.text(obj);
    }
}

impl Shape for TextClass {
    fn name(&self) -> &'static str {
        "text"
    }

    fn init(&self, obj: &mut Object, _vars: &Variables) {
        obj.sw = 0.0;
        obj.w = 0.0;
        obj.h = 0.0;
    }

    fn chops(&self) -> bool {
        true
    }

    fn chop(&self, obj: &Object, toward: Point) -> Point {
        box_chop(obj, toward)
    }

    fn fits(&self) -> bool {
        true
    }

    fn fit(&self, obj: &mut Object, w: f64, h: f64) {
        fit_box(obj, w, h);
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        out.text(obj);
    }
}

impl Shape for SublistClass {
    fn name(&self) -> &'static str {
        "[]"
    }

    fn render(&self, obj: &Object, out: &mut SvgWriter) {
        out.text(obj);
    }
}

impl Shape for NoopClass {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn render(&self, _obj: &Object, _out: &mut SvgWriter) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, Span};

    fn make(class: impl Into<Class>) -> Object {
        let class = class.into();
        let mut obj = Object::new(class, Span::default(), Point::ORIGIN, Direction::Right);
        class.init(&mut obj, &Variables::new());
        obj
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn defaults_come_from_variables() {
        let b = make(BoxClass);
        assert_eq!((b.w, b.h), (0.75, 0.5));
        let c = make(CircleClass);
        assert_eq!((c.w, c.h, c.rad), (0.5, 0.5, 0.25));
        let a = make(ArrowClass);
        assert!(a.rarrow && !a.larrow);
        let m = make(MoveClass);
        assert!(m.sw < 0.0 && m.color < 0.0);
    }

    #[test]
    fn circle_keeps_width_height_and_radius_together() {
        let mut c = make(CircleClass);
        let class = c.class;
        c.rad = 1.0;
        class.on_prop(&mut c, PropKind::Radius);
        assert_eq!((c.w, c.h), (2.0, 2.0));
        c.h = 4.0;
        class.on_prop(&mut c, PropKind::Height);
        assert_eq!((c.w, c.rad), (4.0, 2.0));
    }

    #[test]
    fn rounded_box_corners_move_inward() {
        let mut b = make(BoxClass);
        b.w = 2.0;
        b.h = 2.0;
        assert!(close(b.offset(Compass::NE), Point::new(1.0, 1.0)));
        b.rad = 1.0;
        let ne = b.offset(Compass::NE);
        assert!(close(ne, Point::new(1.0 - ROUND_CORNER_INSET, 1.0 - ROUND_CORNER_INSET)));
        assert!(close(b.offset(Compass::N), Point::new(0.0, 1.0)));
    }

    #[test]
    fn box_chop_picks_compass_points() {
        let mut b = make(BoxClass);
        b.w = 2.0;
        b.h = 1.0;
        assert!(close(b.class.chop(&b, Point::new(5.0, 0.0)), Point::new(1.0, 0.0)));
        assert!(close(b.class.chop(&b, Point::new(0.0, -5.0)), Point::new(0.0, -0.5)));
        assert!(close(b.class.chop(&b, Point::new(4.0, 2.0)), Point::new(1.0, 0.5)));
    }

    #[test]
    fn circle_chop_lands_on_the_circle() {
        let c = make(CircleClass);
        let p = c.class.chop(&c, Point::new(3.0, 4.0));
        assert!(close(p, Point::new(0.15, 0.2)));
        assert_eq!(c.class.chop(&c, Point::new(0.1, 0.0)), Point::ORIGIN);
    }

    #[test]
    fn ellipse_chop_on_axis() {
        let e = make(EllipseClass);
        let p = e.class.chop(&e, Point::new(3.0, 0.0));
        assert!(close(p, Point::new(0.375, 0.0)));
    }

    #[test]
    fn fitting_text() {
        let mut c = make(CircleClass);
        CircleClass.fit(&mut c, 0.3, 0.4);
        assert!((c.w - 0.5).abs() < 1e-12);
        let mut o = make(OvalClass);
        OvalClass.fit(&mut o, 1.0, 0.2);
        assert!((o.w - 1.2).abs() < 1e-12);
        assert!((o.rad - 0.1).abs() < 1e-12);
    }

    #[test]
    fn arc_with_three_points_is_rejected() {
        let mut a = make(ArcClass);
        a.path = vec![Point::ORIGIN, Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let err = ArcClass.check(&mut a).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArcGeometry);
    }

    #[test]
    fn nth_class_matching() {
        assert!(Class::from(ArrowClass).matches(ClassName::Arrow));
        assert!(!Class::from(ArrowClass).matches(ClassName::Line));
    }
}
