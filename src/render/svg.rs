//! SVG generation
//!
//! Output is produced as text in a single pass over the finished objects.
//! Coordinates are flipped (SVG y grows downward) and scaled to pixels at
//! 144 per inch. Numbers are printed the way C's `%g` prints them so that
//! output stays byte-for-byte stable.

use std::fmt::Write as _;

use crate::ast::TextFlags;
use crate::types::{BBox, Direction, Point, Span};

use super::object::{ObjId, Object, TextLabel};
use super::shapes::{DotClass, NoopClass, Shape};
use super::text;
use super::variables::Variables;

/// Pixels per inch.
pub const R_SCALE: f64 = 144.0;

/// Value stamped into `data-pikchr-date` and produced by `pikchr_date`.
pub const PIKCHR_DATE: &str = "20250101000000";

// ============================================================================
// Number formatting
// ============================================================================

/// Format like C's `printf("%.*g", precision, value)`.
pub fn fmt_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.into();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.into();
    }
    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exp < -4 || exp >= p as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `%g`
pub fn g(value: f64) -> String {
    fmt_g(value, 6)
}

/// Round half away from zero into an `i32`, saturating. NaN is 0.
pub fn pik_round(v: f64) -> i32 {
    if v.is_nan() {
        0
    } else if v <= f64::from(i32::MIN) {
        i32::MIN
    } else if v >= f64::from(i32::MAX) {
        i32::MAX
    } else {
        v.round() as i32
    }
}

// ============================================================================
// Layout settings
// ============================================================================

/// Drawing parameters derived from the script variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Default stroke width, never below 0.01.
    pub thickness: f64,
    /// Arrowhead half-width and length per unit of stroke width.
    pub w_arrow: f64,
    pub h_arrow: f64,
    pub font_scale: f64,
    pub char_width: f64,
    pub char_height: f64,
}

impl Settings {
    pub fn from_vars(vars: &Variables) -> Self {
        let thickness = vars.value("thickness").max(0.01);
        let font_scale = match vars.value("fontscale") {
            s if s <= 0.0 => 1.0,
            s => s,
        };
        Self {
            thickness,
            w_arrow: 0.5 * vars.value("arrowwid") / thickness,
            h_arrow: vars.value("arrowht") / thickness,
            font_scale,
            char_width: vars.value("charwid") * font_scale,
            char_height: vars.value("charht") * font_scale,
        }
    }
}

// ============================================================================
// Colors
// ============================================================================

/// Invert a color for dark backgrounds, keeping its hue. Strokes are pushed
/// into the light half of the range, fills into the dark half.
fn to_dark_mode(x: i32, is_bg: bool) -> i32 {
    let x = 0xffffff - x;
    let (r, g, b) = ((x >> 16) & 0xff, (x >> 8) & 0xff, x & 0xff);
    let mx = r.max(g).max(b);
    let mn = r.min(g).min(b);
    let (mut r, mut g, mut b) = (mn + (mx - r), mn + (mx - g), mn + (mx - b));
    if is_bg {
        if mx > 127 {
            r = (127 * r) / mx;
            g = (127 * g) / mx;
            b = (127 * b) / mx;
        }
    } else if mn < 128 && mx > mn {
        r = 127 + ((r - mn) * 128) / (mx - mn);
        g = 127 + ((g - mn) * 128) / (mx - mn);
        b = 127 + ((b - mn) * 128) / (mx - mn);
    }
    r * 0x10000 + g * 0x100 + b
}

/// Color substitution applied to every emitted color.
#[derive(Debug, Clone, Copy)]
struct Palette {
    fg: i32,
    bg: i32,
    dark: bool,
}

impl Palette {
    fn rgb(&self, v: f64, is_bg: bool) -> String {
        let mut x = pik_round(v);
        if x == 0 && self.fg > 0 && !is_bg {
            x = self.fg;
        } else if is_bg && x >= 0xffffff && self.bg > 0 {
            x = self.bg;
        } else if self.dark {
            x = to_dark_mode(x, is_bg);
        }
        format!("rgb({},{},{})", (x >> 16) & 0xff, (x >> 8) & 0xff, x & 0xff)
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Appends SVG markup in diagram coordinates.
pub struct SvgWriter<'a> {
    out: &'a mut String,
    /// Top-left corner of the drawing, in inches.
    origin: Point,
    settings: Settings,
    palette: Palette,
}

impl<'a> SvgWriter<'a> {
    fn px(&self, x: f64) -> f64 {
        (x - self.origin.x) * R_SCALE
    }

    fn py(&self, y: f64) -> f64 {
        (self.origin.y - y) * R_SCALE
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /// `prefix` then the point as `x,y`.
    pub fn xy(&mut self, prefix: &str, p: Point) {
        let (x, y) = (self.px(p.x), self.py(p.y));
        let _ = write!(self.out, "{prefix}{},{}", g(x), g(y));
    }

    pub fn x_attr(&mut self, prefix: &str, x: f64, suffix: &str) {
        let x = self.px(x);
        let _ = write!(self.out, "{prefix}{}{suffix}", g(x));
    }

    pub fn y_attr(&mut self, prefix: &str, y: f64, suffix: &str) {
        let y = self.py(y);
        let _ = write!(self.out, "{prefix}{}{suffix}", g(y));
    }

    /// A distance.
    pub fn dis(&mut self, prefix: &str, v: f64, suffix: &str) {
        let _ = write!(self.out, "{prefix}{}{suffix}", g(v * R_SCALE));
    }

    /// Elliptical arc to `to`.
    pub fn arc(&mut self, rx: f64, ry: f64, to: Point) {
        let (x, y) = (self.px(to.x), self.py(to.y));
        let _ = write!(
            self.out,
            "A{} {} 0 0 0 {} {}",
            g(rx * R_SCALE),
            g(ry * R_SCALE),
            g(x),
            g(y)
        );
    }

    fn color(&mut self, prefix: &str, v: f64, suffix: &str, is_bg: bool) {
        let rgb = self.palette.rgb(v, is_bg);
        let _ = write!(self.out, "{prefix}{rgb}{suffix}");
    }

    /// The ` style="...` attribute, left open for the caller to close.
    ///
    /// `e_fill` says how the fill is used: 0 never filled, 1 filled, 2 a
    /// fill that matches the stroke is a foreground color, 3 a stroke that
    /// matches the fill is a background color.
    pub fn style(&mut self, obj: &Object, fill: f64, e_fill: u8) {
        let mut clr_is_bg = false;
        self.push(" style=\"");
        if fill >= 0.0 && e_fill != 0 {
            let mut fill_is_bg = true;
            if fill == obj.color {
                if e_fill == 2 {
                    fill_is_bg = false;
                }
                if e_fill == 3 {
                    clr_is_bg = true;
                }
            }
            self.color("fill:", fill, ";", fill_is_bg);
        } else {
            self.push("fill:none;");
        }
        if obj.sw >= 0.0 && obj.color >= 0.0 {
            let sw = obj.sw;
            self.dis("stroke-width:", sw, ";");
            if obj.path.len() > 2 && obj.rad <= sw {
                self.push("stroke-linejoin:round;");
            }
            self.color("stroke:", obj.color, ";", clr_is_bg);
            if obj.dotted > 0.0 {
                self.dis("stroke-dasharray:", sw.max(2.1 / R_SCALE), "");
                self.dis(",", obj.dotted, ";");
            } else if obj.dashed > 0.0 {
                self.dis("stroke-dasharray:", obj.dashed, "");
                self.dis(",", obj.dashed, ";");
            }
        }
    }

    /// Draw an arrowhead pointing at `to` along the segment from `from`, then
    /// pull `to` back so the stroke does not poke through the tip.
    pub fn arrowhead(&mut self, obj: &Object, from: Point, to: &mut Point) {
        let d = *to - from;
        let dist = d.x.hypot(d.y);
        if obj.color < 0.0 || obj.sw <= 0.0 || dist <= 0.0 {
            return;
        }
        let u = Point::new(d.x / dist, d.y / dist);
        let mut h = self.settings.h_arrow * obj.sw;
        let w = self.settings.w_arrow * obj.sw;
        let mut e1 = dist - h;
        if e1 < 0.0 {
            e1 = 0.0;
            h = dist;
        }
        let dd = Point::new(-w * u.y, w * u.x);
        let base = from + u * e1;
        self.xy("<polygon points=\"", *to);
        self.xy(" ", base - dd);
        self.xy(" ", base + dd);
        self.color("\" style=\"fill:", obj.color, "\"/>\n", false);
        let amt = h / 2.0;
        *to = if dist <= amt {
            from
        } else {
            from + d * (1.0 - amt / dist)
        };
    }

    /// `<text>` elements for every label of `obj`.
    pub fn text(&mut self, obj: &Object) {
        if obj.texts.is_empty() {
            return;
        }
        let placements = text::place_labels(obj, &self.settings);
        for (t, p) in obj.texts.iter().zip(placements) {
            let f = t.flags;
            self.x_attr("<text x=\"", obj.at.x + p.dx, "\"");
            self.y_attr(" y=\"", obj.at.y + p.dy, "\"");
            if f.has(TextFlags::RJUST) {
                self.push(" text-anchor=\"end\"");
            } else if f.has(TextFlags::LJUST) {
                self.push(" text-anchor=\"start\"");
            } else {
                self.push(" text-anchor=\"middle\"");
            }
            if f.has(TextFlags::ITALIC) {
                self.push(" font-style=\"italic\"");
            }
            if f.has(TextFlags::BOLD) {
                self.push(" font-weight=\"bold\"");
            }
            if f.has(TextFlags::MONO) {
                self.push(" font-family=\"monospace\"");
            }
            if obj.color >= 0.0 {
                self.color(" fill=\"", obj.color, "\"", false);
            }
            let xs = p.scale * self.settings.font_scale;
            if xs <= 0.99 || xs >= 1.01 {
                let _ = write!(self.out, " font-size=\"{}%\"", fmt_g(xs * 100.0, 10));
            }
            if let Some(u) = text::alignment(obj).filter(|_| f.has(TextFlags::ALIGNED)) {
                let angle = u.y.atan2(u.x) * -180.0 / std::f64::consts::PI;
                let _ = write!(self.out, " transform=\"rotate({}", fmt_g(angle, 10));
                self.xy(" ", obj.at);
                self.push(")\"");
            }
            self.push(" dominant-baseline=\"central\">");
            text::write_label_body(self.out, &t.text);
            self.push("</text>\n");
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// Options for [`render_document`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentOptions<'c> {
    /// CSS class of the root element.
    pub class: Option<&'c str>,
    pub dark_mode: bool,
}

/// Grow `bbox` over a list and its sublists. Label slots are laid out again
/// for every object on the way, as they are each time text is measured.
fn add_list_bbox(objects: &mut [Object], list: &[ObjId], settings: &Settings, w_arrow: f64, bbox: &mut BBox) {
    for id in list {
        let obj = &mut objects[id.0];
        text::assign_slots(&mut obj.texts);
        if obj.sw >= 0.0 {
            bbox.add_box(&obj.bbox);
        }
        bbox.add_box(&text::text_bbox(obj, settings));
        if obj.is_line() {
            if let (true, Some(p)) = (obj.larrow, obj.path.first()) {
                bbox.add_ellipse(*p, w_arrow, w_arrow);
            }
            if let (true, Some(p)) = (obj.rarrow, obj.path.last()) {
                bbox.add_ellipse(*p, w_arrow, w_arrow);
            }
        }
        let children = obj.children.clone();
        add_list_bbox(objects, &children, settings, w_arrow, bbox);
    }
}

/// Render the object tree under `root` as a complete `<svg>` element and
/// return its pixel width and height.
pub fn render_document(
    objects: &mut [Object],
    root: &[ObjId],
    vars: &Variables,
    opts: DocumentOptions<'_>,
    out: &mut String,
) -> (i32, i32) {
    let settings = Settings::from_vars(vars);
    let thickness = settings.thickness;
    let margin = vars.value("margin") + thickness;
    let w_arrow = settings.w_arrow * thickness;
    let palette = Palette {
        fg: vars.lookup("fgcolor").map_or(-1, |v| v as i32),
        bg: vars.lookup("bgcolor").map_or(-1, |v| v as i32),
        dark: opts.dark_mode,
    };

    let mut bbox = BBox::EMPTY;
    add_list_bbox(objects, root, &settings, w_arrow, &mut bbox);
    if bbox.is_empty() {
        bbox.add_point(0.0, 0.0);
    }
    bbox.ne.x += margin + vars.value("rightmargin");
    bbox.ne.y += margin + vars.value("topmargin");
    bbox.sw.x -= margin + vars.value("leftmargin");
    bbox.sw.y -= margin + vars.value("bottommargin");
    crate::log::debug!(
        sw_x = bbox.sw.x,
        sw_y = bbox.sw.y,
        ne_x = bbox.ne.x,
        ne_y = bbox.ne.y,
        "document bounding box"
    );

    out.push_str("<svg xmlns='http://www.w3.org/2000/svg'");
    if let Some(class) = opts.class {
        let _ = write!(out, " class=\"{class}\"");
    }
    let w = bbox.width();
    let h = bbox.height();
    let mut w_svg = pik_round(R_SCALE * w);
    let mut h_svg = pik_round(R_SCALE * h);
    let scale = vars.value("scale");
    if (0.001..=1000.0).contains(&scale) && !(0.99..=1.01).contains(&scale) {
        w_svg = pik_round(f64::from(w_svg) * scale);
        h_svg = pik_round(f64::from(h_svg) * scale);
        let _ = write!(
            out,
            " width=\"{}\" height=\"{}\"",
            fmt_g(f64::from(w_svg), 10),
            fmt_g(f64::from(h_svg), 10)
        );
    }
    let _ = write!(
        out,
        " viewBox=\"0 0 {} {}\" data-pikchr-date=\"{PIKCHR_DATE}\">\n",
        g(w * R_SCALE),
        g(h * R_SCALE)
    );

    // Drawing a label lays its slots out once more.
    for obj in objects.iter_mut() {
        text::assign_slots(&mut obj.texts);
    }
    let objects = &*objects;

    let mut writer = SvgWriter {
        out,
        origin: Point::new(bbox.sw.x, bbox.ne.y),
        settings,
        palette,
    };
    let layers = LayerPass {
        objects,
        debug: vars.value("debug") != 0.0,
        label_color: vars.lookup("debug_label_color").filter(|c| *c >= 0.0),
    };
    layers.render(root, &mut writer);
    writer.push("</svg>\n");
    (w_svg, h_svg)
}

/// Draws a list in ascending layer order.
struct LayerPass<'o> {
    objects: &'o [Object],
    debug: bool,
    label_color: Option<f64>,
}

impl LayerPass<'_> {
    fn render(&self, list: &[ObjId], out: &mut SvgWriter<'_>) {
        let mut this_layer = 0;
        loop {
            let mut next_layer = i32::MAX;
            let mut more = false;
            for id in list {
                let obj = &self.objects[id.0];
                if obj.layer > this_layer {
                    next_layer = next_layer.min(obj.layer);
                    more = true;
                    continue;
                }
                if obj.layer < this_layer {
                    continue;
                }
                if self.debug {
                    crate::log::debug!(
                        class = obj.class.name(),
                        name = obj.name.as_deref().unwrap_or(""),
                        x = obj.at.x,
                        y = obj.at.y,
                        w = obj.w,
                        h = obj.h,
                        layer = obj.layer,
                        "render object"
                    );
                }
                obj.class.render(obj, out);
                if !obj.children.is_empty() {
                    self.render(&obj.children, out);
                }
            }
            if !more {
                break;
            }
            this_layer = next_layer;
        }

        if let Some(color) = self.label_color {
            for obj in list.iter().map(|id| &self.objects[id.0]) {
                let Some(name) = &obj.name else { continue };
                let mut dot = Object::new(NoopClass.into(), Span::default(), obj.at, Direction::Right);
                dot.rad = 0.015;
                dot.sw = 0.015;
                dot.fill = color;
                dot.color = color;
                dot.texts.push(TextLabel {
                    text: name.clone(),
                    span: Span::default(),
                    flags: TextFlags(TextFlags::ABOVE),
                });
                DotClass.render(&dot, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_g_formatting() {
        assert_eq!(g(0.0), "0");
        assert_eq!(g(1.0), "1");
        assert_eq!(g(2.16), "2.16");
        assert_eq!(g(108.0), "108");
        assert_eq!(g(1.0 / 3.0), "0.333333");
        assert_eq!(g(123456789.0), "1.23457e+08");
        assert_eq!(g(0.00001), "1e-05");
        assert_eq!(g(-47.52), "-47.52");
        assert_eq!(fmt_g(1234567.0, 10), "1234567");
        assert_eq!(fmt_g(0.1 + 0.2, 10), "0.3");
    }

    #[test]
    fn rounding() {
        assert_eq!(pik_round(2.5), 3);
        assert_eq!(pik_round(-2.5), -3);
        assert_eq!(pik_round(f64::NAN), 0);
        assert_eq!(pik_round(1e20), i32::MAX);
    }

    #[test]
    fn settings_follow_variables() {
        let vars = Variables::new();
        let s = Settings::from_vars(&vars);
        assert_eq!(s.thickness, 0.015);
        assert_eq!(s.font_scale, 1.0);
        assert!((s.w_arrow - 2.0).abs() < 1e-12);
        assert_eq!(s.char_height, 0.14);
    }

    #[test]
    fn palette_substitutions() {
        let plain = Palette { fg: -1, bg: -1, dark: false };
        assert_eq!(plain.rgb(f64::from(0xff8000), false), "rgb(255,128,0)");
        let themed = Palette { fg: 0x336699, bg: 0x101010, dark: false };
        assert_eq!(themed.rgb(0.0, false), "rgb(51,102,153)");
        assert_eq!(themed.rgb(f64::from(0xffffff), true), "rgb(16,16,16)");
        let dark = Palette { fg: -1, bg: -1, dark: true };
        assert_eq!(dark.rgb(0.0, false), "rgb(255,255,255)");
        assert_eq!(dark.rgb(f64::from(0xffffff), true), "rgb(0,0,0)");
    }

    #[test]
    fn empty_document_has_only_margins() {
        let vars = Variables::new();
        let mut out = String::new();
        let (w, h) = render_document(&mut [], &[], &vars, DocumentOptions::default(), &mut out);
        assert_eq!((w, h), (4, 4));
        assert!(out.starts_with("<svg xmlns='http://www.w3.org/2000/svg' viewBox=\"0 0 4.32 4.32\""));
        assert!(out.ends_with("</svg>\n"));
    }
}
