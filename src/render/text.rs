//! Text labels: width estimates, slot assignment and placement.
//!
//! Up to five labels attach to an object. Each label sits in one of five
//! vertical slots (two above, center, two below) and may be justified left
//! or right. There is no font metric available, so widths come from a fixed
//! per-character table in hundredths of `charwid`.

use crate::ast::TextFlags;
use crate::types::{BBox, Point};

use super::object::{Object, TextLabel};
use super::shapes::{Class, Shape};
use super::svg::Settings;

/// Most labels a single object may carry.
pub const MAX_TEXTS: usize = 5;

const STD_AVG: u32 = 100;
const MONO_AVG: u32 = 82;

/// Relative widths of the printable ASCII characters, starting at space.
#[rustfmt::skip]
static AW_CHAR: [u8; 95] = [
    45,  55,  62, 115,  90, 132, 125,  40,
    55,  55,  71, 115,  45,  48,  45,  50,
    91,  91,  91,  91,  91,  91,  91,  91,  91,  91,
    50,  50, 120, 120, 120,  78,
   142, 102, 105, 110, 115, 105,  98, 105,
   125,  58,  58, 107,  95, 145, 125, 115,
    95, 115, 107,  95,  97, 118, 102, 150,
   100,  93, 100,  58,  50,  58, 119,  72,
    72,  86,  92,  80,  92,  85,  52,  92,
    92,  47,  47,  88,  48, 135,  92,  86,
    92,  92,  69,  75,  58,  92,  80, 121,
    81,  80,  76,  91,  49,  91, 118,
];

/// Estimated width of the raw label text in hundredths of a character.
///
/// Backslash escapes count as the escaped character, entities as one and a
/// half average characters, and any non-ASCII character as one average
/// character.
pub fn text_length(text: &str, mono: bool) -> u32 {
    let z = text.as_bytes();
    let n = z.len();
    let avg = if mono { MONO_AVG } else { STD_AVG };
    let mut cnt = 0;
    let mut j = 0;
    while j < n {
        let mut c = z[j];
        if c == b'\\' && z.get(j + 1) != Some(&b'&') {
            j += 1;
            // A trailing backslash escapes the closing quote.
            c = z.get(j).copied().unwrap_or(b'"');
        } else if c == b'&' {
            let end = (j + 7).min(n);
            if let Some(k) = (j + 1..end).find(|&k| z[k] == b';') {
                j = k;
            }
            cnt += avg * 3 / 2;
            j += 1;
            continue;
        }
        if c & 0xc0 == 0xc0 {
            while j + 1 < n && z[j + 1] & 0xc0 == 0x80 {
                j += 1;
            }
            cnt += avg;
        } else if mono {
            cnt += MONO_AVG;
        } else if (0x20..=0x7e).contains(&c) {
            cnt += u32::from(AW_CHAR[usize::from(c - 0x20)]);
        } else {
            cnt += STD_AVG;
        }
        j += 1;
    }
    cnt
}

/// Scale factor from `big`/`small`, squared when doubled.
pub fn font_scale(flags: TextFlags) -> f64 {
    let mut scale = 1.0;
    if flags.has(TextFlags::BIG) {
        scale *= 1.25;
    }
    if flags.has(TextFlags::SMALL) {
        scale *= 0.8;
    }
    if flags.has(TextFlags::XTRA) {
        scale *= scale;
    }
    scale
}

/// Promote the first of two same-side labels to the outer slot, unless the
/// pair is split by opposite justification.
fn promote(labels: &mut [TextLabel], order: impl Iterator<Item = usize>, from: u16, to: u16) {
    let mut seen = 0;
    let mut m_just = 0;
    for i in order {
        let flags = labels[i].flags;
        if !flags.has(from) {
            continue;
        }
        if seen == 0 {
            seen = 1;
            m_just = flags.justify();
        } else if seen == 1 && m_just != 0 && flags.0 & m_just == 0 {
            seen = 2;
        } else {
            labels[i].flags.set_vertical(to);
            break;
        }
    }
}

/// Give every label a vertical slot. Explicit slots are kept; the rest fill
/// the free slots from top to bottom.
pub fn assign_slots(labels: &mut [TextLabel]) {
    let n = labels.len();
    match n {
        0 => return,
        1 => {
            if labels[0].flags.vertical() == 0 {
                labels[0].flags.0 |= TextFlags::CENTER;
            }
            return;
        }
        _ => {}
    }
    promote(labels, (0..n).rev(), TextFlags::ABOVE, TextFlags::ABOVE2);
    promote(labels, 0..n, TextFlags::BELOW, TextFlags::BELOW2);

    let all = labels.iter().fold(0, |acc, t| acc | t.flags.vertical());
    let mut free = Vec::with_capacity(MAX_TEXTS);
    let both = labels.iter().fold(0, |acc, t| acc | t.flags.justify());
    if n == 2 && both == TextFlags::JUSTIFY {
        free.extend([TextFlags::CENTER, TextFlags::CENTER]);
    } else {
        if n >= 4 && all & TextFlags::ABOVE2 == 0 {
            free.push(TextFlags::ABOVE2);
        }
        if all & TextFlags::ABOVE == 0 {
            free.push(TextFlags::ABOVE);
        }
        if n & 1 != 0 {
            free.push(TextFlags::CENTER);
        }
        if all & TextFlags::BELOW == 0 {
            free.push(TextFlags::BELOW);
        }
        if n >= 4 && all & TextFlags::BELOW2 == 0 {
            free.push(TextFlags::BELOW2);
        }
    }
    let mut slots = free.into_iter();
    for label in labels.iter_mut().filter(|t| t.flags.vertical() == 0) {
        label.flags.0 |= slots.next().unwrap_or(TextFlags::CENTER);
    }
}

/// A label's position relative to the object's center.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub dx: f64,
    pub dy: f64,
    /// Font scale from `big`/`small`.
    pub scale: f64,
}

/// Place every label of `obj`. Slots must already be assigned.
pub fn place_labels(obj: &Object, settings: &Settings) -> Vec<Placement> {
    let mut hc = 0.0;
    let mut y_base = 0.0;
    if obj.is_line() {
        hc = 1.5 * obj.sw;
    } else if obj.rad > 0.0 && matches!(obj.class, Class::CylinderClass(_)) {
        y_base = -0.75 * obj.rad;
    }
    let row_height = |slot: u16, floor: f64| {
        obj.texts
            .iter()
            .filter(|t| t.flags.has(slot))
            .map(|t| font_scale(t.flags) * settings.char_height)
            .fold(floor, f64::max)
    };
    let hc = row_height(TextFlags::CENTER, hc);
    let ha1 = row_height(TextFlags::ABOVE, 0.0);
    let ha2 = row_height(TextFlags::ABOVE2, 0.0);
    let hb1 = row_height(TextFlags::BELOW, 0.0);
    let hb2 = row_height(TextFlags::BELOW2, 0.0);
    let jw = if obj.class.justified() {
        0.5 * (obj.w - 0.5 * (settings.char_width + obj.sw))
    } else {
        0.0
    };

    obj.texts
        .iter()
        .map(|t| {
            let f = t.flags;
            let mut y = y_base;
            if f.has(TextFlags::ABOVE2) {
                y += 0.5 * hc + ha1 + 0.5 * ha2;
            }
            if f.has(TextFlags::ABOVE) {
                y += 0.5 * hc + 0.5 * ha1;
            }
            if f.has(TextFlags::BELOW) {
                y -= 0.5 * hc + 0.5 * hb1;
            }
            if f.has(TextFlags::BELOW2) {
                y -= 0.5 * hc + hb1 + 0.5 * hb2;
            }
            let mut dx = 0.0;
            if f.has(TextFlags::LJUST) {
                dx -= jw;
            }
            if f.has(TextFlags::RJUST) {
                dx += jw;
            }
            Placement {
                dx,
                dy: y,
                scale: font_scale(f),
            }
        })
        .collect()
}

/// Unit vector from a line's first vertex to its last, for `aligned` text.
pub fn alignment(obj: &Object) -> Option<Point> {
    let (first, last) = (obj.path.first()?, obj.path.last()?);
    if obj.path.len() < 2 {
        return None;
    }
    let d = *last - *first;
    if d.x == 0.0 && d.y == 0.0 {
        return None;
    }
    let dist = d.x.hypot(d.y);
    Some(Point::new(d.x / dist, d.y / dist))
}

/// The area the labels of `obj` cover.
pub fn text_bbox(obj: &Object, settings: &Settings) -> BBox {
    let mut bbox = BBox::EMPTY;
    for (t, p) in obj.texts.iter().zip(place_labels(obj, settings)) {
        let f = t.flags;
        let mut cw =
            f64::from(text_length(&t.text, f.has(TextFlags::MONO))) * settings.char_width * p.scale * 0.01;
        let ch = 0.5 * settings.char_height * p.scale;
        if f.has(TextFlags::BOLD) && !f.has(TextFlags::MONO) {
            cw *= 1.1;
        }
        let nx = p.dx;
        let y = p.dy;
        let (mut x0, mut y0, mut x1, mut y1) = if f.has(TextFlags::RJUST) {
            (nx, y - ch, nx - cw, y + ch)
        } else if f.has(TextFlags::LJUST) {
            (nx, y - ch, nx + cw, y + ch)
        } else {
            (nx + cw / 2.0, y + ch, nx - cw / 2.0, y - ch)
        };
        if let Some(u) = alignment(obj).filter(|_| f.has(TextFlags::ALIGNED)) {
            (x0, y0) = (u.x * x0 - u.y * y0, u.y * x0 - u.x * y0);
            (x1, y1) = (u.x * x1 - u.y * y1, u.y * x1 - u.x * y1);
        }
        bbox.add_point(obj.at.x + x0, obj.at.y + y0);
        bbox.add_point(obj.at.x + x1, obj.at.y + y1);
    }
    bbox
}

/// Is the text at the start of `z` an HTML entity such as `&amp;` or `&#92;`?
pub fn is_entity(z: &[u8]) -> bool {
    if z.len() < 4 || z[0] != b'&' {
        return false;
    }
    let mut rest = &z[1..];
    let numeric = rest[0] == b'#';
    if numeric {
        rest = &rest[1..];
    }
    for (i, &c) in rest.iter().enumerate() {
        if i > 1 && c == b';' {
            return true;
        }
        let ok = if numeric {
            c.is_ascii_digit()
        } else {
            c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())
        };
        if !ok {
            return false;
        }
    }
    false
}

/// Escape flags for [`escape_into`].
pub const ESCAPE_SPACE: u8 = 1;
pub const ESCAPE_AMP: u8 = 2;

/// Append `text` with `<` and `>` escaped. With [`ESCAPE_SPACE`] spaces
/// become non-breaking; with [`ESCAPE_AMP`] a `&` that does not start an
/// entity becomes `&amp;`.
pub fn escape_into(out: &mut String, text: &str, flags: u8) {
    let bytes = text.as_bytes();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        let rep = match c {
            '<' => "&lt;",
            '>' => "&gt;",
            ' ' if flags & ESCAPE_SPACE != 0 => "\u{a0}",
            '&' if flags & ESCAPE_AMP != 0 => {
                if is_entity(&bytes[i..]) {
                    continue;
                }
                "&amp;"
            }
            _ => continue,
        };
        out.push_str(&text[start..i]);
        out.push_str(rep);
        start = i + c.len_utf8();
    }
    out.push_str(&text[start..]);
}

/// Append a label body: backslash escapes are resolved and a literal
/// backslash is written as `&#92;`.
pub fn write_label_body(out: &mut String, text: &str) {
    let mut rest = text;
    while !rest.is_empty() {
        let j = rest.find('\\').unwrap_or(rest.len());
        if j > 0 {
            escape_into(out, &rest[..j], ESCAPE_SPACE | ESCAPE_AMP);
        }
        if j >= rest.len() {
            break;
        }
        let after = &rest[j + 1..];
        if after.is_empty() || after.starts_with('\\') {
            out.push_str("&#92;");
            rest = after.get(1..).unwrap_or("");
        } else {
            rest = after;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    fn label(flags: u16) -> TextLabel {
        TextLabel {
            text: "x".into(),
            span: Span::default(),
            flags: TextFlags(flags),
        }
    }

    fn slots(labels: &[TextLabel]) -> Vec<u16> {
        labels.iter().map(|t| t.flags.vertical()).collect()
    }

    #[test]
    fn widths_follow_the_table() {
        assert_eq!(text_length("Hello", false), 125 + 85 + 48 + 48 + 86);
        assert_eq!(text_length("Hello", true), 5 * 82);
        assert_eq!(text_length("&amp;x", false), 150 + 81);
        assert_eq!(text_length("\u{e9}", false), 100);
        assert_eq!(text_length("a\\\\b", false), 86 + 50 + 92);
    }

    #[test]
    fn single_label_is_centered() {
        let mut t = vec![label(0)];
        assign_slots(&mut t);
        assert_eq!(slots(&t), vec![TextFlags::CENTER]);
    }

    #[test]
    fn unassigned_labels_fill_top_down() {
        let mut t = vec![label(0), label(0)];
        assign_slots(&mut t);
        assert_eq!(slots(&t), vec![TextFlags::ABOVE, TextFlags::BELOW]);

        let mut t = vec![label(0), label(0), label(0)];
        assign_slots(&mut t);
        assert_eq!(
            slots(&t),
            vec![TextFlags::ABOVE, TextFlags::CENTER, TextFlags::BELOW]
        );
    }

    #[test]
    fn two_aboves_stack() {
        let mut t = vec![label(TextFlags::ABOVE), label(TextFlags::ABOVE)];
        assign_slots(&mut t);
        assert_eq!(slots(&t), vec![TextFlags::ABOVE2, TextFlags::ABOVE]);
    }

    #[test]
    fn opposite_justification_shares_a_row() {
        let mut t = vec![label(TextFlags::LJUST), label(TextFlags::RJUST)];
        assign_slots(&mut t);
        assert_eq!(slots(&t), vec![TextFlags::CENTER, TextFlags::CENTER]);
    }

    #[test]
    fn entities() {
        assert!(is_entity(b"&amp;"));
        assert!(is_entity(b"&#92; tail"));
        assert!(!is_entity(b"&a;"));
        assert!(!is_entity(b"& x;"));
        assert!(!is_entity(b"&#x41;"));
    }

    #[test]
    fn label_bodies_are_escaped() {
        let mut out = String::new();
        write_label_body(&mut out, "a<b & c&lt;");
        assert_eq!(out, "a&lt;b\u{a0}&amp;\u{a0}c&lt;");
        out.clear();
        write_label_body(&mut out, "x\\\\y\\n");
        assert_eq!(out, "x&#92;yn");
    }

    #[test]
    fn font_scales() {
        assert_eq!(font_scale(TextFlags(TextFlags::BIG)), 1.25);
        assert_eq!(font_scale(TextFlags(TextFlags::BIG | TextFlags::XTRA)), 1.5625);
    }
}
