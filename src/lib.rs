//! pikdraw - compile pikchr diagram scripts to SVG
//!
//! ```
//! let out = pikdraw::pikchr("box \"hello\"; arrow; circle", None, pikdraw::Flags::empty());
//! assert!(!out.is_error());
//! assert!(out.markup.starts_with("<svg"));
//! ```

pub mod ast;
pub mod errors;
pub mod keywords;
pub mod lexer;
mod log;
pub mod macros;
pub mod parse;
pub mod render;
pub mod types;

use std::ops::{BitOr, BitOrAssign};

pub use errors::{CompileError, ErrorKind, PikchrError, SourceContext};
pub use render::PIKCHR_DATE;

use render::DocumentOptions;

/// Options for a [`pikchr`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    /// Report errors as plain text instead of HTML.
    pub const PLAINTEXT_ERRORS: Flags = Flags(1);
    /// Keep strokes light and fills dark.
    pub const DARK_MODE: Flags = Flags(2);

    pub const fn empty() -> Self {
        Flags(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Flags(bits)
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// The result of a [`pikchr`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// SVG markup, or the error report.
    pub markup: String,
    /// Pixel width, -1 on error.
    pub width: i32,
    /// Pixel height, -1 on error.
    pub height: i32,
}

impl Rendered {
    pub fn is_error(&self) -> bool {
        self.width < 0
    }
}

fn compile(source: &str, class: Option<&str>, flags: Flags) -> Result<Rendered, CompileError> {
    let ctx = parse::compile(source)?;
    let opts = DocumentOptions {
        class,
        dark_mode: flags.contains(Flags::DARK_MODE),
    };
    let out = ctx.finish(opts);
    Ok(Rendered {
        markup: out.markup,
        width: out.width,
        height: out.height,
    })
}

/// Compile `source` to SVG.
///
/// Never fails: on error the markup holds the error report (HTML unless
/// [`Flags::PLAINTEXT_ERRORS`] is set) and both dimensions are -1.
pub fn pikchr(source: &str, class: Option<&str>, flags: Flags) -> Rendered {
    match compile(source, class, flags) {
        Ok(rendered) => rendered,
        Err(err) => {
            log::warn!(error = %err.kind, start = err.span.start, "compilation failed");
            Rendered {
                markup: err.report(source, flags.contains(Flags::PLAINTEXT_ERRORS)),
                width: -1,
                height: -1,
            }
        }
    }
}

/// Compile `source` to SVG, returning failures as a [`miette`] diagnostic.
pub fn try_pikchr(source: &str, class: Option<&str>, flags: Flags) -> Result<Rendered, PikchrError> {
    compile(source, class, flags)
        .map_err(|err| err.into_diagnostic(&SourceContext::new("<input>", source)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let flags = Flags::PLAINTEXT_ERRORS | Flags::DARK_MODE;
        assert!(flags.contains(Flags::DARK_MODE));
        assert!(flags.contains(Flags::PLAINTEXT_ERRORS));
        assert!(!Flags::empty().contains(Flags::DARK_MODE));
        assert_eq!(flags.bits(), 3);
    }

    #[test]
    fn errors_have_negative_size() {
        let out = pikchr("box wid 1 wid 2", None, Flags::PLAINTEXT_ERRORS);
        assert!(out.is_error());
        assert_eq!((out.width, out.height), (-1, -1));
        assert!(out.markup.contains("ERROR: value is already set"));
        assert!(!out.markup.contains("<pre>"));
    }

    #[test]
    fn diagnostic_carries_kind() {
        let err = try_pikchr("circle rad 0.5 then", None, Flags::empty()).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::LineOnly);
    }
}
