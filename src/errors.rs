//! Error types with rich diagnostics using miette.
//!
//! Compilation stops at the first error. Internally that error is a
//! [`CompileError`] (a kind plus a byte span); at the public boundary it is
//! either rendered as the classic caret report or turned into a
//! [`PikchrError`] diagnostic that carries its source text.

use std::fmt::Write as _;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::types::Span;

/// Source context for error reporting
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Name of the source (filename or "<input>")
    pub name: String,
    /// The full source text
    pub source: String,
}

impl SourceContext {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.source.clone())
    }
}

// ============================================================================
// Error kinds
// ============================================================================

/// Which stage rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Lexical,
    Syntax,
    Semantic,
    Resource,
}

/// Every user-visible error. The `Display` text is the exact message shown
/// after `ERROR:` in reports.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // ---- lexical ----
    #[error("unrecognized token")]
    UnrecognizedToken,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unbalanced {{...}} block")]
    UnbalancedBlock,
    #[error("token is too long - max length 50000 bytes")]
    TokenTooLong,

    // ---- syntax ----
    #[error("syntax error")]
    Syntax,

    // ---- semantic: attributes ----
    #[error("value is already set")]
    AlreadySet,
    #[error("value already fixed by prior constraints")]
    AlreadyFixed,
    #[error("use with line-oriented objects only")]
    LineOnly,
    #[error("use \"at\" to position this type of object")]
    UseAt,
    #[error("use \"from\" and \"to\" to position this object")]
    UseFromTo,
    #[error("location fixed by prior \"at\"")]
    AtAlreadySet,
    #[error("line start location already fixed")]
    FromAlreadySet,
    #[error("polygon is closed")]
    PolygonClosed,
    #[error("polygon already closed")]
    AlreadyClosed,
    #[error("need at least 3 vertexes in order to close the polygon")]
    CloseNeedsThree,
    #[error("no prior path points")]
    NoPriorPath,
    #[error("no prior objects of the same type")]
    NoPriorSame,
    #[error("too many text terms")]
    TooManyTextTerms,
    #[error("arc geometry error")]
    ArcGeometry,

    // ---- semantic: lookups and arithmetic ----
    #[error("no such object")]
    NoSuchObject,
    #[error("no such vertex")]
    NoSuchVertex,
    #[error("no such variable")]
    NoSuchVariable,
    #[error("not a known color name")]
    UnknownColor,
    #[error("value too big - max '1000th'")]
    OrdinalTooBig,
    #[error("division by zero")]
    DivisionByZero,
    #[error("sqrt of negative value")]
    NegativeSqrt,
    #[error("{0} != {1}")]
    AssertionFailed(String, String),

    // ---- semantic: macros ----
    #[error("recursive macro definition")]
    RecursiveMacro,
    #[error("macros nested too deep")]
    MacrosTooDeep,
    #[error("too many macro arguments - max 9")]
    TooManyMacroArgs,
    #[error("unterminated macro argument list")]
    UnterminatedMacroArgs,
    #[error("script is too complex")]
    TooComplex,

    // ---- resource ----
    #[error("too many path elements")]
    TooManyPathElements,
}

impl ErrorKind {
    pub fn category(&self) -> Category {
        match self {
            ErrorKind::UnrecognizedToken
            | ErrorKind::UnterminatedString
            | ErrorKind::UnbalancedBlock
            | ErrorKind::TokenTooLong => Category::Lexical,
            ErrorKind::Syntax => Category::Syntax,
            ErrorKind::TooManyPathElements => Category::Resource,
            _ => Category::Semantic,
        }
    }
}

// ============================================================================
// Compile errors
// ============================================================================

/// The first error raised while compiling a script.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: ErrorKind,
    /// The offending token.
    pub span: Span,
    /// Macro invocation sites active when the error was raised, outermost first.
    pub called_from: Vec<Span>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            called_from: Vec::new(),
        }
    }

    /// Attach the macro call stack unless one is already recorded.
    pub fn in_context(mut self, frames: &[Span]) -> Self {
        if self.called_from.is_empty() {
            self.called_from = frames.to_vec();
        }
        self
    }

    /// The classic error report: numbered source lines, a caret line, the
    /// `ERROR:` message and one `Called from:` block per macro frame.
    /// HTML mode wraps everything in `<div><pre>` and escapes markup.
    pub fn report(&self, source: &str, plaintext: bool) -> String {
        let html = !plaintext;
        let mut out = String::new();
        if html {
            out.push_str("<div><pre>\n");
        }
        write_context(&mut out, source, self.span, 5, html);
        out.push_str("ERROR: ");
        push_error_text(&mut out, &self.kind.to_string(), html);
        out.push('\n');
        for frame in self.called_from.iter().rev() {
            out.push_str("Called from:\n");
            write_context(&mut out, source, *frame, 0, html);
        }
        if html {
            out.push_str("</pre></div>\n");
        }
        out
    }

    /// Attach the source text, producing a miette diagnostic.
    pub fn into_diagnostic(self, ctx: &SourceContext) -> PikchrError {
        let src = ctx.named_source();
        let span: SourceSpan = self.span.into();
        let called_from = self
            .called_from
            .iter()
            .rev()
            .map(|frame| MacroFrame {
                src: ctx.named_source(),
                span: (*frame).into(),
            })
            .collect();
        let kind = self.kind;
        match kind.category() {
            Category::Lexical => PikchrError::Lexical {
                kind,
                src,
                span,
                called_from,
            },
            Category::Syntax => PikchrError::Syntax {
                kind,
                src,
                span,
                called_from,
            },
            Category::Semantic => PikchrError::Semantic {
                kind,
                src,
                span,
                called_from,
            },
            Category::Resource => PikchrError::Resource {
                kind,
                src,
                span,
                called_from,
            },
        }
    }
}

/// Write the numbered lines leading up to `span` followed by a caret line.
fn write_context(out: &mut String, source: &str, span: Span, context: usize, html: bool) {
    let bytes = source.as_bytes();
    if bytes.is_empty() {
        out.push_str("/*   1 */  \n");
        out.push_str(&" ".repeat(11));
        out.push_str("^\n");
        return;
    }

    // An error on a line break (or at end of input) is shown just past the
    // end of the preceding text.
    let mut err = span.start.min(bytes.len());
    if err == bytes.len() || matches!(bytes[err], b'\n' | b'\r') {
        while err > 0 && matches!(bytes[err - 1], b'\n' | b'\r') {
            err -= 1;
        }
    }

    let line_no = 1 + bytes[..err].iter().filter(|&&b| b == b'\n').count();
    let first = line_no.saturating_sub(context).max(1);
    for (idx, line) in source
        .split('\n')
        .enumerate()
        .skip(first - 1)
        .take(line_no + 1 - first)
    {
        let _ = write!(out, "/*{:4} */  ", idx + 1);
        push_error_text(out, line, html);
        out.push('\n');
    }

    let line_start = bytes[..err]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let column = source
        .get(line_start..err)
        .map_or(err - line_start, |s| s.chars().count());
    let carets = span.text(source).chars().count().max(1);
    out.push_str(&" ".repeat(column + 11));
    out.push_str(&"^".repeat(carets));
    out.push('\n');
}

fn push_error_text(out: &mut String, text: &str, html: bool) {
    if !html {
        out.push_str(text);
        return;
    }
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

// ============================================================================
// User-facing diagnostics
// ============================================================================

/// A macro invocation site leading to an error.
#[derive(Error, Diagnostic, Debug)]
#[error("called from this macro invocation")]
pub struct MacroFrame {
    #[source_code]
    pub src: NamedSource<String>,
    #[label("called from here")]
    pub span: SourceSpan,
}

/// A compilation failure with its source attached.
#[derive(Error, Diagnostic, Debug)]
pub enum PikchrError {
    #[error("{kind}")]
    #[diagnostic(code(pikdraw::lexical))]
    Lexical {
        kind: ErrorKind,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
        #[related]
        called_from: Vec<MacroFrame>,
    },

    #[error("{kind}")]
    #[diagnostic(code(pikdraw::syntax))]
    Syntax {
        kind: ErrorKind,
        #[source_code]
        src: NamedSource<String>,
        #[label("unexpected token")]
        span: SourceSpan,
        #[related]
        called_from: Vec<MacroFrame>,
    },

    #[error("{kind}")]
    #[diagnostic(code(pikdraw::semantic))]
    Semantic {
        kind: ErrorKind,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
        #[related]
        called_from: Vec<MacroFrame>,
    },

    #[error("{kind}")]
    #[diagnostic(code(pikdraw::resource))]
    Resource {
        kind: ErrorKind,
        #[source_code]
        src: NamedSource<String>,
        #[label("limit reached here")]
        span: SourceSpan,
        #[related]
        called_from: Vec<MacroFrame>,
    },
}

impl PikchrError {
    pub fn kind(&self) -> &ErrorKind {
        match self {
            PikchrError::Lexical { kind, .. }
            | PikchrError::Syntax { kind, .. }
            | PikchrError::Semantic { kind, .. }
            | PikchrError::Resource { kind, .. } => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_report_marks_column() {
        let src = "box\ncircle ~ 1";
        let err = CompileError::new(ErrorKind::UnrecognizedToken, Span::new(11, 1));
        let report = err.report(src, true);
        insta::assert_snapshot!(report, @r"
        /*   1 */  box
        /*   2 */  circle ~ 1
                          ^
        ERROR: unrecognized token
        ");
    }

    #[test]
    fn html_report_escapes_markup() {
        let src = "print \"<b>\" & 1";
        let err = CompileError::new(ErrorKind::Syntax, Span::new(12, 1));
        let report = err.report(src, false);
        assert!(report.starts_with("<div><pre>\n"));
        assert!(report.ends_with("</pre></div>\n"));
        assert!(report.contains("&lt;b&gt;"));
        assert!(report.contains("ERROR: syntax error"));
    }

    #[test]
    fn error_at_end_of_input_bumps_caret() {
        let src = "box\n";
        let err = CompileError::new(ErrorKind::Syntax, Span::new(4, 1));
        let report = err.report(src, true);
        let caret_line = report.lines().nth(1).unwrap();
        assert_eq!(caret_line.find('^'), Some(14));
    }

    #[test]
    fn called_from_sections_follow_message() {
        let src = "define m { box wid 1 wid 2 }\nm";
        let err = CompileError::new(ErrorKind::AlreadySet, Span::new(21, 3))
            .in_context(&[Span::new(29, 1)]);
        let report = err.report(src, true);
        let message = report.find("ERROR: value is already set").unwrap();
        let called = report.find("Called from:").unwrap();
        assert!(called > message);
        assert!(report.ends_with("/*   2 */  m\n           ^\n"));
    }

    #[test]
    fn diagnostic_category_follows_kind() {
        let ctx = SourceContext::new("<input>", "~");
        let diag = CompileError::new(ErrorKind::UnrecognizedToken, Span::new(0, 1))
            .into_diagnostic(&ctx);
        assert!(matches!(diag, PikchrError::Lexical { .. }));
        assert_eq!(diag.to_string(), "unrecognized token");
    }
}
