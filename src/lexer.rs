//! Token scanner.
//!
//! The pest grammar in `pikchr.pest` recognizes one token at a time from the
//! start of its input. This module turns that match into a [`TokenKind`],
//! classifies words against the keyword and class tables, and converts
//! numeric literals.

use pest::Parser;
use pest_derive::Parser;

use crate::errors::ErrorKind;
use crate::keywords::{ClassName, Keyword, lookup_class, lookup_keyword};
use crate::types::Span;

#[derive(Parser)]
#[grammar = "pikchr.pest"]
struct Scanner;

/// Hard cap on the byte length of a single token.
pub const MAX_TOKEN_LEN: usize = 50_000;

/// The literal that expands to the build date.
pub const DATE_LITERAL: &str = "pikchr_date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKind {
    Left,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eol,
    Number,
    Nth,
    String,
    Date,
    CodeBlock,
    Parameter(u8),
    Ident,
    PlaceName,
    Class(ClassName),
    Keyword(Keyword),
    /// `.` before an uppercase name
    DotU,
    /// `.` before an edge name
    DotE,
    /// `.` before `x` or `y`
    DotXY,
    /// `.` before any other lowercase word
    DotL,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Assign(AssignOp),
    EqEq,
    Arrow(ArrowKind),
    Eof,
}

impl TokenKind {
    pub fn is_keyword(self, kw: Keyword) -> bool {
        self == TokenKind::Keyword(kw)
    }
}

/// A token: a kind plus the source bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// What the scanner found at one position.
#[derive(Debug, Clone, PartialEq)]
pub enum Scanned {
    Token(TokenKind),
    /// Whitespace, comments and line continuations.
    Skip,
    Error(ErrorKind),
}

/// Scan one token at the start of `text`, returning it with its byte length.
/// The length is never zero for non-empty input.
pub fn scan(text: &str) -> (Scanned, usize) {
    let one_char = text.chars().next().map_or(1, char::len_utf8);
    let pair = match Scanner::parse(Rule::token, text)
        .ok()
        .and_then(|mut pairs| pairs.next())
        .and_then(|token| token.into_inner().next())
    {
        Some(pair) => pair,
        None => return (Scanned::Error(ErrorKind::UnrecognizedToken), one_char),
    };
    let matched = pair.as_str();
    let len = matched.len();

    let scanned = match pair.as_rule() {
        Rule::continuation
        | Rule::space
        | Rule::hash_comment
        | Rule::line_comment
        | Rule::block_comment => Scanned::Skip,
        Rule::breakpoint => {
            crate::log::debug!(at = matched, "breakpoint");
            Scanned::Skip
        }
        Rule::newline => Scanned::Token(TokenKind::Eol),
        Rule::string => Scanned::Token(TokenKind::String),
        Rule::unterminated_string => {
            return (Scanned::Error(ErrorKind::UnterminatedString), 1);
        }
        Rule::code_block => Scanned::Token(TokenKind::CodeBlock),
        Rule::open_brace => return (Scanned::Error(ErrorKind::UnbalancedBlock), 1),
        Rule::lr_arrow => Scanned::Token(TokenKind::Arrow(ArrowKind::Both)),
        Rule::l_arrow => Scanned::Token(TokenKind::Arrow(ArrowKind::Left)),
        Rule::r_arrow => Scanned::Token(TokenKind::Arrow(ArrowKind::Right)),
        Rule::assign_op => Scanned::Token(TokenKind::Assign(match matched.as_bytes()[0] {
            b'+' => AssignOp::Add,
            b'-' => AssignOp::Sub,
            b'*' => AssignOp::Mul,
            _ => AssignOp::Div,
        })),
        Rule::eq_eq => Scanned::Token(TokenKind::EqEq),
        Rule::assign => Scanned::Token(TokenKind::Assign(AssignOp::Set)),
        Rule::nth => Scanned::Token(TokenKind::Nth),
        Rule::hex_number | Rule::number => Scanned::Token(TokenKind::Number),
        Rule::dot => classify_dot(&text[1..]),
        Rule::parameter => {
            Scanned::Token(TokenKind::Parameter(matched.as_bytes()[1] - b'0'))
        }
        Rule::word => Scanned::Token(classify_word(matched)),
        Rule::punct => Scanned::Token(match matched {
            "(" => TokenKind::LParen,
            ")" => TokenKind::RParen,
            "[" => TokenKind::LBracket,
            "]" => TokenKind::RBracket,
            "," => TokenKind::Comma,
            ":" => TokenKind::Colon,
            "+" => TokenKind::Plus,
            "-" => TokenKind::Minus,
            "*" => TokenKind::Star,
            "/" => TokenKind::Slash,
            "%" => TokenKind::Percent,
            "<" => TokenKind::Lt,
            _ => TokenKind::Gt,
        }),
        _ => return (Scanned::Error(ErrorKind::UnrecognizedToken), one_char),
    };
    (scanned, len)
}

/// Classify a word: place names start uppercase, then keywords, then classes.
fn classify_word(word: &str) -> TokenKind {
    if word.starts_with(|c: char| c.is_ascii_uppercase()) {
        return TokenKind::PlaceName;
    }
    if let Some(kw) = lookup_keyword(word) {
        return TokenKind::Keyword(kw);
    }
    if let Some(class) = lookup_class(word) {
        return TokenKind::Class(class);
    }
    if word == DATE_LITERAL {
        return TokenKind::Date;
    }
    TokenKind::Ident
}

/// A dot's meaning depends on the word that follows it.
fn classify_dot(rest: &str) -> Scanned {
    let Some(first) = rest.chars().next() else {
        return Scanned::Error(ErrorKind::UnrecognizedToken);
    };
    if first.is_ascii_uppercase() {
        return Scanned::Token(TokenKind::DotU);
    }
    if !first.is_ascii_lowercase() {
        return Scanned::Error(ErrorKind::UnrecognizedToken);
    }
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let kind = match lookup_keyword(&rest[..end]) {
        Some(Keyword::X | Keyword::Y) => TokenKind::DotXY,
        Some(kw) if kw.edge().is_some() => TokenKind::DotE,
        _ => TokenKind::DotL,
    };
    Scanned::Token(kind)
}

// ============================================================================
// Literal conversion
// ============================================================================

/// Convert a numeric literal to inches. Unit suffixes scale the mantissa;
/// hex literals are plain integers. Malformed text yields 0.0.
pub fn number_value(text: &str) -> f64 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_or(0.0, |v| v as f64);
    }
    let (mantissa, divisor) = match text.len().checked_sub(2).map(|i| text.split_at(i)) {
        Some((m, "in")) => (m, 1.0),
        Some((m, "cm")) => (m, 2.54),
        Some((m, "mm")) => (m, 25.4),
        Some((m, "px")) => (m, 96.0),
        Some((m, "pt")) => (m, 72.0),
        Some((m, "pc")) => (m, 6.0),
        _ => (text, 1.0),
    };
    mantissa.parse::<f64>().map_or(0.0, |v| v / divisor)
}

/// The integer part of an ordinal like `3rd`.
pub fn ordinal_value(text: &str) -> u64 {
    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text, |end| &text[..end]);
    digits.parse().unwrap_or(u64::MAX)
}

/// The contents of a string literal without its quotes.
pub fn string_body(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < src.len() {
            let (scanned, len) = scan(&src[pos..]);
            assert!(len > 0);
            if let Scanned::Token(kind) = scanned {
                out.push(kind);
            }
            pos += len;
        }
        out
    }

    fn single(src: &str) -> (Scanned, usize) {
        scan(src)
    }

    // ==== classification tests ====

    #[test]
    fn words_classify_by_table() {
        assert_eq!(
            kinds("box wid Foo x1 $x @y"),
            vec![
                TokenKind::Class(ClassName::Box),
                TokenKind::Keyword(Keyword::Width),
                TokenKind::PlaceName,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
            ]
        );
        assert_eq!(kinds("pikchr_date"), vec![TokenKind::Date]);
    }

    #[test]
    fn dots_are_disambiguated_by_following_word() {
        assert_eq!(kinds(".ne")[0], TokenKind::DotE);
        assert_eq!(kinds(".start")[0], TokenKind::DotE);
        assert_eq!(kinds(".x")[0], TokenKind::DotXY);
        assert_eq!(kinds(".wid")[0], TokenKind::DotL);
        assert_eq!(kinds(".Inner")[0], TokenKind::DotU);
        assert_eq!(kinds(".5"), vec![TokenKind::Number]);
    }

    #[test]
    fn operators_prefer_longest_match() {
        assert_eq!(
            kinds("<-> <- -> -= - == = /= *"),
            vec![
                TokenKind::Arrow(ArrowKind::Both),
                TokenKind::Arrow(ArrowKind::Left),
                TokenKind::Arrow(ArrowKind::Right),
                TokenKind::Assign(AssignOp::Sub),
                TokenKind::Minus,
                TokenKind::EqEq,
                TokenKind::Assign(AssignOp::Set),
                TokenKind::Assign(AssignOp::Div),
                TokenKind::Star,
            ]
        );
    }

    #[test]
    fn arrow_spellings() {
        assert_eq!(kinds("→"), vec![TokenKind::Arrow(ArrowKind::Right)]);
        assert_eq!(kinds("←"), vec![TokenKind::Arrow(ArrowKind::Left)]);
        assert_eq!(kinds("↔"), vec![TokenKind::Arrow(ArrowKind::Both)]);
        assert_eq!(kinds("&rarr;"), vec![TokenKind::Arrow(ArrowKind::Right)]);
        assert_eq!(kinds("&leftarrow;"), vec![TokenKind::Arrow(ArrowKind::Left)]);
        assert_eq!(kinds("&leftrightarrow;"), vec![TokenKind::Arrow(ArrowKind::Both)]);
    }

    #[test]
    fn comments_and_continuations_are_skipped() {
        assert_eq!(
            kinds("box # note\nline // x\n/* multi\nline */ arrow \\\n right"),
            vec![
                TokenKind::Class(ClassName::Box),
                TokenKind::Eol,
                TokenKind::Class(ClassName::Line),
                TokenKind::Eol,
                TokenKind::Class(ClassName::Arrow),
                TokenKind::Keyword(Keyword::Dir(crate::types::Direction::Right)),
            ]
        );
    }

    #[test]
    fn semicolon_ends_a_statement() {
        assert_eq!(
            kinds("box;circle"),
            vec![
                TokenKind::Class(ClassName::Box),
                TokenKind::Eol,
                TokenKind::Class(ClassName::Circle),
            ]
        );
    }

    // ==== literal tests ====

    #[test]
    fn strings_keep_escaped_quotes() {
        let (scanned, len) = single(r#""a \"b\" c" rest"#);
        assert_eq!(scanned, Scanned::Token(TokenKind::String));
        assert_eq!(len, 12);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            single("\"abc"),
            (Scanned::Error(ErrorKind::UnterminatedString), 1)
        );
    }

    #[test]
    fn code_blocks_balance_nested_braces() {
        let src = "{ box { x } \"}\" # }\n } tail";
        let (scanned, len) = single(src);
        assert_eq!(scanned, Scanned::Token(TokenKind::CodeBlock));
        assert_eq!(&src[..len], "{ box { x } \"}\" # }\n }");
        assert_eq!(
            single("{ unbalanced"),
            (Scanned::Error(ErrorKind::UnbalancedBlock), 1)
        );
    }

    #[test]
    fn ordinals_and_parameters() {
        assert_eq!(kinds("1st 22nd 3rd 4th"), vec![TokenKind::Nth; 4]);
        assert_eq!(ordinal_value("22nd"), 22);
        assert_eq!(kinds("$3"), vec![TokenKind::Parameter(3)]);
        assert_eq!(kinds("$0"), vec![TokenKind::Ident]);
    }

    #[test]
    fn unknown_characters_are_single_char_errors() {
        assert_eq!(single("~x"), (Scanned::Error(ErrorKind::UnrecognizedToken), 1));
        assert_eq!(single("é"), (Scanned::Error(ErrorKind::UnrecognizedToken), 2));
    }

    #[test]
    fn units_convert_to_inches() {
        for text in ["1in", "2.54cm", "25.4mm", "96px", "72pt", "6pc", "1"] {
            assert_eq!(kinds(text), vec![TokenKind::Number], "{text}");
            assert!((number_value(text) - 1.0).abs() < 1e-12, "{text}");
        }
        assert_eq!(number_value("0x1F"), 31.0);
        assert_eq!(number_value("1.5e1"), 15.0);
        assert_eq!(number_value(".25"), 0.25);
    }
}
