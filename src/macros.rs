//! Macro expansion for pikchr
//!
//! Handles `define name { body }` and macro invocations. Expansion happens
//! while tokenizing: [`TokenStream`] keeps an explicit stack of frames, each
//! scanning a byte range of the original source (the document, a macro body
//! or a substituted argument). Every token therefore keeps a span into the
//! original text.

use std::collections::HashMap;

use crate::errors::{CompileError, ErrorKind};
use crate::keywords::Keyword;
use crate::lexer::{MAX_TOKEN_LEN, Scanned, Token, TokenKind, scan};
use crate::types::Span;

/// Macro bodies active at once.
const MAX_EXPANSION_DEPTH: usize = 10;
/// Tokens delivered to the parser across the whole document.
const MAX_TOKENS: usize = 100_000;
const MAX_ARGS: usize = 9;

/// Macro definition
#[derive(Debug, Clone)]
struct MacroDef {
    /// The name token of the `define` that created it.
    name: Span,
    /// Body text between the braces.
    body: Span,
    in_use: bool,
}

#[derive(Debug)]
enum FrameKind {
    Document,
    Body {
        name: String,
        call: Span,
        args: [Span; MAX_ARGS],
    },
    Argument,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    pos: usize,
    end: usize,
}

impl Frame {
    fn args(&self) -> Option<&[Span; MAX_ARGS]> {
        match &self.kind {
            FrameKind::Body { args, .. } => Some(args),
            _ => None,
        }
    }
}

/// A pull-based token source with macro expansion and lookahead.
///
/// Tokens are buffered so the parser can look ahead and backtrack with
/// [`mark`](Self::mark)/[`reset`](Self::reset). The buffer is released at
/// statement boundaries with [`commit`](Self::commit).
pub struct TokenStream<'src> {
    source: &'src str,
    frames: Vec<Frame>,
    macros: HashMap<String, MacroDef>,
    /// Buffered tokens with the macro call sites active when each was read.
    buffer: Vec<(Token, Vec<Span>)>,
    cursor: usize,
    delivered: usize,
    after_define: bool,
}

impl<'src> TokenStream<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            frames: vec![Frame {
                kind: FrameKind::Document,
                pos: 0,
                end: source.len(),
            }],
            macros: HashMap::new(),
            buffer: Vec::new(),
            cursor: 0,
            delivered: 0,
            after_define: false,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// The source text of a token.
    pub fn text(&self, token: Token) -> &'src str {
        token.span.text(self.source)
    }

    pub fn peek(&mut self) -> Result<Token, CompileError> {
        self.peek_nth(0)
    }

    /// Look `n` tokens past the cursor.
    pub fn peek_nth(&mut self, n: usize) -> Result<Token, CompileError> {
        while self.buffer.len() <= self.cursor + n {
            let token = self.read_token()?;
            let stack = self.call_stack();
            self.buffer.push((token, stack));
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        let idx = (self.cursor + n).min(self.buffer.len() - 1);
        Ok(self.buffer[idx].0)
    }

    pub fn next(&mut self) -> Result<Token, CompileError> {
        let token = self.peek()?;
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        Ok(token)
    }

    /// Consume the next token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Result<Option<Token>, CompileError> {
        if self.peek()?.kind == kind {
            self.next().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn mark(&self) -> usize {
        self.cursor
    }

    pub fn reset(&mut self, mark: usize) {
        self.cursor = mark;
    }

    /// Forget every consumed token. Marks taken before this are invalid.
    pub fn commit(&mut self) {
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
    }

    /// Register (or replace) a macro from its name token and `{...}` token.
    pub fn define(&mut self, name: Token, body: Token) {
        let text = self.text(name).to_string();
        let body = Span::new(body.span.start + 1, body.span.len.saturating_sub(2));
        crate::log::debug!(macro_name = %text, "define macro");
        let in_use = self.macros.get(&text).is_some_and(|m| m.in_use);
        self.macros.insert(
            text,
            MacroDef {
                name: name.span,
                body,
                in_use,
            },
        );
    }

    /// Call sites of the macro bodies currently being expanded, outermost first.
    pub fn call_stack(&self) -> Vec<Span> {
        self.frames
            .iter()
            .filter_map(|f| match &f.kind {
                FrameKind::Body { call, .. } => Some(*call),
                _ => None,
            })
            .collect()
    }

    /// The macro context of the buffered token covering `span`, falling back
    /// to the context of the current lookahead.
    pub fn context_of(&self, span: Span) -> Vec<Span> {
        self.buffer
            .iter()
            .rev()
            .find(|(t, _)| t.span == span)
            .or_else(|| self.buffer.get(self.cursor.min(self.buffer.len().saturating_sub(1))))
            .map(|(_, stack)| stack.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------------

    fn read_token(&mut self) -> Result<Token, CompileError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(self.eof());
            };
            if frame.pos >= frame.end {
                if matches!(frame.kind, FrameKind::Document) {
                    return Ok(self.eof());
                }
                self.pop_frame();
                continue;
            }

            let start = frame.pos;
            let source = self.source;
            let text = &source[start..frame.end];
            let (scanned, len) = scan(text);
            frame.pos += len;
            let span = Span::new(start, len);

            if len > MAX_TOKEN_LEN {
                return Err(self.error(ErrorKind::TokenTooLong, Span::new(start, 1)));
            }
            let kind = match scanned {
                Scanned::Skip => continue,
                Scanned::Error(kind) => return Err(self.error(kind, span)),
                Scanned::Token(kind) => kind,
            };

            match kind {
                TokenKind::Parameter(n) => {
                    if let Some(args) = self.frames.last().and_then(Frame::args) {
                        let arg = args[usize::from(n) - 1];
                        if arg.len > 0 {
                            self.frames.push(Frame {
                                kind: FrameKind::Argument,
                                pos: arg.start,
                                end: arg.end(),
                            });
                        }
                        continue;
                    }
                }
                TokenKind::Ident if !self.after_define => {
                    let source = self.source;
                    let name = span.text(source);
                    if self.macros.contains_key(name) {
                        self.push_macro(name.to_string(), span)?;
                        continue;
                    }
                }
                _ => {}
            }

            self.delivered += 1;
            if self.delivered > MAX_TOKENS {
                return Err(self.error(ErrorKind::TooComplex, span));
            }
            self.after_define = kind == TokenKind::Keyword(Keyword::Define);
            return Ok(Token { kind, span });
        }
    }

    fn eof(&self) -> Token {
        Token {
            kind: TokenKind::Eof,
            span: Span::new(self.source.len(), 0),
        }
    }

    fn error(&self, kind: ErrorKind, span: Span) -> CompileError {
        CompileError::new(kind, span).in_context(&self.call_stack())
    }

    fn push_macro(&mut self, name: String, call: Span) -> Result<(), CompileError> {
        let (def_name, body, in_use) = match self.macros.get(&name) {
            Some(m) => (m.name, m.body, m.in_use),
            None => return Ok(()),
        };
        if in_use {
            return Err(self.error(ErrorKind::RecursiveMacro, def_name));
        }
        let depth = self
            .frames
            .iter()
            .filter(|f| matches!(f.kind, FrameKind::Body { .. }))
            .count();
        if depth >= MAX_EXPANSION_DEPTH {
            return Err(self.error(ErrorKind::MacrosTooDeep, call));
        }

        let args = self.parse_args()?;
        crate::log::debug!(macro_name = %name, depth = depth + 1, "expand macro");
        if let Some(m) = self.macros.get_mut(&name) {
            m.in_use = true;
        }
        self.frames.push(Frame {
            kind: FrameKind::Body { name, call, args },
            pos: body.start,
            end: body.end(),
        });
        Ok(())
    }

    fn pop_frame(&mut self) {
        if let Some(Frame {
            kind: FrameKind::Body { name, .. },
            ..
        }) = self.frames.pop()
        {
            crate::log::debug!(macro_name = %name, "end of macro");
            if let Some(m) = self.macros.get_mut(&name) {
                m.in_use = false;
            }
        }
    }

    /// Parse `(a, b, ...)` directly after a macro name in the current frame.
    /// Arguments are trimmed; an argument that is exactly `$N` takes the
    /// enclosing frame's N-th argument.
    fn parse_args(&mut self) -> Result<[Span; MAX_ARGS], CompileError> {
        let mut args = [Span::default(); MAX_ARGS];
        let Some(frame) = self.frames.last() else {
            return Ok(args);
        };
        let open = frame.pos;
        let end = frame.end;
        if self.source.as_bytes().get(open) != Some(&b'(') || open >= end {
            return Ok(args);
        }
        let outer = frame.args().copied();

        let open_span = Span::new(open, 1);
        let mut count = 0;
        let mut arg_start = open + 1;
        let mut depth = 0usize;
        let mut pos = open + 1;
        let close = loop {
            if pos >= end {
                return Err(self.error(ErrorKind::UnterminatedMacroArgs, open_span));
            }
            let (scanned, len) = scan(&self.source[pos..end]);
            match scanned {
                Scanned::Token(TokenKind::LParen | TokenKind::LBracket) => depth += 1,
                Scanned::Token(TokenKind::RParen) if depth == 0 => break pos,
                Scanned::Token(TokenKind::RParen | TokenKind::RBracket) => {
                    depth = depth.saturating_sub(1)
                }
                Scanned::Token(TokenKind::Comma) if depth == 0 => {
                    if count == MAX_ARGS - 1 {
                        return Err(self.error(ErrorKind::TooManyMacroArgs, open_span));
                    }
                    args[count] = Span::new(arg_start, pos - arg_start);
                    count += 1;
                    arg_start = pos + 1;
                }
                _ => {}
            }
            pos += len;
        };
        args[count] = Span::new(arg_start, close - arg_start);

        for arg in args.iter_mut().take(count + 1) {
            *arg = self.trim(*arg);
            let text = arg.text(self.source).as_bytes();
            if text.len() == 2 && text[0] == b'$' && (b'1'..=b'9').contains(&text[1]) {
                *arg = outer.map_or(Span::default(), |o| o[usize::from(text[1] - b'1')]);
            }
        }

        if let Some(frame) = self.frames.last_mut() {
            frame.pos = close + 1;
        }
        Ok(args)
    }

    fn trim(&self, span: Span) -> Span {
        let text = span.text(self.source);
        let lead = text.len() - text.trim_start().len();
        let trimmed = text.trim();
        Span::new(span.start + lead, trimmed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::ClassName;

    /// Drain the stream, registering macros the way the parser would.
    fn expand(src: &str) -> Result<Vec<String>, CompileError> {
        let mut ts = TokenStream::new(src);
        let mut out = Vec::new();
        loop {
            let t = ts.next()?;
            match t.kind {
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::Define) => {
                    let name = ts.next()?;
                    let body = ts.next()?;
                    ts.define(name, body);
                }
                _ => out.push(ts.text(t).to_string()),
            }
            ts.commit();
        }
        Ok(out)
    }

    #[test]
    fn plain_tokens_pass_through() {
        assert_eq!(expand("box wid 1").unwrap(), vec!["box", "wid", "1"]);
    }

    #[test]
    fn macro_body_replaces_invocation() {
        let toks = expand("define b { box wid 2 }\nb; b").unwrap();
        assert_eq!(toks, vec!["\n", "box", "wid", "2", ";", "box", "wid", "2"]);
    }

    #[test]
    fn arguments_are_trimmed_and_substituted() {
        let toks = expand("define m { circle rad $1 fill $2 }\nm( 0.5 , (1,2) )").unwrap();
        assert_eq!(
            toks,
            vec!["\n", "circle", "rad", "0.5", "fill", "(", "1", ",", "2", ")"]
        );
    }

    #[test]
    fn missing_arguments_expand_to_nothing() {
        let toks = expand("define m { box $1 $2 }\nm(\"x\")").unwrap();
        assert_eq!(toks, vec!["\n", "box", "\"x\""]);
    }

    #[test]
    fn dollar_argument_forwards_outer_argument() {
        let src = "define inner { text $1 }\ndefine outer { inner($1) }\nouter(\"hi\")";
        let toks = expand(src).unwrap();
        assert_eq!(toks, vec!["\n", "\n", "text", "\"hi\""]);
    }

    #[test]
    fn expanded_tokens_point_into_source() {
        let src = "define b { box }\nb";
        let mut ts = TokenStream::new(src);
        ts.next().unwrap();
        let name = ts.next().unwrap();
        let body = ts.next().unwrap();
        ts.define(name, body);
        assert_eq!(ts.next().unwrap().kind, TokenKind::Eol);
        let t = ts.next().unwrap();
        assert_eq!(t.kind, TokenKind::Class(ClassName::Box));
        assert_eq!(t.span, Span::new(11, 3));
        assert_eq!(ts.call_stack(), vec![Span::new(17, 1)]);
        assert_eq!(ts.context_of(t.span), vec![Span::new(17, 1)]);
    }

    #[test]
    fn define_name_is_not_expanded() {
        let toks = expand("define a { box }\ndefine a { circle }\na").unwrap();
        assert_eq!(toks, vec!["\n", "\n", "circle"]);
    }

    #[test]
    fn recursion_is_reported_at_definition() {
        let err = expand("define r { box r }\nr").unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursiveMacro);
        assert_eq!(err.span, Span::new(7, 1));
        assert_eq!(err.called_from, vec![Span::new(19, 1)]);
    }

    #[test]
    fn argument_list_errors() {
        let err = expand("define m { box }\nm(1,2,3,4,5,6,7,8,9,10)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyMacroArgs);
        let err = expand("define m { box }\nm(1, (2)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedMacroArgs);
    }

    #[test]
    fn nested_commas_do_not_split() {
        let toks = expand("define m { $2 }\nm([a, b], {c, d}, last)").unwrap();
        assert_eq!(toks, vec!["\n", "{c, d}"]);
    }

    #[test]
    fn backtracking_replays_buffered_tokens() {
        let mut ts = TokenStream::new("1 + 2");
        let m = ts.mark();
        ts.next().unwrap();
        ts.next().unwrap();
        ts.reset(m);
        let tok = ts.next().unwrap();
        assert_eq!(ts.text(tok), "1");
        assert_eq!(ts.peek_nth(1).unwrap().kind, TokenKind::Number);
    }

    #[test]
    fn lexical_errors_carry_position() {
        let err = expand("box ~").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnrecognizedToken);
        assert_eq!(err.span, Span::new(4, 1));
    }
}
