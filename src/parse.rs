//! Recursive-descent parser
//!
//! Statements are read one at a time from the macro-expanding
//! [`TokenStream`] and executed on the [`RenderContext`] as soon as they are
//! complete, so later statements can refer to earlier objects. Alternatives
//! sharing a prefix (positions, asserts) are tried in turn with
//! backtracking. When no alternative fits, the syntax error raised furthest
//! into the input is reported.

use crate::ast::*;
use crate::errors::{CompileError, ErrorKind};
use crate::keywords::Keyword;
use crate::lexer::{ArrowKind, Token, TokenKind, number_value, ordinal_value, string_body};
use crate::macros::TokenStream;
use crate::render::{PIKCHR_DATE, RenderContext};
use crate::types::{Direction, Edge, Span};

type Result<T> = std::result::Result<T, CompileError>;

/// Largest ordinal accepted in `Nth` references.
const MAX_ORDINAL: u64 = 1000;

/// Parse and run a whole document. The returned context holds every object,
/// ready to render.
pub fn compile(source: &str) -> Result<RenderContext> {
    let mut parser = Parser {
        tokens: TokenStream::new(source),
        ctx: RenderContext::new(),
        furthest: None,
        depth: 0,
    };
    match parser.document() {
        Ok(()) => Ok(parser.ctx),
        Err(err) => {
            let frames = parser.tokens.context_of(err.span);
            Err(err.in_context(&frames))
        }
    }
}

/// Tokens that may begin an expression.
fn starts_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number
            | TokenKind::Ident
            | TokenKind::PlaceName
            | TokenKind::Nth
            | TokenKind::LParen
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Keyword(
                Keyword::Func(_) | Keyword::Dist | Keyword::This | Keyword::Last | Keyword::First
            )
    )
}

fn size_prop(kw: Keyword) -> Option<SizeProp> {
    match kw {
        Keyword::Height => Some(SizeProp::Height),
        Keyword::Width => Some(SizeProp::Width),
        Keyword::Radius => Some(SizeProp::Radius),
        Keyword::Diameter => Some(SizeProp::Diameter),
        Keyword::Thickness => Some(SizeProp::Thickness),
        _ => None,
    }
}

fn style_flag(kind: TokenKind) -> Option<StyleFlag> {
    let flag = match kind {
        TokenKind::Keyword(Keyword::Cw) => StyleFlag::Cw,
        TokenKind::Keyword(Keyword::Ccw) => StyleFlag::Ccw,
        TokenKind::Keyword(Keyword::Invis) => StyleFlag::Invis,
        TokenKind::Keyword(Keyword::Thick) => StyleFlag::Thick,
        TokenKind::Keyword(Keyword::Thin) => StyleFlag::Thin,
        TokenKind::Keyword(Keyword::Solid) => StyleFlag::Solid,
        TokenKind::Arrow(ArrowKind::Left) => StyleFlag::LArrow,
        TokenKind::Arrow(ArrowKind::Right) => StyleFlag::RArrow,
        TokenKind::Arrow(ArrowKind::Both) => StyleFlag::LRArrow,
        _ => return None,
    };
    Some(flag)
}

/// Properties readable after `object.`
fn dot_property(kw: Keyword) -> Option<Property> {
    match kw {
        Keyword::Width => Some(Property::Width),
        Keyword::Height => Some(Property::Height),
        Keyword::Radius => Some(Property::Radius),
        Keyword::Diameter => Some(Property::Diameter),
        Keyword::Thickness => Some(Property::Thickness),
        Keyword::Dashed => Some(Property::Dashed),
        Keyword::Dotted => Some(Property::Dotted),
        Keyword::Fill => Some(Property::Fill),
        Keyword::Color => Some(Property::Color),
        _ => None,
    }
}

/// Bounding-box sides readable as `object.top` and friends.
fn side_property(kw: Keyword) -> Option<Property> {
    match kw {
        Keyword::Top => Some(Property::Top),
        Keyword::Bottom => Some(Property::Bottom),
        Keyword::Dir(Direction::Left) => Some(Property::Left),
        Keyword::Dir(Direction::Right) => Some(Property::Right),
        _ => None,
    }
}

struct Parser<'src> {
    tokens: TokenStream<'src>,
    ctx: RenderContext,
    /// The furthest token a syntax error was raised at in this statement.
    furthest: Option<Span>,
    /// Open `[` groups. Tokens are only released outside of groups.
    depth: usize,
}

impl Parser<'_> {
    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&mut self) -> Result<Token> {
        self.tokens.peek()
    }

    fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.tokens.peek()?.kind)
    }

    fn peek_nth_kind(&mut self, n: usize) -> Result<TokenKind> {
        Ok(self.tokens.peek_nth(n)?.kind)
    }

    fn bump(&mut self) -> Result<Token> {
        self.tokens.next()
    }

    fn text(&self, token: Token) -> String {
        self.tokens.text(token).to_string()
    }

    /// A syntax error at `token`, remembered if it is the furthest so far.
    fn syntax(&mut self, token: Token) -> CompileError {
        if self.furthest.is_none_or(|f| token.span.start > f.start) {
            self.furthest = Some(token.span);
        }
        CompileError::new(ErrorKind::Syntax, token.span)
    }

    fn unexpected<T>(&mut self) -> Result<T> {
        let tok = self.peek()?;
        Err(self.syntax(tok))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let tok = self.peek()?;
        if tok.kind == kind {
            self.bump()
        } else {
            Err(self.syntax(tok))
        }
    }

    fn expect_kw(&mut self, kw: Keyword) -> Result<Token> {
        self.expect(TokenKind::Keyword(kw))
    }

    fn eat(&mut self, kind: TokenKind) -> Result<Option<Token>> {
        self.tokens.eat(kind)
    }

    fn eat_kw(&mut self, kw: Keyword) -> Result<Option<Token>> {
        self.tokens.eat(TokenKind::Keyword(kw))
    }

    /// Run `f`; on a syntax error rewind and return `None`.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<Option<T>> {
        let mark = self.tokens.mark();
        match f(self) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind == ErrorKind::Syntax => {
                self.tokens.reset(mark);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn starts_expr(&mut self) -> Result<bool> {
        Ok(starts_expr(self.peek_kind()?))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn document(&mut self) -> Result<()> {
        self.statement_list()?;
        match self.peek_kind()? {
            TokenKind::Eof => Ok(()),
            _ => self.unexpected(),
        }
    }

    fn statement_list(&mut self) -> Result<()> {
        loop {
            self.statement()?;
            if self.depth == 0 {
                self.tokens.commit();
            }
            if self.eat(TokenKind::Eol)?.is_none() {
                return Ok(());
            }
        }
    }

    fn statement(&mut self) -> Result<()> {
        self.furthest = None;
        match self.statement_body() {
            Err(e) if e.kind == ErrorKind::Syntax => {
                let span = self.furthest.unwrap_or(e.span);
                Err(CompileError::new(ErrorKind::Syntax, span))
            }
            other => other,
        }
    }

    /// The statement must stop here.
    fn end(&mut self) -> Result<()> {
        match self.peek_kind()? {
            TokenKind::Eol | TokenKind::Eof => Ok(()),
            TokenKind::RBracket if self.depth > 0 => Ok(()),
            _ => self.unexpected(),
        }
    }

    fn statement_body(&mut self) -> Result<()> {
        let tok = self.peek()?;
        match tok.kind {
            TokenKind::Eol | TokenKind::Eof | TokenKind::RBracket => Ok(()),
            TokenKind::Keyword(Keyword::Dir(dir)) => {
                self.bump()?;
                self.end()?;
                self.ctx.set_direction(dir);
                Ok(())
            }
            TokenKind::Ident
            | TokenKind::Keyword(Keyword::Fill | Keyword::Color | Keyword::Thickness) => {
                self.assignment()
            }
            TokenKind::PlaceName if self.peek_nth_kind(1)? == TokenKind::Colon => {
                self.bump()?;
                self.bump()?;
                let name = self.text(tok);
                match self.peek_kind()? {
                    TokenKind::Class(_)
                    | TokenKind::String
                    | TokenKind::Date
                    | TokenKind::LBracket => self.object_statement(Some(name)),
                    _ => {
                        let position = self.position()?;
                        self.end()?;
                        self.ctx.execute(&Statement::Place {
                            name,
                            position,
                            span: tok.span,
                        })
                    }
                }
            }
            TokenKind::Class(_) | TokenKind::String | TokenKind::Date | TokenKind::LBracket => {
                self.object_statement(None)
            }
            TokenKind::Keyword(Keyword::Print) => self.print(),
            TokenKind::Keyword(Keyword::Assert) => self.assert(),
            TokenKind::Keyword(Keyword::Define) => self.define(),
            _ => Err(self.syntax(tok)),
        }
    }

    fn assignment(&mut self) -> Result<()> {
        let name = self.bump()?;
        let op_tok = self.peek()?;
        let TokenKind::Assign(op) = op_tok.kind else {
            return Err(self.syntax(op_tok));
        };
        self.bump()?;
        let value = self.rvalue()?;
        self.end()?;
        let name = self.text(name);
        self.ctx.execute(&Statement::Assign {
            name,
            op,
            value,
            span: op_tok.span,
        })
    }

    fn define(&mut self) -> Result<()> {
        self.bump()?;
        let name = self.peek()?;
        if !matches!(name.kind, TokenKind::Ident | TokenKind::PlaceName) {
            return Err(self.syntax(name));
        }
        self.bump()?;
        let body = self.expect(TokenKind::CodeBlock)?;
        self.end()?;
        self.tokens.define(name, body);
        Ok(())
    }

    fn print(&mut self) -> Result<()> {
        self.bump()?;
        let mut items = Vec::new();
        loop {
            let tok = self.peek()?;
            let item = match tok.kind {
                TokenKind::String | TokenKind::Date => {
                    self.bump()?;
                    PrintItem::Text(self.string_text(tok))
                }
                TokenKind::Keyword(Keyword::Fill | Keyword::Color | Keyword::Thickness) => {
                    self.bump()?;
                    PrintItem::Value(Rvalue::Expr(Expr::Variable {
                        name: self.text(tok),
                        span: tok.span,
                    }))
                }
                _ => PrintItem::Value(self.rvalue()?),
            };
            items.push(item);
            if self.eat(TokenKind::Comma)?.is_some() {
                items.push(PrintItem::Separator);
                continue;
            }
            let next = self.peek_kind()?;
            if !(starts_expr(next) || matches!(next, TokenKind::String | TokenKind::Date)) {
                break;
            }
        }
        self.end()?;
        self.ctx.execute(&Statement::Print(items))
    }

    fn assert(&mut self) -> Result<()> {
        self.bump()?;
        self.expect(TokenKind::LParen)?;
        let numbers = self.attempt(|p| {
            let lhs = p.expr()?;
            let eq = p.expect(TokenKind::EqEq)?;
            let rhs = p.expr()?;
            p.expect(TokenKind::RParen)?;
            Ok((lhs, eq, rhs))
        })?;
        let stmt = match numbers {
            Some((lhs, eq, rhs)) => Statement::AssertEqual {
                lhs,
                rhs,
                span: eq.span,
            },
            None => {
                let lhs = self.position()?;
                let eq = self.expect(TokenKind::EqEq)?;
                let rhs = self.position()?;
                self.expect(TokenKind::RParen)?;
                Statement::AssertSamePlace {
                    lhs,
                    rhs,
                    span: eq.span,
                }
            }
        };
        self.end()?;
        self.ctx.execute(&stmt)
    }

    // ========================================================================
    // Objects and attributes
    // ========================================================================

    fn object_statement(&mut self, name: Option<String>) -> Result<()> {
        let tok = self.bump()?;
        let (base, span, children) = match tok.kind {
            TokenKind::Class(class) => (BaseType::Class(class), tok.span, Vec::new()),
            TokenKind::String | TokenKind::Date => {
                let spec = self.text_spec(tok)?;
                (BaseType::Text(spec), tok.span, Vec::new())
            }
            TokenKind::LBracket => {
                self.ctx.begin_sublist();
                self.depth += 1;
                let inner = self.statement_list();
                self.depth -= 1;
                let children = self.ctx.end_sublist();
                inner?;
                let close = self.expect(TokenKind::RBracket)?;
                (BaseType::Sublist, close.span, children)
            }
            _ => return Err(self.syntax(tok)),
        };

        let leading = if self.starts_expr()? {
            let first = self.peek()?;
            Some((self.relexpr()?, first.span))
        } else {
            None
        };
        let attributes = self.attributes()?;
        self.end()?;
        let stmt = ObjectStmt {
            name,
            base,
            span,
            leading,
            attributes,
        };
        self.ctx.build_object(&stmt, children)?;
        Ok(())
    }

    fn attributes(&mut self) -> Result<Vec<Attribute>> {
        let mut out = Vec::new();
        loop {
            let tok = self.peek()?;
            if let Some(flag) = style_flag(tok.kind) {
                self.bump()?;
                out.push(Attribute::Style(flag));
                continue;
            }
            let kw = match tok.kind {
                TokenKind::String | TokenKind::Date => {
                    self.bump()?;
                    out.push(Attribute::Text(self.text_spec(tok)?));
                    continue;
                }
                TokenKind::Keyword(kw) => kw,
                _ => break,
            };
            let span = tok.span;
            if let Some(prop) = size_prop(kw) {
                self.bump()?;
                let value = self.relexpr()?;
                out.push(Attribute::Size { prop, value, span });
                continue;
            }
            let attr = match kw {
                Keyword::Dashed | Keyword::Dotted => {
                    self.bump()?;
                    let value = if self.starts_expr()? {
                        Some(self.expr()?)
                    } else {
                        None
                    };
                    Attribute::Dash {
                        dotted: kw == Keyword::Dotted,
                        value,
                    }
                }
                Keyword::Fill | Keyword::Color => {
                    self.bump()?;
                    Attribute::Color {
                        fill: kw == Keyword::Fill,
                        value: self.rvalue()?,
                        span,
                    }
                }
                Keyword::Go => {
                    self.bump()?;
                    let next = self.peek()?;
                    if let TokenKind::Keyword(Keyword::Dir(dir)) = next.kind {
                        self.bump()?;
                        self.direction_attribute(dir, next.span)?
                    } else {
                        let dist = self.optional_relexpr()?;
                        self.heading(dist, span)?
                    }
                }
                Keyword::Dir(dir) => {
                    self.bump()?;
                    self.direction_attribute(dir, span)?
                }
                Keyword::Then => {
                    self.bump()?;
                    match self.peek_kind()? {
                        TokenKind::Keyword(Keyword::Heading | Keyword::EdgePt(_)) => {
                            self.heading(None, span)?
                        }
                        kind if starts_expr(kind) => {
                            let dist = Some(self.relexpr()?);
                            self.heading(dist, span)?
                        }
                        _ => Attribute::Then(span),
                    }
                }
                Keyword::Close => {
                    self.bump()?;
                    Attribute::Close(span)
                }
                Keyword::Chop => {
                    self.bump()?;
                    Attribute::Chop
                }
                Keyword::From => {
                    self.bump()?;
                    Attribute::From(self.position()?, span)
                }
                Keyword::To => {
                    self.bump()?;
                    Attribute::To(self.position()?, span)
                }
                Keyword::At => {
                    self.bump()?;
                    Attribute::At {
                        edge: None,
                        position: self.position()?,
                        span,
                    }
                }
                Keyword::With => {
                    self.bump()?;
                    self.eat(TokenKind::DotE)?;
                    let edge = self.edge()?;
                    let at = self.expect_kw(Keyword::At)?;
                    Attribute::At {
                        edge: Some(edge),
                        position: self.position()?,
                        span: at.span,
                    }
                }
                Keyword::Same => {
                    self.bump()?;
                    let other = match self.eat_kw(Keyword::As)? {
                        Some(_) => Some(self.object_ref()?),
                        None => None,
                    };
                    Attribute::Same { other, span }
                }
                Keyword::Fit => {
                    self.bump()?;
                    Attribute::Fit(span)
                }
                Keyword::Behind => {
                    self.bump()?;
                    Attribute::Behind(self.object_ref()?)
                }
                _ => break,
            };
            out.push(attr);
        }
        Ok(out)
    }

    /// After a direction keyword: `until even with P`, or a distance.
    fn direction_attribute(&mut self, dir: Direction, span: Span) -> Result<Attribute> {
        let until = self.eat_kw(Keyword::Until)?.is_some();
        if until || self.peek_kind()? == TokenKind::Keyword(Keyword::Even) {
            self.expect_kw(Keyword::Even)?;
            self.eat_kw(Keyword::With)?;
            let position = self.position()?;
            return Ok(Attribute::EvenWith {
                dir,
                position,
                span,
            });
        }
        let dist = self.optional_relexpr()?;
        Ok(Attribute::Go { dir, dist, span })
    }

    /// `heading EXPR` or a compass point, after an optional distance.
    fn heading(&mut self, dist: Option<RelExpr>, span: Span) -> Result<Attribute> {
        let tok = self.peek()?;
        let heading = match tok.kind {
            TokenKind::Keyword(Keyword::Heading) => {
                self.bump()?;
                Heading::Angle(self.expr()?)
            }
            TokenKind::Keyword(Keyword::EdgePt(cp)) if cp != crate::types::Compass::C => {
                self.bump()?;
                Heading::Compass(cp)
            }
            _ => return Err(self.syntax(tok)),
        };
        Ok(Attribute::Heading {
            dist,
            heading,
            span,
        })
    }

    fn edge(&mut self) -> Result<Edge> {
        let tok = self.peek()?;
        match tok.kind {
            TokenKind::Keyword(kw) => match kw.edge() {
                Some(edge) => {
                    self.bump()?;
                    Ok(edge)
                }
                None => Err(self.syntax(tok)),
            },
            _ => Err(self.syntax(tok)),
        }
    }

    fn string_text(&self, tok: Token) -> String {
        match tok.kind {
            TokenKind::Date => PIKCHR_DATE.to_string(),
            _ => string_body(self.tokens.text(tok)).to_string(),
        }
    }

    /// A string already consumed, plus its position keywords.
    fn text_spec(&mut self, tok: Token) -> Result<TextSpec> {
        let mut flags = TextFlags::default();
        loop {
            let kw = match self.peek_kind()? {
                TokenKind::Keyword(kw) => kw,
                _ => break,
            };
            match kw {
                Keyword::Ljust => flags.set_justify(TextFlags::LJUST),
                Keyword::Rjust => flags.set_justify(TextFlags::RJUST),
                Keyword::Above => flags.set_vertical(TextFlags::ABOVE),
                Keyword::Center => flags.set_vertical(TextFlags::CENTER),
                Keyword::Below => flags.set_vertical(TextFlags::BELOW),
                Keyword::Italic => flags.0 |= TextFlags::ITALIC,
                Keyword::Bold => flags.0 |= TextFlags::BOLD,
                Keyword::Mono => flags.0 |= TextFlags::MONO,
                Keyword::Aligned => flags.0 |= TextFlags::ALIGNED,
                Keyword::Big => flags.set_size(TextFlags::BIG),
                Keyword::Small => flags.set_size(TextFlags::SMALL),
                _ => break,
            }
            self.bump()?;
        }
        Ok(TextSpec {
            text: self.string_text(tok),
            span: tok.span,
            flags,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn rvalue(&mut self) -> Result<Rvalue> {
        let tok = self.peek()?;
        let dotted = matches!(
            self.peek_nth_kind(1)?,
            TokenKind::DotU | TokenKind::DotE | TokenKind::DotL | TokenKind::DotXY
        );
        if tok.kind == TokenKind::PlaceName && !dotted {
            self.bump()?;
            return Ok(Rvalue::Color {
                name: self.text(tok),
                span: tok.span,
            });
        }
        Ok(Rvalue::Expr(self.expr()?))
    }

    fn relexpr(&mut self) -> Result<RelExpr> {
        let expr = self.expr()?;
        let percent = self.eat(TokenKind::Percent)?.is_some();
        Ok(RelExpr { expr, percent })
    }

    fn optional_relexpr(&mut self) -> Result<Option<RelExpr>> {
        if self.starts_expr()? {
            self.relexpr().map(Some)
        } else {
            Ok(None)
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        self.binary(1)
    }

    /// Precedence climbing: `+ -` bind at 1, `* / %` at 2.
    fn binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let tok = self.peek()?;
            let (op, prec) = match tok.kind {
                TokenKind::Plus => (BinaryOp::Add, 1),
                TokenKind::Minus => (BinaryOp::Sub, 1),
                TokenKind::Star => (BinaryOp::Mul, 2),
                TokenKind::Slash => (BinaryOp::Div, 2),
                // A `%` not followed by an operand is a percent suffix.
                TokenKind::Percent if starts_expr(self.peek_nth_kind(1)?) => (BinaryOp::Rem, 2),
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            self.bump()?;
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                span: tok.span,
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek_kind()? {
            TokenKind::Minus => {
                self.bump()?;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            TokenKind::Plus => {
                self.bump()?;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let tok = self.peek()?;
        match tok.kind {
            TokenKind::Number => {
                self.bump()?;
                Ok(Expr::Number(number_value(self.tokens.text(tok))))
            }
            TokenKind::Ident => {
                self.bump()?;
                Ok(Expr::Variable {
                    name: self.text(tok),
                    span: tok.span,
                })
            }
            TokenKind::LParen => {
                self.bump()?;
                let inner = self.peek()?;
                if let TokenKind::Keyword(Keyword::Fill | Keyword::Color | Keyword::Thickness) =
                    inner.kind
                {
                    if self.peek_nth_kind(1)? == TokenKind::RParen {
                        self.bump()?;
                        self.bump()?;
                        return Ok(Expr::Variable {
                            name: self.text(inner),
                            span: inner.span,
                        });
                    }
                }
                let e = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::Keyword(Keyword::Func(func)) => {
                self.bump()?;
                self.expect(TokenKind::LParen)?;
                let mut args = vec![self.expr()?];
                if func.arity() == 2 {
                    self.expect(TokenKind::Comma)?;
                    args.push(self.expr()?);
                }
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Call {
                    func,
                    args,
                    span: tok.span,
                })
            }
            TokenKind::Keyword(Keyword::Dist) => {
                self.bump()?;
                self.expect(TokenKind::LParen)?;
                let a = self.position()?;
                self.expect(TokenKind::Comma)?;
                let b = self.position()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Dist(Box::new(a), Box::new(b)))
            }
            TokenKind::Nth | TokenKind::Keyword(Keyword::First)
                if self.peek_nth_kind(1)? == TokenKind::Keyword(Keyword::Vertex) =>
            {
                let place = self.place()?;
                self.expect(TokenKind::DotXY)?;
                let axis = self.axis()?;
                Ok(Expr::Coord(Box::new(place), axis))
            }
            TokenKind::PlaceName
            | TokenKind::Nth
            | TokenKind::Keyword(Keyword::This | Keyword::Last | Keyword::First) => {
                self.object_expr()
            }
            _ => Err(self.syntax(tok)),
        }
    }

    /// `object.x`, `object.wid`, `object.ne.y`, `object.top`
    fn object_expr(&mut self) -> Result<Expr> {
        let obj = self.object_ref()?;
        let dot = self.peek()?;
        match dot.kind {
            TokenKind::DotXY => {
                self.bump()?;
                let prop = match self.axis()? {
                    Axis::X => Property::X,
                    Axis::Y => Property::Y,
                };
                Ok(Expr::Property(obj, prop))
            }
            TokenKind::DotL => {
                self.bump()?;
                let tok = self.peek()?;
                let prop = match tok.kind {
                    TokenKind::Keyword(kw) => dot_property(kw),
                    _ => None,
                };
                match prop {
                    Some(prop) => {
                        self.bump()?;
                        Ok(Expr::Property(obj, prop))
                    }
                    None => Err(self.syntax(tok)),
                }
            }
            TokenKind::DotE => {
                self.bump()?;
                let tok = self.peek()?;
                let edge = self.edge()?;
                if self.eat(TokenKind::DotXY)?.is_some() {
                    let axis = self.axis()?;
                    return Ok(Expr::Coord(Box::new(Place::Edge(obj, edge)), axis));
                }
                match tok.kind {
                    TokenKind::Keyword(kw) => match side_property(kw) {
                        Some(prop) => Ok(Expr::Property(obj, prop)),
                        None => self.unexpected(),
                    },
                    _ => Err(self.syntax(tok)),
                }
            }
            _ => Err(self.syntax(dot)),
        }
    }

    fn axis(&mut self) -> Result<Axis> {
        let tok = self.peek()?;
        let axis = match tok.kind {
            TokenKind::Keyword(Keyword::X) => Axis::X,
            TokenKind::Keyword(Keyword::Y) => Axis::Y,
            _ => return Err(self.syntax(tok)),
        };
        self.bump()?;
        Ok(axis)
    }

    // ========================================================================
    // Positions, places and object references
    // ========================================================================

    fn position(&mut self) -> Result<Position> {
        if let Some(p) = self.attempt(Self::expr_position)? {
            return Ok(p);
        }
        if let Some(p) = self.attempt(Self::place_position)? {
            return Ok(p);
        }
        self.paren_position()
    }

    /// Positions that start with a number.
    fn expr_position(&mut self) -> Result<Position> {
        let e = self.expr()?;
        let tok = self.peek()?;
        let pos = match tok.kind {
            TokenKind::Comma => {
                self.bump()?;
                Position::Coords(e, self.expr()?)
            }
            TokenKind::Keyword(Keyword::Of) => {
                self.bump()?;
                self.expect_kw(Keyword::The)?;
                self.expect_kw(Keyword::Way)?;
                self.expect_kw(Keyword::Between)?;
                self.between(e)?
            }
            TokenKind::Keyword(Keyword::Way) => {
                self.bump()?;
                self.expect_kw(Keyword::Between)?;
                self.between(e)?
            }
            TokenKind::Keyword(Keyword::Between) => {
                self.bump()?;
                self.between(e)?
            }
            TokenKind::Lt => {
                self.bump()?;
                let a = self.position()?;
                self.expect(TokenKind::Comma)?;
                let b = self.position()?;
                self.expect(TokenKind::Gt)?;
                Position::Between(e, Box::new(a), Box::new(b))
            }
            TokenKind::Keyword(Keyword::Above) => {
                self.bump()?;
                Position::Shift(e, Direction::Up, Box::new(self.position()?))
            }
            TokenKind::Keyword(Keyword::Below) => {
                self.bump()?;
                Position::Shift(e, Direction::Down, Box::new(self.position()?))
            }
            TokenKind::Keyword(Keyword::Dir(dir @ (Direction::Left | Direction::Right))) => {
                self.bump()?;
                self.expect_kw(Keyword::Of)?;
                Position::Shift(e, dir, Box::new(self.position()?))
            }
            TokenKind::Keyword(Keyword::On) => {
                self.bump()?;
                self.expect_kw(Keyword::Heading)?;
                self.heading_position(e)?
            }
            TokenKind::Keyword(Keyword::Heading) => {
                self.bump()?;
                self.heading_position(e)?
            }
            TokenKind::Keyword(Keyword::EdgePt(cp)) => {
                self.bump()?;
                self.expect_kw(Keyword::Of)?;
                Position::CompassShift(e, cp, Box::new(self.position()?))
            }
            _ => return Err(self.syntax(tok)),
        };
        Ok(pos)
    }

    fn between(&mut self, frac: Expr) -> Result<Position> {
        let a = self.position()?;
        self.expect_kw(Keyword::And)?;
        let b = self.position()?;
        Ok(Position::Between(frac, Box::new(a), Box::new(b)))
    }

    /// After `D heading`: a compass point `of P`, or an angle `from P`.
    fn heading_position(&mut self, dist: Expr) -> Result<Position> {
        if let TokenKind::Keyword(Keyword::EdgePt(cp)) = self.peek_kind()? {
            self.bump()?;
            self.expect_kw(Keyword::Of)?;
            return Ok(Position::CompassShift(dist, cp, Box::new(self.position()?)));
        }
        let angle = self.expr()?;
        self.expect_kw(Keyword::From)?;
        Ok(Position::Heading(dist, angle, Box::new(self.position()?)))
    }

    /// `place`, `place + dx, dy`, `place - (dx, dy)`
    fn place_position(&mut self) -> Result<Position> {
        let place = self.place()?;
        let subtract = match self.peek_kind()? {
            TokenKind::Plus => false,
            TokenKind::Minus => true,
            _ => return Ok(Position::Place(place)),
        };
        self.bump()?;
        let pair = self.attempt(|p| {
            p.expect(TokenKind::LParen)?;
            let dx = p.expr()?;
            p.expect(TokenKind::Comma)?;
            let dy = p.expr()?;
            p.expect(TokenKind::RParen)?;
            Ok((dx, dy))
        })?;
        let (dx, dy) = match pair {
            Some(pair) => pair,
            None => {
                let dx = self.expr()?;
                self.expect(TokenKind::Comma)?;
                (dx, self.expr()?)
            }
        };
        Ok(Position::Offset {
            place,
            subtract,
            dx,
            dy,
        })
    }

    /// `(P)` or `(P, Q)`
    fn paren_position(&mut self) -> Result<Position> {
        self.expect(TokenKind::LParen)?;
        let first = self.position()?;
        if self.eat(TokenKind::Comma)?.is_some() {
            let second = self.position()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Position::Pair(Box::new(first), Box::new(second)));
        }
        self.expect(TokenKind::RParen)?;
        Ok(first)
    }

    fn place(&mut self) -> Result<Place> {
        let tok = self.peek()?;
        let next = self.peek_nth_kind(1)?;
        match tok.kind {
            TokenKind::Nth | TokenKind::Keyword(Keyword::First)
                if next == TokenKind::Keyword(Keyword::Vertex) =>
            {
                let index = self.ordinal(tok)?;
                self.bump()?;
                self.bump()?;
                self.expect_kw(Keyword::Of)?;
                let object = self.object_ref()?;
                Ok(Place::Vertex {
                    index,
                    span: tok.span,
                    object,
                })
            }
            TokenKind::Keyword(kw) if kw.edge().is_some() && next == TokenKind::Keyword(Keyword::Of) => {
                let edge = self.edge()?;
                self.bump()?;
                Ok(Place::Edge(self.object_ref()?, edge))
            }
            _ => {
                let obj = self.object_ref()?;
                if self.eat(TokenKind::DotE)?.is_some() {
                    let edge = self.edge()?;
                    return Ok(Place::Edge(obj, edge));
                }
                Ok(Place::Object(obj))
            }
        }
    }

    /// The value of an ordinal token; `first` is 1.
    fn ordinal(&self, tok: Token) -> Result<u64> {
        if tok.kind == TokenKind::Keyword(Keyword::First) {
            return Ok(1);
        }
        let n = ordinal_value(self.tokens.text(tok));
        if n > MAX_ORDINAL {
            return Err(CompileError::new(ErrorKind::OrdinalTooBig, tok.span));
        }
        Ok(n)
    }

    fn object_ref(&mut self) -> Result<ObjectRef> {
        let tok = self.peek()?;
        match tok.kind {
            TokenKind::Keyword(Keyword::This) => {
                self.bump()?;
                Ok(ObjectRef::This(tok.span))
            }
            TokenKind::PlaceName => {
                self.bump()?;
                let mut parts = vec![(self.text(tok), tok.span)];
                while self.eat(TokenKind::DotU)?.is_some() {
                    let name = self.expect(TokenKind::PlaceName)?;
                    parts.push((self.text(name), name.span));
                }
                Ok(ObjectRef::Named(parts))
            }
            TokenKind::Nth | TokenKind::Keyword(Keyword::First) => {
                let n = i64::try_from(self.ordinal(tok)?).unwrap_or(i64::MAX);
                self.bump()?;
                let from_end = self.eat_kw(Keyword::Last)?;
                let (class, span) = self.nth_class(from_end.is_some())?;
                let index = if from_end.is_some() { -n } else { n };
                let span = span.or(from_end.map(|t| t.span)).unwrap_or(tok.span);
                self.nth_within(index, class, span)
            }
            TokenKind::Keyword(Keyword::Last) => {
                self.bump()?;
                let (class, span) = self.nth_class(true)?;
                self.nth_within(-1, class, span.unwrap_or(tok.span))
            }
            _ => Err(self.syntax(tok)),
        }
    }

    /// The class an ordinal counts, with the span of the token naming it.
    /// Only `last` forms may leave the class out.
    fn nth_class(&mut self, optional: bool) -> Result<(NthClass, Option<Span>)> {
        let tok = self.peek()?;
        match tok.kind {
            TokenKind::Class(name) => {
                self.bump()?;
                Ok((NthClass::Class(name), Some(tok.span)))
            }
            TokenKind::LBracket if self.peek_nth_kind(1)? == TokenKind::RBracket => {
                self.bump()?;
                self.bump()?;
                Ok((NthClass::Sublist, Some(tok.span)))
            }
            _ if optional => Ok((NthClass::Any, None)),
            _ => Err(self.syntax(tok)),
        }
    }

    fn nth_within(&mut self, index: i64, class: NthClass, span: Span) -> Result<ObjectRef> {
        let within = match self.peek_kind()? {
            TokenKind::Keyword(Keyword::Of | Keyword::In) => {
                self.bump()?;
                Some(Box::new(self.object_ref()?))
            }
            _ => None,
        };
        Ok(ObjectRef::Nth {
            index,
            class,
            span,
            within,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn fails(source: &str) -> CompileError {
        match compile(source) {
            Ok(_) => panic!("{source:?} should fail"),
            Err(e) => e,
        }
    }

    fn ok(source: &str) -> RenderContext {
        match compile(source) {
            Ok(ctx) => ctx,
            Err(e) => panic!("{source:?} failed: {} at {:?}", e.kind, e.span),
        }
    }

    /// Parse a lone position against an empty document.
    fn position(source: &str) -> Position {
        let mut parser = Parser {
            tokens: TokenStream::new(source),
            ctx: RenderContext::new(),
            furthest: None,
            depth: 0,
        };
        match parser.position() {
            Ok(p) => p,
            Err(e) => panic!("{source:?}: {}", e.kind),
        }
    }

    #[test]
    fn precedence_and_percent() {
        let mut parser = Parser {
            tokens: TokenStream::new("1 + 2 * 3 % 4"),
            ctx: RenderContext::new(),
            furthest: None,
            depth: 0,
        };
        let e = parser.expr().unwrap();
        assert_eq!(parser.ctx.eval_expr(&e).unwrap(), 3.0);

        let mut parser = Parser {
            tokens: TokenStream::new("50%"),
            ctx: RenderContext::new(),
            furthest: None,
            depth: 0,
        };
        let rel = parser.relexpr().unwrap();
        assert!(rel.percent);
        assert_eq!(rel.expr, Expr::Number(50.0));
    }

    #[test]
    fn position_forms() {
        assert!(matches!(position("1, 2"), Position::Coords(..)));
        assert!(matches!(position("(1, 2)"), Position::Coords(..)));
        assert!(matches!(position("((1,2), (3,4))"), Position::Pair(..)));
        assert!(matches!(
            position("1/3 of the way between (0,0) and (3,3)"),
            Position::Between(..)
        ));
        assert!(matches!(position("0.5 <(0,0), (1,1)>"), Position::Between(..)));
        assert!(matches!(position("1 above (0,0)"), Position::Shift(_, Direction::Up, _)));
        assert!(matches!(position("2 left of (0,0)"), Position::Shift(_, Direction::Left, _)));
        assert!(matches!(position("1 heading 45 from (0,0)"), Position::Heading(..)));
        assert!(matches!(position("1 ne of (0,0)"), Position::CompassShift(..)));
        assert!(matches!(position("A.n + (1, 2)"), Position::Offset { subtract: false, .. }));
        assert!(matches!(position("A - 1, 2"), Position::Offset { subtract: true, .. }));
        assert!(matches!(position("north of A"), Position::Place(Place::Edge(..))));
        assert!(matches!(
            position("2nd vertex of L"),
            Position::Place(Place::Vertex { index: 2, .. })
        ));
    }

    #[test]
    fn object_references() {
        let mut parser = Parser {
            tokens: TokenStream::new("2nd last box in A.B"),
            ctx: RenderContext::new(),
            furthest: None,
            depth: 0,
        };
        let r = parser.object_ref().unwrap();
        let ObjectRef::Nth { index, class, within, .. } = r else {
            panic!("not an ordinal: {r:?}");
        };
        assert_eq!(index, -2);
        assert_eq!(class, NthClass::Class(crate::keywords::ClassName::Box));
        assert!(matches!(within.as_deref(), Some(ObjectRef::Named(parts)) if parts.len() == 2));
    }

    #[test]
    fn statements_run_in_order() {
        let ctx = ok("size = 2\nbox wid size\nB: circle at last box.e\nassert(B.x == 1)");
        let size = Expr::Variable {
            name: "size".into(),
            span: Span::default(),
        };
        assert_eq!(ctx.eval_expr(&size).unwrap(), 2.0);
    }

    #[test]
    fn positions_assert() {
        ok("A: (1,2)\nassert(A == (1,2))");
        let err = fails("assert((1,2) == (2,1))");
        assert_eq!(err.kind.to_string(), "(1,2) != (2,1)");
    }

    #[test]
    fn syntax_error_points_at_token() {
        let err = fails("box wid");
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.span.start, 7);
        let err = fails("box; circle ]");
        assert_eq!(err.span, Span::new(12, 1));
        let err = fails("[box");
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn ordinals_are_capped() {
        let err = fails("box; line from 1001st box.n");
        assert_eq!(err.kind, ErrorKind::OrdinalTooBig);
        assert_eq!(err.span, Span::new(15, 6));
    }

    #[test]
    fn macros_expand_into_statements() {
        let ctx = ok("define two { box; box }\ntwo\ntwo");
        assert_eq!(ctx.objects().len(), 4);
        let err = fails("define bad { box wid 1 wid 2 }\nbad");
        assert_eq!(err.kind, ErrorKind::AlreadySet);
        assert_eq!(err.called_from.len(), 1);
    }

    #[test]
    fn text_positions_set_flags() {
        let ctx = ok(r#"box "a" ljust above bold big big"#);
        let flags = ctx.objects()[0].texts[0].flags;
        assert!(flags.has(TextFlags::LJUST | TextFlags::ABOVE | TextFlags::BOLD));
        assert!(flags.has(TextFlags::XTRA));
    }

    #[test]
    fn print_and_date() {
        let ctx = ok("print \"d:\", pikchr_date");
        let out = ctx.finish(Default::default());
        assert!(out.markup.starts_with(&format!("d: {PIKCHR_DATE}<br>\n")));
    }

    #[test]
    fn direction_statement_turns_the_chain() {
        let ctx = ok("down; box; box; assert(2nd box.n == 1st box.s)\nright; box");
        let objects = ctx.objects();
        assert_eq!(objects[1].at.x, objects[0].at.x);
        assert!(objects[1].at.y < objects[0].at.y);
        assert_eq!(objects[2].at.y, objects[1].at.y);
        assert!(objects[2].at.x > objects[1].at.x);
    }

    #[test]
    fn then_heading_and_even_with() {
        let ctx = ok("line right 1 then 1 heading 180 then up until even with (0,3)");
        let path = &ctx.objects()[0].path;
        assert_eq!(path.len(), 4);
        assert!((path[2].y + 1.0).abs() < 1e-9);
        assert_eq!(path[3], Point::new(path[2].x, 3.0));
    }
}
