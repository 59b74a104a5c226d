//! Rendering context - the document state the parser's actions work on

use std::fmt::Write as _;

use crate::ast::{PrintItem, Statement};
use crate::errors::{CompileError, ErrorKind};
use crate::types::{Direction, Point, Span};

use super::object::{ObjId, Object};
use super::path_builder::PathBuilder;
use super::svg::{DocumentOptions, fmt_g, render_document};
use super::text::escape_into;
use super::variables::Variables;

type Result<T> = std::result::Result<T, CompileError>;

/// Rendering context
pub struct RenderContext {
    /// Every object created so far, referenced by [`ObjId`]
    pub(super) objects: Vec<Object>,
    /// Statement lists being built: the document first, open `[...]` groups after
    pub(super) lists: Vec<Vec<ObjId>>,
    pub(super) vars: Variables,
    /// Current direction
    pub(super) direction: Direction,
    /// `this`: the object under construction, or the last one built
    pub(super) current: Option<ObjId>,
    /// Path of the current line object
    pub(super) path: PathBuilder,
    /// `print` output, emitted ahead of the drawing
    printed: String,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            lists: vec![Vec::new()],
            vars: Variables::new(),
            direction: Direction::Right,
            current: None,
            path: PathBuilder::default(),
            printed: String::new(),
        }
    }
}

/// The finished document.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub markup: String,
    pub width: i32,
    pub height: i32,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every object built so far, in creation order.
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub(super) fn object(&self, id: ObjId) -> &Object {
        &self.objects[id.0]
    }

    pub(super) fn object_mut(&mut self, id: ObjId) -> &mut Object {
        &mut self.objects[id.0]
    }

    /// The innermost list under construction.
    pub(super) fn list(&self) -> &[ObjId] {
        self.lists.last().map_or(&[], Vec::as_slice)
    }

    /// Open a `[...]` group.
    pub fn begin_sublist(&mut self) {
        self.lists.push(Vec::new());
    }

    /// Close the innermost group and hand back its members.
    pub fn end_sublist(&mut self) -> Vec<ObjId> {
        if self.lists.len() > 1 {
            self.lists.pop().unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    /// Run one parsed statement.
    pub fn execute(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Assign {
                name,
                op,
                value,
                span,
            } => {
                let value = self.eval_rvalue(value)?;
                self.vars.assign(name, *op, value, *span)
            }
            Statement::Place {
                name,
                position,
                span,
            } => {
                let at = self.eval_position(position)?;
                self.add_place(name, at, *span);
                Ok(())
            }
            Statement::Print(items) => self.print(items),
            Statement::AssertEqual { lhs, rhs, span } => {
                let lhs = fmt_g(self.eval_expr(lhs)?, 6);
                let rhs = fmt_g(self.eval_expr(rhs)?, 6);
                check_equal(lhs, rhs, *span)
            }
            Statement::AssertSamePlace { lhs, rhs, span } => {
                let lhs = self.eval_position(lhs)?;
                let rhs = self.eval_position(rhs)?;
                check_equal(point_text(lhs), point_text(rhs), *span)
            }
        }
    }

    /// A bare direction statement. The previous object's exit turns to face
    /// the new direction.
    pub fn set_direction(&mut self, dir: Direction) {
        self.direction = dir;
        if let Some(&last) = self.list().last() {
            self.object_mut(last).set_exit(dir);
        }
    }

    fn print(&mut self, items: &[PrintItem]) -> Result<()> {
        let mut line = String::new();
        for item in items {
            match item {
                PrintItem::Text(text) => escape_into(&mut line, text, 0),
                PrintItem::Value(value) => {
                    let v = self.eval_rvalue(value)?;
                    line.push_str(&fmt_g(v, 10));
                }
                PrintItem::Separator => line.push(' '),
            }
        }
        self.printed.push_str(&line);
        self.printed.push_str("<br>\n");
        Ok(())
    }

    /// Render everything built so far.
    pub fn finish(mut self, opts: DocumentOptions<'_>) -> Output {
        let mut markup = self.printed;
        let root = self.lists.into_iter().next().unwrap_or_default();
        if root.is_empty() {
            markup.push_str("<!-- empty pikchr diagram -->\n");
            return Output {
                markup,
                width: 0,
                height: 0,
            };
        }
        let (width, height) = render_document(&mut self.objects, &root, &self.vars, opts, &mut markup);
        Output {
            markup,
            width,
            height,
        }
    }
}

fn point_text(p: Point) -> String {
    let mut s = String::new();
    let _ = write!(s, "({},{})", fmt_g(p.x, 6), fmt_g(p.y, 6));
    s
}

fn check_equal(lhs: String, rhs: String, span: Span) -> Result<()> {
    if lhs == rhs {
        Ok(())
    } else {
        Err(CompileError::new(ErrorKind::AssertionFailed(lhs, rhs), span))
    }
}
