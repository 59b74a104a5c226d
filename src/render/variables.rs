//! Script variables.
//!
//! Built-in defaults live in a sorted static table. A script assignment
//! creates a user variable that shadows the built-in of the same name; the
//! first assignment starts from the built-in value (or 0) so that `+=`
//! works on defaults.

use std::collections::HashMap;

use crate::errors::{CompileError, ErrorKind};
use crate::lexer::AssignOp;
use crate::types::Span;

#[rustfmt::skip]
static BUILTINS: &[(&str, f64)] = &[
    ("arcrad",      0.25),
    ("arrowhead",   2.0),
    ("arrowht",     0.08),
    ("arrowwid",    0.06),
    ("boxht",       0.5),
    ("boxrad",      0.0),
    ("boxwid",      0.75),
    ("charht",      0.14),
    ("charwid",     0.08),
    ("circlerad",   0.25),
    ("color",       0.0),
    ("cylht",       0.5),
    ("cylrad",      0.075),
    ("cylwid",      0.75),
    ("dashwid",     0.05),
    ("diamondht",   0.75),
    ("diamondwid",  1.0),
    ("dotrad",      0.015),
    ("ellipseht",   0.5),
    ("ellipsewid",  0.75),
    ("fileht",      0.75),
    ("filerad",     0.15),
    ("filewid",     0.5),
    ("fill",        -1.0),
    ("lineht",      0.5),
    ("linerad",     0.0),
    ("linewid",     0.5),
    ("movewid",     0.5),
    ("ovalht",      0.5),
    ("ovalwid",     1.0),
    ("scale",       1.0),
    ("textht",      0.5),
    ("textwid",     0.75),
    ("thickness",   0.015),
];

/// The default value of a built-in variable.
pub fn builtin(name: &str) -> Option<f64> {
    BUILTINS
        .binary_search_by(|(n, _)| (*n).cmp(name))
        .ok()
        .map(|i| BUILTINS[i].1)
}

/// User variables layered over the built-ins.
#[derive(Debug, Default, Clone)]
pub struct Variables {
    user: HashMap<String, f64>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// A user variable, else a built-in.
    pub fn lookup(&self, name: &str) -> Option<f64> {
        self.user.get(name).copied().or_else(|| builtin(name))
    }

    /// Like [`lookup`](Self::lookup) but missing names read as 0.
    pub fn value(&self, name: &str) -> f64 {
        self.lookup(name).unwrap_or(0.0)
    }

    /// Apply `name op= value`. `op_span` locates division-by-zero errors.
    pub fn assign(
        &mut self,
        name: &str,
        op: AssignOp,
        value: f64,
        op_span: Span,
    ) -> Result<(), CompileError> {
        let initial = self.value(name);
        let slot = self.user.entry(name.to_string()).or_insert(initial);
        match op {
            AssignOp::Set => *slot = value,
            AssignOp::Add => *slot += value,
            AssignOp::Sub => *slot -= value,
            AssignOp::Mul => *slot *= value,
            AssignOp::Div => {
                if value == 0.0 {
                    return Err(CompileError::new(ErrorKind::DivisionByZero, op_span));
                }
                *slot /= value;
            }
        }
        crate::log::debug!(var = name, value = *slot, "set variable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: Span = Span::new(0, 1);

    #[test]
    fn table_is_sorted() {
        assert!(BUILTINS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn user_values_shadow_builtins() {
        let mut vars = Variables::new();
        assert_eq!(vars.lookup("boxwid"), Some(0.75));
        vars.assign("boxwid", AssignOp::Set, 2.0, S).unwrap();
        assert_eq!(vars.lookup("boxwid"), Some(2.0));
        assert_eq!(builtin("boxwid"), Some(0.75));
    }

    #[test]
    fn compound_assignment_starts_from_default() {
        let mut vars = Variables::new();
        vars.assign("linewid", AssignOp::Mul, 2.0, S).unwrap();
        assert_eq!(vars.value("linewid"), 1.0);
        vars.assign("fresh", AssignOp::Add, 3.0, S).unwrap();
        assert_eq!(vars.value("fresh"), 3.0);
        assert_eq!(vars.lookup("missing"), None);
    }

    #[test]
    fn divide_assign_by_zero_fails() {
        let mut vars = Variables::new();
        let err = vars.assign("x", AssignOp::Div, 0.0, S).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }
}
