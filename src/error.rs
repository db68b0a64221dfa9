//error.rs - diagnostics and error types

use std::fmt;

use thiserror::Error;

use crate::lexer::SrcLocation;
use crate::types::ValueType;

//one recorded problem in a config file, lexing/parsing/evaluation all produce these
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub loc: SrcLocation,
    pub fix: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, loc: SrcLocation) -> Self {
        Self { message: message.into(), loc, fix: None }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    //error header, the offending source line and a caret under the column
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut out = format!(
            "\x1b[31;1;4merror\x1b[0m (at {}:{}:{}): {}\n",
            filename, self.loc.line, self.loc.col, self.message
        );
        if let Some(line) = source.lines().nth(self.loc.line.saturating_sub(1)) {
            out.push_str(&format!("> {}\n", line));
            out.push_str(&format!("  {:>width$}^\n", "", width = self.loc.col.saturating_sub(1)));
        }
        if let Some(fix) = &self.fix {
            out.push_str(&format!("potential fix: {}\n", fix));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.message)
    }
}

//failures while building object classes and instances
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObjectError {
    #[error("unknown object type: {0}")]
    UnknownClass(String),

    #[error("missing initializer `{0}` for object")]
    MissingKey(&'static str),

    #[error("initializer `{key}` must be a {expected}, found {found}")]
    WrongKeyType {
        key: &'static str,
        expected: ValueType,
        found: ValueType,
    },

    #[error("storage slot {index} holds a different kind of value")]
    SlotKindMismatch { index: usize },
}

//node-local evaluation failures, recorded and evaluation moves on
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expected lvalue on the left of '='")]
    ExpectedLvalue,

    #[error("type mismatch on assignment: cannot assign {found} to `{name}` of type {expected}")]
    AssignTypeMismatch {
        name: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("type mismatch: cannot apply '{op}' to {lhs} and {rhs}")]
    ArithmeticTypeMismatch {
        op: char,
        lhs: ValueType,
        rhs: ValueType,
    },

    #[error("cannot find field {0} in object")]
    UnknownField(String),

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("cannot find meaningful overload for \"{name}\" with arguments ({})", join_types(.args))]
    NoOverload { name: String, args: Vec<ValueType> },

    #[error("unknown movement controller {0}")]
    UnknownController(String),

    #[error("unknown tracking type {0}")]
    UnknownTrackedQuantity(String),

    #[error("`{0}` can only be declared inside an objtype block")]
    OutsideObjType(String),

    #[error("invalid argument to `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: &'static str },

    #[error("force kind `{0}` is disabled")]
    DisabledForce(&'static str),

    #[error("tracker handle is stale, a newer tracker replaced it")]
    StaleTracker,

    #[error(transparent)]
    Object(#[from] ObjectError),
}

fn join_types(types: &[ValueType]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

//failures surfaced to the driver
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} error(s) while parsing configuration")]
    Parse(usize),

    #[error("{0} error(s) while evaluating configuration")]
    Eval(usize),

    #[error("window error: {0}")]
    Window(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_points_at_column() {
        let d = Diagnostic::new("expected ';'", SrcLocation::new(2, 5)).with_fix("add ';'");
        let out = d.render("a.phy", "x = 1;\nx = 2\n");
        assert!(out.contains("a.phy:2:5"));
        assert!(out.contains("> x = 2\n"));
        assert!(out.contains("      ^\n"));
        assert!(out.contains("potential fix: add ';'"));
    }

    #[test]
    fn overload_message_lists_argument_types() {
        let e = EvalError::NoOverload {
            name: "pos".into(),
            args: vec![ValueType::Number, ValueType::Vector],
        };
        assert_eq!(
            e.to_string(),
            "cannot find meaningful overload for \"pos\" with arguments (number, vector)"
        );
    }
}
