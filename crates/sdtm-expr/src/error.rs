use thiserror::Error;

/// Expression-language defects. All of these are configuration-class:
/// they surface when a rule set is compiled, never during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("unterminated string literal starting at position {pos}")]
    UnterminatedString { pos: usize },
    #[error("unexpected {found} at position {pos}, expected {expected}")]
    UnexpectedToken {
        pos: usize,
        found: String,
        expected: &'static str,
    },
    #[error("unknown function '{name}' at position {pos}")]
    UnknownFunction { pos: usize, name: String },
    #[error("{func} takes {expected} argument(s), found {found}")]
    BadArity {
        func: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("unknown date format '{name}'")]
    UnknownDateFormat { name: String },
    #[error("{func} argument {position} must be {expected}")]
    BadArgument {
        func: &'static str,
        position: usize,
        expected: &'static str,
    },
    #[error("trailing input at position {pos}")]
    TrailingInput { pos: usize },
}

/// A parse failure tied to the rule that carried the expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule '{variable}': {source}")]
pub struct CompileError {
    pub variable: String,
    #[source]
    pub source: ExprError,
}

pub type Result<T> = std::result::Result<T, ExprError>;
