pub mod ast;
pub mod compile;
pub mod dates;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{BinOp, Expr, Func};
pub use compile::{CompiledRule, CompiledRuleSet, compile};
pub use dates::{DateFormat, ParsedDate, complete_date, is_canonical, parse_canonical, reformat};
pub use error::{CompileError, ExprError};
pub use eval::{EvalNote, Evaluator, Scope};
pub use parser::parse;
