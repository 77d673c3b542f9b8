//! Closed AST for the mapping expression language.
//!
//! Rule expressions arrive as text (`IF(AESER == 'Y', 'SERIOUS', '')`) and
//! parse into this tagged union exactly once per rule set. Keeping the
//! function set a closed enum gives the evaluator an exhaustive match
//! instead of runtime string dispatch.

/// A mapping function recognized by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    /// Constant value, ignores the row context.
    Assign,
    /// String concatenation; missing operands are empty.
    Concat,
    /// 1-based substring; out-of-range clamps to empty.
    Substr,
    Upcase,
    Trim,
    /// Remove every occurrence of the given characters.
    Compress,
    /// Conditional; evaluates exactly one branch.
    If,
    /// Parse by one named source format, re-emit canonical ISO 8601.
    Iso8601DateFormat,
    /// First matching format wins; empty when none match.
    Iso8601DateTimeFormats,
    /// Codelist decode; unmapped values pass through upper-cased.
    Format,
    /// Dense per-group sequence numbering (composite pass).
    Sequence,
    /// Offset from a reference date with no day zero (composite pass).
    StudyDay,
    /// Single-winner baseline selection per partition (composite pass).
    BaselineFlag,
}

impl Func {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "ASSIGN" => Some(Self::Assign),
            "CONCAT" => Some(Self::Concat),
            "SUBSTR" => Some(Self::Substr),
            "UPCASE" => Some(Self::Upcase),
            "TRIM" => Some(Self::Trim),
            "COMPRESS" => Some(Self::Compress),
            "IF" => Some(Self::If),
            "ISO8601DATEFORMAT" => Some(Self::Iso8601DateFormat),
            "ISO8601DATETIMEFORMATS" => Some(Self::Iso8601DateTimeFormats),
            "FORMAT" => Some(Self::Format),
            "SEQUENCE" => Some(Self::Sequence),
            "STUDY_DAY" => Some(Self::StudyDay),
            "BASELINE_FLAG" => Some(Self::BaselineFlag),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Assign => "ASSIGN",
            Self::Concat => "CONCAT",
            Self::Substr => "SUBSTR",
            Self::Upcase => "UPCASE",
            Self::Trim => "TRIM",
            Self::Compress => "COMPRESS",
            Self::If => "IF",
            Self::Iso8601DateFormat => "ISO8601DATEFORMAT",
            Self::Iso8601DateTimeFormats => "ISO8601DATETIMEFORMATS",
            Self::Format => "FORMAT",
            Self::Sequence => "SEQUENCE",
            Self::StudyDay => "STUDY_DAY",
            Self::BaselineFlag => "BASELINE_FLAG",
        }
    }

    /// Permitted argument count, inclusive. `None` means unbounded above.
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Self::Assign | Self::Upcase | Self::Trim => (1, Some(1)),
            Self::Concat => (1, None),
            Self::Substr | Self::If => (3, Some(3)),
            Self::Compress | Self::Iso8601DateFormat | Self::Format | Self::StudyDay => {
                (2, Some(2))
            }
            Self::Iso8601DateTimeFormats | Self::Sequence => (2, None),
            Self::BaselineFlag => (4, Some(4)),
        }
    }

    /// Human-readable arity for error messages.
    pub fn arity_text(&self) -> &'static str {
        match self {
            Self::Assign | Self::Upcase | Self::Trim => "1",
            Self::Concat => "1 or more",
            Self::Substr | Self::If => "3",
            Self::Compress | Self::Iso8601DateFormat | Self::Format | Self::StudyDay => "2",
            Self::Iso8601DateTimeFormats | Self::Sequence => "2 or more",
            Self::BaselineFlag => "4",
        }
    }

    /// True for set-aware derivations the per-cell evaluator must defer to
    /// the transformer's composite pass.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Sequence | Self::StudyDay | Self::BaselineFlag)
    }
}

/// Comparison and logical operators permitted in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Quoted string or bare number.
    Literal(String),
    /// Column reference, optionally dataset-qualified.
    Field {
        table: Option<String>,
        column: String,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
    /// Condition node; only produced inside `IF` conditions, `where`
    /// clauses, and business rules.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// The composite derivation this expression defers to, if any.
    pub fn composite(&self) -> Option<Func> {
        match self {
            Expr::Call { func, .. } if func.is_composite() => Some(*func),
            _ => None,
        }
    }

    /// Collect every source column reference in the tree.
    ///
    /// Arguments of composite derivations are excluded: they name output
    /// variables, not source columns.
    pub fn collect_fields<'a>(&'a self, out: &mut Vec<(Option<&'a str>, &'a str)>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field { table, column } => out.push((table.as_deref(), column)),
            Expr::Call { func, args } => {
                if !func.is_composite() {
                    for arg in args {
                        arg.collect_fields(out);
                    }
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
        }
    }
}
