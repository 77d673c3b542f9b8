//! Total evaluation of mapping expressions.
//!
//! No function here ever fails on missing or malformed input: every
//! operation has a defined empty result, and coercion problems are
//! reported as notes the caller attaches to the output record. Only
//! configuration defects (caught earlier, at compile time) are errors.

use sdtm_rules::{CodelistRegistry, NoteKind, Record};

use crate::ast::{BinOp, Expr, Func};
use crate::dates::{self, DateFormat};

/// Read access to the values an expression may reference.
///
/// Implemented by the transformer's row context (raw source columns,
/// join-key lookups) and by output records (business-rule conditions).
pub trait Scope {
    fn field(&self, table: Option<&str>, column: &str) -> Option<String>;
}

/// Output records act as a scope for condition evaluation; dataset
/// qualifiers have no meaning there and resolve to nothing.
impl Scope for Record {
    fn field(&self, table: Option<&str>, column: &str) -> Option<String> {
        if table.is_some() {
            return None;
        }
        self.get(column).map(str::to_string)
    }
}

/// A defect recovered during evaluation, destined for a [`sdtm_rules::FieldNote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalNote {
    pub kind: NoteKind,
    pub detail: String,
}

impl EvalNote {
    fn coercion(detail: impl Into<String>) -> Self {
        Self {
            kind: NoteKind::CoercionFailure,
            detail: detail.into(),
        }
    }
}

/// Expression evaluator, optionally wired to a codelist registry for
/// `FORMAT` decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator<'a> {
    codelists: Option<&'a CodelistRegistry>,
}

impl<'a> Evaluator<'a> {
    pub fn new() -> Self {
        Self { codelists: None }
    }

    pub fn with_codelists(codelists: &'a CodelistRegistry) -> Self {
        Self {
            codelists: Some(codelists),
        }
    }

    /// Evaluate an expression to its string value.
    pub fn eval(&self, expr: &Expr, scope: &dyn Scope, notes: &mut Vec<EvalNote>) -> String {
        match expr {
            Expr::Literal(text) => text.clone(),
            Expr::Field { table, column } => scope
                .field(table.as_deref(), column)
                .unwrap_or_default(),
            Expr::Binary { .. } => {
                if self.eval_condition(expr, scope, notes) {
                    "Y".to_string()
                } else {
                    String::new()
                }
            }
            Expr::Call { func, args } => self.call(*func, args, scope, notes),
        }
    }

    /// Evaluate an expression as a condition.
    ///
    /// Comparisons and logical operators produce their truth value; any
    /// other expression is truthy when it evaluates non-empty.
    pub fn eval_condition(&self, expr: &Expr, scope: &dyn Scope, notes: &mut Vec<EvalNote>) -> bool {
        match expr {
            Expr::Binary { op, lhs, rhs } => match op {
                BinOp::And => {
                    self.eval_condition(lhs, scope, notes)
                        && self.eval_condition(rhs, scope, notes)
                }
                BinOp::Or => {
                    self.eval_condition(lhs, scope, notes)
                        || self.eval_condition(rhs, scope, notes)
                }
                _ => {
                    let left = self.eval(lhs, scope, notes);
                    let right = self.eval(rhs, scope, notes);
                    compare(&left, &right, *op)
                }
            },
            other => !self.eval(other, scope, notes).trim().is_empty(),
        }
    }

    fn call(&self, func: Func, args: &[Expr], scope: &dyn Scope, notes: &mut Vec<EvalNote>) -> String {
        match func {
            Func::Assign => self.eval(&args[0], scope, notes),
            Func::Concat => args
                .iter()
                .map(|arg| self.eval(arg, scope, notes))
                .collect(),
            Func::Substr => self.substr(args, scope, notes),
            Func::Upcase => self.eval(&args[0], scope, notes).to_uppercase(),
            Func::Trim => self.eval(&args[0], scope, notes).trim().to_string(),
            Func::Compress => {
                let value = self.eval(&args[0], scope, notes);
                let drop: Vec<char> = self.eval(&args[1], scope, notes).chars().collect();
                value.chars().filter(|c| !drop.contains(c)).collect()
            }
            Func::If => {
                if self.eval_condition(&args[0], scope, notes) {
                    self.eval(&args[1], scope, notes)
                } else {
                    self.eval(&args[2], scope, notes)
                }
            }
            Func::Iso8601DateFormat => {
                let value = self.eval(&args[0], scope, notes);
                self.reformat_date(&value, &args[1..], notes)
            }
            Func::Iso8601DateTimeFormats => {
                let value = self.eval(&args[0], scope, notes);
                self.reformat_date(&value, &args[1..], notes)
            }
            Func::Format => self.format_lookup(args, scope, notes),
            // Set-aware derivations cannot be computed per cell; the
            // transformer routes them through the composite pass.
            Func::Sequence | Func::StudyDay | Func::BaselineFlag => {
                notes.push(EvalNote {
                    kind: NoteKind::DerivationDefect,
                    detail: format!("{} is computed in the composite pass", func.name()),
                });
                String::new()
            }
        }
    }

    /// 1-based substring with clamping; anything out of range is empty.
    fn substr(&self, args: &[Expr], scope: &dyn Scope, notes: &mut Vec<EvalNote>) -> String {
        let value = self.eval(&args[0], scope, notes);
        let start_text = self.eval(&args[1], scope, notes);
        let len_text = self.eval(&args[2], scope, notes);

        let (Ok(start), Ok(len)) = (start_text.trim().parse::<i64>(), len_text.trim().parse::<i64>())
        else {
            notes.push(EvalNote::coercion(format!(
                "SUBSTR bounds '{start_text}', '{len_text}' are not integers"
            )));
            return String::new();
        };

        if start < 1 || len < 1 {
            return String::new();
        }
        value
            .chars()
            .skip(start as usize - 1)
            .take(len as usize)
            .collect()
    }

    fn reformat_date(&self, value: &str, formats: &[Expr], notes: &mut Vec<EvalNote>) -> String {
        if value.trim().is_empty() {
            return String::new();
        }
        for format_arg in formats {
            let Expr::Literal(name) = format_arg else {
                continue; // unreachable: shape checked at parse time
            };
            let Some(format) = DateFormat::parse_name(name) else {
                continue;
            };
            if let Some(iso) = dates::reformat(value, format) {
                return iso;
            }
        }
        notes.push(EvalNote::coercion(format!(
            "date value '{value}' matched none of the declared formats"
        )));
        String::new()
    }

    fn format_lookup(&self, args: &[Expr], scope: &dyn Scope, notes: &mut Vec<EvalNote>) -> String {
        let value = self.eval(&args[0], scope, notes);
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let Expr::Literal(name) = &args[1] else {
            return String::new(); // unreachable: shape checked at parse time
        };

        if let Some(codelist) = self.codelists.and_then(|registry| registry.resolve(name)) {
            if let Some(term) = codelist.decode(trimmed) {
                return term.to_string();
            }
            notes.push(EvalNote {
                kind: NoteKind::CodelistMiss,
                detail: format!("value '{trimmed}' is not in codelist '{name}'"),
            });
        } else {
            notes.push(EvalNote {
                kind: NoteKind::CodelistMiss,
                detail: format!("codelist '{name}' is not available"),
            });
        }
        // Unmapped values pass through upper-cased; the terminology layer
        // decides whether that is acceptable.
        trimmed.to_uppercase()
    }
}

/// Compare two values: numerically when both parse as numbers, otherwise
/// as case-sensitive strings.
fn compare(left: &str, right: &str, op: BinOp) -> bool {
    let ordering = match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r),
        _ => Some(left.cmp(right)),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        BinOp::Eq => ordering.is_eq(),
        BinOp::Ne => !ordering.is_eq(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Lt => ordering.is_lt(),
        BinOp::Ge => ordering.is_ge(),
        BinOp::Le => ordering.is_le(),
        BinOp::And | BinOp::Or => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use sdtm_rules::Codelist;
    use std::collections::HashMap;

    struct MapScope(HashMap<String, String>);

    impl MapScope {
        fn of(pairs: &[(&str, &str)]) -> Self {
            Self(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_uppercase(), v.to_string()))
                    .collect(),
            )
        }
    }

    impl Scope for MapScope {
        fn field(&self, _table: Option<&str>, column: &str) -> Option<String> {
            self.0.get(&column.to_uppercase()).cloned()
        }
    }

    fn eval(text: &str, scope: &MapScope) -> (String, Vec<EvalNote>) {
        let expr = parse(text).unwrap();
        let mut notes = Vec::new();
        let value = Evaluator::new().eval(&expr, scope, &mut notes);
        (value, notes)
    }

    #[test]
    fn assign_ignores_context() {
        let scope = MapScope::of(&[("AETERM", "RASH")]);
        assert_eq!(eval("ASSIGN('AE')", &scope).0, "AE");
    }

    #[test]
    fn concat_treats_missing_as_empty() {
        let scope = MapScope::of(&[("SITEID", "001")]);
        assert_eq!(eval("CONCAT(SITEID, '-', SUBJID)", &scope).0, "001-");
    }

    #[test]
    fn substr_clamps_out_of_range() {
        let scope = MapScope::of(&[("V", "ABCDEF")]);
        assert_eq!(eval("SUBSTR(V, 2, 3)", &scope).0, "BCD");
        assert_eq!(eval("SUBSTR(V, 5, 10)", &scope).0, "EF");
        assert_eq!(eval("SUBSTR(V, 9, 2)", &scope).0, "");
        assert_eq!(eval("SUBSTR(V, 0, 2)", &scope).0, "");
    }

    #[test]
    fn compress_removes_every_occurrence() {
        let scope = MapScope::of(&[("PHONE", "(555) 123-4567")]);
        assert_eq!(eval("COMPRESS(PHONE, '()- ')", &scope).0, "5551234567");
    }

    #[test]
    fn if_evaluates_exactly_one_branch() {
        // The false branch holds a FORMAT miss that would add a note if
        // it were evaluated.
        let scope = MapScope::of(&[("AESER", "Y")]);
        let (value, notes) = eval("IF(AESER == 'Y', 'SERIOUS', FORMAT(AESER, 'NY'))", &scope);
        assert_eq!(value, "SERIOUS");
        assert!(notes.is_empty());
    }

    #[test]
    fn condition_compares_numerically_when_both_numeric() {
        let scope = MapScope::of(&[("N", "9")]);
        assert_eq!(eval("IF(N < 10, 'LOW', 'HIGH')", &scope).0, "LOW");
        // String comparison would put "9" after "10".
        let scope = MapScope::of(&[("N", "ABC")]);
        assert_eq!(eval("IF(N < 'B', 'LOW', 'HIGH')", &scope).0, "LOW");
    }

    #[test]
    fn date_format_degrades_short_input() {
        let scope = MapScope::of(&[("AESTDT", "20080910"), ("AEENDT", "200809")]);
        assert_eq!(
            eval("ISO8601DATEFORMAT(AESTDT, 'YYYYMMDD')", &scope).0,
            "2008-09-10"
        );
        assert_eq!(
            eval("ISO8601DATEFORMAT(AEENDT, 'YYYYMMDD')", &scope).0,
            "2008-09"
        );
    }

    #[test]
    fn unparseable_date_is_empty_with_note() {
        let scope = MapScope::of(&[("DT", "NOT A DATE")]);
        let (value, notes) = eval("ISO8601DATEFORMAT(DT, 'YYYYMMDD')", &scope);
        assert_eq!(value, "");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NoteKind::CoercionFailure);
    }

    #[test]
    fn datetime_formats_first_match_wins() {
        let scope = MapScope::of(&[("DT", "10-SEP-2008 14:05")]);
        let (value, notes) = eval(
            "ISO8601DATETIMEFORMATS(DT, 'YYYY-MM-DD HH:MM', 'DD-MON-YYYY HH:MM')",
            &scope,
        );
        assert_eq!(value, "2008-09-10T14:05:00");
        assert!(notes.is_empty());
    }

    #[test]
    fn format_decodes_and_flags_misses() {
        let mut registry = CodelistRegistry::new();
        registry.insert(
            Codelist::new("AESEV", ["MILD", "MODERATE", "SEVERE"]).with_synonym("Slight", "MILD"),
        );
        let evaluator = Evaluator::with_codelists(&registry);
        let scope = MapScope::of(&[("SEV", "slight"), ("BAD", "awful")]);

        let expr = parse("FORMAT(SEV, 'AESEV')").unwrap();
        let mut notes = Vec::new();
        assert_eq!(evaluator.eval(&expr, &scope, &mut notes), "MILD");
        assert!(notes.is_empty());

        let expr = parse("FORMAT(BAD, 'AESEV')").unwrap();
        assert_eq!(evaluator.eval(&expr, &scope, &mut notes), "AWFUL");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NoteKind::CodelistMiss);
    }

    #[test]
    fn composite_functions_defer() {
        let scope = MapScope::of(&[]);
        let (value, notes) = eval("SEQUENCE(USUBJID, AESTDTC)", &scope);
        assert_eq!(value, "");
        assert_eq!(notes[0].kind, NoteKind::DerivationDefect);
    }
}
