//! Parse-once compilation of a rule set.
//!
//! Expression text is parsed exactly once, when the rule set is loaded;
//! malformed rules are configuration defects and fail here, before any
//! source data is touched.

use sdtm_rules::{RuleSet, VariableRule};

use crate::ast::{Expr, Func};
use crate::error::CompileError;
use crate::parser::parse;

/// A variable rule paired with its parsed expression.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: VariableRule,
    pub expr: Expr,
    /// The composite derivation this rule defers to, if any.
    pub composite: Option<Func>,
}

/// A rule set with every expression parsed and shape-checked.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    pub domain: String,
    pub subject_variable: String,
    pub sequence_variable: String,
    pub grain: sdtm_rules::Grain,
    pub allow_derived_refs: bool,
    pub where_clause: Option<Expr>,
    pub rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    pub fn rule(&self, variable: &str) -> Option<&CompiledRule> {
        self.rules
            .iter()
            .find(|compiled| compiled.rule.variable.eq_ignore_ascii_case(variable))
    }

    /// Rules evaluated per grain unit, in declaration order.
    pub fn cell_rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(|compiled| compiled.composite.is_none())
    }

    /// Rules deferred to the composite pass, in declaration order.
    pub fn composite_rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(|compiled| compiled.composite.is_some())
    }

    /// Every source column reference across all rules and the row
    /// predicate, as (table, column) pairs.
    pub fn referenced_fields(&self) -> Vec<(Option<&str>, &str)> {
        let mut fields = Vec::new();
        for compiled in &self.rules {
            compiled.expr.collect_fields(&mut fields);
        }
        if let Some(clause) = &self.where_clause {
            clause.collect_fields(&mut fields);
        }
        fields
    }
}

/// Compile a loaded rule set, parsing every expression.
pub fn compile(rule_set: RuleSet) -> Result<CompiledRuleSet, CompileError> {
    let mut rules = Vec::with_capacity(rule_set.rules.len());
    for rule in &rule_set.rules {
        let expr = parse(&rule.expression).map_err(|source| CompileError {
            variable: rule.variable.clone(),
            source,
        })?;
        let composite = expr.composite();
        rules.push(CompiledRule {
            rule: rule.clone(),
            expr,
            composite,
        });
    }

    let where_clause = match &rule_set.where_clause {
        Some(text) => Some(parse(text).map_err(|source| CompileError {
            variable: "<where>".to_string(),
            source,
        })?),
        None => None,
    };

    Ok(CompiledRuleSet {
        domain: rule_set.domain,
        subject_variable: rule_set.subject_variable,
        sequence_variable: rule_set.sequence_variable,
        grain: rule_set.grain,
        allow_derived_refs: rule_set.allow_derived_refs,
        where_clause,
        rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdtm_rules::{CoreRequirement, DataType};

    fn rule(variable: &str, order: u32, expression: &str) -> VariableRule {
        VariableRule::new(
            variable,
            order,
            DataType::Char,
            CoreRequirement::Required,
            expression,
        )
    }

    #[test]
    fn compile_splits_cell_and_composite_rules() {
        let set = RuleSet::new(
            "AE",
            vec![
                rule("USUBJID", 1, "CONCAT(STUDYID, '-', SUBJID)"),
                rule("AESEQ", 2, "SEQUENCE(USUBJID, AESTDTC)"),
                rule("AETERM", 3, "UPCASE(AETERM)"),
            ],
        )
        .unwrap();
        let compiled = compile(set).unwrap();
        assert_eq!(compiled.cell_rules().count(), 2);
        assert_eq!(compiled.composite_rules().count(), 1);
        assert_eq!(
            compiled.rule("AESEQ").unwrap().composite,
            Some(Func::Sequence)
        );
    }

    #[test]
    fn compile_reports_the_offending_rule() {
        let set = RuleSet::new("AE", vec![rule("AETERM", 1, "NOSUCH(AETERM)")]).unwrap();
        let err = compile(set).unwrap_err();
        assert_eq!(err.variable, "AETERM");
    }

    #[test]
    fn referenced_fields_include_where_clause() {
        let set = RuleSet::new("AE", vec![rule("AETERM", 1, "TRIM(AETERM)")])
            .unwrap()
            .with_where_clause("AEYN == 'Y'");
        let compiled = compile(set).unwrap();
        let fields = compiled.referenced_fields();
        assert!(fields.contains(&(None, "AETERM")));
        assert!(fields.contains(&(None, "AEYN")));
    }
}
