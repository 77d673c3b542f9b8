//! Declarative cross-field business rules.
//!
//! Each rule pairs a `when` condition with an `expect` condition in the
//! mapping expression language; every record where `when` holds but
//! `expect` does not counts against the rule. Severity comes from the
//! rule declaration.

use sdtm_expr::{Evaluator, Expr, parse};
use sdtm_rules::{BusinessRule, CountBasis, Issue, Layer, TransformOutput};

use crate::error::ConformError;

/// A business rule with both conditions parsed.
#[derive(Debug, Clone)]
pub struct CompiledBusinessRule {
    pub rule: BusinessRule,
    when: Expr,
    expect: Expr,
}

/// Parse the condition text of every rule. Malformed rules are
/// configuration defects and fail here.
pub fn compile_rules(rules: &[BusinessRule]) -> Result<Vec<CompiledBusinessRule>, ConformError> {
    rules
        .iter()
        .map(|rule| {
            let when = parse(&rule.when).map_err(|source| ConformError::BusinessRule {
                id: rule.id.clone(),
                clause: "when",
                source,
            })?;
            let expect = parse(&rule.expect).map_err(|source| ConformError::BusinessRule {
                id: rule.id.clone(),
                clause: "expect",
                source,
            })?;
            Ok(CompiledBusinessRule {
                rule: rule.clone(),
                when,
                expect,
            })
        })
        .collect()
}

pub fn check(
    compiled: &[CompiledBusinessRule],
    domain: &str,
    output: &TransformOutput,
) -> Vec<Issue> {
    let evaluator = Evaluator::new();
    let mut issues = Vec::new();

    for business in compiled {
        let mut notes = Vec::new();
        let violations = output
            .records
            .iter()
            .filter(|record| {
                evaluator.eval_condition(&business.when, *record, &mut notes)
                    && !evaluator.eval_condition(&business.expect, *record, &mut notes)
            })
            .count() as u64;

        if violations > 0 {
            issues.push(Issue {
                rule_id: business.rule.id.clone(),
                severity: business.rule.severity,
                layer: Layer::BusinessRules,
                domain: domain.to_string(),
                variable: None,
                message: business.rule.message.clone(),
                records_affected: violations,
                basis: CountBasis::PerRecord,
            });
        }
    }

    issues
}
