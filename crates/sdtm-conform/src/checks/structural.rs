//! Structural checks: presence, population, length, type, and the
//! (subject, sequence) uniqueness and density invariants.

use std::collections::{BTreeMap, HashSet};

use sdtm_expr::CompiledRuleSet;
use sdtm_rules::{CoreRequirement, DataType, Issue, Layer, TransformOutput};

use crate::catalog;

pub fn check(rules: &CompiledRuleSet, output: &TransformOutput) -> Vec<Issue> {
    let mut issues = Vec::new();
    if output.records.is_empty() {
        return issues;
    }

    for compiled in &rules.rules {
        let rule = &compiled.rule;
        let present = output.records.iter().any(|record| record.has(&rule.variable));

        if !present {
            match rule.core {
                CoreRequirement::Required => {
                    issues.push(issue_for(
                        catalog::REQUIRED_MISSING,
                        rules,
                        &rule.variable,
                        format!("Required variable {} is not present", rule.variable),
                        1,
                    ));
                }
                CoreRequirement::Expected => {
                    issues.push(issue_for(
                        catalog::EXPECTED_MISSING,
                        rules,
                        &rule.variable,
                        format!("Expected variable {} is not present", rule.variable),
                        1,
                    ));
                }
                CoreRequirement::Permissible => {}
            }
            continue;
        }

        if rule.core == CoreRequirement::Required {
            let missing = output
                .records
                .iter()
                .filter(|record| record.populated(&rule.variable).is_none())
                .count() as u64;
            if missing > 0 {
                issues.push(
                    issue_for(
                        catalog::REQUIRED_NOT_POPULATED,
                        rules,
                        &rule.variable,
                        format!("Required variable {} has missing values", rule.variable),
                        missing,
                    )
                    .per_record(),
                );
            }
        }

        if let Some(length) = rule.length {
            let over = output
                .records
                .iter()
                .filter(|record| {
                    record
                        .get(&rule.variable)
                        .is_some_and(|value| value.chars().count() as u32 > length)
                })
                .count() as u64;
            if over > 0 {
                issues.push(
                    issue_for(
                        catalog::LENGTH_EXCEEDED,
                        rules,
                        &rule.variable,
                        format!(
                            "Variable {} exceeds its declared length of {length}",
                            rule.variable
                        ),
                        over,
                    )
                    .per_record(),
                );
            }
        }

        if rule.data_type == DataType::Num {
            let bad = output
                .records
                .iter()
                .filter(|record| {
                    record
                        .populated(&rule.variable)
                        .is_some_and(|value| value.parse::<f64>().is_err())
                })
                .count() as u64;
            if bad > 0 {
                issues.push(
                    issue_for(
                        catalog::TYPE_MISMATCH,
                        rules,
                        &rule.variable,
                        format!("Numeric variable {} holds non-numeric values", rule.variable),
                        bad,
                    )
                    .per_record(),
                );
            }
        }
    }

    issues.extend(check_sequence(rules, output));
    issues
}

/// (subject, sequence) pairs must be unique, and sequence values dense
/// 1..N within each subject.
fn check_sequence(rules: &CompiledRuleSet, output: &TransformOutput) -> Vec<Issue> {
    let subject_var = &rules.subject_variable;
    let seq_var = &rules.sequence_variable;
    let mut issues = Vec::new();

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut duplicates = 0u64;
    let mut by_subject: BTreeMap<String, Vec<u64>> = BTreeMap::new();

    for record in &output.records {
        let Some(seq) = record.populated(seq_var) else {
            continue;
        };
        let subject = record.get(subject_var).unwrap_or_default().to_string();
        if !seen.insert((subject.clone(), seq.to_string())) {
            duplicates += 1;
        }
        if let Ok(number) = seq.parse::<u64>() {
            by_subject.entry(subject).or_default().push(number);
        }
    }

    if duplicates > 0 {
        issues.push(
            issue_for(
                catalog::SEQUENCE_DUPLICATE,
                rules,
                seq_var,
                format!("Duplicate ({subject_var}, {seq_var}) pairs"),
                duplicates,
            )
            .per_record(),
        );
    }

    let mut sparse_records = 0u64;
    for numbers in by_subject.values_mut() {
        numbers.sort_unstable();
        let dense = numbers
            .iter()
            .enumerate()
            .all(|(index, &value)| value == index as u64 + 1);
        if !dense {
            sparse_records += numbers.len() as u64;
        }
    }
    if sparse_records > 0 {
        issues.push(
            issue_for(
                catalog::SEQUENCE_NOT_DENSE,
                rules,
                seq_var,
                format!("{seq_var} values are not dense 1..N within subject"),
                sparse_records,
            )
            .per_record(),
        );
    }

    issues
}

fn issue_for(
    rule_id: &str,
    rules: &CompiledRuleSet,
    variable: &str,
    message: String,
    count: u64,
) -> Issue {
    Issue::new(
        rule_id,
        catalog::severity(rule_id),
        Layer::Structural,
        rules.domain.clone(),
        message,
    )
    .with_variable(variable)
    .with_records(count)
}
