//! Cross-domain referential checks against the subject/visit registry.

use std::collections::BTreeSet;

use sdtm_expr::CompiledRuleSet;
use sdtm_rules::{Issue, Layer, SubjectRegistry, TransformOutput};

use crate::catalog;

const VISIT_VARIABLE: &str = "VISIT";

pub fn check(
    rules: &CompiledRuleSet,
    output: &TransformOutput,
    registry: &SubjectRegistry,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    if output.records.is_empty() {
        return issues;
    }

    let subject_var = &rules.subject_variable;
    let mut unknown_subjects = 0u64;
    let mut unknown_names: BTreeSet<String> = BTreeSet::new();
    let mut unknown_visits = 0u64;

    for record in &output.records {
        let Some(subject) = record.populated(subject_var) else {
            continue;
        };
        if !registry.contains_subject(subject) {
            unknown_subjects += 1;
            unknown_names.insert(subject.to_string());
            continue;
        }
        if let Some(visit) = record.populated(VISIT_VARIABLE) {
            if !registry.contains_visit(subject, visit) {
                unknown_visits += 1;
            }
        }
    }

    if unknown_subjects > 0 {
        let sample: Vec<&str> = unknown_names.iter().take(5).map(String::as_str).collect();
        issues.push(
            Issue::new(
                catalog::SUBJECT_UNKNOWN,
                catalog::severity(catalog::SUBJECT_UNKNOWN),
                Layer::CrossDomain,
                rules.domain.clone(),
                format!(
                    "Subjects absent from the reference domain: {}",
                    sample.join(", ")
                ),
            )
            .with_variable(subject_var)
            .with_records(unknown_subjects)
            .per_record(),
        );
    }

    if unknown_visits > 0 {
        issues.push(
            Issue::new(
                catalog::VISIT_UNKNOWN,
                catalog::severity(catalog::VISIT_UNKNOWN),
                Layer::CrossDomain,
                rules.domain.clone(),
                "Visit references absent from the reference domain".to_string(),
            )
            .with_variable(VISIT_VARIABLE)
            .with_records(unknown_visits)
            .per_record(),
        );
    }

    issues
}
