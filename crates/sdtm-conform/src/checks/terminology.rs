//! Controlled-terminology conformance.
//!
//! Membership is exact and case-sensitive. Near misses (case-only
//! mismatches) are flagged under their own rule rather than silently
//! accepted; genuinely novel values split by whether the codelist is
//! extensible.

use std::collections::BTreeSet;

use sdtm_expr::CompiledRuleSet;
use sdtm_rules::{CodelistRegistry, Issue, Layer, TransformOutput};

use crate::catalog;

pub fn check(
    rules: &CompiledRuleSet,
    output: &TransformOutput,
    codelists: Option<&CodelistRegistry>,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    if output.records.is_empty() {
        return issues;
    }

    for compiled in &rules.rules {
        let rule = &compiled.rule;
        let Some(codelist_name) = &rule.codelist else {
            continue;
        };

        let Some(codelist) = codelists.and_then(|registry| registry.resolve(codelist_name)) else {
            issues.push(
                Issue::new(
                    catalog::CT_UNAVAILABLE,
                    catalog::severity(catalog::CT_UNAVAILABLE),
                    Layer::Terminology,
                    rules.domain.clone(),
                    format!(
                        "Codelist '{codelist_name}' bound to {} is not available",
                        rule.variable
                    ),
                )
                .with_variable(&rule.variable),
            );
            continue;
        };

        let mut near_misses = 0u64;
        let mut novel = 0u64;
        let mut novel_values: BTreeSet<String> = BTreeSet::new();

        for record in &output.records {
            let Some(value) = record.populated(&rule.variable) else {
                continue;
            };
            if codelist.is_member(value) {
                continue;
            }
            if codelist.is_member_ci(value) {
                near_misses += 1;
            } else {
                novel += 1;
                novel_values.insert(value.to_string());
            }
        }

        if near_misses > 0 {
            issues.push(
                Issue::new(
                    catalog::CT_NEAR_MISS,
                    catalog::severity(catalog::CT_NEAR_MISS),
                    Layer::Terminology,
                    rules.domain.clone(),
                    format!(
                        "{} values differ from codelist '{}' members only by case",
                        rule.variable, codelist.name
                    ),
                )
                .with_variable(&rule.variable)
                .with_records(near_misses)
                .per_record(),
            );
        }

        if novel > 0 {
            let (rule_id, verb) = if codelist.extensible {
                (catalog::CT_NOVEL_TERM, "are not standard terms of")
            } else {
                (catalog::CT_VIOLATION, "are outside")
            };
            let sample: Vec<&str> = novel_values.iter().take(5).map(String::as_str).collect();
            issues.push(
                Issue::new(
                    rule_id,
                    catalog::severity(rule_id),
                    Layer::Terminology,
                    rules.domain.clone(),
                    format!(
                        "{} values {verb} codelist '{}': {}",
                        rule.variable,
                        codelist.name,
                        sample.join(", ")
                    ),
                )
                .with_variable(&rule.variable)
                .with_records(novel)
                .per_record(),
            );
        }
    }

    issues
}
