//! Date-format conformance.
//!
//! Every populated value of a date variable must be canonical full or
//! partial ISO 8601, and paired start/end dates must be ordered when both
//! carry day precision.

use sdtm_expr::{CompiledRuleSet, complete_date, is_canonical};
use sdtm_rules::{Issue, Layer, TransformOutput};

use crate::catalog;

pub fn check(rules: &CompiledRuleSet, output: &TransformOutput) -> Vec<Issue> {
    let mut issues = Vec::new();
    if output.records.is_empty() {
        return issues;
    }

    let date_vars: Vec<&str> = rules
        .rules
        .iter()
        .map(|compiled| compiled.rule.variable.as_str())
        .filter(|name| name.to_uppercase().ends_with("DTC"))
        .collect();

    for variable in &date_vars {
        let bad = output
            .records
            .iter()
            .filter(|record| {
                record
                    .populated(variable)
                    .is_some_and(|value| !is_canonical(value))
            })
            .count() as u64;
        if bad > 0 {
            issues.push(
                Issue::new(
                    catalog::DATE_NOT_ISO,
                    catalog::severity(catalog::DATE_NOT_ISO),
                    Layer::DateFormat,
                    rules.domain.clone(),
                    format!("{variable} holds values that are not ISO 8601"),
                )
                .with_variable(*variable)
                .with_records(bad)
                .per_record(),
            );
        }
    }

    // --STDTC / --ENDTC pairs: start must not fall after end.
    for start_var in &date_vars {
        let upper = start_var.to_uppercase();
        let Some(prefix) = upper.strip_suffix("STDTC") else {
            continue;
        };
        let end_name = format!("{prefix}ENDTC");
        let Some(end_var) = date_vars
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&end_name))
        else {
            continue;
        };

        let out_of_order = output
            .records
            .iter()
            .filter(|record| {
                let start = record.populated(start_var).and_then(complete_date);
                let end = record.populated(end_var).and_then(complete_date);
                matches!((start, end), (Some(start), Some(end)) if start > end)
            })
            .count() as u64;
        if out_of_order > 0 {
            issues.push(
                Issue::new(
                    catalog::DATE_PAIR_ORDER,
                    catalog::severity(catalog::DATE_PAIR_ORDER),
                    Layer::DateFormat,
                    rules.domain.clone(),
                    format!("{start_var} falls after {end_var}"),
                )
                .with_variable(*start_var)
                .with_records(out_of_order)
                .per_record(),
            );
        }
    }

    issues
}
