//! Surface transformer field notes as conformance issues.
//!
//! Recovered per-field defects (coercion failures, codelist misses,
//! derivation defects) never abort a run; they ride along on the records
//! and become issues here so the score reflects them.

use std::collections::BTreeMap;

use sdtm_expr::CompiledRuleSet;
use sdtm_rules::{Issue, Layer, NoteKind, TransformOutput};

use crate::catalog;

/// Aggregate notes into one issue per (kind, variable).
pub fn check(rules: &CompiledRuleSet, output: &TransformOutput) -> Vec<Issue> {
    let mut counts: BTreeMap<(NoteKind, String), (u64, String)> = BTreeMap::new();
    for record in &output.records {
        for note in &record.notes {
            let entry = counts
                .entry((note.kind, note.variable.to_uppercase()))
                .or_insert_with(|| (0, note.detail.clone()));
            entry.0 += 1;
        }
    }

    counts
        .into_iter()
        .map(|((kind, variable), (count, detail))| {
            let (rule_id, layer) = match kind {
                NoteKind::CoercionFailure => (catalog::COERCION_NOTE, Layer::Structural),
                NoteKind::DerivationDefect => (catalog::DERIVATION_NOTE, Layer::Structural),
                NoteKind::CodelistMiss => (catalog::CT_UNMAPPED_NOTE, Layer::Terminology),
            };
            Issue::new(
                rule_id,
                catalog::severity(rule_id),
                layer,
                rules.domain.clone(),
                format!("{variable}: {detail}"),
            )
            .with_variable(variable)
            .with_records(count)
            .per_record()
        })
        .collect()
}
