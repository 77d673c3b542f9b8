//! The two-pass domain transformation pipeline.
//!
//! Pass 1 evaluates every per-cell rule against each grain unit in rule
//! declaration order. Pass 2 applies the composite derivations over the
//! complete record set. A single unit's derivation failure never aborts
//! the run; only schema-level configuration defects do, and those fail
//! before any record is produced.

use std::collections::HashSet;

use tracing::{debug, info};

use sdtm_expr::{CompiledRule, CompiledRuleSet, Evaluator, Expr, Func};
use sdtm_rules::{CodelistRegistry, Grain, NoteKind, Record, RowRef, SourceSet, TransformOutput};

use crate::context::{MeasureValue, RowContext, SourceIndex, is_virtual_column};
use crate::derive::{baseline, sequence, studyday};
use crate::error::MapperError;

/// Transform one domain's source tables into ordered output records.
pub fn transform(
    rules: &CompiledRuleSet,
    source: &SourceSet,
    codelists: Option<&CodelistRegistry>,
) -> Result<TransformOutput, MapperError> {
    check_schema(rules, source)?;

    let index = SourceIndex::build(source);
    let evaluator = match codelists {
        Some(registry) => Evaluator::with_codelists(registry),
        None => Evaluator::new(),
    };

    let mut output = TransformOutput::new(rules.domain.clone());
    let mut skipped = 0usize;

    for row in source.primary.rows() {
        for measure in grain_units(&rules.grain, &row) {
            if let Some(clause) = &rules.where_clause {
                let ctx = RowContext::new(&index, row, measure.as_ref());
                let mut notes = Vec::new();
                if !evaluator.eval_condition(clause, &ctx, &mut notes) {
                    skipped += 1;
                    continue;
                }
            }
            output
                .records
                .push(evaluate_unit(rules, &evaluator, &index, row, measure.as_ref()));
        }
    }
    debug!(
        domain = %rules.domain,
        records = output.records.len(),
        skipped,
        "per-cell pass complete"
    );

    apply_composites(rules, &mut output.records);

    sort_records(rules, &mut output.records);

    info!(
        domain = %rules.domain,
        rows = source.primary.len(),
        records = output.records.len(),
        notes = output.note_count(),
        "domain transformed"
    );
    Ok(output)
}

/// Grain units for one source row: one `None` for per-row domains, one
/// measurement per non-missing declared column for vertical domains.
fn grain_units(grain: &Grain, row: &RowRef<'_>) -> Vec<Option<MeasureValue>> {
    match grain {
        Grain::PerRow => vec![None],
        Grain::Vertical(specs) => specs
            .iter()
            .filter_map(|spec| {
                let value = row.get(&spec.column)?.trim();
                if value.is_empty() {
                    return None;
                }
                Some(Some(MeasureValue {
                    testcd: spec.testcd.clone(),
                    test: spec.test.clone(),
                    value: value.to_string(),
                }))
            })
            .collect(),
    }
}

fn evaluate_unit(
    rules: &CompiledRuleSet,
    evaluator: &Evaluator<'_>,
    index: &SourceIndex<'_>,
    row: RowRef<'_>,
    measure: Option<&MeasureValue>,
) -> Record {
    let mut record = Record::new();
    for compiled in &rules.rules {
        if compiled.composite.is_some() {
            // Placeholder keeps declaration order; the composite pass
            // fills the value in.
            record.set(&compiled.rule.variable, "");
            continue;
        }
        let (value, notes) = {
            let mut ctx = RowContext::new(index, row, measure);
            if rules.allow_derived_refs {
                ctx = ctx.with_derived(&record);
            }
            let mut notes = Vec::new();
            let value = evaluator.eval(&compiled.expr, &ctx, &mut notes);
            (value, notes)
        };
        record.set(&compiled.rule.variable, value);
        for note in notes {
            record.push_note(&compiled.rule.variable, note.kind, note.detail);
        }
    }
    record
}

/// Second pass: composite derivations over the full record set, in rule
/// declaration order.
fn apply_composites(rules: &CompiledRuleSet, records: &mut [Record]) {
    for compiled in rules.composite_rules() {
        let target = compiled.rule.variable.as_str();
        let args = field_args(&compiled.expr);
        match compiled.composite {
            Some(Func::Sequence) => {
                sequence::assign(records, &args[0], &args[1..], target);
            }
            Some(Func::StudyDay) => {
                apply_study_day(records, &args[0], &args[1], target);
            }
            Some(Func::BaselineFlag) => {
                let vars = baseline::BaselineVars {
                    subject: &rules.subject_variable,
                    testcd: &args[0],
                    date: &args[1],
                    result: &args[2],
                    cutoff: &args[3],
                };
                baseline::assign(records, &vars, target);
            }
            _ => {}
        }
    }
}

fn apply_study_day(records: &mut [Record], event_var: &str, ref_var: &str, target: &str) {
    for record in records.iter_mut() {
        let event = record.get(event_var).unwrap_or_default().to_string();
        let reference = record.get(ref_var).unwrap_or_default().to_string();
        match studyday::study_day_from_strings(&event, &reference) {
            Some(day) => record.set(target, day.to_string()),
            None => {
                record.set(target, "");
                // Both populated but unusable deserves a diagnostic;
                // plain missing input does not.
                if !event.trim().is_empty() && !reference.trim().is_empty() {
                    record.push_note(
                        target,
                        NoteKind::DerivationDefect,
                        format!(
                            "study day needs two complete dates, got '{event}' and '{reference}'"
                        ),
                    );
                }
            }
        }
    }
}

/// Extract the output-variable names of a composite call's arguments.
/// Argument shape was enforced at parse time.
fn field_args(expr: &Expr) -> Vec<String> {
    match expr {
        Expr::Call { args, .. } => args
            .iter()
            .filter_map(|arg| match arg {
                Expr::Field { table: None, column } => Some(column.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn sort_records(rules: &CompiledRuleSet, records: &mut [Record]) {
    let subject = rules.subject_variable.as_str();
    let seq = rules.sequence_variable.as_str();
    records.sort_by(|a, b| {
        let left = a.get(subject).unwrap_or_default();
        let right = b.get(subject).unwrap_or_default();
        left.cmp(right).then_with(|| seq_key(a, seq).cmp(&seq_key(b, seq)))
    });
}

fn seq_key(record: &Record, seq_var: &str) -> i64 {
    record
        .get(seq_var)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(i64::MAX)
}

/// Fail loudly when any expression references a column absent from every
/// referenced table: running would only produce misleading output.
fn check_schema(rules: &CompiledRuleSet, source: &SourceSet) -> Result<(), MapperError> {
    let vertical = matches!(rules.grain, Grain::Vertical(_));
    let rule_vars: HashSet<String> = rules
        .rules
        .iter()
        .map(|compiled| compiled.rule.variable.to_uppercase())
        .collect();

    if let Grain::Vertical(specs) = &rules.grain {
        for spec in specs {
            if !source.primary.has_column(&spec.column) {
                return Err(MapperError::SchemaViolation {
                    variable: format!("<grain:{}>", spec.testcd),
                    column: spec.column.clone(),
                    scope: format!("primary table '{}'", source.primary.name),
                });
            }
        }
    }

    for compiled in &rules.rules {
        if compiled.composite.is_some() {
            check_derivation_targets(compiled, &rule_vars)?;
            continue;
        }
        check_expr_fields(
            &compiled.rule.variable,
            &compiled.expr,
            rules,
            source,
            vertical,
            &rule_vars,
        )?;
    }
    if let Some(clause) = &rules.where_clause {
        check_expr_fields("<where>", clause, rules, source, vertical, &rule_vars)?;
    }
    Ok(())
}

fn check_expr_fields(
    variable: &str,
    expr: &Expr,
    rules: &CompiledRuleSet,
    source: &SourceSet,
    vertical: bool,
    rule_vars: &HashSet<String>,
) -> Result<(), MapperError> {
    let mut fields = Vec::new();
    expr.collect_fields(&mut fields);
    for (table, column) in fields {
        match table {
            Some(name) => {
                let Some(table) = source.table(name) else {
                    return Err(MapperError::UnknownTable {
                        variable: variable.to_string(),
                        table: name.to_string(),
                    });
                };
                if !table.has_column(column) {
                    return Err(MapperError::SchemaViolation {
                        variable: variable.to_string(),
                        column: column.to_string(),
                        scope: format!("table '{}'", table.name),
                    });
                }
            }
            None => {
                let resolvable = source.primary.has_column(column)
                    || (vertical && is_virtual_column(column))
                    || (rules.allow_derived_refs && rule_vars.contains(&column.to_uppercase()));
                if !resolvable {
                    return Err(MapperError::SchemaViolation {
                        variable: variable.to_string(),
                        column: column.to_string(),
                        scope: format!("primary table '{}'", source.primary.name),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_derivation_targets(
    compiled: &CompiledRule,
    rule_vars: &HashSet<String>,
) -> Result<(), MapperError> {
    for referenced in field_args(&compiled.expr) {
        if !rule_vars.contains(&referenced.to_uppercase()) {
            return Err(MapperError::UnknownDerivationTarget {
                variable: compiled.rule.variable.clone(),
                referenced,
            });
        }
    }
    Ok(())
}
