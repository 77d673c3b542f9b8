//! Row contexts and join-key resolution.
//!
//! Each grain unit is evaluated against a [`RowContext`]: the primary row,
//! the measurement for vertical domains, optionally the in-progress output
//! record, and join-key lookup closures into the auxiliary tables.

use std::collections::HashMap;

use sdtm_expr::Scope;
use sdtm_rules::{DuplicateRule, Record, RowRef, SourceSet};

/// Virtual column carrying the measurement test code on vertical grains.
pub const VIRTUAL_TESTCD: &str = "_TESTCD_";
/// Virtual column carrying the measurement test label.
pub const VIRTUAL_TEST: &str = "_TEST_";
/// Virtual column carrying the collected measurement result.
pub const VIRTUAL_ORRES: &str = "_ORRES_";

pub fn is_virtual_column(column: &str) -> bool {
    column.eq_ignore_ascii_case(VIRTUAL_TESTCD)
        || column.eq_ignore_ascii_case(VIRTUAL_TEST)
        || column.eq_ignore_ascii_case(VIRTUAL_ORRES)
}

/// The unpivoted measurement backing one vertical grain unit.
#[derive(Debug, Clone)]
pub struct MeasureValue {
    pub testcd: String,
    pub test: String,
    pub value: String,
}

/// Join-key indexes over the auxiliary lookup tables of a source set.
///
/// Built once per domain run; candidate rows for a key are pre-ordered by
/// the table's pinned duplicate rule, so resolution never depends on
/// incidental load order.
#[derive(Debug)]
pub struct SourceIndex<'a> {
    source: &'a SourceSet,
    by_table: HashMap<String, HashMap<String, Vec<usize>>>,
}

impl<'a> SourceIndex<'a> {
    pub fn build(source: &'a SourceSet) -> Self {
        let mut by_table = HashMap::new();
        for lookup in source.lookups() {
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for row in lookup.table.rows() {
                let key = row.get(&source.join_key).unwrap_or_default().trim();
                if key.is_empty() {
                    continue;
                }
                index.entry(key.to_string()).or_default().push(row.index());
            }
            for rows in index.values_mut() {
                order_candidates(rows, &lookup.table, &lookup.dedupe);
            }
            by_table.insert(lookup.table.name.to_uppercase(), index);
        }
        Self { source, by_table }
    }

    pub fn source(&self) -> &'a SourceSet {
        self.source
    }

    /// Coalesce a column over the rows matching a join key: first
    /// non-missing value in the table's pinned candidate order.
    fn coalesce(&self, table: &str, key: &str, column: &str) -> Option<String> {
        let lookup = self.source.lookup(table)?;
        let candidates = self.by_table.get(&table.to_uppercase())?.get(key)?;
        for &row_index in candidates {
            let row = lookup.table.row(row_index)?;
            if let Some(value) = row.get(column) {
                if !value.trim().is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}

fn order_candidates(rows: &mut [usize], table: &sdtm_rules::SourceTable, rule: &DuplicateRule) {
    match rule {
        DuplicateRule::First => {}
        DuplicateRule::Last => rows.reverse(),
        DuplicateRule::OrderBy(column) => {
            rows.sort_by_key(|&index| {
                table
                    .row(index)
                    .and_then(|row| row.get(column))
                    .unwrap_or_default()
                    .to_string()
            });
        }
    }
}

/// Everything one grain unit's expressions may read.
pub struct RowContext<'a> {
    index: &'a SourceIndex<'a>,
    row: RowRef<'a>,
    join_value: String,
    measure: Option<&'a MeasureValue>,
    derived: Option<&'a Record>,
}

impl<'a> RowContext<'a> {
    pub fn new(index: &'a SourceIndex<'a>, row: RowRef<'a>, measure: Option<&'a MeasureValue>) -> Self {
        let join_value = row
            .get(&index.source.join_key)
            .unwrap_or_default()
            .trim()
            .to_string();
        Self {
            index,
            row,
            join_value,
            measure,
            derived: None,
        }
    }

    /// Expose the in-progress record so later rules can read values
    /// derived by earlier rules. Only wired up when the rule set declares
    /// `allow_derived_refs`.
    pub fn with_derived(mut self, record: &'a Record) -> Self {
        self.derived = Some(record);
        self
    }

    fn virtual_field(&self, column: &str) -> Option<String> {
        let measure = self.measure?;
        if column.eq_ignore_ascii_case(VIRTUAL_TESTCD) {
            Some(measure.testcd.clone())
        } else if column.eq_ignore_ascii_case(VIRTUAL_TEST) {
            Some(measure.test.clone())
        } else if column.eq_ignore_ascii_case(VIRTUAL_ORRES) {
            Some(measure.value.clone())
        } else {
            None
        }
    }
}

impl Scope for RowContext<'_> {
    fn field(&self, table: Option<&str>, column: &str) -> Option<String> {
        match table {
            Some(name) => {
                if self.index.source.primary.name.eq_ignore_ascii_case(name) {
                    return self.row.get(column).map(str::to_string);
                }
                if self.join_value.is_empty() {
                    return None;
                }
                self.index.coalesce(name, &self.join_value, column)
            }
            None => {
                if let Some(value) = self.virtual_field(column) {
                    return Some(value);
                }
                // Derived values shadow raw source columns of the same
                // name when derived reads are enabled.
                if let Some(record) = self.derived {
                    if record.has(column) {
                        return record.get(column).map(str::to_string);
                    }
                }
                self.row.get(column).map(str::to_string)
            }
        }
    }
}
