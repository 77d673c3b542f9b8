use std::collections::HashMap;

use crate::error::ModelError;

/// A named table of raw source rows.
///
/// Values are kept as collected strings; all typing happens downstream in
/// the expression evaluator. Column lookup is case-insensitive, matching how
/// extraction systems rename headers unpredictably.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let column_index = build_column_index(&columns);
        Self {
            name: name.into(),
            columns,
            column_index,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, values: Vec<String>) -> crate::Result<()> {
        if values.len() != self.columns.len() {
            return Err(ModelError::RowWidthMismatch {
                table: self.name.clone(),
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.rows.push(values);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index.contains_key(&column.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        (index < self.rows.len()).then_some(RowRef { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.rows.len()).map(|index| RowRef { table: self, index })
    }

    fn cell(&self, index: usize, column: &str) -> Option<&str> {
        let col = *self.column_index.get(&column.to_uppercase())?;
        self.rows.get(index).map(|row| row[col].as_str())
    }
}

fn build_column_index(columns: &[String]) -> HashMap<String, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.to_uppercase(), idx))
        .collect()
}

/// Borrowed view of one source row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a SourceTable,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table.cell(self.index, column)
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Resolution order for duplicate join-key matches in a lookup table.
///
/// Must be declared at registration time; there is no load-order default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateRule {
    /// Scan matching rows in source order, first non-missing value wins.
    First,
    /// Scan matching rows in reverse source order.
    Last,
    /// Scan matching rows ordered ascending by the named column.
    OrderBy(String),
}

/// A lookup table paired with its pinned duplicate-resolution rule.
#[derive(Debug, Clone)]
pub struct LookupTable {
    pub table: SourceTable,
    pub dedupe: DuplicateRule,
}

/// The primary table plus auxiliary lookup tables backing one domain run.
///
/// All tables share a join key; dataset-qualified expression references
/// resolve through the lookup tables by that key.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub primary: SourceTable,
    pub join_key: String,
    lookups: Vec<LookupTable>,
}

impl SourceSet {
    pub fn new(primary: SourceTable, join_key: impl Into<String>) -> crate::Result<Self> {
        let join_key = join_key.into();
        if !primary.has_column(&join_key) {
            return Err(ModelError::PrimaryMissingJoinKey {
                table: primary.name.clone(),
                join_key,
            });
        }
        Ok(Self {
            primary,
            join_key,
            lookups: Vec::new(),
        })
    }

    /// Register an auxiliary lookup table. The duplicate-resolution rule is
    /// required configuration, not an implementation detail.
    pub fn add_lookup(&mut self, table: SourceTable, dedupe: DuplicateRule) -> crate::Result<()> {
        if !table.has_column(&self.join_key) {
            return Err(ModelError::LookupMissingJoinKey {
                table: table.name.clone(),
                join_key: self.join_key.clone(),
            });
        }
        let duplicate = table.name.eq_ignore_ascii_case(&self.primary.name)
            || self
                .lookups
                .iter()
                .any(|lookup| lookup.table.name.eq_ignore_ascii_case(&table.name));
        if duplicate {
            return Err(ModelError::DuplicateTable { table: table.name });
        }
        self.lookups.push(LookupTable { table, dedupe });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&LookupTable> {
        self.lookups
            .iter()
            .find(|lookup| lookup.table.name.eq_ignore_ascii_case(name))
    }

    pub fn lookups(&self) -> &[LookupTable] {
        &self.lookups
    }

    /// The table a qualified reference names, primary included.
    pub fn table(&self, name: &str) -> Option<&SourceTable> {
        if self.primary.name.eq_ignore_ascii_case(name) {
            return Some(&self.primary);
        }
        self.lookup(name).map(|lookup| &lookup.table)
    }
}
