use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a recovered per-field defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// A value could not be coerced to the expected shape (bad date, bad
    /// number); the field resolved empty.
    CoercionFailure,
    /// A `FORMAT` lookup found no codelist member; the value passed through
    /// upper-cased.
    CodelistMiss,
    /// A composite derivation could not produce a value for this record.
    DerivationDefect,
}

/// Diagnostic attached to a record when a field-level defect was recovered.
///
/// Notes never abort a run; the validator surfaces them as issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNote {
    pub variable: String,
    pub kind: NoteKind,
    pub detail: String,
}

/// One transformed output record: an insertion-ordered variable→value map
/// plus any diagnostics recovered while deriving it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    values: Vec<(String, String)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    pub notes: Vec<FieldNote>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, preserving first-insertion order on overwrite.
    pub fn set(&mut self, variable: impl Into<String>, value: impl Into<String>) {
        let variable = variable.into();
        let key = variable.to_uppercase();
        match self.index.get(&key) {
            Some(&slot) => self.values[slot].1 = value.into(),
            None => {
                self.index.insert(key, self.values.len());
                self.values.push((variable, value.into()));
            }
        }
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.index
            .get(&variable.to_uppercase())
            .map(|&slot| self.values[slot].1.as_str())
    }

    /// A populated value: present and not all-whitespace.
    pub fn populated(&self, variable: &str) -> Option<&str> {
        self.get(variable)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn has(&self, variable: &str) -> bool {
        self.index.contains_key(&variable.to_uppercase())
    }

    /// Variables in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn push_note(&mut self, variable: impl Into<String>, kind: NoteKind, detail: impl Into<String>) {
        self.notes.push(FieldNote {
            variable: variable.into(),
            kind,
            detail: detail.into(),
        });
    }

    /// Rebuild the lookup index; required after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .values
            .iter()
            .enumerate()
            .map(|(slot, (name, _))| (name.to_uppercase(), slot))
            .collect();
    }
}

/// The complete ordered output of one domain transformation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformOutput {
    pub domain: String,
    pub records: Vec<Record>,
}

impl TransformOutput {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total field notes across all records.
    pub fn note_count(&self) -> usize {
        self.records.iter().map(|record| record.notes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_preserves_insertion_order() {
        let mut record = Record::new();
        record.set("STUDYID", "S1");
        record.set("USUBJID", "S1-001");
        record.set("AETERM", "HEADACHE");
        record.set("USUBJID", "S1-002"); // overwrite keeps position

        let names: Vec<&str> = record.variables().collect();
        assert_eq!(names, vec!["STUDYID", "USUBJID", "AETERM"]);
        assert_eq!(record.get("usubjid"), Some("S1-002"));
    }

    #[test]
    fn populated_trims_whitespace() {
        let mut record = Record::new();
        record.set("AESEV", "  ");
        assert_eq!(record.get("AESEV"), Some("  "));
        assert_eq!(record.populated("AESEV"), None);
    }

    #[test]
    fn reindex_restores_lookup_after_roundtrip() {
        let mut record = Record::new();
        record.set("AETERM", "RASH");
        let json = serde_json::to_string(&record).unwrap();
        let mut back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("AETERM"), None);
        back.reindex();
        assert_eq!(back.get("AETERM"), Some("RASH"));
    }
}
