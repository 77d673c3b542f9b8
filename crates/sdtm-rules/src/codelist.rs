use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A controlled-terminology codelist: the closed (or extensible) set of
/// submission values plus a synonym map used by `FORMAT` decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codelist {
    pub name: String,
    pub extensible: bool,
    /// Permitted submission values, exact case.
    pub terms: BTreeSet<String>,
    /// Upper-cased collected value → submission value.
    synonyms: BTreeMap<String, String>,
}

impl Codelist {
    pub fn new(name: impl Into<String>, terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            extensible: false,
            terms: terms.into_iter().map(Into::into).collect(),
            synonyms: BTreeMap::new(),
        }
    }

    pub fn extensible(mut self) -> Self {
        self.extensible = true;
        self
    }

    /// Register a collected-value synonym for a submission value.
    pub fn with_synonym(mut self, collected: impl Into<String>, term: impl Into<String>) -> Self {
        self.synonyms
            .insert(collected.into().trim().to_uppercase(), term.into());
        self
    }

    /// Exact, case-sensitive membership; the conformance criterion.
    pub fn is_member(&self, value: &str) -> bool {
        self.terms.contains(value)
    }

    /// Case-insensitive membership, for near-miss detection.
    pub fn is_member_ci(&self, value: &str) -> bool {
        let upper = value.to_uppercase();
        self.terms.iter().any(|term| term.to_uppercase() == upper)
    }

    /// Decode a collected value to its submission value.
    ///
    /// Matching is case-normalized over both the term set and the synonym
    /// map. Returns `None` when nothing matches; `FORMAT` then passes the
    /// value through upper-cased and flags it.
    pub fn decode(&self, value: &str) -> Option<&str> {
        let key = value.trim().to_uppercase();
        if key.is_empty() {
            return None;
        }
        if let Some(term) = self.terms.iter().find(|term| term.to_uppercase() == key) {
            return Some(term.as_str());
        }
        self.synonyms.get(&key).map(String::as_str)
    }
}

/// Name-keyed codelist collection supplied by the external CT provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodelistRegistry {
    codelists: BTreeMap<String, Codelist>,
}

impl CodelistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, codelist: Codelist) {
        self.codelists
            .insert(codelist.name.to_uppercase(), codelist);
    }

    pub fn resolve(&self, name: &str) -> Option<&Codelist> {
        self.codelists.get(&name.trim().to_uppercase())
    }
}
