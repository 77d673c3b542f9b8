use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Known subject keys and (subject, visit) pairs from the reference domain.
///
/// Supplied externally; required only when the cross-domain layer is on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectRegistry {
    subjects: BTreeSet<String>,
    visits: BTreeSet<(String, String)>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subject(&mut self, subject: impl Into<String>) {
        self.subjects.insert(subject.into());
    }

    pub fn add_visit(&mut self, subject: impl Into<String>, visit: impl Into<String>) {
        let subject = subject.into();
        self.subjects.insert(subject.clone());
        self.visits.insert((subject, visit.into()));
    }

    pub fn contains_subject(&self, subject: &str) -> bool {
        self.subjects.contains(subject)
    }

    pub fn contains_visit(&self, subject: &str, visit: &str) -> bool {
        self.visits
            .contains(&(subject.to_string(), visit.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}
