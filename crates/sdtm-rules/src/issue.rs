use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue severity, fixed by the rule that raised it, never by the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "Critical"),
            Self::Major => write!(f, "Major"),
            Self::Minor => write!(f, "Minor"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// How an issue's record count feeds the compliance penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountBasis {
    /// One penalty per distinct issue, regardless of spread.
    PerIssue,
    /// Penalty scales with affected records, up to the configured cap.
    PerRecord,
}

/// Validation layer that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Structural,
    Terminology,
    DateFormat,
    BusinessRules,
    CrossDomain,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Terminology => "terminology",
            Self::DateFormat => "date format",
            Self::BusinessRules => "business rules",
            Self::CrossDomain => "cross domain",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A conformance issue found during one validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Conformance rule identifier (e.g., "CG0102").
    pub rule_id: String,
    pub severity: Severity,
    pub layer: Layer,
    pub domain: String,
    /// Variable the issue concerns, when applicable.
    pub variable: Option<String>,
    pub message: String,
    /// Number of records the defect touches.
    pub records_affected: u64,
    pub basis: CountBasis,
}

impl Issue {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        layer: Layer,
        domain: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            layer,
            domain: domain.into(),
            variable: None,
            message: message.into(),
            records_affected: 1,
            basis: CountBasis::PerIssue,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn with_records(mut self, count: u64) -> Self {
        self.records_affected = count;
        self
    }

    pub fn per_record(mut self) -> Self {
        self.basis = CountBasis::PerRecord;
        self
    }
}
