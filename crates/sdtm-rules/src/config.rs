use serde::{Deserialize, Serialize};

use crate::issue::Severity;

/// Penalty weight per severity class.
///
/// Observed scoring schemes disagree on exact weights, so nothing here is
/// canonical; callers override per study convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub critical: f64,
    pub major: f64,
    pub minor: f64,
    pub warning: f64,
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Major => self.major,
            Severity::Minor => self.minor,
            Severity::Warning => self.warning,
        }
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 5.0,
            major: 0.8,
            minor: 0.3,
            warning: 0.1,
        }
    }
}

/// Configuration for the compliance scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: SeverityWeights,
    /// Minimum score for readiness.
    pub threshold: f64,
    /// Major issues tolerated while still submission-ready.
    pub allowed_major: usize,
    /// Cap on the per-record multiplier, so one pervasive defect cannot
    /// drive the score unboundedly negative.
    pub per_record_cap: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: SeverityWeights::default(),
            threshold: 90.0,
            allowed_major: 5,
            per_record_cap: 25,
        }
    }
}

/// Which validation layers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub structural: bool,
    pub terminology: bool,
    pub date_format: bool,
    pub business_rules: bool,
    /// Needs a [`crate::SubjectRegistry`]; skipped when none is supplied.
    pub cross_domain: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            structural: true,
            terminology: true,
            date_format: true,
            business_rules: true,
            cross_domain: false,
        }
    }
}

/// A declarative cross-field business rule.
///
/// Both conditions use the mapping expression language's condition grammar
/// and are evaluated per output record: every record where `when` holds but
/// `expect` does not counts against the rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRule {
    pub id: String,
    pub severity: Severity,
    pub when: String,
    pub expect: String,
    pub message: String,
}

impl BusinessRule {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        when: impl Into<String>,
        expect: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            when: when.into(),
            expect: expect.into(),
            message: message.into(),
        }
    }
}
