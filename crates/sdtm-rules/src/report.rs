use serde::{Deserialize, Serialize};

use crate::issue::{Issue, Layer, Severity};

/// Sub-score for one validation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerScore {
    pub layer: Layer,
    /// 0–100, same penalty model as the overall score.
    pub score: f64,
    pub issue_count: usize,
}

/// Weighted compliance summary for one validation run.
///
/// Recomputed from scratch every run; never mutated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub domain: String,
    /// 0–100 severity-weighted score, floored at 0.
    pub score: f64,
    pub submission_ready: bool,
    pub layer_scores: Vec<LayerScore>,
    pub issues: Vec<Issue>,
}

impl ComplianceReport {
    pub fn count_at(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    pub fn critical_count(&self) -> usize {
        self.count_at(Severity::Critical)
    }

    pub fn major_count(&self) -> usize {
        self.count_at(Severity::Major)
    }

    pub fn layer_score(&self, layer: Layer) -> Option<f64> {
        self.layer_scores
            .iter()
            .find(|entry| entry.layer == layer)
            .map(|entry| entry.score)
    }
}

pub const REPORT_SCHEMA: &str = "sdtm-engine.compliance-report";
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope for persisting a report as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub schema: String,
    pub schema_version: u32,
    pub report: ComplianceReport,
}

impl ReportPayload {
    pub fn new(report: ComplianceReport) -> Self {
        Self {
            schema: REPORT_SCHEMA.to_string(),
            schema_version: REPORT_SCHEMA_VERSION,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{CountBasis, Layer};

    fn sample_report() -> ComplianceReport {
        ComplianceReport {
            domain: "AE".to_string(),
            score: 92.6,
            submission_ready: false,
            layer_scores: vec![LayerScore {
                layer: Layer::Structural,
                score: 95.0,
                issue_count: 1,
            }],
            issues: vec![Issue {
                rule_id: "CG0102".to_string(),
                severity: Severity::Critical,
                layer: Layer::Structural,
                domain: "AE".to_string(),
                variable: Some("AETERM".to_string()),
                message: "Required variable AETERM has missing values".to_string(),
                records_affected: 2,
                basis: CountBasis::PerRecord,
            }],
        }
    }

    #[test]
    fn severity_counts() {
        let report = sample_report();
        assert_eq!(report.critical_count(), 1);
        assert_eq!(report.major_count(), 0);
        assert_eq!(report.layer_score(Layer::Structural), Some(95.0));
        assert_eq!(report.layer_score(Layer::Terminology), None);
    }

    #[test]
    fn payload_round_trips() {
        let payload = ReportPayload::new(sample_report());
        let json = serde_json::to_string(&payload).unwrap();
        let back: ReportPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.schema, REPORT_SCHEMA);
        assert_eq!(back.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(back.report.domain, "AE");
        assert_eq!(back.report.issues.len(), 1);
    }
}
