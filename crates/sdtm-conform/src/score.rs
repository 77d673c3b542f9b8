//! The compliance scorer.
//!
//! A deterministic reduction from an issue multiset to a report. Every
//! issue subtracts `weight(severity) * f(count)` from 100, where `f` is 1
//! for per-issue penalties and the capped record count for per-record
//! penalties. The score floors at 0, and readiness is three independent
//! clauses so a numerically acceptable score can never mask a raw
//! critical-count violation.

use sdtm_rules::{
    ComplianceReport, CountBasis, Issue, Layer, LayerScore, ScoringConfig, Severity,
};

/// Penalty one issue contributes.
pub fn penalty(issue: &Issue, config: &ScoringConfig) -> f64 {
    let weight = config.weights.weight(issue.severity);
    let factor = match issue.basis {
        CountBasis::PerIssue => 1.0,
        CountBasis::PerRecord => issue.records_affected.min(config.per_record_cap) as f64,
    };
    weight * factor
}

fn floored_score(issues: &[&Issue], config: &ScoringConfig) -> f64 {
    let total: f64 = issues.iter().map(|issue| penalty(issue, config)).sum();
    (100.0 - total).max(0.0)
}

/// Reduce a validation run's issues to a compliance report.
///
/// `layers_run` lists the layers that actually executed, so a disabled
/// layer is distinguishable from a clean one.
pub fn build_report(
    domain: impl Into<String>,
    issues: Vec<Issue>,
    config: &ScoringConfig,
    layers_run: &[Layer],
) -> ComplianceReport {
    let all: Vec<&Issue> = issues.iter().collect();
    let score = floored_score(&all, config);

    let layer_scores = layers_run
        .iter()
        .map(|&layer| {
            let layer_issues: Vec<&Issue> =
                issues.iter().filter(|issue| issue.layer == layer).collect();
            LayerScore {
                layer,
                score: floored_score(&layer_issues, config),
                issue_count: layer_issues.len(),
            }
        })
        .collect();

    let critical = issues
        .iter()
        .filter(|issue| issue.severity == Severity::Critical)
        .count();
    let major = issues
        .iter()
        .filter(|issue| issue.severity == Severity::Major)
        .count();

    // Three independent clauses: score, raw critical count, major budget.
    let submission_ready =
        score >= config.threshold && critical == 0 && major <= config.allowed_major;

    ComplianceReport {
        domain: domain.into(),
        score,
        submission_ready,
        layer_scores,
        issues,
    }
}
