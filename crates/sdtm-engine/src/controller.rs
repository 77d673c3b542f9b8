//! The bounded self-correction loop.
//!
//! Scoring leads to one of three places: terminal readiness, another
//! remap pass with templated feedback, or terminal exhaustion once the
//! iteration budget is spent. Exhaustion is a manual-review signal, not a
//! failure. The loop is iteration-bounded, never time-bounded, and always
//! returns within `max_iterations + 1` scoring passes.

use std::collections::BTreeSet;

use tracing::info;

use sdtm_conform::ValidationContext;
use sdtm_expr::CompiledRuleSet;
use sdtm_rules::{
    CodelistRegistry, ComplianceReport, CorrectionState, SourceSet, TransformOutput,
};

use crate::error::Result;

/// Layer sub-scores below this contribute a feedback hint.
const HINT_THRESHOLD: f64 = 80.0;

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// How a correction loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// The output met every readiness clause.
    Ready,
    /// The iteration budget ran out before readiness; the final records
    /// and report need a human decision.
    Exhausted,
}

/// Terminal result of a correction loop.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub records: TransformOutput,
    pub report: ComplianceReport,
    pub state: CorrectionState,
    pub phase: LoopPhase,
}

/// Run Transform → Validate → Score until ready or exhausted.
///
/// The same rule set is re-applied on every pass: the engine never
/// synthesizes rules, so the accumulated feedback is advisory context for
/// whoever supplies them.
pub fn run_correction_loop(
    rules: &CompiledRuleSet,
    source: &SourceSet,
    validation: &ValidationContext<'_>,
    codelists: Option<&CodelistRegistry>,
    max_iterations: u32,
) -> Result<LoopOutcome> {
    let mut state = CorrectionState::new(max_iterations);

    loop {
        let records = sdtm_mapper::transform(rules, source, codelists)?;
        let report = validation.validate(rules, &records);

        if report.submission_ready {
            info!(
                domain = %rules.domain,
                iteration = state.iteration,
                score = report.score,
                "correction loop ready"
            );
            return Ok(LoopOutcome {
                records,
                report,
                state: state.resolved(),
                phase: LoopPhase::Ready,
            });
        }

        if state.exhausted() {
            info!(
                domain = %rules.domain,
                iterations = state.iteration,
                score = report.score,
                "correction loop exhausted, manual review needed"
            );
            return Ok(LoopOutcome {
                records,
                report,
                state,
                phase: LoopPhase::Exhausted,
            });
        }

        let hints = feedback_hints(&report);
        state = state.advance(hints);
        info!(
            domain = %rules.domain,
            iteration = state.iteration,
            max_iterations,
            score = report.score,
            "correction feedback, remapping"
        );
    }
}

/// One templated hint per layer scoring below the threshold, naming the
/// variables its issues touch.
fn feedback_hints(report: &ComplianceReport) -> Vec<String> {
    report
        .layer_scores
        .iter()
        .filter(|layer| layer.score < HINT_THRESHOLD)
        .map(|layer| {
            let variables: BTreeSet<&str> = report
                .issues
                .iter()
                .filter(|issue| issue.layer == layer.layer)
                .filter_map(|issue| issue.variable.as_deref())
                .collect();
            let named: Vec<&str> = variables.into_iter().take(5).collect();
            if named.is_empty() {
                format!(
                    "{} layer scored {:.1}; review its mapping rules",
                    layer.layer, layer.score
                )
            } else {
                format!(
                    "{} layer scored {:.1}; review the rules for {}",
                    layer.layer,
                    layer.score,
                    named.join(", ")
                )
            }
        })
        .collect()
}
