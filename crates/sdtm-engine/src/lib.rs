//! Public facade for the rule-driven SDTM conversion engine.
//!
//! The operations external callers compose:
//!
//! - [`compile`] parses a loaded rule set once, rejecting malformed
//!   expressions before any data is touched;
//! - [`transform`] runs one domain's two-pass transformation;
//! - [`validate`] scores a transformed output against the layered checks;
//! - [`run_correction_loop`] drives Transform → Validate → Score under a
//!   bounded iteration budget.
//!
//! The engine performs no I/O of any kind: rule sets, source tables,
//! codelists, and the subject registry all arrive from external
//! collaborators, and results come back as values.

pub mod controller;
pub mod error;

pub use controller::{DEFAULT_MAX_ITERATIONS, LoopOutcome, LoopPhase, run_correction_loop};
pub use error::{EngineError, Result};

pub use sdtm_conform::ValidationContext;
pub use sdtm_expr::{CompiledRuleSet, compile};
pub use sdtm_rules::{
    CodelistRegistry, ComplianceReport, CorrectionState, RuleSet, SourceSet, TransformOutput,
};

/// Transform one domain's source tables into ordered output records.
pub fn transform(
    rules: &CompiledRuleSet,
    source: &SourceSet,
    codelists: Option<&CodelistRegistry>,
) -> Result<TransformOutput> {
    Ok(sdtm_mapper::transform(rules, source, codelists)?)
}

/// Validate a transformed output and score the result.
pub fn validate(
    validation: &ValidationContext<'_>,
    rules: &CompiledRuleSet,
    output: &TransformOutput,
) -> ComplianceReport {
    validation.validate(rules, output)
}
