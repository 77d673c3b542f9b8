//! Layered conformance validation over transformed output.
//!
//! Each layer is independently scorable and independently toggled; the
//! scorer reduces the combined issue multiset to a [`ComplianceReport`].
//! Everything here returns data: a messy dataset yields a low score, not
//! an error.

pub mod catalog;
pub mod checks;
pub mod error;
pub mod score;

pub use checks::business::CompiledBusinessRule;
pub use error::{ConformError, Result};
pub use score::{build_report, penalty};

use tracing::info;

use sdtm_expr::CompiledRuleSet;
use sdtm_rules::{
    BusinessRule, CodelistRegistry, ComplianceReport, Issue, Layer, LayerConfig, ScoringConfig,
    SubjectRegistry, TransformOutput,
};

/// Validation configuration plus compiled business rules and the external
/// references the layers consult.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext<'a> {
    pub layers: LayerConfig,
    pub scoring: ScoringConfig,
    business: Vec<CompiledBusinessRule>,
    codelists: Option<&'a CodelistRegistry>,
    registry: Option<&'a SubjectRegistry>,
}

impl<'a> ValidationContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layers(mut self, layers: LayerConfig) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Compile and attach business rules. Malformed condition text is a
    /// configuration defect.
    pub fn with_business_rules(mut self, rules: &[BusinessRule]) -> Result<Self> {
        self.business = checks::business::compile_rules(rules)?;
        Ok(self)
    }

    pub fn with_codelists(mut self, codelists: &'a CodelistRegistry) -> Self {
        self.codelists = Some(codelists);
        self
    }

    pub fn with_registry(mut self, registry: &'a SubjectRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Run every enabled layer and score the result.
    pub fn validate(&self, rules: &CompiledRuleSet, output: &TransformOutput) -> ComplianceReport {
        let mut issues: Vec<Issue> = Vec::new();
        let mut layers_run: Vec<Layer> = Vec::new();

        if self.layers.structural {
            layers_run.push(Layer::Structural);
            issues.extend(checks::structural::check(rules, output));
        }
        if self.layers.terminology {
            layers_run.push(Layer::Terminology);
            issues.extend(checks::terminology::check(rules, output, self.codelists));
        }
        if self.layers.structural || self.layers.terminology {
            issues.extend(
                checks::notes::check(rules, output).into_iter().filter(|issue| {
                    match issue.layer {
                        Layer::Structural => self.layers.structural,
                        Layer::Terminology => self.layers.terminology,
                        _ => true,
                    }
                }),
            );
        }
        if self.layers.date_format {
            layers_run.push(Layer::DateFormat);
            issues.extend(checks::dates::check(rules, output));
        }
        if self.layers.business_rules && !self.business.is_empty() {
            layers_run.push(Layer::BusinessRules);
            issues.extend(checks::business::check(&self.business, &rules.domain, output));
        }
        if self.layers.cross_domain {
            // The layer needs the external registry; without one it is
            // skipped, not failed.
            if let Some(registry) = self.registry {
                layers_run.push(Layer::CrossDomain);
                issues.extend(checks::cross_domain::check(rules, output, registry));
            }
        }

        let report = score::build_report(rules.domain.clone(), issues, &self.scoring, &layers_run);
        info!(
            domain = %rules.domain,
            score = report.score,
            issues = report.issues.len(),
            submission_ready = report.submission_ready,
            "validation complete"
        );
        report
    }
}
