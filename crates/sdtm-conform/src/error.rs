use thiserror::Error;

use sdtm_expr::ExprError;

/// Configuration-class defects in validation setup. Data-quality findings
/// are issues on the report, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConformError {
    #[error("business rule '{id}' ({clause} clause): {source}")]
    BusinessRule {
        id: String,
        /// "when" or "expect".
        clause: &'static str,
        #[source]
        source: ExprError,
    },
}

pub type Result<T> = std::result::Result<T, ConformError>;
