use thiserror::Error;

/// Configuration-class defects detected before a domain run produces any
/// output. Data-quality problems never take this path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapperError {
    #[error(
        "rule '{variable}' references column '{column}' which is absent from {scope}"
    )]
    SchemaViolation {
        variable: String,
        column: String,
        /// Where the column was looked for ("table 'EX_SUPP'" or
        /// "the primary table").
        scope: String,
    },
    #[error("rule '{variable}' references unknown table '{table}'")]
    UnknownTable { variable: String, table: String },
    #[error(
        "derivation for '{variable}' references '{referenced}', which is not a target variable of the rule set"
    )]
    UnknownDerivationTarget {
        variable: String,
        referenced: String,
    },
}

pub type Result<T> = std::result::Result<T, MapperError>;
