use thiserror::Error;

/// Configuration-class defects raised while assembling model inputs.
///
/// Data-quality conditions are never errors; they surface as issues on a
/// report instead.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("rule set for domain '{domain}' contains no variable rules")]
    EmptyRuleSet { domain: String },
    #[error("source table '{table}' is registered twice")]
    DuplicateTable { table: String },
    #[error("lookup table '{table}' does not contain join key column '{join_key}'")]
    LookupMissingJoinKey { table: String, join_key: String },
    #[error("primary table '{table}' does not contain join key column '{join_key}'")]
    PrimaryMissingJoinKey { table: String, join_key: String },
    #[error("row has {got} values but table '{table}' declares {expected} columns")]
    RowWidthMismatch {
        table: String,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
