use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// SDTM core designation for a variable (SDTMIG v3.4 Section 4.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreRequirement {
    Required,
    Expected,
    Permissible,
}

impl fmt::Display for CoreRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "Required"),
            Self::Expected => write!(f, "Expected"),
            Self::Permissible => write!(f, "Permissible"),
        }
    }
}

impl FromStr for CoreRequirement {
    type Err = String;

    /// Parse a core designation as found in mapping specifications
    /// (case-insensitive, single-letter abbreviations accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REQUIRED" | "REQ" | "R" => Ok(Self::Required),
            "EXPECTED" | "EXP" | "E" => Ok(Self::Expected),
            "PERMISSIBLE" | "PERM" | "P" => Ok(Self::Permissible),
            other => Err(format!("Unknown core requirement: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Char,
    Num,
}

/// Measurement column declaration for vertical (unpivoted) domains.
///
/// One output record is produced per non-missing measurement per source row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureSpec {
    /// Source column holding the collected result.
    pub column: String,
    /// Short test code emitted through the `_TESTCD_` virtual column.
    pub testcd: String,
    /// Test label emitted through the `_TEST_` virtual column.
    pub test: String,
}

/// Record grain for a domain.
///
/// The grain is declared, never inferred from the shape of the data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum Grain {
    /// One output record per source row.
    #[default]
    PerRow,
    /// One output record per non-missing measurement column per source row.
    Vertical(Vec<MeasureSpec>),
}

/// A single declarative mapping rule for one target variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRule {
    /// Target variable name (e.g., "AESTDTC").
    pub variable: String,
    /// Position in the output record (1-based declaration order).
    pub order: u32,
    pub data_type: DataType,
    /// Declared maximum length, when the target schema constrains it.
    pub length: Option<u32>,
    pub core: CoreRequirement,
    /// Source tables the expression may reference (informational).
    pub source_tables: Vec<String>,
    /// Source columns the expression reads (informational).
    pub source_columns: Vec<String>,
    /// Mapping expression text, parsed once by the engine.
    pub expression: String,
    /// Codelist binding for controlled-terminology conformance.
    pub codelist: Option<String>,
}

impl VariableRule {
    pub fn new(
        variable: impl Into<String>,
        order: u32,
        data_type: DataType,
        core: CoreRequirement,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            order,
            data_type,
            length: None,
            core,
            source_tables: Vec::new(),
            source_columns: Vec::new(),
            expression: expression.into(),
            codelist: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_codelist(mut self, codelist: impl Into<String>) -> Self {
        self.codelist = Some(codelist.into());
        self
    }
}

/// Complete mapping specification for one target domain.
///
/// Immutable once loaded; the engine never mutates or synthesizes rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Domain code (e.g., "AE", "VS").
    pub domain: String,
    /// Output variable holding the subject key (typically "USUBJID").
    pub subject_variable: String,
    /// Output variable holding the per-subject sequence number.
    pub sequence_variable: String,
    pub grain: Grain,
    /// Whether a rule may read values derived by earlier rules of the same
    /// record. Off by default: rules see raw source columns only.
    pub allow_derived_refs: bool,
    /// Optional row-inclusion predicate, evaluated per grain unit.
    pub where_clause: Option<String>,
    pub rules: Vec<VariableRule>,
}

impl RuleSet {
    pub fn new(domain: impl Into<String>, rules: Vec<VariableRule>) -> crate::Result<Self> {
        let domain = domain.into();
        if rules.is_empty() {
            return Err(ModelError::EmptyRuleSet { domain });
        }
        let sequence_variable = format!("{}SEQ", domain.to_uppercase());
        Ok(Self {
            domain,
            subject_variable: "USUBJID".to_string(),
            sequence_variable,
            grain: Grain::PerRow,
            allow_derived_refs: false,
            where_clause: None,
            rules,
        })
    }

    pub fn with_grain(mut self, grain: Grain) -> Self {
        self.grain = grain;
        self
    }

    pub fn with_subject_variable(mut self, variable: impl Into<String>) -> Self {
        self.subject_variable = variable.into();
        self
    }

    pub fn with_sequence_variable(mut self, variable: impl Into<String>) -> Self {
        self.sequence_variable = variable.into();
        self
    }

    pub fn with_derived_refs(mut self) -> Self {
        self.allow_derived_refs = true;
        self
    }

    pub fn with_where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause = Some(predicate.into());
        self
    }

    /// Return the rule for a target variable (case-insensitive).
    pub fn rule(&self, variable: &str) -> Option<&VariableRule> {
        self.rules
            .iter()
            .find(|rule| rule.variable.eq_ignore_ascii_case(variable))
    }

    /// Target variable names in declaration order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.variable.as_str()).collect()
    }
}
