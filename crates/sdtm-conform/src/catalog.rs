//! The conformance rule catalog.
//!
//! Every check raises issues under a fixed rule id with a fixed severity
//! and count basis. Severity is a property of the rule, never of the data.

use sdtm_rules::Severity;

/// Required variable absent from the output entirely.
pub const REQUIRED_MISSING: &str = "CG0101";
/// Required variable present but with missing values.
pub const REQUIRED_NOT_POPULATED: &str = "CG0102";
/// Expected variable absent from the output.
pub const EXPECTED_MISSING: &str = "CG0103";
/// Value exceeds the declared length.
pub const LENGTH_EXCEEDED: &str = "CG0104";
/// Numeric variable holding a non-numeric value.
pub const TYPE_MISMATCH: &str = "CG0105";
/// Duplicate (subject, sequence) pair.
pub const SEQUENCE_DUPLICATE: &str = "CG0106";
/// Sequence values not dense 1..N within a subject.
pub const SEQUENCE_NOT_DENSE: &str = "CG0107";
/// Recovered coercion failure reported by the transformer.
pub const COERCION_NOTE: &str = "CG0108";
/// Recovered derivation defect reported by the transformer.
pub const DERIVATION_NOTE: &str = "CG0109";

/// Value outside a non-extensible codelist.
pub const CT_VIOLATION: &str = "CG0201";
/// Novel term against an extensible codelist.
pub const CT_NOVEL_TERM: &str = "CG0202";
/// Case-only mismatch against a codelist member.
pub const CT_NEAR_MISS: &str = "CG0203";
/// Unmapped value passed through by a FORMAT lookup.
pub const CT_UNMAPPED_NOTE: &str = "CG0204";
/// A bound codelist was not available to the validator.
pub const CT_UNAVAILABLE: &str = "CG0205";

/// Populated date value is not canonical full-or-partial ISO 8601.
pub const DATE_NOT_ISO: &str = "CG0301";
/// Paired start date falls after its end date.
pub const DATE_PAIR_ORDER: &str = "CG0302";

/// Referenced subject absent from the reference domain.
pub const SUBJECT_UNKNOWN: &str = "CG0501";
/// Referenced (subject, visit) pair absent from the reference domain.
pub const VISIT_UNKNOWN: &str = "CG0502";

pub fn severity(rule_id: &str) -> Severity {
    match rule_id {
        REQUIRED_MISSING | SEQUENCE_DUPLICATE | SUBJECT_UNKNOWN => Severity::Critical,
        REQUIRED_NOT_POPULATED | TYPE_MISMATCH | SEQUENCE_NOT_DENSE | CT_VIOLATION
        | DATE_NOT_ISO | DATE_PAIR_ORDER | VISIT_UNKNOWN => Severity::Major,
        EXPECTED_MISSING | LENGTH_EXCEEDED | CT_NEAR_MISS => Severity::Minor,
        _ => Severity::Warning,
    }
}
