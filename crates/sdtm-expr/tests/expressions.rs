//! End-to-end tests for the mapping expression language.

use sdtm_expr::{Evaluator, Scope, parse};
use std::collections::HashMap;

struct Row(HashMap<String, String>);

impl Row {
    fn of(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_uppercase(), v.to_string()))
                .collect(),
        )
    }
}

impl Scope for Row {
    fn field(&self, _table: Option<&str>, column: &str) -> Option<String> {
        self.0.get(&column.to_uppercase()).cloned()
    }
}

fn eval(text: &str, row: &Row) -> String {
    let expr = parse(text).expect("expression parses");
    let mut notes = Vec::new();
    Evaluator::new().eval(&expr, row, &mut notes)
}

#[test]
fn subject_key_construction() {
    let row = Row::of(&[("STUDYID", "ABC123"), ("SITEID", "001"), ("SUBJID", "042")]);
    assert_eq!(
        eval("CONCAT(STUDYID, '-', SITEID, '-', SUBJID)", &row),
        "ABC123-001-042"
    );
}

#[test]
fn severity_normalization_chain() {
    let row = Row::of(&[("SEVERITY", "  severe ")]);
    assert_eq!(eval("UPCASE(TRIM(SEVERITY))", &row), "SEVERE");
}

#[test]
fn conditional_on_multiple_fields() {
    let row = Row::of(&[("AESEV", "SEVERE"), ("AEOUT", "RECOVERED")]);
    assert_eq!(
        eval(
            "IF(AESEV == 'SEVERE' && AEOUT != 'FATAL', 'REVIEW', '')",
            &row
        ),
        "REVIEW"
    );
}

#[test]
fn mixed_precision_date_pair() {
    // A complete start date and a month-precision end date from the same
    // collection format.
    let row = Row::of(&[("AESTDT", "20080910"), ("AEENDT", "200809")]);
    assert_eq!(
        eval("ISO8601DATEFORMAT(AESTDT, 'YYYYMMDD')", &row),
        "2008-09-10"
    );
    assert_eq!(
        eval("ISO8601DATEFORMAT(AEENDT, 'YYYYMMDD')", &row),
        "2008-09"
    );
}

#[test]
fn fallback_format_chain_picks_first_match() {
    let row = Row::of(&[("VISITDT", "09/10/2008")]);
    assert_eq!(
        eval(
            "ISO8601DATETIMEFORMATS(VISITDT, 'YYYY-MM-DD', 'MM/DD/YYYY', 'DD/MM/YYYY')",
            &row
        ),
        "2008-09-10"
    );
}

#[test]
fn empty_input_stays_empty_through_every_function() {
    let row = Row::of(&[("V", "")]);
    for text in [
        "TRIM(V)",
        "UPCASE(V)",
        "SUBSTR(V, 1, 5)",
        "COMPRESS(V, '-')",
        "ISO8601DATEFORMAT(V, 'YYYYMMDD')",
        "FORMAT(V, 'NY')",
    ] {
        assert_eq!(eval(text, &row), "", "{text}");
    }
}
