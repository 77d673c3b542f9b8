//! End-to-end domain transformation tests.

use sdtm_expr::compile;
use sdtm_mapper::{MapperError, transform};
use sdtm_rules::{
    Codelist, CodelistRegistry, CoreRequirement, DataType, DuplicateRule, Grain, MeasureSpec,
    RuleSet, SourceSet, SourceTable, VariableRule,
};

fn rule(variable: &str, order: u32, expression: &str) -> VariableRule {
    VariableRule::new(
        variable,
        order,
        DataType::Char,
        CoreRequirement::Required,
        expression,
    )
}

fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> SourceTable {
    let mut t = SourceTable::new(name, columns.iter().map(|c| c.to_string()).collect());
    for row in rows {
        t.push_row(row.iter().map(|v| v.to_string()).collect())
            .unwrap();
    }
    t
}

fn ae_rules() -> RuleSet {
    RuleSet::new(
        "AE",
        vec![
            rule("STUDYID", 1, "ASSIGN('ABC123')"),
            rule("DOMAIN", 2, "ASSIGN('AE')"),
            rule("USUBJID", 3, "CONCAT('ABC123', '-', SUBJID)"),
            rule("AESEQ", 4, "SEQUENCE(USUBJID, AESTDTC)"),
            rule("AETERM", 5, "UPCASE(TRIM(AETERM))"),
            rule("AEDECOD", 6, "CODES.PT"),
            rule("AESEV", 7, "FORMAT(SEVERITY, 'AESEV')"),
            rule("AESTDTC", 8, "ISO8601DATEFORMAT(AESTDT, 'YYYYMMDD')"),
            rule("AEENDTC", 9, "ISO8601DATEFORMAT(AEENDT, 'YYYYMMDD')"),
            rule("RFSTDTC", 10, "DM.RFSTDTC"),
            rule("AESTDY", 11, "STUDY_DAY(AESTDTC, RFSTDTC)"),
        ],
    )
    .unwrap()
}

fn ae_source() -> SourceSet {
    let primary = table(
        "AE_RAW",
        &["SUBJID", "AETERM", "SEVERITY", "AESTDT", "AEENDT"],
        &[
            &["002", " nausea ", "mild", "20080915", ""],
            &["001", "Rash", "moderate", "20080910", "200809"],
            &["001", "Headache", "severe", "20080905", "20080906"],
        ],
    );
    let dm = table(
        "DM",
        &["SUBJID", "RFSTDTC"],
        &[&["001", "2008-09-08"], &["002", "2008-09-10"]],
    );
    let codes = table(
        "CODES",
        &["SUBJID", "PT"],
        &[&["001", "Dermatitis"], &["002", "Nausea"]],
    );
    let mut source = SourceSet::new(primary, "SUBJID").unwrap();
    source.add_lookup(dm, DuplicateRule::First).unwrap();
    source.add_lookup(codes, DuplicateRule::First).unwrap();
    source
}

fn codelists() -> CodelistRegistry {
    let mut registry = CodelistRegistry::new();
    registry.insert(
        Codelist::new("AESEV", ["MILD", "MODERATE", "SEVERE"])
            .with_synonym("1", "MILD")
            .with_synonym("2", "MODERATE")
            .with_synonym("3", "SEVERE"),
    );
    registry
}

#[test]
fn full_domain_transform() {
    let compiled = compile(ae_rules()).unwrap();
    let registry = codelists();
    let output = transform(&compiled, &ae_source(), Some(&registry)).unwrap();

    assert_eq!(output.domain, "AE");
    assert_eq!(output.records.len(), 3);

    // Sorted by (subject, sequence); subject 001's two events ordered by
    // start date, which reverses their source order.
    let first = &output.records[0];
    assert_eq!(first.get("USUBJID"), Some("ABC123-001"));
    assert_eq!(first.get("AESEQ"), Some("1"));
    assert_eq!(first.get("AETERM"), Some("HEADACHE"));
    assert_eq!(first.get("AESTDTC"), Some("2008-09-05"));
    // Three days before the reference date, so study day is -3 (no day 0).
    assert_eq!(first.get("AESTDY"), Some("-3"));

    let second = &output.records[1];
    assert_eq!(second.get("AESEQ"), Some("2"));
    assert_eq!(second.get("AESEV"), Some("MODERATE"));
    assert_eq!(second.get("AEDECOD"), Some("Dermatitis"));
    assert_eq!(second.get("AESTDTC"), Some("2008-09-10"));
    // Partial end date degrades rather than erroring.
    assert_eq!(second.get("AEENDTC"), Some("2008-09"));
    assert_eq!(second.get("AESTDY"), Some("3"));

    let third = &output.records[2];
    assert_eq!(third.get("USUBJID"), Some("ABC123-002"));
    assert_eq!(third.get("AESEQ"), Some("1"));
    assert_eq!(third.get("AETERM"), Some("NAUSEA"));
    assert_eq!(third.get("AEENDTC"), Some(""));
}

#[test]
fn variables_keep_declaration_order() {
    let compiled = compile(ae_rules()).unwrap();
    let registry = codelists();
    let output = transform(&compiled, &ae_source(), Some(&registry)).unwrap();

    let names: Vec<&str> = output.records[0].variables().collect();
    assert_eq!(
        names,
        vec![
            "STUDYID", "DOMAIN", "USUBJID", "AESEQ", "AETERM", "AEDECOD", "AESEV", "AESTDTC",
            "AEENDTC", "RFSTDTC", "AESTDY",
        ]
    );
}

#[test]
fn duplicated_source_sequence_is_renumbered_in_date_order() {
    let rules = RuleSet::new(
        "AE",
        vec![
            rule("USUBJID", 1, "CONCAT('ABC123', '-', SUBJID)"),
            rule("AESTDTC", 2, "ISO8601DATEFORMAT(AESTDT, 'YYYYMMDD')"),
            rule("AESEQ", 3, "SEQUENCE(USUBJID, AESTDTC)"),
        ],
    )
    .unwrap();
    // Four rows for one subject, all carrying source sequence "1".
    let primary = table(
        "AE_RAW",
        &["SUBJID", "SRCSEQ", "AESTDT"],
        &[
            &["001", "1", "20080912"],
            &["001", "1", "20080910"],
            &["001", "1", "20080913"],
            &["001", "1", "20080911"],
        ],
    );
    let source = SourceSet::new(primary, "SUBJID").unwrap();

    let compiled = compile(rules).unwrap();
    let output = transform(&compiled, &source, None).unwrap();

    let pairs: Vec<(&str, &str)> = output
        .records
        .iter()
        .map(|r| (r.get("AESTDTC").unwrap(), r.get("AESEQ").unwrap()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("2008-09-10", "1"),
            ("2008-09-11", "2"),
            ("2008-09-12", "3"),
            ("2008-09-13", "4"),
        ]
    );
}

#[test]
fn vertical_grain_unpivots_and_flags_baseline() {
    let rules = RuleSet::new(
        "VS",
        vec![
            rule("USUBJID", 1, "CONCAT('ABC123', '-', SUBJID)"),
            rule("VSTESTCD", 2, "_TESTCD_"),
            rule("VSTEST", 3, "_TEST_"),
            rule("VSORRES", 4, "_ORRES_"),
            rule("VSDTC", 5, "ISO8601DATEFORMAT(VSDT, 'YYYYMMDD')"),
            rule("RFSTDTC", 6, "DM.RFSTDTC"),
            rule("VSSEQ", 7, "SEQUENCE(USUBJID, VSTESTCD, VSDTC)"),
            rule("VSBLFL", 8, "BASELINE_FLAG(VSTESTCD, VSDTC, VSORRES, RFSTDTC)"),
        ],
    )
    .unwrap()
    .with_grain(Grain::Vertical(vec![
        MeasureSpec {
            column: "SYSBP".to_string(),
            testcd: "SYSBP".to_string(),
            test: "Systolic Blood Pressure".to_string(),
        },
        MeasureSpec {
            column: "DIABP".to_string(),
            testcd: "DIABP".to_string(),
            test: "Diastolic Blood Pressure".to_string(),
        },
    ]));

    let primary = table(
        "VS_RAW",
        &["SUBJID", "VSDT", "SYSBP", "DIABP"],
        &[
            &["001", "20080901", "120", "80"],
            &["001", "20080907", "118", ""],
            &["001", "20080915", "125", "82"],
        ],
    );
    let dm = table("DM", &["SUBJID", "RFSTDTC"], &[&["001", "2008-09-08"]]);
    let mut source = SourceSet::new(primary, "SUBJID").unwrap();
    source.add_lookup(dm, DuplicateRule::First).unwrap();

    let compiled = compile(rules).unwrap();
    let output = transform(&compiled, &source, None).unwrap();

    // Five non-missing measurements across three rows.
    assert_eq!(output.records.len(), 5);

    // Baseline: last qualifying record at or before the reference date,
    // one winner per test code.
    let winners: Vec<(&str, &str)> = output
        .records
        .iter()
        .filter(|r| r.get("VSBLFL") == Some("Y"))
        .map(|r| (r.get("VSTESTCD").unwrap(), r.get("VSDTC").unwrap()))
        .collect();
    assert_eq!(winners, vec![("DIABP", "2008-09-01"), ("SYSBP", "2008-09-07")]);

    // Sequence numbers are dense across the subject's unpivoted records.
    let seqs: Vec<&str> = output
        .records
        .iter()
        .map(|r| r.get("VSSEQ").unwrap())
        .collect();
    assert_eq!(seqs, vec!["1", "2", "3", "4", "5"]);
}

#[test]
fn where_clause_gates_record_inclusion() {
    let rules = RuleSet::new(
        "AE",
        vec![
            rule("USUBJID", 1, "CONCAT('ABC123', '-', SUBJID)"),
            rule("AETERM", 2, "UPCASE(AETERM)"),
        ],
    )
    .unwrap()
    .with_where_clause("OCCURRED == 'Y'");

    let primary = table(
        "AE_RAW",
        &["SUBJID", "AETERM", "OCCURRED"],
        &[
            &["001", "Rash", "Y"],
            &["001", "Headache", "N"],
            &["002", "Nausea", "Y"],
        ],
    );
    let source = SourceSet::new(primary, "SUBJID").unwrap();

    let compiled = compile(rules).unwrap();
    let output = transform(&compiled, &source, None).unwrap();
    assert_eq!(output.records.len(), 2);
    assert!(output.records.iter().all(|r| r.get("AETERM") != Some("HEADACHE")));
}

#[test]
fn unknown_column_fails_before_producing_output() {
    let rules = RuleSet::new("AE", vec![rule("AETERM", 1, "UPCASE(NO_SUCH_COLUMN)")]).unwrap();
    let primary = table("AE_RAW", &["SUBJID", "AETERM"], &[&["001", "Rash"]]);
    let source = SourceSet::new(primary, "SUBJID").unwrap();

    let compiled = compile(rules).unwrap();
    let err = transform(&compiled, &source, None).unwrap_err();
    assert!(matches!(err, MapperError::SchemaViolation { .. }));
}

#[test]
fn unknown_table_fails_before_producing_output() {
    let rules = RuleSet::new("AE", vec![rule("AEDECOD", 1, "MEDDRA.PT")]).unwrap();
    let primary = table("AE_RAW", &["SUBJID"], &[&["001"]]);
    let source = SourceSet::new(primary, "SUBJID").unwrap();

    let compiled = compile(rules).unwrap();
    let err = transform(&compiled, &source, None).unwrap_err();
    assert!(matches!(err, MapperError::UnknownTable { .. }));
}

#[test]
fn derivation_must_reference_target_variables() {
    let rules = RuleSet::new(
        "AE",
        vec![
            rule("USUBJID", 1, "CONCAT('ABC123', '-', SUBJID)"),
            rule("AESEQ", 2, "SEQUENCE(USUBJID, AESTDTC)"),
        ],
    )
    .unwrap();
    let primary = table("AE_RAW", &["SUBJID"], &[&["001"]]);
    let source = SourceSet::new(primary, "SUBJID").unwrap();

    let compiled = compile(rules).unwrap();
    let err = transform(&compiled, &source, None).unwrap_err();
    assert!(matches!(
        err,
        MapperError::UnknownDerivationTarget { ref referenced, .. } if referenced == "AESTDTC"
    ));
}

#[test]
fn derived_refs_must_be_declared() {
    // USUBJID is a target variable but not a source column; reading it
    // from another rule requires the explicit opt-in.
    let rules = vec![
        rule("USUBJID", 1, "CONCAT('ABC123', '-', SUBJID)"),
        rule("SUBJLEN", 2, "SUBSTR(USUBJID, 1, 6)"),
    ];
    let primary = table("AE_RAW", &["SUBJID"], &[&["001"]]);

    let strict = compile(RuleSet::new("AE", rules.clone()).unwrap()).unwrap();
    let source = SourceSet::new(primary.clone(), "SUBJID").unwrap();
    assert!(matches!(
        transform(&strict, &source, None).unwrap_err(),
        MapperError::SchemaViolation { .. }
    ));

    let relaxed = compile(RuleSet::new("AE", rules).unwrap().with_derived_refs()).unwrap();
    let source = SourceSet::new(primary, "SUBJID").unwrap();
    let output = transform(&relaxed, &source, None).unwrap();
    assert_eq!(output.records[0].get("SUBJLEN"), Some("ABC123"));
}
