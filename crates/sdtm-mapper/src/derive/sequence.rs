//! Dense per-group sequence numbering.
//!
//! Records are partitioned by the group variable (typically the subject
//! key), ordered by the declared order variables, and numbered 1..N with
//! no gaps and no restarts. Source order is the tie-break: the sort is
//! stable, so records with equal order keys keep their input order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use sdtm_rules::Record;

use super::value_order;

/// Assign dense sequence numbers into `target`.
///
/// Must run only after every order-variable derivation is complete.
pub fn assign(records: &mut [Record], group_var: &str, order_vars: &[String], target: &str) {
    let mut partitions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let group = record.get(group_var).unwrap_or_default().to_string();
        partitions.entry(group).or_default().push(index);
    }

    for indexes in partitions.values_mut() {
        indexes.sort_by(|&a, &b| compare_records(&records[a], &records[b], order_vars));
        for (position, &index) in indexes.iter().enumerate() {
            records[index].set(target, (position + 1).to_string());
        }
    }
}

fn compare_records(a: &Record, b: &Record, order_vars: &[String]) -> Ordering {
    for var in order_vars {
        let left = a.get(var).unwrap_or_default();
        let right = b.get(var).unwrap_or_default();
        let ordering = value_order(left, right);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, date: &str) -> Record {
        let mut r = Record::new();
        r.set("USUBJID", subject);
        r.set("AESTDTC", date);
        r
    }

    #[test]
    fn numbering_is_dense_per_subject() {
        let mut records = vec![
            record("A", "2024-01-03"),
            record("B", "2024-01-01"),
            record("A", "2024-01-01"),
            record("A", "2024-01-02"),
        ];
        assign(&mut records, "USUBJID", &["AESTDTC".to_string()], "AESEQ");

        // A's records numbered 1..3 in date order, B restarts at 1.
        assert_eq!(records[0].get("AESEQ"), Some("3"));
        assert_eq!(records[1].get("AESEQ"), Some("1"));
        assert_eq!(records[2].get("AESEQ"), Some("1"));
        assert_eq!(records[3].get("AESEQ"), Some("2"));
    }

    #[test]
    fn equal_keys_keep_source_order() {
        let mut records = vec![
            record("A", "2024-01-01"),
            record("A", "2024-01-01"),
            record("A", "2024-01-01"),
        ];
        assign(&mut records, "USUBJID", &["AESTDTC".to_string()], "AESEQ");
        let values: Vec<_> = records.iter().map(|r| r.get("AESEQ").unwrap()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn numeric_order_keys_compare_numerically() {
        let mut records = vec![record("A", "10"), record("A", "9"), record("A", "100")];
        assign(&mut records, "USUBJID", &["AESTDTC".to_string()], "AESEQ");
        assert_eq!(records[0].get("AESEQ"), Some("2"));
        assert_eq!(records[1].get("AESEQ"), Some("1"));
        assert_eq!(records[2].get("AESEQ"), Some("3"));
    }
}
