//! Single-winner baseline selection.
//!
//! Within each (subject, test code) partition, the chronologically last
//! record with a non-missing result dated at or before its cutoff receives
//! "Y". Every other record receives no value, never "N". A partition with
//! no qualifying record simply has no flag, which is a valid terminal
//! state, not a defect.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sdtm_expr::complete_date;
use sdtm_rules::Record;

pub struct BaselineVars<'a> {
    pub subject: &'a str,
    pub testcd: &'a str,
    pub date: &'a str,
    pub result: &'a str,
    pub cutoff: &'a str,
}

/// Assign the baseline flag into `target` across the whole record set.
pub fn assign(records: &mut [Record], vars: &BaselineVars<'_>, target: &str) {
    let mut partitions: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let subject = record.get(vars.subject).unwrap_or_default().to_string();
        let testcd = record.get(vars.testcd).unwrap_or_default().to_string();
        partitions.entry((subject, testcd)).or_default().push(index);
    }

    // Every record carries the variable, populated only for winners.
    for record in records.iter_mut() {
        record.set(target, "");
    }

    for indexes in partitions.values() {
        let mut winner: Option<(NaiveDate, usize)> = None;
        for &index in indexes {
            let record = &records[index];
            if record.populated(vars.result).is_none() {
                continue;
            }
            let Some(date) = record.get(vars.date).and_then(complete_date) else {
                continue;
            };
            let Some(cutoff) = record.get(vars.cutoff).and_then(complete_date) else {
                continue;
            };
            if date > cutoff {
                continue;
            }
            // Later date wins; equal dates fall to the later record.
            let better = match winner {
                None => true,
                Some((best, _)) => date >= best,
            };
            if better {
                winner = Some((date, index));
            }
        }
        if let Some((_, index)) = winner {
            records[index].set(target, "Y");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, testcd: &str, date: &str, result: &str, cutoff: &str) -> Record {
        let mut r = Record::new();
        r.set("USUBJID", subject);
        r.set("VSTESTCD", testcd);
        r.set("VSDTC", date);
        r.set("VSORRES", result);
        r.set("RFSTDTC", cutoff);
        r
    }

    fn vars() -> BaselineVars<'static> {
        BaselineVars {
            subject: "USUBJID",
            testcd: "VSTESTCD",
            date: "VSDTC",
            result: "VSORRES",
            cutoff: "RFSTDTC",
        }
    }

    fn flags(records: &[Record]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.get("VSBLFL").unwrap_or_default())
            .collect()
    }

    #[test]
    fn last_qualifying_record_wins() {
        let mut records = vec![
            record("A", "SYSBP", "2024-01-10", "118", "2024-01-15"),
            record("A", "SYSBP", "2024-01-14", "121", "2024-01-15"),
            record("A", "SYSBP", "2024-01-20", "125", "2024-01-15"),
        ];
        assign(&mut records, &vars(), "VSBLFL");
        assert_eq!(flags(&records), vec!["", "Y", ""]);
    }

    #[test]
    fn missing_results_never_qualify() {
        let mut records = vec![
            record("A", "SYSBP", "2024-01-14", "", "2024-01-15"),
            record("A", "SYSBP", "2024-01-10", "118", "2024-01-15"),
        ];
        assign(&mut records, &vars(), "VSBLFL");
        assert_eq!(flags(&records), vec!["", "Y"]);
    }

    #[test]
    fn partition_without_qualifier_gets_no_flag() {
        let mut records = vec![
            record("A", "SYSBP", "2024-01-20", "125", "2024-01-15"),
            record("A", "DIABP", "2024-01-10", "80", "2024-01-15"),
        ];
        assign(&mut records, &vars(), "VSBLFL");
        // SYSBP is after cutoff: no flag anywhere in that partition.
        assert_eq!(flags(&records), vec!["", "Y"]);
    }

    #[test]
    fn at_most_one_winner_per_partition() {
        let mut records = vec![
            record("A", "SYSBP", "2024-01-14", "118", "2024-01-15"),
            record("A", "SYSBP", "2024-01-14", "121", "2024-01-15"),
            record("B", "SYSBP", "2024-01-14", "130", "2024-01-15"),
        ];
        assign(&mut records, &vars(), "VSBLFL");
        // Equal dates: the later record takes the flag.
        assert_eq!(flags(&records), vec!["", "Y", "Y"]);
        let y_count = records
            .iter()
            .filter(|r| r.get("VSBLFL") == Some("Y"))
            .count();
        assert_eq!(y_count, 2); // one per (subject, test) partition
    }

    #[test]
    fn partial_dates_never_qualify() {
        let mut records = vec![
            record("A", "SYSBP", "2024-01", "118", "2024-01-15"),
            record("A", "SYSBP", "2024-01-10", "120", "2024-01-15"),
        ];
        assign(&mut records, &vars(), "VSBLFL");
        assert_eq!(flags(&records), vec!["", "Y"]);
    }
}
