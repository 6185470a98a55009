// 🔍 Duplicate Resolver - one record per transactionId
// Last-writer-wins keyed on sourceDate: within each transactionId group the
// record with the latest sourceDate survives, the rest are quarantined.

use crate::data_quality::Partition;
use crate::record::{ErrorType, Record};
use crate::run_log::RunLog;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

/// Timestamp shapes accepted for sourceDate
const SOURCE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse sourceDate as a timestamp; offsets are normalized to UTC
pub fn parse_source_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for format in SOURCE_DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Ascending order with unparseable timestamps after every parsed one
fn compare_source_dates(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Resolve duplicate transactionIds.
///
/// Stable ascending sort by `(transactionId, sourceDate)`; the last row of each
/// group is kept. Survivors come out in that sorted order, rejects in input order.
pub fn resolve_duplicates(records: Vec<Record>, file_name: &str, log: &mut RunLog) -> Partition {
    let keys: Vec<Option<NaiveDateTime>> = records
        .iter()
        .map(|r| parse_source_date(&r.source_date))
        .collect();

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        records[a]
            .transaction_id
            .cmp(&records[b].transaction_id)
            .then_with(|| compare_source_dates(&keys[a], &keys[b]))
    });

    let mut survivors = Vec::new();
    for (pos, &i) in order.iter().enumerate() {
        let last_of_group = order
            .get(pos + 1)
            .map_or(true, |&next| records[next].transaction_id != records[i].transaction_id);
        if last_of_group {
            survivors.push(i);
        }
    }

    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
    let mut partition = Partition::default();

    for i in survivors {
        if let Some(record) = slots[i].take() {
            partition.valid.push(record);
        }
    }

    for record in slots.into_iter().flatten() {
        partition
            .rejected
            .push(record.reject(ErrorType::Duplicate, file_name));
    }

    log.record(&format!(
        "Found {} duplicate rows (removed).",
        partition.rejected.len()
    ));

    partition
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_record(transaction_id: &str, source_date: &str, description: &str) -> Record {
        Record {
            customer_id: "C1".to_string(),
            customer_name: "Ada".to_string(),
            transaction_id: transaction_id.to_string(),
            transaction_date: "2023-01-01".to_string(),
            source_date: source_date.to_string(),
            merchant_id: "M1".to_string(),
            category_id: "K1".to_string(),
            currency: "GBP".to_string(),
            amount: "10.0".to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_later_source_date_wins() {
        let records = vec![
            create_record("T100", "2023-01-05", "amended"),
            create_record("T100", "2023-01-01", "original"),
        ];
        let mut log = RunLog::in_memory();

        let partition = resolve_duplicates(records, "f.json", &mut log);

        assert_eq!(partition.valid.len(), 1);
        assert_eq!(partition.valid[0].description, "amended");
        assert_eq!(partition.rejected.len(), 1);
        assert_eq!(partition.rejected[0].record.description, "original");
        assert_eq!(partition.rejected[0].error_type, ErrorType::Duplicate);
        assert_eq!(log.entries(), &["Found 1 duplicate rows (removed).".to_string()]);
    }

    #[test]
    fn test_tie_keeps_last_in_input_order() {
        let records = vec![
            create_record("T1", "2023-01-01T10:00:00", "first"),
            create_record("T1", "2023-01-01T10:00:00", "second"),
            create_record("T1", "2023-01-01T10:00:00", "third"),
        ];

        let partition = resolve_duplicates(records, "f.json", &mut RunLog::in_memory());

        assert_eq!(partition.valid.len(), 1);
        assert_eq!(partition.valid[0].description, "third");
        let rejected: Vec<&str> = partition
            .rejected
            .iter()
            .map(|r| r.record.description.as_str())
            .collect();
        assert_eq!(rejected, vec!["first", "second"]);
    }

    #[test]
    fn test_timestamps_compare_as_time_not_text() {
        // Textually "2023-01-01T09:00:00+00:00" > "2023-01-01T08:30:00-02:00", in time it is earlier
        let records = vec![
            create_record("T1", "2023-01-01T08:30:00-02:00", "later"),
            create_record("T1", "2023-01-01T09:00:00+00:00", "earlier"),
        ];

        let partition = resolve_duplicates(records, "f.json", &mut RunLog::in_memory());

        assert_eq!(partition.valid[0].description, "later");
    }

    #[test]
    fn test_unparseable_source_date_sorts_last() {
        let records = vec![
            create_record("T1", "not a date", "garbled"),
            create_record("T1", "2023-06-01", "dated"),
        ];

        let partition = resolve_duplicates(records, "f.json", &mut RunLog::in_memory());

        assert_eq!(partition.valid[0].description, "garbled");
        assert_eq!(partition.rejected[0].record.description, "dated");
    }

    #[test]
    fn test_singletons_pass_through_sorted_by_id() {
        let records = vec![
            create_record("T3", "2023-01-01", "c"),
            create_record("T1", "2023-01-01", "a"),
            create_record("T2", "2023-01-01", "b"),
        ];
        let mut log = RunLog::in_memory();

        let partition = resolve_duplicates(records, "f.json", &mut log);

        let ids: Vec<&str> = partition
            .valid
            .iter()
            .map(|r| r.transaction_id.as_str())
            .collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);
        assert!(partition.rejected.is_empty());
        assert_eq!(log.entries(), &["Found 0 duplicate rows (removed).".to_string()]);
    }

    #[test]
    fn test_parse_source_date_shapes() {
        assert!(parse_source_date("2023-01-05").is_some());
        assert!(parse_source_date("2023-01-05T10:11:12").is_some());
        assert!(parse_source_date("2023-01-05T10:11:12.250").is_some());
        assert!(parse_source_date("2023-01-05 10:11:12").is_some());
        assert!(parse_source_date("2023-01-05T10:11:12Z").is_some());
        assert!(parse_source_date("05/01/2023").is_none());
        assert!(parse_source_date("").is_none());
    }
}
