// ✅ Data Quality Checks - currency and date-format validators
// Each check takes the batch by value and splits it into two disjoint
// partitions. Rows are never mutated; rejects carry a reason and the file name.

use crate::config::ValidationRules;
use crate::record::{ErrorType, Record, RejectedRecord};
use crate::run_log::RunLog;
use chrono::NaiveDate;
use std::collections::HashMap;

// ============================================================================
// PARTITION
// ============================================================================

/// Output of one validator: rows that continue, rows that are quarantined
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub valid: Vec<Record>,
    pub rejected: Vec<RejectedRecord>,
}

// ============================================================================
// CURRENCY VALIDATOR
// ============================================================================

/// Keep rows whose currency is allowed by `rules`, reject the rest.
/// Logs one line per distinct invalid currency, in order of first appearance.
pub fn validate_currency(
    records: Vec<Record>,
    rules: &ValidationRules,
    file_name: &str,
    log: &mut RunLog,
) -> Partition {
    let mut partition = Partition::default();
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        if rules.is_allowed_currency(&record.currency) {
            partition.valid.push(record);
            continue;
        }

        match positions.get(&record.currency) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(record.currency.clone(), counts.len());
                counts.push((record.currency.clone(), 1));
            }
        }

        let error_type = ErrorType::IncorrectCurrency(record.currency.clone());
        partition.rejected.push(record.reject(error_type, file_name));
    }

    for (currency, count) in &counts {
        log.record(&format!("Found {} rows with currency: {}.", count, currency));
    }

    partition
}

// ============================================================================
// DATE VALIDATOR
// ============================================================================

/// Strict parse under a single format; no fallbacks, no locale guessing
pub fn parse_transaction_date(value: &str, date_format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, date_format).ok()
}

/// Keep rows whose transactionDate parses under `date_format`
pub fn validate_transaction_date(
    records: Vec<Record>,
    date_format: &str,
    file_name: &str,
    log: &mut RunLog,
) -> Partition {
    let mut partition = Partition::default();

    for record in records {
        match parse_transaction_date(&record.transaction_date, date_format) {
            Some(_) => partition.valid.push(record),
            None => partition
                .rejected
                .push(record.reject(ErrorType::IncorrectDateFormat, file_name)),
        }
    }

    log.record(&format!(
        "Found {} incorrect date rows (removed).",
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

    fn create_record(transaction_id: &str, currency: &str, date: &str) -> Record {
        Record {
            customer_id: "C1".to_string(),
            customer_name: "Ada".to_string(),
            transaction_id: transaction_id.to_string(),
            transaction_date: date.to_string(),
            source_date: "2023-01-01T00:00:00".to_string(),
            merchant_id: "M1".to_string(),
            category_id: "K1".to_string(),
            currency: currency.to_string(),
            amount: "10.0".to_string(),
            description: "Test purchase".to_string(),
        }
    }

    fn rules() -> ValidationRules {
        ValidationRules::default()
    }

    #[test]
    fn test_currency_partition() {
        let records = vec![
            create_record("T1", "GBP", "2023-01-01"),
            create_record("T2", "JPY", "2023-01-01"),
            create_record("T3", "USD", "2023-01-01"),
            create_record("T4", "JPY", "2023-01-01"),
            create_record("T5", "usd", "2023-01-01"),
        ];
        let mut log = RunLog::in_memory();

        let partition = validate_currency(records, &rules(), "transactions_2023_01_05.json", &mut log);

        assert_eq!(partition.valid.len() + partition.rejected.len(), 5);
        assert_eq!(partition.valid.len(), 2);
        assert!(partition.valid.iter().all(|r| rules().is_allowed_currency(&r.currency)));
        assert!(partition
            .rejected
            .iter()
            .all(|r| !rules().is_allowed_currency(&r.record.currency)));
        assert_eq!(
            partition.rejected[0].error_type.tag(),
            "INCORRECT CURRENCY = JPY"
        );
        assert_eq!(partition.rejected[0].file_name, "transactions_2023_01_05.json");

        assert_eq!(
            log.entries(),
            &[
                "Found 2 rows with currency: JPY.".to_string(),
                "Found 1 rows with currency: usd.".to_string(),
            ]
        );
    }

    #[test]
    fn test_currency_all_valid_logs_nothing() {
        let records = vec![create_record("T1", "EUR", "2023-01-01")];
        let mut log = RunLog::in_memory();

        let partition = validate_currency(records, &rules(), "f.json", &mut log);

        assert_eq!(partition.valid.len(), 1);
        assert!(partition.rejected.is_empty());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_date_partition_is_strict() {
        let records = vec![
            create_record("T1", "GBP", "2023-01-05"),
            create_record("T2", "GBP", "31/02/2023"),
            create_record("T3", "GBP", "2023-02-30"),
            create_record("T4", "GBP", ""),
            create_record("T5", "GBP", "January 5, 2023"),
        ];
        let mut log = RunLog::in_memory();

        let partition = validate_transaction_date(records, "%Y-%m-%d", "f.json", &mut log);

        assert_eq!(partition.valid.len(), 1);
        assert_eq!(partition.valid[0].transaction_id, "T1");
        assert_eq!(partition.rejected.len(), 4);
        assert!(partition
            .rejected
            .iter()
            .all(|r| r.error_type == ErrorType::IncorrectDateFormat));
        assert!(partition
            .rejected
            .iter()
            .all(|r| parse_transaction_date(&r.record.transaction_date, "%Y-%m-%d").is_none()));
        assert_eq!(log.entries(), &["Found 4 incorrect date rows (removed).".to_string()]);
    }

    #[test]
    fn test_date_format_is_configurable() {
        assert!(parse_transaction_date("05/01/2023", "%d/%m/%Y").is_some());
        assert!(parse_transaction_date("2023-01-05", "%d/%m/%Y").is_none());
    }
}
