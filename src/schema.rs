// 📐 Shape Layer - Schema Normalization
// Confirms a raw batch has the required column set (case- and order-insensitive)
// and turns its rows into canonical Records. Any failure abandons the batch.

use crate::error::{PipelineError, Result, SchemaMismatch};
use crate::parser::{cell_text, RawBatch};
use crate::record::Record;
use crate::run_log::RunLog;
use std::collections::HashMap;

/// Normalize a raw batch against the canonical `required` field list
pub fn normalize(batch: &RawBatch, required: &[String], log: &mut RunLog) -> Result<Vec<Record>> {
    let rows = batch.row_count();
    let columns = batch.column_count();

    if rows == 0 {
        return Err(PipelineError::EmptyBatch);
    }

    if columns != required.len() {
        return Err(SchemaMismatch::ColumnCount {
            expected: required.len(),
            found: columns,
        }
        .into());
    }

    // Case-folded input name → name as written in the batch
    let mut by_folded: HashMap<String, &str> = HashMap::new();
    for column in &batch.columns {
        if let Some(first) = by_folded.insert(column.to_lowercase(), column.as_str()) {
            return Err(SchemaMismatch::AmbiguousColumn {
                first: first.to_string(),
                second: column.clone(),
            }
            .into());
        }
    }

    for field in required {
        if !by_folded.contains_key(&field.to_lowercase()) {
            return Err(SchemaMismatch::MissingColumn(field.clone()).into());
        }
    }

    log.record(&format!("Total number of rows in raw file: {}", rows));
    log.record(&format!("Total number of columns: {}", columns));
    for (n, column) in batch.columns.iter().enumerate() {
        log.record(&format!(
            "Column {}  -->\tName: {}, DataType : {}",
            n + 1,
            column,
            batch.column_kind(column).name()
        ));
    }

    let records = batch
        .rows
        .iter()
        .map(|row| {
            Record::from_lookup(|field| {
                let source = by_folded.get(&field.to_lowercase()).copied();
                cell_text(source.and_then(|name| row.get(name)))
            })
        })
        .collect();

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FIELDS;
    use serde_json::{json, Map, Value};

    fn required() -> Vec<String> {
        FIELDS.iter().map(|f| f.to_string()).collect()
    }

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn full_row(transaction_id: &str) -> Vec<(&'static str, Value)> {
        vec![
            ("customerId", json!("C1")),
            ("customerName", json!("Ada")),
            ("transactionId", json!(transaction_id)),
            ("transactionDate", json!("2023-01-05")),
            ("sourceDate", json!("2023-01-05T10:00:00")),
            ("merchantId", json!("M1")),
            ("categoryId", json!("K1")),
            ("currency", json!("GBP")),
            ("amount", json!(12.5)),
            ("description", json!("coffee")),
        ]
    }

    #[test]
    fn test_normalizes_mixed_case_columns() {
        let shouted: Vec<(&str, Value)> = full_row("T1")
            .into_iter()
            .map(|(k, v)| (if k == "currency" { "CURRENCY" } else { k }, v))
            .collect();
        let mut renamed = row(&shouted);
        let amount = renamed.remove("amount").unwrap();
        renamed.insert("Amount".to_string(), amount);

        let batch = RawBatch::from_rows(vec![renamed]);
        let mut log = RunLog::in_memory();
        let records = normalize(&batch, &required(), &mut log).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].currency, "GBP");
        assert_eq!(records[0].amount, "12.5");
        assert!(log
            .entries()
            .contains(&"Total number of rows in raw file: 1".to_string()));
    }

    #[test]
    fn test_empty_batch_is_fatal() {
        let mut log = RunLog::in_memory();
        let result = normalize(&RawBatch::default(), &required(), &mut log);

        assert!(matches!(result, Err(PipelineError::EmptyBatch)));
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_missing_column_fails_count_check() {
        let mut pairs = full_row("T1");
        pairs.retain(|(k, _)| *k != "description");
        let batch = RawBatch::from_rows(vec![row(&pairs)]);

        let result = normalize(&batch, &required(), &mut RunLog::in_memory());

        assert!(matches!(
            result,
            Err(PipelineError::SchemaMismatch(SchemaMismatch::ColumnCount {
                expected: 10,
                found: 9
            }))
        ));
    }

    #[test]
    fn test_misspelled_column_is_fatal() {
        let mut pairs = full_row("T1");
        pairs.retain(|(k, _)| *k != "description");
        pairs.push(("descripton", json!("typo")));
        let batch = RawBatch::from_rows(vec![row(&pairs)]);

        let result = normalize(&batch, &required(), &mut RunLog::in_memory());

        assert!(matches!(
            result,
            Err(PipelineError::SchemaMismatch(SchemaMismatch::MissingColumn(ref f))) if f == "description"
        ));
    }

    #[test]
    fn test_case_collision_is_fatal() {
        let mut pairs = full_row("T1");
        pairs.retain(|(k, _)| *k != "description");
        pairs.push(("Currency", json!("USD")));
        let batch = RawBatch::from_rows(vec![row(&pairs)]);

        let result = normalize(&batch, &required(), &mut RunLog::in_memory());

        assert!(matches!(
            result,
            Err(PipelineError::SchemaMismatch(SchemaMismatch::AmbiguousColumn { .. }))
        ));
    }

    #[test]
    fn test_missing_key_in_one_row_becomes_empty_text() {
        let mut sparse = full_row("T2");
        sparse.retain(|(k, _)| *k != "merchantId");
        let batch = RawBatch::from_rows(vec![row(&full_row("T1")), row(&sparse)]);

        let records = normalize(&batch, &required(), &mut RunLog::in_memory()).unwrap();

        assert_eq!(records[0].merchant_id, "M1");
        assert_eq!(records[1].merchant_id, "");
    }
}
