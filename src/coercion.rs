// 🔢 Type Coercion - typed transactionDate and amount on the final valid set
// Earlier stages guarantee dates parse, so a failure here is an internal fault.
// A blank amount (null or missing in the batch) is carried as None; amount text
// that is present but not a number aborts the batch.

use crate::data_quality::parse_transaction_date;
use crate::error::{PipelineError, Result};
use crate::record::{Record, ValidatedRecord};

pub fn coerce_types(records: Vec<Record>, date_format: &str) -> Result<Vec<ValidatedRecord>> {
    records
        .into_iter()
        .map(|record| coerce_record(record, date_format))
        .collect()
}

fn coerce_record(record: Record, date_format: &str) -> Result<ValidatedRecord> {
    let transaction_date = parse_transaction_date(&record.transaction_date, date_format)
        .ok_or_else(|| PipelineError::Coercion {
            transaction_id: record.transaction_id.clone(),
            reason: format!(
                "transactionDate `{}` does not match {}",
                record.transaction_date, date_format
            ),
        })?;

    let amount = match record.amount.trim() {
        "" => None,
        text => Some(parse_amount(text).ok_or_else(|| PipelineError::Coercion {
            transaction_id: record.transaction_id.clone(),
            reason: format!("amount `{}` is not a number", record.amount),
        })?),
    };

    Ok(ValidatedRecord {
        record,
        transaction_date,
        amount,
    })
}

/// Decimal text → f64; NaN and infinities are not amounts
pub fn parse_amount(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

// ============================================================================
// TESTS
// ============================================================================
