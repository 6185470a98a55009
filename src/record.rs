// 🧾 Record Model - one row per transaction in a batch
// Raw text until Type Coercion, typed afterwards.

use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Canonical field names, in canonical order
pub const FIELDS: [&str; 10] = [
    "customerId",
    "customerName",
    "transactionId",
    "transactionDate",
    "sourceDate",
    "merchantId",
    "categoryId",
    "currency",
    "amount",
    "description",
];

// ============================================================================
// REJECTION REASONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    /// Currency outside the allowed set (carries the offending value)
    IncorrectCurrency(String),
    IncorrectDateFormat,
    /// Superseded by a record with the same transactionId and later sourceDate
    Duplicate,
}

impl ErrorType {
    /// Reason tag as written to the rejected export
    pub fn tag(&self) -> String {
        match self {
            ErrorType::IncorrectCurrency(value) => format!("INCORRECT CURRENCY = {}", value),
            ErrorType::IncorrectDateFormat => "INCORRECT DATE FORMAT".to_string(),
            ErrorType::Duplicate => "DUPLICATE VALUE (Removed from final DataFrame)".to_string(),
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A transaction exactly as read from the batch, every field as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub customer_id: String,
    pub customer_name: String,
    pub transaction_id: String,
    pub transaction_date: String,
    pub source_date: String,
    pub merchant_id: String,
    pub category_id: String,
    pub currency: String,
    pub amount: String,
    pub description: String,
}

impl Record {
    /// Build a record by asking `lookup` for each canonical field
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        Record {
            customer_id: lookup("customerId"),
            customer_name: lookup("customerName"),
            transaction_id: lookup("transactionId"),
            transaction_date: lookup("transactionDate"),
            source_date: lookup("sourceDate"),
            merchant_id: lookup("merchantId"),
            category_id: lookup("categoryId"),
            currency: lookup("currency"),
            amount: lookup("amount"),
            description: lookup("description"),
        }
    }

    /// Field value by name, case-insensitive
    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match field.to_lowercase().as_str() {
            "customerid" => &self.customer_id,
            "customername" => &self.customer_name,
            "transactionid" => &self.transaction_id,
            "transactiondate" => &self.transaction_date,
            "sourcedate" => &self.source_date,
            "merchantid" => &self.merchant_id,
            "categoryid" => &self.category_id,
            "currency" => &self.currency,
            "amount" => &self.amount,
            "description" => &self.description,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Quarantine this record with a reason and its source file
    pub fn reject(self, error_type: ErrorType, file_name: &str) -> RejectedRecord {
        RejectedRecord {
            record: self,
            error_type,
            file_name: file_name.to_string(),
        }
    }
}

/// A record diverted out of the valid stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record: Record,
    pub error_type: ErrorType,
    pub file_name: String,
}

/// A record that survived every check, with typed date and amount
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    pub record: Record,
    pub transaction_date: NaiveDate,
    /// None when the batch carried no amount (null, missing or blank)
    pub amount: Option<f64>,
}

impl ValidatedRecord {
    /// Field rendered for export; typed fields use their coerced value
    pub fn render(&self, field: &str, date_format: &str) -> Result<String> {
        match field.to_lowercase().as_str() {
            "transactiondate" => format_date(self.transaction_date, date_format).ok_or_else(|| {
                PipelineError::Config(format!(
                    "date_format `{}` cannot render a calendar date",
                    date_format
                ))
            }),
            "amount" => Ok(self.amount.map(format_amount).unwrap_or_default()),
            _ => Ok(self.record.get(field).unwrap_or_default().to_string()),
        }
    }
}

/// Format a date with a chrono format string.
/// None when the format asks for fields a date does not have (hours, offsets)
/// or contains an unknown specifier.
pub fn format_date(date: NaiveDate, date_format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(date_format)).ok()?;
    Some(out)
}

/// Shortest round-trip text, always with a fractional part (`12.0`, `20.5`).
/// Same digits the csv serializer writes for the projections.
pub fn format_amount(amount: f64) -> String {
    format!("{:?}", amount)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_tags() {
        assert_eq!(
            ErrorType::IncorrectCurrency("JPY".to_string()).tag(),
            "INCORRECT CURRENCY = JPY"
        );
        assert_eq!(ErrorType::IncorrectDateFormat.tag(), "INCORRECT DATE FORMAT");
        assert_eq!(
            ErrorType::Duplicate.tag(),
            "DUPLICATE VALUE (Removed from final DataFrame)"
        );
    }

    #[test]
    fn test_from_lookup_covers_every_field() {
        let record = Record::from_lookup(|field| format!("v_{}", field));

        for field in FIELDS {
            assert_eq!(record.get(field), Some(format!("v_{}", field).as_str()));
        }
        assert_eq!(record.get("TRANSACTIONID"), Some("v_transactionId"));
        assert_eq!(record.get("unknown"), None);
    }

    #[test]
    fn test_validated_render() {
        let record = Record {
            transaction_id: "T1".to_string(),
            transaction_date: "2023-01-05".to_string(),
            amount: "12.50".to_string(),
            ..Default::default()
        };
        let validated = ValidatedRecord {
            record,
            transaction_date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            amount: Some(12.5),
        };

        assert_eq!(validated.render("transactionDate", "%d/%m/%Y").unwrap(), "05/01/2023");
        assert_eq!(validated.render("amount", "%Y-%m-%d").unwrap(), "12.5");
        assert_eq!(validated.render("transactionId", "%Y-%m-%d").unwrap(), "T1");

        let blank = ValidatedRecord {
            amount: None,
            ..validated
        };
        assert_eq!(blank.render("amount", "%Y-%m-%d").unwrap(), "");
    }

    #[test]
    fn test_time_fields_cannot_render_a_date() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let validated = ValidatedRecord {
            record: Record::default(),
            transaction_date: date,
            amount: Some(1.0),
        };

        assert_eq!(format_date(date, "%Y-%m-%d").as_deref(), Some("2023-01-01"));
        assert_eq!(format_date(date, "%Y-%m-%d %H:%M"), None);
        assert!(matches!(
            validated.render("transactionDate", "%Y-%m-%d %H:%M"),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_format_amount_keeps_fraction() {
        assert_eq!(format_amount(12.0), "12.0");
        assert_eq!(format_amount(20.5), "20.5");
        assert_eq!(format_amount(-45.99), "-45.99");
        assert_eq!(format_amount(0.0), "0.0");
    }
}
