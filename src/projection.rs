// 🧮 Projections - customer and transaction views of the validated set
// Pure derivations: no filtering of their own, the processing timestamp is passed in.

use crate::record::ValidatedRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRow {
    pub customer_id: String,
    pub customer_name: String,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub customer_id: String,
    pub transaction_id: String,
    pub transaction_date: NaiveDate,
    pub currency: String,
    pub amount: Option<f64>,
    pub created_on: DateTime<Utc>,
}

/// Distinct (customerId, customerName) pairs, first appearance wins the position
pub fn customers(validated: &[ValidatedRecord], created_on: DateTime<Utc>) -> Vec<CustomerRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for v in validated {
        let pair = (v.record.customer_id.as_str(), v.record.customer_name.as_str());
        if seen.insert(pair) {
            rows.push(CustomerRow {
                customer_id: v.record.customer_id.clone(),
                customer_name: v.record.customer_name.clone(),
                created_on,
            });
        }
    }

    rows
}

/// One row per validated transaction
pub fn transactions(validated: &[ValidatedRecord], created_on: DateTime<Utc>) -> Vec<TransactionRow> {
    validated
        .iter()
        .map(|v| TransactionRow {
            customer_id: v.record.customer_id.clone(),
            transaction_id: v.record.transaction_id.clone(),
            transaction_date: v.transaction_date,
            currency: v.record.currency.clone(),
            amount: v.amount,
            created_on,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
