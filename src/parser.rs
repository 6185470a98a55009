// 📥 Batch Reader - JSON document → raw tabular batch
// Reads the `transactions` array once, fully materialized. Column set is the
// union of keys across rows, like a dataframe built from a list of objects.

use crate::error::{PipelineError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Kind of JSON value seen in a column, used for the column description log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Number,
    Boolean,
    Null,
    Nested,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueKind::Text,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
            Value::Array(_) | Value::Object(_) => ValueKind::Nested,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ValueKind::Text => "Text or Alphanumeric",
            ValueKind::Number => "Number",
            ValueKind::Boolean => "Flag (true or false)",
            ValueKind::Null => "Null",
            ValueKind::Nested => "Nested",
        }
    }
}

/// One batch as read from disk, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    /// Union of keys, in order of first appearance
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
struct BatchDocument {
    #[serde(default)]
    transactions: Vec<Map<String, Value>>,
}

impl RawBatch {
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();

        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }

        RawBatch { columns, rows }
    }

    /// Parse a document of the form `{"transactions": [ {...}, ... ]}`
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        let document: BatchDocument = serde_json::from_str(text)?;
        Ok(Self::from_rows(document.transactions))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_json_str(&text).map_err(|source| PipelineError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Kind of the first non-null value in a column (Null if every value is null)
    pub fn column_kind(&self, column: &str) -> ValueKind {
        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(ValueKind::of)
            .find(|kind| *kind != ValueKind::Null)
            .unwrap_or(ValueKind::Null)
    }
}

/// Text form of a cell: strings verbatim, numbers as written, null/missing empty
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
