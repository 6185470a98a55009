// ⚠️ Pipeline Errors - two failure tiers
// Fatal errors abandon the whole batch; row-level problems never reach here,
// they are quarantined as RejectedRecord instead.

use std::path::PathBuf;
use thiserror::Error;

/// Why the column set of a batch could not be normalized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("required column `{0}` is missing")]
    MissingColumn(String),

    #[error("columns `{first}` and `{second}` collide when case-folded")]
    AmbiguousColumn { first: String, second: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File is empty. Exiting.")]
    EmptyBatch,

    #[error("Columns do not match requirements ({0}). Exiting!")]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("type coercion failed for transaction `{transaction_id}`: {reason}")]
    Coercion {
        transaction_id: String,
        reason: String,
    },

    #[error("no file matching transactions_<year>_<month>_<day>.json in {}", .0.display())]
    NoBatchFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error decoding JSON file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Fatal normalization failures: the batch is discarded and nothing is written
    pub fn is_batch_abandoned(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyBatch | PipelineError::SchemaMismatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
