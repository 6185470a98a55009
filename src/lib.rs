// Transaction Batch Pipeline - Core Library
// Validates one JSON batch of transactions, quarantines bad rows with a reason,
// exports the clean set and its projections, and loads them into SQLite.

pub mod config;
pub mod error;
pub mod record;
pub mod run_log;
pub mod parser;       // Batch reader: JSON → raw batch
pub mod schema;       // Schema Normalizer
pub mod data_quality; // Currency + date validators
pub mod deduplication; // Duplicate resolver
pub mod coercion;     // Type coercion
pub mod projection;   // Customer / transaction views
pub mod export;       // CSV artifacts
pub mod pipeline;     // Orchestrator
pub mod discovery;    // Latest batch file
pub mod db;           // SQLite upsert

// Re-export commonly used types
pub use config::{DataPaths, PipelineConfig, ValidationRules};
pub use error::{PipelineError, SchemaMismatch};
pub use record::{ErrorType, Record, RejectedRecord, ValidatedRecord, FIELDS};
pub use run_log::RunLog;
pub use parser::RawBatch;
pub use schema::normalize;
pub use data_quality::{validate_currency, validate_transaction_date, Partition};
pub use deduplication::resolve_duplicates;
pub use coercion::coerce_types;
pub use projection::{CustomerRow, TransactionRow};
pub use export::ExportPaths;
pub use pipeline::{run_batch, BatchReport, Pipeline, PipelineStage, StageCounts, ValidationOutcome};
pub use discovery::{latest_batch, BatchFile};
pub use db::{load_projections, setup_database, upsert, KeyedRow, LoadSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
