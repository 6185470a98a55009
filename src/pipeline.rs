// 🔄 Pipeline Orchestrator - one batch, strictly sequential stages
//
// Loaded → Normalized → CurrencyFiltered → DateFiltered → Deduplicated
//        → TypeCoerced → Exported                      (or Abandoned)
//
// The orchestrator owns the working batch. Each validator consumes it and hands
// back two partitions; rejects accumulate here and are written once at the end.

use crate::coercion::coerce_types;
use crate::config::PipelineConfig;
use crate::data_quality::{validate_currency, validate_transaction_date};
use crate::deduplication::resolve_duplicates;
use crate::discovery::BatchFile;
use crate::error::Result;
use crate::export::{self, ExportPaths};
use crate::parser::RawBatch;
use crate::projection;
use crate::record::{RejectedRecord, ValidatedRecord};
use crate::run_log::RunLog;
use crate::schema::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// STATE MACHINE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Loaded,
    Normalized,
    CurrencyFiltered,
    DateFiltered,
    Deduplicated,
    TypeCoerced,
    Exported,
    Abandoned,
}

impl PipelineStage {
    pub fn name(&self) -> &str {
        match self {
            PipelineStage::Loaded => "Loaded",
            PipelineStage::Normalized => "Normalized",
            PipelineStage::CurrencyFiltered => "CurrencyFiltered",
            PipelineStage::DateFiltered => "DateFiltered",
            PipelineStage::Deduplicated => "Deduplicated",
            PipelineStage::TypeCoerced => "TypeCoerced",
            PipelineStage::Exported => "Exported",
            PipelineStage::Abandoned => "Abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Exported | PipelineStage::Abandoned)
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Validated and rejected sets of one batch, before anything is written
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub validated: Vec<ValidatedRecord>,
    /// Currency rejects, then date rejects, then duplicate rejects
    pub rejected: Vec<RejectedRecord>,
    pub summary: StageCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub input_rows: usize,
    pub currency_rejected: usize,
    pub date_rejected: usize,
    pub duplicate_rejected: usize,
    pub validated: usize,
}

impl StageCounts {
    pub fn rejected(&self) -> usize {
        self.currency_rejected + self.date_rejected + self.duplicate_rejected
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows in, {} validated, {} rejected ({} currency, {} date, {} duplicate)",
            self.input_rows,
            self.validated,
            self.rejected(),
            self.currency_rejected,
            self.date_rejected,
            self.duplicate_rejected
        )
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch: BatchFile,
    pub outcome: ValidationOutcome,
    pub paths: ExportPaths,
    pub validated_digest: String,
    pub rejected_digest: String,
    pub processed_at: DateTime<Utc>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    stage: PipelineStage,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Pipeline {
            config,
            stage: PipelineStage::Loaded,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!(from = self.stage.name(), to = next.name(), "pipeline stage");
        self.stage = next;
    }

    /// Run every validation stage on a loaded batch. Nothing is written.
    ///
    /// Normalization failures leave the pipeline `Abandoned` and are logged
    /// before being returned.
    pub fn validate(
        &mut self,
        batch: &RawBatch,
        file_name: &str,
        log: &mut RunLog,
    ) -> Result<ValidationOutcome> {
        let config = self.config;
        let rules = &config.rules;

        let records = match normalize(batch, &rules.required_fields, log) {
            Ok(records) => records,
            Err(e) => {
                self.advance(PipelineStage::Abandoned);
                log.error(&e.to_string());
                return Err(e);
            }
        };
        let mut summary = StageCounts {
            input_rows: records.len(),
            ..Default::default()
        };
        self.advance(PipelineStage::Normalized);

        let mut rejected = Vec::new();

        let partition = validate_currency(records, rules, file_name, log);
        summary.currency_rejected = partition.rejected.len();
        rejected.extend(partition.rejected);
        self.advance(PipelineStage::CurrencyFiltered);

        let partition = validate_transaction_date(partition.valid, &rules.date_format, file_name, log);
        summary.date_rejected = partition.rejected.len();
        rejected.extend(partition.rejected);
        self.advance(PipelineStage::DateFiltered);

        let partition = resolve_duplicates(partition.valid, file_name, log);
        summary.duplicate_rejected = partition.rejected.len();
        rejected.extend(partition.rejected);
        self.advance(PipelineStage::Deduplicated);

        let validated = match coerce_types(partition.valid, &rules.date_format) {
            Ok(validated) => validated,
            Err(e) => {
                log.error(&e.to_string());
                return Err(e);
            }
        };
        summary.validated = validated.len();
        self.advance(PipelineStage::TypeCoerced);

        Ok(ValidationOutcome {
            validated,
            rejected,
            summary,
        })
    }

    /// Write the four artifacts of a validated batch
    pub fn export(
        &mut self,
        outcome: &ValidationOutcome,
        paths: &ExportPaths,
        processed_at: DateTime<Utc>,
    ) -> Result<(String, String)> {
        let config = self.config;
        let rules = &config.rules;

        // Render everything first so a serialization fault writes nothing
        let validated = export::validated_csv(&outcome.validated, &rules.required_fields, &rules.date_format)?;
        let rejected = export::rejected_csv(&outcome.rejected, &rules.required_fields)?;
        let customers = export::customers_csv(&projection::customers(&outcome.validated, processed_at))?;
        let transactions =
            export::transactions_csv(&projection::transactions(&outcome.validated, processed_at))?;

        export::write_artifacts(&[
            (paths.validated.as_path(), validated.as_slice()),
            (paths.rejected.as_path(), rejected.as_slice()),
            (paths.customers.as_path(), customers.as_slice()),
            (paths.transactions.as_path(), transactions.as_slice()),
        ])?;
        self.advance(PipelineStage::Exported);

        Ok((export::digest(&validated), export::digest(&rejected)))
    }
}

/// Log file of a batch: `<logs>/log_<stem>.log`
pub fn log_path(config: &PipelineConfig, batch: &BatchFile) -> std::path::PathBuf {
    config.paths.logs.join(format!("log_{}.log", batch.stem()))
}

/// Read, validate and export one batch file.
///
/// The run log is truncated at the start and flushed on every exit path.
pub fn run_batch(config: &PipelineConfig, batch: &BatchFile) -> Result<BatchReport> {
    config.validate()?;

    let mut log = RunLog::create(&log_path(config, batch))?;
    log.record(&format!("Processing batch {}", batch.file_name));
    info!(file = %batch.file_name, run_id = log.run_id(), "starting batch");

    let raw = match RawBatch::read(&batch.path) {
        Ok(raw) => raw,
        Err(e) => {
            log.error(&e.to_string());
            return Err(e);
        }
    };

    let mut pipeline = Pipeline::new(config);
    let outcome = pipeline.validate(&raw, &batch.file_name, &mut log)?;

    let processed_at = Utc::now();
    let paths = ExportPaths::for_batch(&config.paths.final_data, &config.paths.removed_data, batch.stem());
    let (validated_digest, rejected_digest) = match pipeline.export(&outcome, &paths, processed_at) {
        Ok(digests) => digests,
        Err(e) => {
            log.error(&e.to_string());
            return Err(e);
        }
    };

    log.record(&outcome.summary.summary());
    log.record(&format!("Validated export sha256: {}", validated_digest));
    log.record(&format!("Rejected export sha256: {}", rejected_digest));
    if let Some(path) = log.path() {
        debug!(log = %path.display(), "run log complete");
    }
    log.finish()?;

    info!(
        file = %batch.file_name,
        validated = outcome.summary.validated,
        rejected = outcome.summary.rejected(),
        "batch exported"
    );

    Ok(BatchReport {
        batch: batch.clone(),
        outcome,
        paths,
        validated_digest,
        rejected_digest,
        processed_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
