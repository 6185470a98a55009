// 💾 Exports - CSV artifacts for one batch
// Validated and rejected exports carry no run timestamps, so the same input
// always produces byte-identical files.

use crate::error::{PipelineError, Result};
use crate::projection::{CustomerRow, TransactionRow};
use crate::record::{RejectedRecord, ValidatedRecord};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Where each artifact of a batch lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub validated: PathBuf,
    pub rejected: PathBuf,
    pub customers: PathBuf,
    pub transactions: PathBuf,
}

impl ExportPaths {
    pub fn for_batch(final_dir: &Path, removed_dir: &Path, stem: &str) -> Self {
        ExportPaths {
            validated: final_dir.join(format!("validated_{}.csv", stem)),
            rejected: removed_dir.join(format!("removed_rows_{}.csv", stem)),
            customers: final_dir.join(format!("customers_only_{}.csv", stem)),
            transactions: final_dir.join(format!("transactions_only_{}.csv", stem)),
        }
    }
}

/// Validated set: canonical columns, typed fields rendered with `date_format`
pub fn validated_csv(
    records: &[ValidatedRecord],
    fields: &[String],
    date_format: &str,
) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields)?;

    for record in records {
        let row = fields
            .iter()
            .map(|f| record.render(f, date_format))
            .collect::<Result<Vec<String>>>()?;
        writer.write_record(&row)?;
    }

    into_bytes(writer)
}

/// Rejected set: canonical columns as read, plus ErrorType and FileName
pub fn rejected_csv(records: &[RejectedRecord], fields: &[String]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header: Vec<&str> = fields.iter().map(String::as_str).collect();
    header.extend(["ErrorType", "FileName"]);
    writer.write_record(&header)?;

    for rejected in records {
        let mut row: Vec<String> = fields
            .iter()
            .map(|f| rejected.record.get(f).unwrap_or_default().to_string())
            .collect();
        row.push(rejected.error_type.tag());
        row.push(rejected.file_name.clone());
        writer.write_record(&row)?;
    }

    into_bytes(writer)
}

pub fn customers_csv(rows: &[CustomerRow]) -> Result<Vec<u8>> {
    serialize_rows(rows, &["customerId", "customerName", "createdOn"])
}

pub fn transactions_csv(rows: &[TransactionRow]) -> Result<Vec<u8>> {
    serialize_rows(
        rows,
        &[
            "customerId",
            "transactionId",
            "transactionDate",
            "currency",
            "amount",
            "createdOn",
        ],
    )
}

// Header written explicitly so an empty projection still has its columns
fn serialize_rows<T: Serialize>(rows: &[T], header: &[&str]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;

    for row in rows {
        writer.serialize(row)?;
    }

    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| PipelineError::Csv(csv::Error::from(e.into_error())))
}

/// Write every artifact of a batch or none of them.
///
/// Each file is first staged beside its target as `<name>.partial`. Targets are
/// only replaced once all of them are staged; a staging failure removes what
/// was staged and leaves the previous exports untouched. The final renames are
/// atomic per file, not as a group.
pub fn write_artifacts(artifacts: &[(&Path, &[u8])]) -> Result<()> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(artifacts.len());

    for (path, bytes) in artifacts {
        let partial = partial_path(path);
        if let Err(e) = write_artifact(&partial, bytes) {
            discard(&staged);
            return Err(e);
        }
        staged.push((partial, *path));
    }

    for (partial, path) in &staged {
        fs::rename(partial, path).map_err(|e| PipelineError::io(*path, e))?;
    }

    Ok(())
}

/// Write one artifact, creating its directory
fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| PipelineError::io(path, e))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (partial, _) in staged {
        if let Err(e) = fs::remove_file(partial) {
            tracing::warn!(path = %partial.display(), error = %e, "failed to remove staged export");
        }
    }
}

/// SHA-256 of an artifact, hex encoded
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================
