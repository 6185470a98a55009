// 📂 Batch Discovery - pick the latest transactions_<year>_<month>_<day>.json

use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn batch_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^transactions_(\d{4})_(\d{1,2})_(\d{1,2})\.json$")
            .expect("batch file pattern is a valid regex")
    })
}

/// A source file whose name embeds its batch date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFile {
    pub path: PathBuf,
    pub file_name: String,
    pub batch_date: NaiveDate,
}

impl BatchFile {
    /// Parse a file name like `transactions_2023_01_05.json`
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let caps = batch_name_pattern().captures(file_name)?;

        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        let batch_date = NaiveDate::from_ymd_opt(year, month, day)?;

        Some(BatchFile {
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            batch_date,
        })
    }

    /// File name without extension; keys every artifact of the run
    pub fn stem(&self) -> &str {
        self.file_name
            .strip_suffix(".json")
            .unwrap_or(&self.file_name)
    }
}

/// Latest batch in `dir` by embedded date; non-matching files are ignored
pub fn latest_batch(dir: &Path) -> Result<BatchFile> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut latest: Option<BatchFile> = None;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let Some(candidate) = BatchFile::from_path(&entry.path()) else {
            tracing::debug!(path = %entry.path().display(), "skipping non-batch file");
            continue;
        };

        // Same date written two ways (01 vs 1): the lexically larger name wins
        let newer = match &latest {
            None => true,
            Some(current) => {
                (candidate.batch_date, &candidate.file_name) > (current.batch_date, &current.file_name)
            }
        };
        if newer {
            latest = Some(candidate);
        }
    }

    latest.ok_or_else(|| PipelineError::NoBatchFound(dir.to_path_buf()))
}

// ============================================================================
// TESTS
// ============================================================================
