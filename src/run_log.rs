// 📝 Run Log - plain-text audit log for one batch run
// Truncated when the run starts, one timestamped line per event, flushed on drop
// so success, quarantine-only and abandoned runs all leave a complete file.

use crate::error::{PipelineError, Result};
use chrono::{SecondsFormat, Utc};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct RunLog {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    entries: Vec<String>,
    run_id: String,
}

impl RunLog {
    /// Create (or truncate) the log file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }

        let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
        let mut log = RunLog {
            writer: Some(BufWriter::new(file)),
            path: Some(path.to_path_buf()),
            entries: Vec::new(),
            run_id: uuid::Uuid::new_v4().to_string(),
        };

        let header = format!("Run {} started", log.run_id);
        log.record(&header);
        Ok(log)
    }

    /// Log that keeps entries in memory only
    pub fn in_memory() -> Self {
        RunLog {
            writer: None,
            path: None,
            entries: Vec::new(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Append one event. Multi-line text is split into one line per event.
    pub fn record(&mut self, text: &str) {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            tracing::info!(run_id = %self.run_id, "{}", line);

            if let Some(writer) = self.writer.as_mut() {
                if let Err(e) = writeln!(writer, "{} {}", stamp, line) {
                    tracing::warn!(error = %e, "failed to write run log line");
                }
            }

            self.entries.push(line.to_string());
        }
    }

    /// Log a fatal condition with the ERROR prefix the log readers grep for
    pub fn error(&mut self, text: &str) {
        tracing::error!(run_id = %self.run_id, "{}", text);
        self.record(&format!("ERROR: {}", text));
    }

    /// Lines recorded so far, without timestamps
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush and close, surfacing any I/O error
    pub fn finish(mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            let path = self.path.clone().unwrap_or_default();
            writer.flush().map_err(|e| PipelineError::io(path, e))?;
        }
        Ok(())
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                tracing::warn!(error = %e, "failed to flush run log");
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_splits_lines() {
        let mut log = RunLog::in_memory();
        log.record("Found 2 rows with currency: JPY.\nFound 1 rows with currency: AUD.\n");
        log.error("File is empty. Exiting.");

        assert_eq!(
            log.entries(),
            &[
                "Found 2 rows with currency: JPY.".to_string(),
                "Found 1 rows with currency: AUD.".to_string(),
                "ERROR: File is empty. Exiting.".to_string(),
            ]
        );
    }

    #[test]
    fn test_file_is_truncated_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("log_transactions_2023_01_05.log");

        let mut first = RunLog::create(&path).unwrap();
        first.record("first run");
        first.finish().unwrap();

        let mut second = RunLog::create(&path).unwrap();
        second.record("second run");
        drop(second);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("first run"));
        assert!(contents.contains("second run"));
        assert_eq!(contents.lines().count(), 2);
    }
}
