// ⚙️ Pipeline Configuration - explicit, immutable, passed into every entry point
// Defaults reproduce the original deployment layout under data/.

use crate::error::{PipelineError, Result};
use crate::record::{format_date, FIELDS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: DataPaths,
    pub rules: ValidationRules,

    /// SQLite database receiving the projections (None = export only)
    pub database: Option<PathBuf>,
}

/// Directories for source, rejected, validated and log artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub raw_data: PathBuf,
    pub removed_data: PathBuf,
    pub final_data: PathBuf,
    pub logs: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub allowed_currencies: BTreeSet<String>,

    /// chrono format string for transactionDate
    pub date_format: String,

    /// Canonical field names in canonical order
    pub required_fields: Vec<String>,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            raw_data: PathBuf::from("data/raw_data"),
            removed_data: PathBuf::from("data/removed_data"),
            final_data: PathBuf::from("data/final_data"),
            logs: PathBuf::from("data/logs"),
        }
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        ValidationRules {
            allowed_currencies: ["GBP", "USD", "EUR"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            date_format: "%Y-%m-%d".to_string(),
            required_fields: FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
                Self::from_toml(&text)?
            }
            None => PipelineConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Root all four artifact directories under `root`
    pub fn rooted_at(root: &Path) -> Self {
        PipelineConfig {
            paths: DataPaths {
                raw_data: root.join("raw_data"),
                removed_data: root.join("removed_data"),
                final_data: root.join("final_data"),
                logs: root.join("logs"),
            },
            ..PipelineConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rules.validate()
    }
}

impl ValidationRules {
    pub fn validate(&self) -> Result<()> {
        if self.allowed_currencies.is_empty() {
            return Err(PipelineError::Config(
                "allowed_currencies must not be empty".to_string(),
            ));
        }

        if self.date_format.trim().is_empty() {
            return Err(PipelineError::Config("date_format must not be empty".to_string()));
        }

        // Validated dates are written back out with the same format
        if format_date(NaiveDate::default(), &self.date_format).is_none() {
            return Err(PipelineError::Config(format!(
                "date_format `{}` must format a calendar date (no time or offset fields)",
                self.date_format
            )));
        }

        // Required fields may be reordered or re-cased, never added or dropped
        let known: HashSet<String> = FIELDS.iter().map(|f| f.to_lowercase()).collect();
        let mut seen = HashSet::new();

        for field in &self.required_fields {
            let folded = field.to_lowercase();
            if !known.contains(&folded) {
                return Err(PipelineError::Config(format!(
                    "unknown required field `{}`",
                    field
                )));
            }
            if !seen.insert(folded) {
                return Err(PipelineError::Config(format!(
                    "required field `{}` listed twice",
                    field
                )));
            }
        }

        if seen.len() != known.len() {
            return Err(PipelineError::Config(format!(
                "required_fields must list all {} record fields",
                known.len()
            )));
        }

        Ok(())
    }

    pub fn is_allowed_currency(&self, currency: &str) -> bool {
        self.allowed_currencies.contains(currency)
    }
}

// ============================================================================
// TESTS
// ============================================================================
