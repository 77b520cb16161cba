use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HISTORY_FILE: &str = ".slideshow-history.jsonl";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One solved dataset, as stored in the run history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub timestamp: String,
    pub dataset: String,
    /// blake3 digest of the dataset bytes.
    pub digest: String,
    pub solution: String,
    pub strategy: String,
    pub fallback: Option<String>,
    pub photos: usize,
    pub slides: usize,
    pub score: u64,
    pub elapsed_ms: u64,
}

impl RunRecord {
    pub fn stamped_now(mut self) -> Self {
        self.timestamp = Utc::now().to_rfc3339();
        self
    }
}

/// Append-only JSON-lines log of solved datasets.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(HISTORY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &RunRecord) -> Result<(), HistoryError> {
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(out, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// All readable records in file order. Malformed lines are skipped with a warning.
    pub fn load(&self) -> Result<Vec<RunRecord>, HistoryError> {
        let text = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) => warn!("Skipping malformed history entry {}: {}", i, err),
            }
        }
        Ok(records)
    }
}
