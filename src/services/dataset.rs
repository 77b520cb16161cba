use crate::core::photo::{Orientation, PhotoSet};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Malformed dataset at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

impl DatasetError {
    fn malformed(line: usize, message: impl Into<String>) -> Self {
        DatasetError::Malformed {
            line,
            message: message.into(),
        }
    }
}

/// Reads the line-oriented photo format:
///
/// ```text
/// 4
/// H 3 cat beach sun
/// V 2 selfie smile
/// V 2 garden selfie
/// H 2 garden cat
/// ```
pub struct DatasetReader;

impl DatasetReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_path(&self, path: &Path) -> Result<PhotoSet, DatasetError> {
        let bytes = fs::read(path)?;
        self.parse_bytes(&bytes)
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<PhotoSet, DatasetError> {
        self.parse_str(std::str::from_utf8(bytes)?)
    }

    pub fn parse_str(&self, text: &str) -> Result<PhotoSet, DatasetError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

        let (_, header) = lines
            .next()
            .ok_or_else(|| DatasetError::malformed(1, "missing photo count"))?;
        let count: usize = header
            .parse()
            .map_err(|_| DatasetError::malformed(1, format!("invalid photo count '{}'", header)))?;

        let mut builder = PhotoSet::builder();
        for (line_no, line) in lines.by_ref().take(count) {
            let mut fields = line.split_whitespace();
            let orientation: Orientation = fields
                .next()
                .ok_or_else(|| DatasetError::malformed(line_no, "empty photo line"))?
                .parse()
                .map_err(|e| DatasetError::malformed(line_no, format!("{}", e)))?;
            let tag_count: usize = match fields.next() {
                Some(raw) => raw.parse().map_err(|_| {
                    DatasetError::malformed(line_no, format!("invalid tag count '{}'", raw))
                })?,
                None => return Err(DatasetError::malformed(line_no, "missing tag count")),
            };
            let tags: Vec<&str> = fields.collect();
            if tags.len() != tag_count {
                return Err(DatasetError::malformed(
                    line_no,
                    format!("declared {} tags, found {}", tag_count, tags.len()),
                ));
            }
            builder.push(orientation, tags);
        }

        if builder.len() < count {
            return Err(DatasetError::malformed(
                builder.len() + 2,
                format!("declared {} photos, found {}", count, builder.len()),
            ));
        }
        if let Some((line_no, _)) = lines.find(|(_, l)| !l.is_empty()) {
            return Err(DatasetError::malformed(
                line_no,
                format!("unexpected content after {} photos", count),
            ));
        }

        Ok(builder.build())
    }
}

impl Default for DatasetReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand inputs into dataset files: directories are walked recursively for
/// `*.txt`, anything else is kept as given. Inputs that cannot be read are
/// still returned so that loading them fails for that dataset alone.
/// The result is sorted and deduplicated.
pub fn discover_datasets(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            if !input.is_file() {
                warn!("Dataset '{}' not found", input.display());
            }
            found.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input) {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                        found.push(path.to_path_buf());
                    }
                }
                Err(err) => {
                    warn!("Could not walk '{}': {}", input.display(), err);
                    if let Some(path) = err.path() {
                        found.push(path.to_path_buf());
                    }
                }
            }
        }
    }
    found.sort();
    found.dedup();
    found
}
