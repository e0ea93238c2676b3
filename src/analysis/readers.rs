//! Safe readers for per-node log artifacts.
//!
//! Simulation runs routinely lose individual nodes, so an absent file must
//! degrade that node's contribution instead of aborting a batch over dozens
//! of nodes. `ReadOutcome` surfaces the missing-file case explicitly so each
//! call site chooses between degrading to empty and failing closed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};

/// Outcome of reading an artifact that may legitimately be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    Found(T),
    NotFound(PathBuf),
}

impl<T> ReadOutcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, ReadOutcome::Found(_))
    }

    pub fn into_found(self) -> Option<T> {
        match self {
            ReadOutcome::Found(value) => Some(value),
            ReadOutcome::NotFound(_) => None,
        }
    }
}

/// Read a text file into lines. Absence is not an error.
pub fn read_lines(path: &Path) -> Result<ReadOutcome<Vec<String>>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(ReadOutcome::Found(
            content.lines().map(str::to_string).collect(),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("Could not find file {}", path.display());
            Ok(ReadOutcome::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Read a CSV file into rows of field strings.
///
/// Embedded NUL bytes are stripped from the raw stream before tokenization.
/// The header row is dropped unless `keep_header` is set.
pub fn read_csv(path: &Path, keep_header: bool) -> Result<ReadOutcome<Vec<Vec<String>>>> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("Could not find file {}", path.display());
            return Ok(ReadOutcome::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let cleaned = raw.replace('\0', "");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(cleaned.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed CSV in {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    if !keep_header && !rows.is_empty() {
        rows.remove(0);
    }
    Ok(ReadOutcome::Found(rows))
}
