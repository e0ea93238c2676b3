//! Application log error scanning.
//!
//! Flags log lines containing configured error markers, suppressing known
//! benign matches via an ignore list. Both tests are case-insensitive
//! substring containment.

use std::path::Path;

use color_eyre::eyre::Result;

use super::readers::{read_lines, ReadOutcome};
use super::types::LogFinding;
use crate::config::LogCheckConfig;

/// Application log file name within a node directory.
pub const APP_LOG_FILE: &str = "java.log";

/// Trailing context lines captured per finding.
const CONTEXT_LINES: usize = 10;

/// Whether a line matches an error marker and no ignore marker.
pub fn is_error_line(line: &str, config: &LogCheckConfig) -> bool {
    let lower = line.to_lowercase();
    let matches_error = config
        .error_markers
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()));
    if !matches_error {
        return false;
    }
    !config
        .ignore_markers
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

/// Scan a node's application log for error markers. A missing log yields no
/// findings.
pub fn scan_app_log(node_dir: &Path, node: &str, config: &LogCheckConfig) -> Result<Vec<LogFinding>> {
    let lines = match read_lines(&node_dir.join(APP_LOG_FILE))? {
        ReadOutcome::Found(lines) => lines,
        ReadOutcome::NotFound(_) => return Ok(Vec::new()),
    };

    let mut findings = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if is_error_line(line, config) {
            let context_end = lines.len().min(index + 1 + CONTEXT_LINES);
            findings.push(LogFinding {
                line_number: index + 1,
                line: line.clone(),
                context: lines[index + 1..context_end].to_vec(),
            });
        }
    }

    if !findings.is_empty() {
        log::warn!(
            "Found {} suspect lines in application log for {}",
            findings.len(),
            node
        );
    }
    Ok(findings)
}
