//! Dead-reckoning counter reading.
//!
//! Each node writes one cumulative counter file per throttling decision
//! category. A percentage breakdown is only meaningful over the complete
//! set, so a node missing any required counter yields no record at all
//! rather than a partially populated one.

use std::path::Path;

use color_eyre::eyre::{Context, ContextCompat, Result};

use super::readers::{read_csv, read_lines, ReadOutcome};
use super::types::{DeadReckoningCounters, DrCategory};

/// Counter file name, current convention.
pub fn counter_file_name(category: DrCategory) -> String {
    format!("dr-counter-{}.csv", category.label())
}

/// Older runs wrote the bare file name with the count as the last raw line.
fn legacy_counter_file_name(category: DrCategory) -> String {
    format!("dr-counter-{}", category.label())
}

/// Read one counter, trying the CSV convention (last row, second column)
/// first and falling back to the legacy last-raw-line convention.
fn read_counter(node_dir: &Path, category: DrCategory) -> Result<Option<u64>> {
    let csv_path = node_dir.join(counter_file_name(category));
    if let ReadOutcome::Found(rows) = read_csv(&csv_path, false)? {
        let last = rows
            .last()
            .with_context(|| format!("{} has no data rows", csv_path.display()))?;
        let value = last
            .get(1)
            .with_context(|| format!("counter row in {} has no value column", csv_path.display()))?
            .trim()
            .parse::<u64>()
            .with_context(|| format!("unparseable counter in {}", csv_path.display()))?;
        return Ok(Some(value));
    }

    let legacy_path = node_dir.join(legacy_counter_file_name(category));
    if let ReadOutcome::Found(lines) = read_lines(&legacy_path)? {
        let last = lines
            .iter()
            .rev()
            .find(|line| !line.trim().is_empty())
            .with_context(|| format!("{} is empty", legacy_path.display()))?;
        let value = last
            .trim()
            .parse::<u64>()
            .with_context(|| format!("unparseable counter in {}", legacy_path.display()))?;
        return Ok(Some(value));
    }

    Ok(None)
}

impl DeadReckoningCounters {
    /// Load the counter set for one node.
    ///
    /// Fails closed: if any required category is missing in both file
    /// conventions, the whole per-node record is absent. The `null` category
    /// is optional and contributes to totals only when present.
    pub fn load(node_dir: &Path, node: &str) -> Result<Option<Self>> {
        let velocity = read_counter(node_dir, DrCategory::Velocity)?;
        let threshold = read_counter(node_dir, DrCategory::Threshold)?;
        let skip = read_counter(node_dir, DrCategory::Skip)?;
        let null = read_counter(node_dir, DrCategory::Null)?;

        match (velocity, threshold, skip) {
            (Some(velocity), Some(threshold), Some(skip)) => Ok(Some(DeadReckoningCounters {
                velocity,
                threshold,
                skip,
                null,
            })),
            _ => {
                log::warn!(
                    "Dead-reckoning counters incomplete for {}, skipping node",
                    node
                );
                Ok(None)
            }
        }
    }
}
