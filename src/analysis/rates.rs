//! Publisher interest-rate parsing.
//!
//! Each (node, object type) pair has one CSV of cumulative interest counts
//! and mean rates sampled over the run. The last row carries the final
//! totals; the full row set gives the rate-over-time series.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use color_eyre::eyre::{bail, Context, ContextCompat, Result};

use super::readers::{read_csv, ReadOutcome};
use super::types::{ObjectType, Rate, SimSeconds};

/// File name of the publisher interest-rate CSV for one (node, object type).
pub fn rate_file_name(node: &str, object_type: ObjectType) -> String {
    format!(
        "pub-interest-rate-{}-{}-sync.csv",
        node,
        object_type.rate_label()
    )
}

impl Rate {
    /// Build a rate from data rows `(timestamp, cumulative count, mean rate)`.
    ///
    /// The header row must already be stripped. An empty row set violates the
    /// construction invariant and is an error, not an empty rate.
    pub fn from_rows(rows: &[Vec<String>]) -> Result<Rate> {
        let last = match rows.last() {
            Some(row) => row,
            None => bail!("rate CSV contains no data rows"),
        };

        let final_mean_rate = parse_field::<f64>(last, 2)?;
        let total_count = parse_field::<u64>(last, 1)?;

        // Row order is preserved; a duplicated timestamp keeps its first
        // position and takes the last value.
        let mut series: Vec<(SimSeconds, f64)> = Vec::with_capacity(rows.len());
        let mut positions: HashMap<SimSeconds, usize> = HashMap::new();
        for row in rows {
            let timestamp = parse_field::<SimSeconds>(row, 0)?;
            let rate = parse_field::<f64>(row, 2)?;
            match positions.get(&timestamp) {
                Some(&at) => series[at].1 = rate,
                None => {
                    positions.insert(timestamp, series.len());
                    series.push((timestamp, rate));
                }
            }
        }

        Ok(Rate {
            final_mean_rate,
            total_count,
            mean_rate_over_time: series,
        })
    }
}

fn parse_field<T: std::str::FromStr>(row: &[String], index: usize) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let field = row
        .get(index)
        .with_context(|| format!("rate row {:?} is missing column {}", row, index))?;
    field
        .trim()
        .parse::<T>()
        .with_context(|| format!("rate row {:?} has unparseable column {}", row, index))
}

/// Interest rates for one node, one entry per object type with data on disk.
///
/// An absent rate CSV leaves its object type out of the table entirely; an
/// absent entry is "no data", never a zero rate.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInterestRates {
    node: String,
    by_type: BTreeMap<ObjectType, Rate>,
}

impl NodeInterestRates {
    pub fn load(node_dir: &Path, node: &str) -> Result<Self> {
        let mut by_type = BTreeMap::new();
        for object_type in ObjectType::ALL {
            let path = node_dir.join(rate_file_name(node, object_type));
            if let ReadOutcome::Found(rows) = read_csv(&path, false)? {
                let rate = Rate::from_rows(&rows)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                by_type.insert(object_type, rate);
            }
        }
        log::debug!("Loaded {} rate tables for {}", by_type.len(), node);
        Ok(Self {
            node: node.to_string(),
            by_type,
        })
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn rate_for(&self, object_type: ObjectType) -> Option<&Rate> {
        self.by_type.get(&object_type)
    }

    pub fn by_type(&self) -> &BTreeMap<ObjectType, Rate> {
        &self.by_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn rows(data: &[(&str, &str, &str)]) -> Vec<Vec<String>> {
        data.iter()
            .map(|(a, b, c)| vec![a.to_string(), b.to_string(), c.to_string()])
            .collect()
    }

    #[test]
    fn rate_takes_final_row_and_full_series() {
        let rate = Rate::from_rows(&rows(&[
            ("1", "10", "10.0"),
            ("2", "25", "12.5"),
            ("3", "36", "12.0"),
        ]))
        .unwrap();

        assert_eq!(rate.total_count, 36);
        assert!((rate.final_mean_rate - 12.0).abs() < 1e-9);
        assert_eq!(
            rate.mean_rate_over_time,
            vec![(1, 10.0), (2, 12.5), (3, 12.0)]
        );
    }

    #[test]
    fn duplicate_timestamp_keeps_position_takes_last_value() {
        let rate = Rate::from_rows(&rows(&[
            ("1", "10", "10.0"),
            ("2", "20", "11.0"),
            ("1", "30", "99.0"),
        ]))
        .unwrap();

        assert_eq!(rate.mean_rate_over_time, vec![(1, 99.0), (2, 11.0)]);
    }

    #[test]
    fn empty_row_set_is_an_error() {
        assert!(Rate::from_rows(&[]).is_err());
    }

    #[test]
    fn reparsing_the_same_rows_is_idempotent() {
        let data = rows(&[("1", "10", "10.0"), ("2", "25", "12.5")]);
        assert_eq!(Rate::from_rows(&data).unwrap(), Rate::from_rows(&data).unwrap());
    }

    #[test]
    fn missing_rate_file_yields_absent_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(rate_file_name("nodeA", ObjectType::Status)),
            "timestamp,count,rate\n5,100,20.0\n",
        )
        .unwrap();

        let rates = NodeInterestRates::load(dir.path(), "nodeA").unwrap();
        assert!(rates.rate_for(ObjectType::Status).is_some());
        assert_eq!(rates.rate_for(ObjectType::Blocks), None);
        assert_eq!(rates.rate_for(ObjectType::Status).unwrap().total_count, 100);
    }
}
