//! Packet-time histogram loading and metric-name parsing.
//!
//! Each node dumps a flat JSON map of structured metric keys to raw sample
//! lists. Keys follow `<tag>-<objectType>-<metricType>-<peerName>`; malformed
//! keys are skipped per-key with a warning so one bad entry cannot abort a
//! batch load.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::types::{HistogramMetric, MetricName, MetricNameError, ObjectType, StatusDelta};

/// Histogram dump file name within a node directory.
pub const HISTOGRAM_VALUES_FILE: &str = "histogram_values.json";

/// Key prefix marking position-delta metrics.
pub const STATUS_DELTA_PREFIX: &str = "eng-status-delta";

/// Divisor converting position-delta samples from the simulator's fixed-point
/// units to world units.
pub const STATUS_DELTA_SCALE: f64 = 100.0;

impl MetricName {
    /// Parse a structured metric key into its four hyphen-delimited fields.
    pub fn parse(key: &str) -> Result<MetricName, MetricNameError> {
        let fields: Vec<&str> = key.split('-').collect();
        if fields.len() != 4 {
            return Err(MetricNameError::WrongFieldCount {
                key: key.to_string(),
                count: fields.len(),
            });
        }
        let object_type = fields[1].parse::<ObjectType>()?;
        Ok(MetricName {
            tag: fields[0].to_string(),
            object_type,
            metric_type: fields[2].to_string(),
            peer: fields[3].to_string(),
        })
    }
}

/// Read the raw histogram map for one node. A missing dump degrades to an
/// empty map.
fn load_raw(node_dir: &Path) -> Result<BTreeMap<String, Vec<i64>>> {
    let path = node_dir.join(HISTOGRAM_VALUES_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("Could not find file {}", path.display());
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse histogram JSON in {}", path.display()))
}

/// Per-node packet-time metrics grouped object type first, metric type second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketTimeHistograms {
    node: String,
    by_object_type: BTreeMap<ObjectType, BTreeMap<String, Vec<HistogramMetric>>>,
}

impl PacketTimeHistograms {
    pub fn load(node_dir: &Path, node: &str) -> Result<Self> {
        Ok(Self::from_map(node, load_raw(node_dir)?))
    }

    pub fn from_map(node: &str, raw: BTreeMap<String, Vec<i64>>) -> Self {
        let mut by_object_type: BTreeMap<ObjectType, BTreeMap<String, Vec<HistogramMetric>>> =
            BTreeMap::new();
        for (key, samples) in raw {
            let name = match MetricName::parse(&key) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("Skipping malformed histogram key {:?}: {}", key, e);
                    continue;
                }
            };
            by_object_type
                .entry(name.object_type)
                .or_default()
                .entry(name.metric_type.clone())
                .or_default()
                .push(HistogramMetric { name, samples });
        }
        Self {
            node: node.to_string(),
            by_object_type,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Per-peer metrics for one (object type, metric type) pair.
    pub fn metrics_for(
        &self,
        object_type: ObjectType,
        metric_type: &str,
    ) -> Option<&Vec<HistogramMetric>> {
        self.by_object_type.get(&object_type)?.get(metric_type)
    }

    /// Every peer's samples for one pair, flattened into a single pool.
    pub fn combined_samples(&self, object_type: ObjectType, metric_type: &str) -> Vec<i64> {
        self.metrics_for(object_type, metric_type)
            .map(|metrics| {
                metrics
                    .iter()
                    .flat_map(|metric| metric.samples.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Position-delta histograms for one node, scaled to world units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusDeltas {
    node: String,
    deltas: Vec<StatusDelta>,
}

impl StatusDeltas {
    pub fn load(node_dir: &Path, node: &str) -> Result<Self> {
        Ok(Self::from_map(node, load_raw(node_dir)?))
    }

    pub fn from_map(node: &str, raw: BTreeMap<String, Vec<i64>>) -> Self {
        let mut deltas = Vec::new();
        for (key, samples) in raw {
            if !key.starts_with(STATUS_DELTA_PREFIX) {
                continue;
            }
            let name = match MetricName::parse(&key) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("Skipping malformed status-delta key {:?}: {}", key, e);
                    continue;
                }
            };
            deltas.push(StatusDelta {
                peer: name.peer,
                values: samples
                    .iter()
                    .map(|&sample| sample as f64 / STATUS_DELTA_SCALE)
                    .collect(),
            });
        }
        Self {
            node: node.to_string(),
            deltas,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn deltas(&self) -> &[StatusDelta] {
        &self.deltas
    }

    /// Every peer's scaled values flattened into a single pool.
    pub fn all_values(&self) -> Vec<f64> {
        self.deltas
            .iter()
            .flat_map(|delta| delta.values.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, &[i64])]) -> BTreeMap<String, Vec<i64>> {
        entries
            .iter()
            .map(|(key, samples)| (key.to_string(), samples.to_vec()))
            .collect()
    }

    #[test]
    fn metric_name_parses_four_fields() {
        let name = MetricName::parse("sub-status-rtt-nodeB").unwrap();
        assert_eq!(name.tag, "sub");
        assert_eq!(name.object_type, ObjectType::Status);
        assert_eq!(name.metric_type, "rtt");
        assert_eq!(name.peer, "nodeB");
    }

    #[test]
    fn metric_name_rejects_wrong_field_counts() {
        assert_eq!(
            MetricName::parse("sub-status-rtt"),
            Err(MetricNameError::WrongFieldCount {
                key: "sub-status-rtt".to_string(),
                count: 3,
            })
        );
        assert!(MetricName::parse("sub-status-rtt-nodeB-extra").is_err());
    }

    #[test]
    fn groups_metrics_by_object_then_metric_type() {
        let histograms = PacketTimeHistograms::from_map(
            "nodeA",
            raw(&[
                ("sub-status-rtt-nodeB", &[10, 20]),
                ("sub-status-rtt-nodeC", &[30]),
                ("sub-status-latency-nodeB", &[5]),
                ("sub-block-rtt-nodeB", &[40]),
            ]),
        );

        let status_rtt = histograms.metrics_for(ObjectType::Status, "rtt").unwrap();
        assert_eq!(status_rtt.len(), 2);
        assert_eq!(
            histograms.combined_samples(ObjectType::Status, "rtt"),
            vec![10, 20, 30]
        );
        assert_eq!(
            histograms.combined_samples(ObjectType::Blocks, "rtt"),
            vec![40]
        );
        assert_eq!(
            histograms.combined_samples(ObjectType::Projectiles, "rtt"),
            Vec::<i64>::new()
        );
    }

    #[test]
    fn malformed_keys_are_skipped_not_fatal() {
        let histograms = PacketTimeHistograms::from_map(
            "nodeA",
            raw(&[
                ("sub-status-rtt-nodeB", &[10]),
                ("garbage", &[1, 2, 3]),
                ("sub-warship-rtt-nodeB", &[4]),
            ]),
        );
        assert_eq!(
            histograms.combined_samples(ObjectType::Status, "rtt"),
            vec![10]
        );
    }

    #[test]
    fn status_deltas_select_prefix_and_scale_by_100() {
        let deltas = StatusDeltas::from_map(
            "nodeA",
            raw(&[
                ("eng-status-delta-nodeB", &[100, 200, 300]),
                ("sub-status-rtt-nodeB", &[10]),
            ]),
        );

        assert_eq!(deltas.deltas().len(), 1);
        assert_eq!(deltas.deltas()[0].peer, "nodeB");
        assert_eq!(deltas.deltas()[0].values, vec![1.0, 2.0, 3.0]);
        assert_eq!(deltas.all_values(), vec![1.0, 2.0, 3.0]);
    }
}
