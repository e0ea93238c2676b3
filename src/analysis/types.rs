//! Core data types for simulation metrics analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Seconds of simulated time elapsed since the start of a run.
pub type SimSeconds = i64;

/// Object types replicated by the game simulation.
///
/// The wire formats spell these two ways: rate and counter file names use the
/// plural form (`status`, `blocks`, `projectiles`) while histogram metric keys
/// use the singular form (`status`, `block`, `projectile`). Both parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Status,
    Blocks,
    Projectiles,
}

impl ObjectType {
    pub const ALL: [ObjectType; 3] = [ObjectType::Status, ObjectType::Blocks, ObjectType::Projectiles];

    /// Label used in rate and counter file names.
    pub fn rate_label(&self) -> &'static str {
        match self {
            ObjectType::Status => "status",
            ObjectType::Blocks => "blocks",
            ObjectType::Projectiles => "projectiles",
        }
    }

    /// Label used in histogram metric keys.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ObjectType::Status => "status",
            ObjectType::Blocks => "block",
            ObjectType::Projectiles => "projectile",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rate_label())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = MetricNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(ObjectType::Status),
            "block" | "blocks" => Ok(ObjectType::Blocks),
            "projectile" | "projectiles" => Ok(ObjectType::Projectiles),
            other => Err(MetricNameError::UnknownObjectType {
                value: other.to_string(),
            }),
        }
    }
}

/// Interest rate record parsed from one per-node, per-object-type CSV.
///
/// Immutable once built. `mean_rate_over_time` preserves file row order;
/// a duplicated timestamp keeps its first position but takes the last value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Mean rate column of the last data row.
    pub final_mean_rate: f64,
    /// Cumulative count column of the last data row.
    pub total_count: u64,
    /// Timestamped mean-rate series in row order.
    pub mean_rate_over_time: Vec<(SimSeconds, f64)>,
}

/// Cache hit-rate error conditions a caller must distinguish.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheRateError {
    /// No lookups were observed for the queried key, so a hit rate is
    /// undefined rather than zero.
    #[error("no cache lookups recorded")]
    NoLookups,
}

/// Lookup/hit accumulator for one (peer, object type) key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRate {
    pub lookups: u64,
    pub hits: u64,
}

impl CacheRate {
    pub fn add_lookup(&mut self) {
        self.lookups += 1;
    }

    pub fn add_hit(&mut self) {
        self.hits += 1;
    }

    /// Merge another accumulator for the same key by summing both fields.
    pub fn merge(&mut self, other: &CacheRate) {
        self.lookups += other.lookups;
        self.hits += other.hits;
    }

    /// Fraction of lookups that hit the cache.
    pub fn hit_rate(&self) -> Result<f64, CacheRateError> {
        if self.lookups == 0 {
            return Err(CacheRateError::NoLookups);
        }
        Ok(self.hits as f64 / self.lookups as f64)
    }
}

/// Publisher-side versus subscriber-side interest totals for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestComparison {
    /// Interests the publisher itself counted.
    pub interests_seen: u64,
    /// Sum of the interests every other node expressed toward the publisher.
    pub interests_expressed: u64,
}

/// Dead-reckoning throttling decision categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrCategory {
    /// Update sent because predicted velocity diverged.
    Velocity,
    /// Update suppressed by the positional threshold.
    Threshold,
    /// Update skipped outright.
    Skip,
    /// Update omitted entirely. Only present in older runs.
    Null,
}

impl DrCategory {
    pub fn label(&self) -> &'static str {
        match self {
            DrCategory::Velocity => "velocity",
            DrCategory::Threshold => "threshold",
            DrCategory::Skip => "skip",
            DrCategory::Null => "null",
        }
    }
}

/// Cumulative dead-reckoning counters for one node.
///
/// Only constructed when every required counter file is present; a partial
/// set is treated as no data for the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadReckoningCounters {
    pub velocity: u64,
    pub threshold: u64,
    pub skip: u64,
    /// Absent when the run predates the null counter.
    pub null: Option<u64>,
}

impl DeadReckoningCounters {
    pub fn total(&self) -> u64 {
        self.velocity + self.threshold + self.skip + self.null.unwrap_or(0)
    }

    /// Fraction of decisions that were not outright skips. Zero totals yield
    /// 0.0 by convention.
    pub fn actionable_fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (total - self.skip) as f64 / total as f64
    }

    /// Percentage of the total per category, keyed by category label.
    pub fn percentages(&self) -> BTreeMap<&'static str, f64> {
        let total = self.total();
        let pct = |count: u64| {
            if total == 0 {
                0.0
            } else {
                100.0 * count as f64 / total as f64
            }
        };
        let mut out = BTreeMap::new();
        out.insert(DrCategory::Velocity.label(), pct(self.velocity));
        out.insert(DrCategory::Threshold.label(), pct(self.threshold));
        out.insert(DrCategory::Skip.label(), pct(self.skip));
        if let Some(null) = self.null {
            out.insert(DrCategory::Null.label(), pct(null));
        }
        out
    }
}

/// Errors raised while parsing a structured histogram metric key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricNameError {
    #[error("metric key {key:?} has {count} hyphen-delimited fields, expected 4")]
    WrongFieldCount { key: String, count: usize },

    #[error("unknown object type {value:?}")]
    UnknownObjectType { value: String },
}

/// Structured form of a histogram metric key
/// `<tag>-<objectType>-<metricType>-<peerName>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricName {
    pub tag: String,
    pub object_type: ObjectType,
    pub metric_type: String,
    pub peer: String,
}

/// One parsed histogram metric: a structured name plus its raw samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramMetric {
    pub name: MetricName,
    pub samples: Vec<i64>,
}

/// Position-deviation samples for one peer, converted from the simulator's
/// fixed-point units to world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDelta {
    pub peer: String,
    pub values: Vec<f64>,
}

/// A suspect line found while scanning a node's application log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFinding {
    /// 1-based line number in the log file.
    pub line_number: usize,
    pub line: String,
    /// Up to ten lines following the match, for context.
    pub context: Vec<String>,
}

/// Summary statistics over one pooled sample list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub samples: usize,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
}

/// Per-object-type rate summary used in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSummary {
    pub final_mean_rate: f64,
    pub total_count: u64,
}

impl From<&Rate> for RateSummary {
    fn from(rate: &Rate) -> Self {
        Self {
            final_mean_rate: rate.final_mean_rate,
            total_count: rate.total_count,
        }
    }
}

/// Cache analysis results across a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheReport {
    /// Overall hit rate per node; `None` when a node recorded no lookups.
    pub total_rate_by_node: BTreeMap<String, Option<f64>>,
    /// Hit rate per consuming peer, broken down by router node.
    pub router_rates_by_peer: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Dead-reckoning breakdown for one node, derived from its counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadReckoningBreakdown {
    pub counters: DeadReckoningCounters,
    pub total: u64,
    pub actionable_fraction: f64,
}

impl From<DeadReckoningCounters> for DeadReckoningBreakdown {
    fn from(counters: DeadReckoningCounters) -> Self {
        Self {
            total: counters.total(),
            actionable_fraction: counters.actionable_fraction(),
            counters,
        }
    }
}

/// Report metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_timestamp: String,
    pub data_dir: String,
    pub run_dir: String,
    pub topology: String,
    pub total_nodes: usize,
    pub game_nodes: usize,
    pub router_nodes: usize,
}

/// Complete analysis report for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAnalysisReport {
    pub metadata: AnalysisMetadata,
    /// node -> object type label -> rate summary.
    pub interest_rates: BTreeMap<String, BTreeMap<String, RateSummary>>,
    /// Publisher node -> seen/expressed comparison.
    pub interest_comparisons: BTreeMap<String, InterestComparison>,
    pub cache: CacheReport,
    pub dead_reckoning: BTreeMap<String, DeadReckoningBreakdown>,
    /// node -> pooled round-trip-time summary for status objects.
    pub packet_times: BTreeMap<String, SampleSummary>,
    /// node -> pooled position-delta summary.
    pub status_deltas: BTreeMap<String, SampleSummary>,
    /// run dir -> node -> final mean producer rate.
    pub producer_rate_comparison: BTreeMap<String, BTreeMap<String, f64>>,
    pub log_findings: BTreeMap<String, Vec<LogFinding>>,
}
