//! Batch analysis over one simulation run.
//!
//! Collects per-node artifacts in parallel, then performs the cross-node
//! joins: publisher/subscriber interest comparisons, router cache-rate
//! breakdowns, and producer-rate comparison across sibling run directories.
//! Node analyses never share mutable state, so the fan-out is read-only and
//! order-independent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;

use crate::config::AnalysisConfig;

use super::cache_log::CacheRateTable;
use super::histograms::{PacketTimeHistograms, StatusDeltas};
use super::interest_aggregation::InterestAggregation;
use super::log_check::scan_app_log;
use super::rates::NodeInterestRates;
use super::types::*;

/// One run to analyze.
///
/// `run_dir` is the directory under `data_dir` holding one subdirectory per
/// node; `sibling_dirs` are other run directories of the same experiment used
/// for cross-run rate comparison. Node names are given explicitly, never
/// discovered from the filesystem.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub data_dir: PathBuf,
    pub run_dir: String,
    pub sibling_dirs: Vec<String>,
    pub topology: String,
    pub nodes: Vec<String>,
}

impl AnalysisRun {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        run_dir: impl Into<String>,
        sibling_dirs: Vec<String>,
        topology: impl Into<String>,
        mut nodes: Vec<String>,
    ) -> Self {
        nodes.sort();
        Self {
            data_dir: data_dir.into(),
            run_dir: run_dir.into(),
            sibling_dirs,
            topology: topology.into(),
            nodes,
        }
    }

    pub fn run_path(&self) -> PathBuf {
        self.data_dir.join(&self.run_dir)
    }

    pub fn node_dir(&self, node: &str) -> PathBuf {
        self.run_path().join(node)
    }

    /// Nodes participating in the game: everything not designated a router
    /// for this run's topology.
    pub fn game_nodes(&self, config: &AnalysisConfig) -> Vec<String> {
        let routers = config.router_nodes(&self.topology);
        self.nodes
            .iter()
            .filter(|node| !routers.contains(node))
            .cloned()
            .collect()
    }

    /// Designated router nodes present in this run.
    pub fn router_nodes(&self, config: &AnalysisConfig) -> Vec<String> {
        let routers = config.router_nodes(&self.topology);
        self.nodes
            .iter()
            .filter(|node| routers.contains(node))
            .cloned()
            .collect()
    }
}

/// Everything parsed from one node's directory.
#[derive(Debug, Clone)]
pub struct NodeArtifacts {
    pub node: String,
    pub rates: NodeInterestRates,
    pub cache: CacheRateTable,
    pub dead_reckoning: Option<DeadReckoningCounters>,
    pub packet_times: PacketTimeHistograms,
    pub status_deltas: StatusDeltas,
    pub log_findings: Vec<LogFinding>,
}

/// Parse every artifact for one node.
pub fn collect_node(
    node_dir: &Path,
    node: &str,
    config: &AnalysisConfig,
) -> Result<NodeArtifacts> {
    Ok(NodeArtifacts {
        node: node.to_string(),
        rates: NodeInterestRates::load(node_dir, node)?,
        cache: CacheRateTable::load(node_dir, node)?,
        dead_reckoning: DeadReckoningCounters::load(node_dir, node)?,
        packet_times: PacketTimeHistograms::load(node_dir, node)?,
        status_deltas: StatusDeltas::load(node_dir, node)?,
        log_findings: scan_app_log(node_dir, node, &config.log_check)?,
    })
}

/// Run the full analysis pass for one run.
pub fn run_analysis(run: &AnalysisRun, config: &AnalysisConfig) -> Result<FullAnalysisReport> {
    let game_nodes = run.game_nodes(config);
    let router_nodes = run.router_nodes(config);
    log::info!(
        "Analyzing run {} ({} nodes, {} routers) in parallel...",
        run.run_dir,
        run.nodes.len(),
        router_nodes.len()
    );

    let artifacts: Vec<NodeArtifacts> = run
        .nodes
        .par_iter()
        .map(|node| {
            collect_node(&run.node_dir(node), node, config)
                .with_context(|| format!("Failed to collect artifacts for {}", node))
        })
        .collect::<Result<Vec<_>>>()?;

    let is_game_node = |node: &str| game_nodes.iter().any(|n| n == node);

    // Per-node interest rates, game nodes only.
    let mut interest_rates = BTreeMap::new();
    for artifact in artifacts.iter().filter(|a| is_game_node(&a.node)) {
        let by_label: BTreeMap<String, RateSummary> = artifact
            .rates
            .by_type()
            .iter()
            .map(|(object_type, rate)| (object_type.rate_label().to_string(), rate.into()))
            .collect();
        if !by_label.is_empty() {
            interest_rates.insert(artifact.node.clone(), by_label);
        }
    }

    // Publisher/subscriber interest comparison per game node.
    let mut interest_comparisons = BTreeMap::new();
    for publisher in &game_nodes {
        let aggregation = InterestAggregation::load(
            &run.run_path(),
            publisher,
            &run.nodes,
            &router_nodes,
            ObjectType::Status,
        )?;
        if let Some(aggregation) = aggregation {
            interest_comparisons.insert(publisher.clone(), aggregation.comparison());
        }
    }

    // Cache analysis: total rate for every node, per-router breakdown for
    // routers (or all nodes when the topology designates none).
    let mut cache = CacheReport::default();
    for artifact in &artifacts {
        cache
            .total_rate_by_node
            .insert(artifact.node.clone(), artifact.cache.total_rate(None, None).ok());
    }
    let breakdown_nodes: Vec<&NodeArtifacts> = if router_nodes.is_empty() {
        artifacts.iter().collect()
    } else {
        artifacts
            .iter()
            .filter(|a| router_nodes.contains(&a.node))
            .collect()
    };
    for router in breakdown_nodes {
        let by_peer = router
            .cache
            .rates_for_object_type(ObjectType::Status.rate_label());
        for (peer, cache_rate) in by_peer {
            if let Ok(rate) = cache_rate.hit_rate() {
                cache
                    .router_rates_by_peer
                    .entry(peer)
                    .or_insert_with(BTreeMap::new)
                    .insert(router.node.clone(), rate);
            }
        }
    }

    // Dead-reckoning breakdowns for nodes with a complete counter set.
    let mut dead_reckoning = BTreeMap::new();
    for artifact in artifacts.iter().filter(|a| is_game_node(&a.node)) {
        if let Some(counters) = artifact.dead_reckoning {
            dead_reckoning.insert(artifact.node.clone(), counters.into());
        }
    }

    // Pooled sample summaries per game node.
    let mut packet_times = BTreeMap::new();
    let mut status_deltas = BTreeMap::new();
    for artifact in artifacts.iter().filter(|a| is_game_node(&a.node)) {
        let rtt: Vec<f64> = artifact
            .packet_times
            .combined_samples(ObjectType::Status, "rtt")
            .iter()
            .map(|&sample| sample as f64)
            .collect();
        if !rtt.is_empty() {
            packet_times.insert(artifact.node.clone(), summarize(&rtt));
        }
        let deltas = artifact.status_deltas.all_values();
        if !deltas.is_empty() {
            status_deltas.insert(artifact.node.clone(), summarize(&deltas));
        }
    }

    let mut log_findings = BTreeMap::new();
    for artifact in artifacts.iter().filter(|a| is_game_node(&a.node)) {
        if !artifact.log_findings.is_empty() {
            log_findings.insert(artifact.node.clone(), artifact.log_findings.clone());
        }
    }

    let report = FullAnalysisReport {
        metadata: AnalysisMetadata {
            analysis_timestamp: chrono::Utc::now().to_rfc3339(),
            data_dir: run.data_dir.display().to_string(),
            run_dir: run.run_dir.clone(),
            topology: run.topology.clone(),
            total_nodes: run.nodes.len(),
            game_nodes: game_nodes.len(),
            router_nodes: router_nodes.len(),
        },
        interest_rates,
        interest_comparisons,
        cache,
        dead_reckoning,
        packet_times,
        status_deltas,
        producer_rate_comparison: compare_producer_rates(run, config, ObjectType::Status)?,
        log_findings,
    };

    log::info!(
        "Run {} analyzed: {} rate tables, {} interest comparisons",
        run.run_dir,
        report.interest_rates.len(),
        report.interest_comparisons.len()
    );
    Ok(report)
}

/// Final mean producer rate per game node, across the main run directory and
/// every sibling run directory. Nodes without rate data in a directory are
/// left out of that directory's map.
pub fn compare_producer_rates(
    run: &AnalysisRun,
    config: &AnalysisConfig,
    object_type: ObjectType,
) -> Result<BTreeMap<String, BTreeMap<String, f64>>> {
    let mut by_dir = BTreeMap::new();
    let mut all_dirs = vec![run.run_dir.clone()];
    all_dirs.extend(run.sibling_dirs.iter().cloned());

    for dir in all_dirs {
        let mut by_node = BTreeMap::new();
        for node in run.game_nodes(config) {
            let node_dir = run.data_dir.join(&dir).join(&node);
            let rates = NodeInterestRates::load(&node_dir, &node)?;
            if let Some(rate) = rates.rate_for(object_type) {
                by_node.insert(node.clone(), rate.final_mean_rate);
            }
        }
        by_dir.insert(dir, by_node);
    }
    Ok(by_dir)
}

/// Summary statistics over one pooled sample list.
pub fn summarize(values: &[f64]) -> SampleSummary {
    SampleSummary {
        samples: values.len(),
        mean: mean(values),
        median: median(values),
        p95: percentile(values, 95.0),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
