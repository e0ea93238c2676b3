//! Metrics analysis for distributed game simulation runs.
//!
//! This module turns the per-node log artifacts written by the simulator
//! (rate CSVs, counter files, router logs, histogram dumps) into normalized
//! metric records and compares them across nodes and runs.

pub mod types;
pub mod readers;
pub mod rates;
pub mod cache_log;
pub mod interest_aggregation;
pub mod dead_reckoning;
pub mod histograms;
pub mod log_check;
pub mod runner;
pub mod report;

pub use types::*;
pub use cache_log::{classify_line, CacheEvent, CachePatterns, CacheRateTable};
pub use interest_aggregation::InterestAggregation;
pub use rates::NodeInterestRates;
pub use runner::{collect_node, run_analysis, AnalysisRun, NodeArtifacts};
pub use report::{generate_json_report, generate_text_report, print_summary, write_reports};
