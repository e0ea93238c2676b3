//! # gamesim-metrics - Metrics analysis for distributed game simulations
//!
//! This library analyzes the per-node log artifacts produced by a
//! distributed simulation of a multiplayer networked game running over a
//! content-centric network, and derives comparative metrics across nodes
//! and runs.
//!
//! ## Overview
//!
//! Each simulated node leaves behind a directory of fixed-format artifacts:
//! interest-rate CSVs per replicated object type, per-publisher interest
//! counters, dead-reckoning decision counters, a router cache log, a JSON
//! histogram dump of packet timings and position deltas, and an application
//! log. This crate parses those artifacts into normalized records and joins
//! them across nodes: publisher/subscriber interest balance, router
//! cache-rate breakdowns by peer, and producer-rate comparison across runs.
//!
//! ## Architecture
//!
//! - `config`: analysis configuration (topology router maps, log-scan
//!   markers) loaded from YAML
//! - `analysis::readers`: safe file readers distinguishing found from absent
//! - `analysis::rates`: interest-rate CSV parsing
//! - `analysis::cache_log`: router cache log classification and accumulation
//! - `analysis::interest_aggregation`: publisher/subscriber interest joins
//! - `analysis::dead_reckoning`: throttling counter reading
//! - `analysis::histograms`: histogram dump loading and metric-name parsing
//! - `analysis::log_check`: application log error scanning
//! - `analysis::runner`: parallel per-node collection and cross-node joins
//! - `analysis::report`: JSON and text report generation
//!
//! ## Error Handling
//!
//! Simulation runs routinely have partial node failures, so missing files
//! degrade a node's contribution instead of aborting a batch; the
//! dead-reckoning reader is the deliberate exception and fails closed on a
//! partial counter set. Fallible operations return
//! `Result<T, color_eyre::eyre::Error>` with path context.

pub mod config;
pub mod analysis;
