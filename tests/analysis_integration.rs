//! End-to-end analysis over a synthetic simulation run laid out on disk.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use gamesim_metrics::analysis::{
    run_analysis, write_reports, AnalysisRun, FullAnalysisReport, ObjectType,
};
use gamesim_metrics::config::AnalysisConfig;

fn write_rate_file(node_dir: &Path, node: &str, rows: &[(i64, u64, f64)]) {
    let mut content = String::from("timestamp,count,rate\n");
    for (timestamp, count, rate) in rows {
        content.push_str(&format!("{},{},{}\n", timestamp, count, rate));
    }
    fs::write(
        node_dir.join(format!("pub-interest-rate-{}-status-sync.csv", node)),
        content,
    )
    .unwrap();
}

fn write_interest_counter(node_dir: &Path, publisher: &str, count: u64) {
    fs::write(
        node_dir.join(format!("sub-status-interestscounter-{}.csv", publisher)),
        format!("timestamp,count\n5,1\n30,{}\n", count),
    )
    .unwrap();
}

fn write_dr_counters(node_dir: &Path, velocity: u64, threshold: u64, skip: u64) {
    for (category, value) in [("velocity", velocity), ("threshold", threshold), ("skip", skip)] {
        fs::write(
            node_dir.join(format!("dr-counter-{}.csv", category)),
            format!("timestamp,count\n30,{}\n", value),
        )
        .unwrap();
    }
}

fn cache_line(event: &str, peer: &str, object_type: &str) -> String {
    format!(
        "1584023712.332 DEBUG: [ContentStore] {} /com/stefanolupo/ndngame/0/{}/{}/sync/7\n",
        event, peer, object_type
    )
}

/// Build one complete run: two game nodes with full artifacts, one empty
/// game node, one router.
fn build_run(data_dir: &Path) {
    let run = data_dir.join("run-a");

    // nodeA: publisher with rates, histograms and dead-reckoning counters.
    let node_a = run.join("nodeA");
    fs::create_dir_all(&node_a).unwrap();
    write_rate_file(&node_a, "nodeA", &[(1, 2, 2.0), (2, 5, 2.5), (3, 9, 4.5)]);
    write_dr_counters(&node_a, 70, 20, 10);
    fs::write(
        node_a.join("histogram_values.json"),
        r#"{
            "sub-status-rtt-nodeB": [100, 200],
            "eng-status-delta-nodeB": [100, 200, 300],
            "not-a-valid-key": [1]
        }"#,
    )
    .unwrap();
    fs::write(node_a.join("java.log"), "INFO starting\nINFO shutting down\n").unwrap();

    // nodeB: publisher whose subscribers left no counters, with a log error.
    let node_b = run.join("nodeB");
    fs::create_dir_all(&node_b).unwrap();
    write_rate_file(&node_b, "nodeB", &[(1, 8, 4.0), (3, 20, 6.5)]);
    write_interest_counter(&node_b, "nodeA", 7);
    fs::write(
        node_b.join("java.log"),
        "INFO starting\nfatal exception in tick loop\nat GameLoop.tick\n",
    )
    .unwrap();

    // nodeC: present in the node list but left no artifacts at all.
    fs::create_dir_all(run.join("nodeC")).unwrap();

    // nodeE: router with a cache log.
    let node_e = run.join("nodeE");
    fs::create_dir_all(&node_e).unwrap();
    let mut nfd_log = String::from("router starting\n");
    for _ in 0..4 {
        nfd_log.push_str(&cache_line("find", "nodeA", "status"));
    }
    for _ in 0..2 {
        nfd_log.push_str(&cache_line("matching", "nodeA", "status"));
    }
    for _ in 0..2 {
        nfd_log.push_str(&cache_line("find", "nodeB", "status"));
    }
    nfd_log.push_str(&cache_line("matching", "nodeB", "status"));
    fs::write(node_e.join("nfd.log"), nfd_log).unwrap();

    // Sibling run with a different producer rate for nodeA.
    let sibling_a = data_dir.join("run-b").join("nodeA");
    fs::create_dir_all(&sibling_a).unwrap();
    write_rate_file(&sibling_a, "nodeA", &[(1, 3, 2.5)]);
}

fn analysis_run(data_dir: &Path) -> AnalysisRun {
    AnalysisRun::new(
        data_dir,
        "run-a",
        vec!["run-b".to_string()],
        "dumbbell",
        vec![
            "nodeA".to_string(),
            "nodeB".to_string(),
            "nodeC".to_string(),
            "nodeE".to_string(),
        ],
    )
}

#[test]
fn full_run_analysis_joins_all_metrics() {
    let dir = TempDir::new().unwrap();
    build_run(dir.path());
    let config = AnalysisConfig::default();

    let report = run_analysis(&analysis_run(dir.path()), &config).unwrap();

    assert_eq!(report.metadata.total_nodes, 4);
    assert_eq!(report.metadata.game_nodes, 3);
    assert_eq!(report.metadata.router_nodes, 1);

    // Interest rates: nodeA and nodeB have status data, nodeC nothing.
    let node_a_status = &report.interest_rates["nodeA"]["status"];
    assert_eq!(node_a_status.total_count, 9);
    assert!((node_a_status.final_mean_rate - 4.5).abs() < 1e-9);
    assert!(!report.interest_rates.contains_key("nodeC"));

    // Interest comparisons: nodeB expressed 7 toward nodeA; nobody left
    // counters for nodeB, which degrades to zero expressed.
    let for_a = &report.interest_comparisons["nodeA"];
    assert_eq!((for_a.interests_seen, for_a.interests_expressed), (9, 7));
    let for_b = &report.interest_comparisons["nodeB"];
    assert_eq!((for_b.interests_seen, for_b.interests_expressed), (20, 0));
    assert!(!report.interest_comparisons.contains_key("nodeC"));

    // Cache: the router saw 6 lookups and 3 hits; game nodes saw none.
    assert_eq!(report.cache.total_rate_by_node["nodeE"], Some(0.5));
    assert_eq!(report.cache.total_rate_by_node["nodeA"], None);
    let via_router = &report.cache.router_rates_by_peer["nodeA"];
    assert!((via_router["nodeE"] - 0.5).abs() < 1e-9);

    // Dead reckoning: only nodeA has a complete counter set.
    let dr = &report.dead_reckoning["nodeA"];
    assert_eq!(dr.total, 100);
    assert!((dr.actionable_fraction - 0.9).abs() < 1e-9);
    assert!(!report.dead_reckoning.contains_key("nodeB"));

    // Histogram pools.
    let rtt = &report.packet_times["nodeA"];
    assert_eq!(rtt.samples, 2);
    assert!((rtt.mean - 150.0).abs() < 1e-9);
    let deltas = &report.status_deltas["nodeA"];
    assert_eq!(deltas.samples, 3);
    assert!((deltas.mean - 2.0).abs() < 1e-9);

    // Producer rates across both run directories.
    assert!((report.producer_rate_comparison["run-a"]["nodeA"] - 4.5).abs() < 1e-9);
    assert!((report.producer_rate_comparison["run-b"]["nodeA"] - 2.5).abs() < 1e-9);
    assert!(!report.producer_rate_comparison["run-b"].contains_key("nodeB"));

    // Log findings: only nodeB tripped an error marker.
    assert_eq!(report.log_findings.len(), 1);
    assert_eq!(report.log_findings["nodeB"][0].line_number, 2);
}

#[test]
fn reanalyzing_the_same_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    build_run(dir.path());
    let config = AnalysisConfig::default();
    let run = analysis_run(dir.path());

    let first = run_analysis(&run, &config).unwrap();
    let second = run_analysis(&run, &config).unwrap();

    assert_eq!(first.interest_rates, second.interest_rates);
    assert_eq!(first.interest_comparisons, second.interest_comparisons);
    assert_eq!(first.cache, second.cache);
    assert_eq!(first.dead_reckoning, second.dead_reckoning);
    assert_eq!(first.packet_times, second.packet_times);
    assert_eq!(first.status_deltas, second.status_deltas);
    assert_eq!(first.producer_rate_comparison, second.producer_rate_comparison);
    assert_eq!(first.log_findings, second.log_findings);
}

#[test]
fn reports_round_trip_through_a_cleared_output_dir() {
    let dir = TempDir::new().unwrap();
    build_run(dir.path());
    let config = AnalysisConfig::default();
    let report = run_analysis(&analysis_run(dir.path()), &config).unwrap();

    // A stale artifact from a previous pass must not survive.
    let output_dir = dir.path().join("reports");
    fs::create_dir_all(&output_dir).unwrap();
    fs::write(output_dir.join("stale.png"), b"old").unwrap();

    write_reports(&report, &output_dir).unwrap();

    assert!(!output_dir.join("stale.png").exists());
    assert!(output_dir.join("report.txt").exists());

    let json = fs::read_to_string(output_dir.join("full_report.json")).unwrap();
    let parsed: FullAnalysisReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);

    let text = fs::read_to_string(output_dir.join("report.txt")).unwrap();
    assert!(text.contains("INTEREST RATES"));
    assert!(text.contains("CACHE HIT RATES"));
}

#[test]
fn missing_rate_csv_is_absent_not_zero() {
    let dir = TempDir::new().unwrap();
    let node_dir = dir.path().join("run-a").join("nodeZ");
    fs::create_dir_all(&node_dir).unwrap();

    let rates =
        gamesim_metrics::analysis::NodeInterestRates::load(&node_dir, "nodeZ").unwrap();
    assert!(rates.rate_for(ObjectType::Status).is_none());
    assert!(rates.by_type().is_empty());
}
