//! Report generation for simulation metrics analysis.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::types::*;

/// Shorten a node name for display ("nodeB" becomes "B"). The aggregate
/// node keeps a single letter.
pub fn clean_node_name(name: &str) -> &str {
    if name == "nodeNN" {
        "N"
    } else {
        name.strip_prefix("node").unwrap_or(name)
    }
}

/// Clear and recreate the report output directory for a batch pass.
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("Failed to clear output directory {}", output_dir.display()))?;
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    Ok(())
}

/// Generate JSON report
pub fn generate_json_report(report: &FullAnalysisReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(report: &FullAnalysisReport, output_path: &Path) -> Result<()> {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(80));
    lines.push("                     SIMULATION METRICS ANALYSIS".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Analysis Date: {}", report.metadata.analysis_timestamp));
    lines.push(format!("Data Directory: {}", report.metadata.data_dir));
    lines.push(format!("Run: {}", report.metadata.run_dir));
    lines.push(format!("Topology: {}", report.metadata.topology));
    lines.push(format!(
        "Nodes: {} ({} game, {} router)",
        report.metadata.total_nodes, report.metadata.game_nodes, report.metadata.router_nodes
    ));
    lines.push(String::new());

    if !report.interest_rates.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                          INTEREST RATES".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (node, by_type) in &report.interest_rates {
            for (object_type, summary) in by_type {
                lines.push(format!(
                    "  {} {}: count {}, rate {:.2} / sec",
                    clean_node_name(node),
                    object_type,
                    summary.total_count,
                    summary.final_mean_rate
                ));
            }
        }
        lines.push(String::new());
    }

    if !report.interest_comparisons.is_empty() {
        lines.push("=".repeat(80));
        lines.push("              INTERESTS SEEN VS INTERESTS EXPRESSED".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (node, comparison) in &report.interest_comparisons {
            let ratio = if comparison.interests_expressed > 0 {
                format!(
                    "{:.0}%",
                    100.0 * comparison.interests_seen as f64
                        / comparison.interests_expressed as f64
                )
            } else {
                "n/a".to_string()
            };
            lines.push(format!(
                "  {}: seen {}, expressed {} (aggregation factor {})",
                clean_node_name(node),
                comparison.interests_seen,
                comparison.interests_expressed,
                ratio
            ));
        }
        lines.push(String::new());
    }

    if !report.cache.total_rate_by_node.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                          CACHE HIT RATES".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (node, rate) in &report.cache.total_rate_by_node {
            match rate {
                Some(rate) => lines.push(format!(
                    "  {}: {:.1}%",
                    clean_node_name(node),
                    rate * 100.0
                )),
                None => lines.push(format!("  {}: no lookups", clean_node_name(node))),
            }
        }
        lines.push(String::new());

        if !report.cache.router_rates_by_peer.is_empty() {
            lines.push("Router cache rates by consuming peer:".to_string());
            for (peer, by_router) in &report.cache.router_rates_by_peer {
                for (router, rate) in by_router {
                    lines.push(format!(
                        "  {} via {}: {:.1}%",
                        clean_node_name(peer),
                        clean_node_name(router),
                        rate * 100.0
                    ));
                }
            }
            lines.push(String::new());
        }
    }

    if !report.dead_reckoning.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                  DEAD-RECKONING THROTTLING DECISIONS".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (node, breakdown) in &report.dead_reckoning {
            let percentages = breakdown.counters.percentages();
            let formatted: Vec<String> = percentages
                .iter()
                .map(|(category, pct)| format!("{} {:.1}%", category, pct))
                .collect();
            lines.push(format!(
                "  {}: total {}, actionable {:.1}% ({})",
                clean_node_name(node),
                breakdown.total,
                breakdown.actionable_fraction * 100.0,
                formatted.join(", ")
            ));
        }
        lines.push(String::new());
    }

    if !report.packet_times.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                       STATUS ROUND TRIP TIMES".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (node, summary) in &report.packet_times {
            lines.push(format!(
                "  {}: {} samples, mean {:.1}ms, median {:.1}ms, p95 {:.1}ms",
                clean_node_name(node),
                summary.samples,
                summary.mean,
                summary.median,
                summary.p95
            ));
        }
        lines.push(String::new());
    }

    if !report.status_deltas.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                         POSITION DELTAS (GWU)".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (node, summary) in &report.status_deltas {
            lines.push(format!(
                "  {}: {} samples, mean {:.2}, median {:.2}, p95 {:.2}",
                clean_node_name(node),
                summary.samples,
                summary.mean,
                summary.median,
                summary.p95
            ));
        }
        lines.push(String::new());
    }

    if !report.producer_rate_comparison.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                    PRODUCER RATES ACROSS RUNS".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (dir, by_node) in &report.producer_rate_comparison {
            for (node, rate) in by_node {
                lines.push(format!(
                    "  {} {}: {:.2} / sec",
                    dir,
                    clean_node_name(node),
                    rate
                ));
            }
        }
        lines.push(String::new());
    }

    if !report.log_findings.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                      APPLICATION LOG FINDINGS".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for (node, findings) in &report.log_findings {
            lines.push(format!("{} ({} findings):", node, findings.len()));
            for finding in findings {
                lines.push(format!("  line {}: {}", finding.line_number, finding.line));
            }
        }
        lines.push(String::new());
    }

    lines.push("=".repeat(80));

    let content = lines.join("\n");
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Write the JSON and text reports into a freshly cleared output directory.
pub fn write_reports(report: &FullAnalysisReport, output_dir: &Path) -> Result<()> {
    prepare_output_dir(output_dir)?;
    generate_json_report(report, &output_dir.join("full_report.json"))?;
    generate_text_report(report, &output_dir.join("report.txt"))?;
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &FullAnalysisReport) {
    println!("\n=== SIMULATION METRICS SUMMARY ===\n");
    println!("Run: {}", report.metadata.run_dir);
    println!(
        "Nodes: {} ({} game, {} router)",
        report.metadata.total_nodes, report.metadata.game_nodes, report.metadata.router_nodes
    );

    if !report.interest_comparisons.is_empty() {
        println!("\nInterest comparisons:");
        for (node, comparison) in &report.interest_comparisons {
            println!(
                "  {}: seen {}, expressed {}",
                clean_node_name(node),
                comparison.interests_seen,
                comparison.interests_expressed
            );
        }
    }

    if !report.cache.total_rate_by_node.is_empty() {
        println!("\nCache hit rates:");
        for (node, rate) in &report.cache.total_rate_by_node {
            match rate {
                Some(rate) => println!("  {}: {:.1}%", clean_node_name(node), rate * 100.0),
                None => println!("  {}: no lookups", clean_node_name(node)),
            }
        }
    }

    if !report.log_findings.is_empty() {
        let total: usize = report.log_findings.values().map(Vec::len).sum();
        println!("\nApplication log findings: {}", total);
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_node_name_strips_prefix() {
        assert_eq!(clean_node_name("nodeB"), "B");
        assert_eq!(clean_node_name("nodeNN"), "N");
        assert_eq!(clean_node_name("router1"), "router1");
    }
}
