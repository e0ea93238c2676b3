//! Analysis configuration.
//!
//! The per-run lookup tables the analysis needs are carried here as explicit
//! values rather than module-level globals: the topology-to-router-node map
//! that splits a run's nodes into game nodes and routers, and the marker
//! lists driving the application log scan.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// Router nodes for one named topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySpec {
    /// Nodes that only forward traffic and do not participate in the game.
    #[serde(default)]
    pub routers: Vec<String>,
}

/// Marker lists for the application log scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogCheckConfig {
    /// Substrings flagging a log line as a suspected error.
    pub error_markers: Vec<String>,
    /// Substrings marking known benign errors to suppress.
    pub ignore_markers: Vec<String>,
}

impl Default for LogCheckConfig {
    fn default() -> Self {
        Self {
            error_markers: vec![
                "exception".to_string(),
                "error [".to_string(),
                "Assertion 'IsLocked()".to_string(),
            ],
            ignore_markers: vec![
                "Type component was null for collision with PROJECTILE".to_string(),
            ],
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Topology {topology:?} lists router {router:?} more than once")]
    DuplicateRouter { topology: String, router: String },
    #[error("Log check configuration contains an empty error marker")]
    EmptyErrorMarker,
}

/// Top-level analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Topology name -> router nodes excluded from game-node analyses.
    pub topologies: HashMap<String, TopologySpec>,
    pub log_check: LogCheckConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let mut topologies = HashMap::new();
        topologies.insert(
            "tree".to_string(),
            TopologySpec {
                routers: vec!["nodeE".to_string(), "nodeF".to_string(), "nodeG".to_string()],
            },
        );
        topologies.insert(
            "dumbbell".to_string(),
            TopologySpec {
                routers: vec!["nodeE".to_string(), "nodeF".to_string()],
            },
        );
        topologies.insert(
            "scalability".to_string(),
            TopologySpec {
                routers: vec![
                    "nodeQ".to_string(),
                    "nodeR".to_string(),
                    "nodeS".to_string(),
                    "nodeT".to_string(),
                ],
            },
        );
        Self {
            topologies,
            log_check: LogCheckConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Router nodes for a topology; unknown topologies have none.
    pub fn router_nodes(&self, topology: &str) -> &[String] {
        self.topologies
            .get(topology)
            .map(|spec| spec.routers.as_slice())
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (topology, spec) in &self.topologies {
            for (index, router) in spec.routers.iter().enumerate() {
                if spec.routers[..index].contains(router) {
                    return Err(ValidationError::DuplicateRouter {
                        topology: topology.clone(),
                        router: router.clone(),
                    });
                }
            }
        }
        if self.log_check.error_markers.iter().any(|m| m.is_empty()) {
            return Err(ValidationError::EmptyErrorMarker);
        }
        Ok(())
    }
}

/// Load and validate configuration from a YAML file.
pub fn load_config(config_path: &Path) -> Result<AnalysisConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .with_context(|| format!("Failed to open config file {}", config_path.display()))?;
    let config: AnalysisConfig = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_topologies_carry_router_lists() {
        let config = AnalysisConfig::default();
        assert_eq!(config.router_nodes("tree"), ["nodeE", "nodeF", "nodeG"]);
        assert_eq!(config.router_nodes("square"), Vec::<String>::new().as_slice());
        config.validate().unwrap();
    }

    #[test]
    fn yaml_config_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "topologies:\n  ring:\n    routers: [nodeX, nodeY]\nlog_check:\n  error_markers: [\"panic\"]\n"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.router_nodes("ring"), ["nodeX", "nodeY"]);
        assert_eq!(config.log_check.error_markers, ["panic"]);
        // Unspecified sections fall back to defaults.
        assert!(!config.log_check.ignore_markers.is_empty());
    }

    #[test]
    fn duplicate_router_fails_validation() {
        let mut config = AnalysisConfig::default();
        config.topologies.insert(
            "bad".to_string(),
            TopologySpec {
                routers: vec!["nodeE".to_string(), "nodeE".to_string()],
            },
        );
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateRouter { .. })
        ));
    }
}
