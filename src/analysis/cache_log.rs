//! Router cache log parsing.
//!
//! The content router logs one line per cache lookup and one per cache hit,
//! each naming the peer and object type of the sync prefix being resolved.
//! A single sequential scan classifies every line and accumulates
//! per-(peer, object type) lookup/hit counters.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use color_eyre::eyre::{Context, Result};
use regex::Regex;

use super::readers::{read_lines, ReadOutcome};
use super::types::{CacheRate, CacheRateError};

/// Router log file name within a node directory.
pub const NFD_LOG_FILE: &str = "nfd.log";

/// Fixed sync-prefix layout written by the simulator.
const SYNC_PREFIX: &str = "/com/stefanolupo/ndngame/0";

/// Compiled patterns for cache event lines.
pub struct CachePatterns {
    /// Match: "find <prefix>/<peer>/<objectType>/sync" (lookup initiated)
    lookup: Regex,
    /// Match: "matching <prefix>/<peer>/<objectType>/sync" (hit without forwarding)
    hit: Regex,
}

impl CachePatterns {
    /// Patterns matching any peer and any object type.
    pub fn new() -> Self {
        Self::for_target(".*", ".*").expect("Invalid default cache patterns")
    }

    /// Patterns narrowed to a peer pattern and an object type pattern.
    pub fn for_target(peer_pattern: &str, type_pattern: &str) -> Result<Self> {
        let lookup = Regex::new(&format!(
            "find {}/({})/({})/sync",
            SYNC_PREFIX, peer_pattern, type_pattern
        ))
        .with_context(|| format!("Invalid cache lookup pattern for ({}, {})", peer_pattern, type_pattern))?;
        let hit = Regex::new(&format!(
            "matching {}/({})/({})/sync",
            SYNC_PREFIX, peer_pattern, type_pattern
        ))
        .with_context(|| format!("Invalid cache hit pattern for ({}, {})", peer_pattern, type_pattern))?;
        Ok(Self { lookup, hit })
    }
}

impl Default for CachePatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global match-anything patterns instance.
pub static PATTERNS: LazyLock<CachePatterns> = LazyLock::new(CachePatterns::new);

/// A classified router log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Lookup { peer: String, object_type: String },
    Hit { peer: String, object_type: String },
    Unmatched,
}

/// Classify one log line.
///
/// Lookup and hit events are mutually exclusive in the log, so the lookup
/// pattern is checked first and the first match wins.
pub fn classify_line(patterns: &CachePatterns, line: &str) -> CacheEvent {
    if let Some(caps) = patterns.lookup.captures(line) {
        return CacheEvent::Lookup {
            peer: caps[1].to_string(),
            object_type: caps[2].to_string(),
        };
    }
    if let Some(caps) = patterns.hit.captures(line) {
        return CacheEvent::Hit {
            peer: caps[1].to_string(),
            object_type: caps[2].to_string(),
        };
    }
    CacheEvent::Unmatched
}

/// Accumulated cache counters for one node, keyed peer-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheRateTable {
    node: String,
    by_peer: BTreeMap<String, BTreeMap<String, CacheRate>>,
    total: CacheRate,
}

impl CacheRateTable {
    /// Scan raw log lines once, in file order.
    pub fn from_lines(node: &str, lines: &[String], patterns: &CachePatterns) -> Self {
        let mut table = CacheRateTable {
            node: node.to_string(),
            ..Default::default()
        };
        for line in lines {
            match classify_line(patterns, line) {
                CacheEvent::Lookup { peer, object_type } => {
                    table
                        .by_peer
                        .entry(peer)
                        .or_default()
                        .entry(object_type)
                        .or_default()
                        .add_lookup();
                    table.total.add_lookup();
                }
                CacheEvent::Hit { peer, object_type } => {
                    table
                        .by_peer
                        .entry(peer)
                        .or_default()
                        .entry(object_type)
                        .or_default()
                        .add_hit();
                    table.total.add_hit();
                }
                CacheEvent::Unmatched => {}
            }
        }
        table
    }

    /// Load and scan a node's router log. A missing log degrades to an
    /// empty table.
    pub fn load(node_dir: &Path, node: &str) -> Result<Self> {
        match read_lines(&node_dir.join(NFD_LOG_FILE))? {
            ReadOutcome::Found(lines) => {
                let table = Self::from_lines(node, &lines, &PATTERNS);
                log::debug!(
                    "{}: {} cache lookups, {} hits",
                    node,
                    table.total.lookups,
                    table.total.hits
                );
                Ok(table)
            }
            ReadOutcome::NotFound(_) => Ok(CacheRateTable {
                node: node.to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// All counters keyed peer-first, peers in name order.
    pub fn by_peer(&self) -> &BTreeMap<String, BTreeMap<String, CacheRate>> {
        &self.by_peer
    }

    /// All object types observed for one peer.
    pub fn rates_for_peer(&self, peer: &str) -> Option<&BTreeMap<String, CacheRate>> {
        self.by_peer.get(peer)
    }

    /// All peers re-keyed by one object type. A peer with no events of that
    /// type gets a zero-valued entry.
    pub fn rates_for_object_type(&self, object_type: &str) -> BTreeMap<String, CacheRate> {
        self.by_peer
            .iter()
            .map(|(peer, by_type)| {
                (
                    peer.clone(),
                    by_type.get(object_type).copied().unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Global counters across every key.
    pub fn total(&self) -> &CacheRate {
        &self.total
    }

    /// Aggregate hit rate, optionally narrowed to one peer or one object
    /// type. A peer filter takes precedence when both are given.
    pub fn total_rate(
        &self,
        peer: Option<&str>,
        object_type: Option<&str>,
    ) -> Result<f64, CacheRateError> {
        match (peer, object_type) {
            (None, None) => self.total.hit_rate(),
            (Some(peer), _) => {
                let mut combined = CacheRate::default();
                if let Some(by_type) = self.by_peer.get(peer) {
                    for rate in by_type.values() {
                        combined.merge(rate);
                    }
                }
                combined.hit_rate()
            }
            (None, Some(object_type)) => {
                let mut combined = CacheRate::default();
                for rate in self.rates_for_object_type(object_type).values() {
                    combined.merge(rate);
                }
                combined.hit_rate()
            }
        }
    }
}
