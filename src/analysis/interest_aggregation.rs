//! Publisher/subscriber interest aggregation.
//!
//! Compares the number of interests a publishing node saw against the sum
//! of the interests every other node expressed toward it. The two totals
//! come from different files on different nodes, so the join is the only
//! place either side can be checked against the other.

use std::collections::BTreeMap;
use std::path::Path;

use color_eyre::eyre::{Context, ContextCompat, Result};

use super::rates::NodeInterestRates;
use super::readers::{read_csv, ReadOutcome};
use super::types::{InterestComparison, ObjectType};

/// File name of a subscriber's per-publisher interest counter CSV.
pub fn counter_file_name(publisher: &str, object_type: ObjectType) -> String {
    format!(
        "sub-{}-interestscounter-{}.csv",
        object_type.rate_label(),
        publisher
    )
}

/// Interest totals for one publishing node, joined across the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct InterestAggregation {
    publisher: String,
    object_type: ObjectType,
    interests_seen: u64,
    by_subscriber: BTreeMap<String, u64>,
}

impl InterestAggregation {
    /// Join the publisher's own totals with every other node's counters.
    ///
    /// `nodes` is the full node list for the run; the publisher itself and
    /// the designated router nodes are excluded from the subscriber side.
    /// A missing counter file contributes 0 to the sum. Returns `None` when
    /// the publisher's own rate CSV is absent, since there is nothing to
    /// compare against.
    pub fn load(
        data_dir: &Path,
        publisher: &str,
        nodes: &[String],
        routers: &[String],
        object_type: ObjectType,
    ) -> Result<Option<Self>> {
        let publisher_rates = NodeInterestRates::load(&data_dir.join(publisher), publisher)?;
        let interests_seen = match publisher_rates.rate_for(object_type) {
            Some(rate) => rate.total_count,
            None => {
                log::warn!(
                    "No {} rate data for publisher {}, skipping interest aggregation",
                    object_type,
                    publisher
                );
                return Ok(None);
            }
        };

        let mut by_subscriber = BTreeMap::new();
        for node in nodes {
            if node == publisher || routers.contains(node) {
                continue;
            }
            let path = data_dir
                .join(node)
                .join(counter_file_name(publisher, object_type));
            let count = match read_csv(&path, false)? {
                ReadOutcome::Found(rows) => match rows.last() {
                    Some(last) => last
                        .get(1)
                        .with_context(|| format!("counter row in {} has no count column", path.display()))?
                        .trim()
                        .parse::<u64>()
                        .with_context(|| format!("unparseable count in {}", path.display()))?,
                    None => {
                        log::warn!("Counter file {} has no data rows", path.display());
                        0
                    }
                },
                ReadOutcome::NotFound(_) => 0,
            };
            by_subscriber.insert(node.clone(), count);
        }

        Ok(Some(Self {
            publisher: publisher.to_string(),
            object_type,
            interests_seen,
            by_subscriber,
        }))
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Per-subscriber counts contributing to the expressed total.
    pub fn by_subscriber(&self) -> &BTreeMap<String, u64> {
        &self.by_subscriber
    }

    /// Seen-versus-expressed totals for the publisher.
    pub fn comparison(&self) -> InterestComparison {
        InterestComparison {
            interests_seen: self.interests_seen,
            interests_expressed: self.by_subscriber.values().sum(),
        }
    }
}
