//! Ground-truth store: generated graphs persisted as JSON.
//!
//! Records are keyed by `(users, seed, tier probabilities)`. A missing
//! record is generated and persisted; an existing one is loaded verbatim.
//! Generation is deterministic, so regenerating a key always reproduces
//! the same graph.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shroud_graph::{
    build_graph, compute_statistics, GraphConfig, GraphStatistics, LehmerRng, NodeId, SocialGraph,
    Tier,
};

use crate::config::TierProbabilities;
use crate::error::{Error, Result};

/// Record format version.
const RECORD_VERSION: u32 = 1;

/// Identifying metadata of a ground-truth record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruthMetadata {
    #[serde(rename = "N")]
    pub n: usize,
    pub seed: i64,
    pub tier_probabilities: TierProbabilities,
    pub generated_at: String,
    pub version: u32,
}

/// A persisted graph with tier map and statistics.
///
/// Adjacency and tiers use string ids, matching the on-disk JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruthRecord {
    pub metadata: GroundTruthMetadata,
    pub graph: BTreeMap<String, Vec<u32>>,
    pub tier_map: BTreeMap<String, BTreeMap<String, Tier>>,
    pub statistics: GraphStatistics,
}

impl GroundTruthRecord {
    /// Serialize a built graph into record form.
    pub fn from_graph(
        graph: &SocialGraph,
        n: usize,
        seed: i64,
        probabilities: TierProbabilities,
    ) -> Self {
        let mut adjacency = BTreeMap::new();
        let mut tier_map = BTreeMap::new();

        for u in graph.node_ids() {
            let mut neighbors: Vec<u32> = graph.neighbors(u).iter().map(|v| v.0).collect();
            neighbors.sort_unstable();
            adjacency.insert(u.to_string(), neighbors);

            let tiers: BTreeMap<String, Tier> = graph
                .neighbors(u)
                .iter()
                .filter_map(|&v| graph.tier(u, v).map(|t| (v.to_string(), t)))
                .collect();
            tier_map.insert(u.to_string(), tiers);
        }

        Self {
            metadata: GroundTruthMetadata {
                n,
                seed,
                tier_probabilities: probabilities,
                generated_at: chrono::Utc::now().to_rfc3339(),
                version: RECORD_VERSION,
            },
            graph: adjacency,
            tier_map,
            statistics: compute_statistics(graph),
        }
    }

    /// Reconstruct the in-memory graph from a record.
    pub fn to_graph(&self) -> Result<SocialGraph> {
        let n = self.metadata.n;
        let mut graph = SocialGraph::new(n);

        for (from, tiers) in &self.tier_map {
            let u = parse_id(from, n)?;
            for (to, &tier) in tiers {
                let v = parse_id(to, n)?;
                graph.add_edge(u, v, tier);
            }
        }

        // Every adjacency entry must be backed by a tier entry.
        for (from, neighbors) in &self.graph {
            let u = parse_id(from, n)?;
            for &v in neighbors {
                if !graph.has_edge(u, NodeId(v)) {
                    return Err(Error::InvalidRecord(format!(
                        "edge {}-{} has no tier",
                        from, v
                    )));
                }
            }
        }
        Ok(graph)
    }
}

fn parse_id(raw: &str, n: usize) -> Result<NodeId> {
    let id: u32 = raw
        .parse()
        .map_err(|_| Error::InvalidRecord(format!("bad node id: {}", raw)))?;
    if id as usize >= n {
        return Err(Error::InvalidRecord(format!("node id out of range: {}", id)));
    }
    Ok(NodeId(id))
}

/// Directory-backed store of ground-truth records.
pub struct GroundTruthStore {
    dir: PathBuf,
}

impl GroundTruthStore {
    /// Open or create the store directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// Record filename for a key, probabilities with dots replaced by
    /// underscores.
    pub fn filename(n: usize, seed: i64, p: TierProbabilities) -> String {
        let fmt = |v: f64| format!("{}", v).replace('.', "_");
        format!(
            "graph_N{}_seed{}_{}-{}-{}.json",
            n,
            seed,
            fmt(p.intimate),
            fmt(p.friend),
            fmt(p.acquaintance)
        )
    }

    /// Load the record for a key, generating and persisting it first if
    /// missing. Returns the record, the reconstructed graph, and the
    /// record filename.
    pub fn load_or_generate(
        &self,
        n: usize,
        seed: i64,
        probabilities: TierProbabilities,
    ) -> Result<(GroundTruthRecord, SocialGraph, String)> {
        let filename = Self::filename(n, seed, probabilities);
        let path = self.dir.join(&filename);

        if path.exists() {
            let data = std::fs::read(&path)?;
            let record: GroundTruthRecord = serde_json::from_slice(&data)?;
            let graph = record.to_graph()?;
            return Ok((record, graph, filename));
        }

        let config = GraphConfig {
            users: n,
            p_intimate: probabilities.intimate,
            p_friend: probabilities.friend,
            p_acquaintance: probabilities.acquaintance,
            seed,
            ..GraphConfig::default()
        };
        let graph = build_graph(&config, &mut LehmerRng::new(seed));
        let record = GroundTruthRecord::from_graph(&graph, n, seed, probabilities);

        std::fs::write(&path, serde_json::to_vec_pretty(&record)?)?;
        Ok((record, graph, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn probs() -> TierProbabilities {
        TierProbabilities::default()
    }

    #[test]
    fn filename_replaces_dots() {
        let name = GroundTruthStore::filename(75, 21, probs());
        assert_eq!(name, "graph_N75_seed21_0_02-0_05-0_1.json");
    }

    #[test]
    fn generate_then_reload_is_identical() {
        let dir = tempdir().unwrap();
        let store = GroundTruthStore::open(dir.path()).unwrap();

        let (record, graph, filename) = store.load_or_generate(75, 21, probs()).unwrap();
        assert!(dir.path().join(&filename).exists());

        // Second call must read from disk and agree exactly.
        let (reloaded, graph2, _) = store.load_or_generate(75, 21, probs()).unwrap();
        assert_eq!(record, reloaded);
        assert_eq!(graph, graph2);
    }

    #[test]
    fn record_round_trips_through_graph() {
        let dir = tempdir().unwrap();
        let store = GroundTruthStore::open(dir.path()).unwrap();

        let (record, graph, _) = store.load_or_generate(50, 3, probs()).unwrap();
        let rebuilt = record.to_graph().unwrap();
        assert_eq!(graph, rebuilt);
        assert_eq!(record.statistics.total_edges, graph.edge_count());
    }

    #[test]
    fn distinct_keys_get_distinct_files() {
        let dir = tempdir().unwrap();
        let store = GroundTruthStore::open(dir.path()).unwrap();

        store.load_or_generate(50, 1, probs()).unwrap();
        store.load_or_generate(50, 2, probs()).unwrap();

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[test]
    fn malformed_record_is_an_error() {
        let record = GroundTruthRecord {
            metadata: GroundTruthMetadata {
                n: 2,
                seed: 1,
                tier_probabilities: probs(),
                generated_at: String::new(),
                version: RECORD_VERSION,
            },
            graph: BTreeMap::from([("0".into(), vec![7])]),
            tier_map: BTreeMap::new(),
            statistics: compute_statistics(&SocialGraph::new(2)),
        };
        assert!(record.to_graph().is_err());
    }
}
