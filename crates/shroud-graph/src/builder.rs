//! Tiered small-world graph construction.
//!
//! Each node picks per-tier neighbor sets from distance-banded candidates
//! via weighted sampling, then a bridge pass adds a few long-range edges.
//! Construction consumes a single RNG stream, so a seed pins the graph.

use std::collections::HashSet;

use crate::graph::{NodeId, SocialGraph};
use crate::rng::LehmerRng;
use crate::tier::Tier;

/// Guards the inverse-distance weight against division by zero.
const DISTANCE_EPSILON: f64 = 1e-6;

/// Parameters for graph construction.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Number of users.
    pub users: usize,
    /// Fraction of peers targeted as intimate ties.
    pub p_intimate: f64,
    /// Fraction of peers targeted as friends.
    pub p_friend: f64,
    /// Fraction of peers targeted as acquaintances.
    pub p_acquaintance: f64,
    /// Per-node probability of receiving long-range bridge edges.
    pub p_bridge: f64,
    /// Experiment seed.
    pub seed: i64,
    /// Candidate band width as a multiple of the tier target.
    pub band_multiplier: usize,
    /// Bridge edges added per bridging node.
    pub bridge_sample: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            users: 100,
            p_intimate: 0.02,
            p_friend: 0.05,
            p_acquaintance: 0.10,
            p_bridge: 0.1,
            seed: 1,
            band_multiplier: 2,
            bridge_sample: 3,
        }
    }
}

impl GraphConfig {
    /// Per-node tier targets `(intimate, friend, acquaintance)`.
    ///
    /// The floors guarantee every node has at least one intimate tie and
    /// strictly more friends than intimates, more acquaintances than
    /// friends.
    pub fn tier_targets(&self) -> (usize, usize, usize) {
        let peers = self.users.saturating_sub(1) as f64;
        let k_int = ((self.p_intimate * peers) as usize).max(1);
        let k_fri = ((self.p_friend * peers) as usize).max(k_int + 2);
        let k_acq = ((self.p_acquaintance * peers) as usize).max(k_fri + 3);
        (k_int, k_fri, k_acq)
    }
}

/// Deterministic pseudo-distance between two nodes.
///
/// Hashes the ordered id pair onto `[0, 1)`, then squares and scales by `n`
/// so that most pairs look far apart and a few look close, which is what
/// gives the banded selection its clustering bias.
fn pseudo_distance(i: NodeId, j: NodeId, n: usize) -> f64 {
    let mixed = (i.0 as u64)
        .wrapping_mul(2_654_435_761)
        .wrapping_add((j.0 as u64).wrapping_mul(2_246_822_519))
        % (1u64 << 32);
    let unit = mixed as f64 / (1u64 << 32) as f64;
    unit * unit * n as f64
}

/// Build a tiered social graph.
///
/// The RNG stream is consumed in a fixed order (tier selection for node 0,
/// 1, ..., then the bridge pass), so two calls with equal configs and
/// freshly seeded streams produce identical graphs.
pub fn build_graph(config: &GraphConfig, rng: &mut LehmerRng) -> SocialGraph {
    let n = config.users;
    let mut graph = SocialGraph::new(n);
    if n < 2 {
        return graph;
    }

    let (k_int, k_fri, k_acq) = config.tier_targets();
    let tier_plan = [
        (Tier::Intimate, k_int),
        (Tier::Friend, k_fri),
        (Tier::Acquaintance, k_acq),
    ];

    for u in graph.node_ids().collect::<Vec<_>>() {
        // Peers ordered nearest first; distance ties fall back to id order
        // so the ordering stays total.
        let mut peers: Vec<(NodeId, f64)> = (0..n as u32)
            .map(NodeId)
            .filter(|&v| v != u)
            .map(|v| (v, pseudo_distance(u, v, n)))
            .collect();
        peers.sort_by(|x, y| x.1.partial_cmp(&y.1).unwrap().then(x.0.cmp(&y.0)));

        let mut picked: HashSet<NodeId> = HashSet::new();
        for (tier, k) in tier_plan {
            let band_size = k.max(config.band_multiplier * k);
            let band: Vec<(NodeId, f64)> = peers
                .iter()
                .filter(|(v, _)| !picked.contains(v))
                .take(band_size)
                .copied()
                .collect();

            for v in weighted_sample(&band, k, rng) {
                graph.add_edge(u, v, tier);
                picked.insert(v);
            }
        }
    }

    bridge_pass(config, &mut graph, rng);
    graph
}

/// Efraimidis–Spirakis weighted sampling without replacement.
///
/// Each candidate gets the key `u^(1/w)` with `w = 1/(dist + eps)`; the
/// `k` largest keys win.
fn weighted_sample(band: &[(NodeId, f64)], k: usize, rng: &mut LehmerRng) -> Vec<NodeId> {
    let mut keyed: Vec<(f64, NodeId)> = band
        .iter()
        .map(|&(v, dist)| {
            let weight = 1.0 / (dist + DISTANCE_EPSILON);
            let key = rng.next_f64().powf(1.0 / weight);
            (key, v)
        })
        .collect();
    keyed.sort_by(|x, y| y.0.partial_cmp(&x.0).unwrap().then(x.1.cmp(&y.1)));
    keyed.into_iter().take(k).map(|(_, v)| v).collect()
}

/// Long-range bridge edges.
///
/// Bridging nodes walk their non-neighbors in id order, including each with
/// probability `(wanted - added) / remaining`, which selects exactly
/// `bridge_sample` of them uniformly when enough remain.
fn bridge_pass(config: &GraphConfig, graph: &mut SocialGraph, rng: &mut LehmerRng) {
    let n = graph.len();
    for u in 0..n as u32 {
        let u = NodeId(u);
        if !rng.chance(config.p_bridge) {
            continue;
        }

        let non_neighbors: Vec<NodeId> = (0..n as u32)
            .map(NodeId)
            .filter(|&v| v != u && !graph.has_edge(u, v))
            .collect();

        let mut added = 0usize;
        for (idx, &v) in non_neighbors.iter().enumerate() {
            if added >= config.bridge_sample {
                break;
            }
            let remaining = non_neighbors.len() - idx;
            let p = (config.bridge_sample - added) as f64 / remaining as f64;
            if rng.next_f64() < p {
                graph.add_edge(u, v, Tier::Acquaintance);
                added += 1;
            }
        }
    }
}
