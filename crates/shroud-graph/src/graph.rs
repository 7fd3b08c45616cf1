//! Social graph adjacency and tier lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tier::Tier;

/// A dense user identifier in `[0, N)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The id as a vector index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical key for an unordered node pair: always `(min, max)`.
///
/// Link histories, conversation threads, and adversary state are all keyed
/// by this, so both directions of an edge land on the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    a: NodeId,
    b: NodeId,
}

impl PairKey {
    /// Build the canonical key for `{x, y}`.
    pub fn new(x: NodeId, y: NodeId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// The smaller endpoint.
    pub fn a(self) -> NodeId {
        self.a
    }

    /// The larger endpoint.
    pub fn b(self) -> NodeId {
        self.b
    }
}

/// An undirected, tiered social graph over dense ids.
///
/// Adjacency is a plain `Vec` indexed by id; tiers live in an ordered map
/// so that edge iteration is deterministic (cover traffic draws one random
/// sample per edge, and iteration order is part of the reproducibility
/// contract).
#[derive(Debug, Clone)]
pub struct SocialGraph {
    adjacency: Vec<Vec<NodeId>>,
    tiers: BTreeMap<PairKey, Tier>,
}

/// Two graphs are equal when they cover the same nodes and carry the same
/// tiered edge set. Adjacency-list order is an artifact of construction
/// order and does not participate.
impl PartialEq for SocialGraph {
    fn eq(&self, other: &Self) -> bool {
        self.adjacency.len() == other.adjacency.len() && self.tiers == other.tiers
    }
}

impl Eq for SocialGraph {}

impl SocialGraph {
    /// An empty graph over `n` nodes.
    pub fn new(n: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); n],
            tiers: BTreeMap::new(),
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// True when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.adjacency.len() as u32).map(NodeId)
    }

    /// Neighbors of `u`.
    pub fn neighbors(&self, u: NodeId) -> &[NodeId] {
        &self.adjacency[u.index()]
    }

    /// Degree of `u`.
    pub fn degree(&self, u: NodeId) -> usize {
        self.adjacency[u.index()].len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.tiers.len()
    }

    /// Insert the undirected edge `{u, v}` with the given tier.
    ///
    /// Re-inserting an existing edge reconciles tiers by keeping the
    /// stronger one. Self-loops are ignored.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, tier: Tier) {
        if u == v {
            return;
        }
        let key = PairKey::new(u, v);
        match self.tiers.get_mut(&key) {
            Some(existing) => {
                *existing = existing.stronger(tier);
            }
            None => {
                self.tiers.insert(key, tier);
                self.adjacency[u.index()].push(v);
                self.adjacency[v.index()].push(u);
            }
        }
    }

    /// True when `{u, v}` is an edge.
    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.tiers.contains_key(&PairKey::new(u, v))
    }

    /// Tier of the edge `{u, v}`, if present. Symmetric by construction.
    pub fn tier(&self, u: NodeId, v: NodeId) -> Option<Tier> {
        self.tiers.get(&PairKey::new(u, v)).copied()
    }

    /// All edges with their tiers, in canonical-pair order.
    pub fn edges(&self) -> impl Iterator<Item = (PairKey, Tier)> + '_ {
        self.tiers.iter().map(|(&k, &t)| (k, t))
    }
}
