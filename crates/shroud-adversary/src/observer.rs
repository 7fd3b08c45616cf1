//! Observer placement strategies.

use std::collections::{BTreeSet, VecDeque};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shroud_graph::{LehmerRng, NodeId, SocialGraph};

/// How observer nodes are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// Uniform without replacement.
    Random,
    /// Top-k by degree, ties by id.
    HighDegree,
    /// BFS ball around a random root, padded with random nodes.
    Cluster,
}

impl Placement {
    pub const ALL: [Placement; 3] = [Placement::Random, Placement::HighDegree, Placement::Cluster];

    /// Stable label, matching the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Placement::Random => "random",
            Placement::HighDegree => "high-degree",
            Placement::Cluster => "cluster",
        }
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Placement::Random),
            "high-degree" => Ok(Placement::HighDegree),
            "cluster" => Ok(Placement::Cluster),
            other => Err(format!("unknown placement: {}", other)),
        }
    }
}

/// Select `k` observer nodes from the graph.
///
/// Draws from its own RNG stream; placement never perturbs simulation
/// decisions. Requests larger than the graph return every node.
pub fn place_observers(
    graph: &SocialGraph,
    k: usize,
    placement: Placement,
    rng: &mut LehmerRng,
) -> BTreeSet<NodeId> {
    let n = graph.len();
    let k = k.min(n);
    if k == 0 {
        return BTreeSet::new();
    }

    match placement {
        Placement::Random => {
            let mut ids: Vec<NodeId> = graph.node_ids().collect();
            rng.shuffle(&mut ids);
            ids.into_iter().take(k).collect()
        }
        Placement::HighDegree => {
            let mut ids: Vec<NodeId> = graph.node_ids().collect();
            ids.sort_by_key(|&u| (std::cmp::Reverse(graph.degree(u)), u));
            ids.into_iter().take(k).collect()
        }
        Placement::Cluster => {
            let root = NodeId(rng.index(n) as u32);
            let mut chosen: BTreeSet<NodeId> = BTreeSet::new();
            let mut queue = VecDeque::from([root]);

            while let Some(u) = queue.pop_front() {
                if chosen.len() >= k {
                    break;
                }
                if !chosen.insert(u) {
                    continue;
                }
                for &v in graph.neighbors(u) {
                    if !chosen.contains(&v) {
                        queue.push_back(v);
                    }
                }
            }

            // Component smaller than k: pad with random outsiders.
            if chosen.len() < k {
                let mut rest: Vec<NodeId> =
                    graph.node_ids().filter(|u| !chosen.contains(u)).collect();
                rng.shuffle(&mut rest);
                chosen.extend(rest.into_iter().take(k - chosen.len()));
            }
            chosen
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_graph::Tier;

    /// A hub (node 0) with spokes, plus a detached pair {5, 6}.
    fn hub_graph() -> SocialGraph {
        let mut g = SocialGraph::new(7);
        for i in 1..5 {
            g.add_edge(NodeId(0), NodeId(i), Tier::Friend);
        }
        g.add_edge(NodeId(5), NodeId(6), Tier::Friend);
        g
    }

    #[test]
    fn random_placement_yields_k_distinct() {
        let g = hub_graph();
        let observers = place_observers(&g, 3, Placement::Random, &mut LehmerRng::new(1));
        assert_eq!(observers.len(), 3);
    }

    #[test]
    fn high_degree_picks_the_hub() {
        let g = hub_graph();
        let observers = place_observers(&g, 1, Placement::HighDegree, &mut LehmerRng::new(2));
        assert_eq!(observers, BTreeSet::from([NodeId(0)]));
    }

    #[test]
    fn high_degree_breaks_ties_by_id() {
        let g = hub_graph();
        let observers = place_observers(&g, 3, Placement::HighDegree, &mut LehmerRng::new(3));
        // Hub first, then the lowest-id degree-1 nodes.
        assert!(observers.contains(&NodeId(0)));
        assert!(observers.contains(&NodeId(1)));
        assert!(observers.contains(&NodeId(2)));
    }

    #[test]
    fn cluster_placement_stays_local() {
        // A line graph: a BFS ball of 3 is a contiguous id range.
        let mut g = SocialGraph::new(7);
        for i in 0..6 {
            g.add_edge(NodeId(i), NodeId(i + 1), Tier::Friend);
        }

        let observers = place_observers(&g, 3, Placement::Cluster, &mut LehmerRng::new(4));
        assert_eq!(observers.len(), 3);
        let min = observers.iter().min().unwrap().0;
        let max = observers.iter().max().unwrap().0;
        assert!(max - min <= 2, "cluster spread too wide: {:?}", observers);
    }

    #[test]
    fn cluster_pads_small_components() {
        let g = hub_graph();
        // k exceeds both components: padding must fill up.
        let observers = place_observers(&g, 6, Placement::Cluster, &mut LehmerRng::new(5));
        assert_eq!(observers.len(), 6);
    }

    #[test]
    fn oversized_k_returns_all_nodes() {
        let g = hub_graph();
        let observers = place_observers(&g, 99, Placement::Random, &mut LehmerRng::new(6));
        assert_eq!(observers.len(), 7);
    }

    #[test]
    fn placement_round_trips_labels() {
        for p in Placement::ALL {
            assert_eq!(p.label().parse::<Placement>().unwrap(), p);
        }
        assert!("nearest".parse::<Placement>().is_err());
    }
}
