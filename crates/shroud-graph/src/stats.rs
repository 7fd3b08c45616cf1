//! Graph statistics for ground-truth records.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph::{NodeId, SocialGraph};
use crate::tier::Tier;

/// Edge counts per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDistribution {
    pub intimate: usize,
    pub friend: usize,
    pub acquaintance: usize,
}

/// Summary statistics persisted alongside a generated graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub avg_degree: f64,
    pub min_degree: usize,
    pub max_degree: usize,
    /// Degree -> node count.
    pub degree_distribution: BTreeMap<usize, usize>,
    pub tier_distribution: TierDistribution,
    pub components: usize,
    /// Largest finite eccentricity. 0 for an edgeless graph.
    pub diameter: usize,
    /// Mean local clustering coefficient.
    pub clustering: f64,
}

/// Compute the full statistics block for a graph.
pub fn compute_statistics(graph: &SocialGraph) -> GraphStatistics {
    let n = graph.len();
    let degrees: Vec<usize> = graph.node_ids().map(|u| graph.degree(u)).collect();

    let mut degree_distribution = BTreeMap::new();
    for &d in &degrees {
        *degree_distribution.entry(d).or_insert(0) += 1;
    }

    let mut tier_distribution = TierDistribution::default();
    for (_, tier) in graph.edges() {
        match tier {
            Tier::Intimate => tier_distribution.intimate += 1,
            Tier::Friend => tier_distribution.friend += 1,
            Tier::Acquaintance => tier_distribution.acquaintance += 1,
        }
    }

    GraphStatistics {
        total_nodes: n,
        total_edges: graph.edge_count(),
        avg_degree: if n == 0 {
            0.0
        } else {
            degrees.iter().sum::<usize>() as f64 / n as f64
        },
        min_degree: degrees.iter().copied().min().unwrap_or(0),
        max_degree: degrees.iter().copied().max().unwrap_or(0),
        degree_distribution,
        tier_distribution,
        components: component_count(graph),
        diameter: diameter(graph),
        clustering: average_clustering(graph),
    }
}

/// Number of connected components.
fn component_count(graph: &SocialGraph) -> usize {
    let n = graph.len();
    let mut seen = vec![false; n];
    let mut components = 0;

    for start in graph.node_ids() {
        if seen[start.index()] {
            continue;
        }
        components += 1;
        let mut queue = VecDeque::from([start]);
        seen[start.index()] = true;
        while let Some(u) = queue.pop_front() {
            for &v in graph.neighbors(u) {
                if !seen[v.index()] {
                    seen[v.index()] = true;
                    queue.push_back(v);
                }
            }
        }
    }
    components
}

/// BFS depth to the farthest reachable node.
fn eccentricity(graph: &SocialGraph, start: NodeId) -> usize {
    let mut dist = vec![usize::MAX; graph.len()];
    dist[start.index()] = 0;
    let mut queue = VecDeque::from([start]);
    let mut max = 0;

    while let Some(u) = queue.pop_front() {
        for &v in graph.neighbors(u) {
            if dist[v.index()] == usize::MAX {
                dist[v.index()] = dist[u.index()] + 1;
                max = max.max(dist[v.index()]);
                queue.push_back(v);
            }
        }
    }
    max
}

/// Largest finite eccentricity over all nodes.
fn diameter(graph: &SocialGraph) -> usize {
    graph
        .node_ids()
        .map(|u| eccentricity(graph, u))
        .max()
        .unwrap_or(0)
}

/// Mean local clustering coefficient. Nodes of degree < 2 contribute 0.
fn average_clustering(graph: &SocialGraph) -> f64 {
    let n = graph.len();
    if n == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for u in graph.node_ids() {
        let neighbors = graph.neighbors(u);
        let d = neighbors.len();
        if d < 2 {
            continue;
        }
        let mut closed = 0usize;
        for i in 0..d {
            for j in (i + 1)..d {
                if graph.has_edge(neighbors[i], neighbors[j]) {
                    closed += 1;
                }
            }
        }
        total += closed as f64 / (d * (d - 1) / 2) as f64;
    }
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_graph, GraphConfig};
    use crate::rng::LehmerRng;

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    #[test]
    fn triangle_statistics() {
        let mut g = SocialGraph::new(3);
        g.add_edge(n(0), n(1), Tier::Friend);
        g.add_edge(n(1), n(2), Tier::Friend);
        g.add_edge(n(2), n(0), Tier::Intimate);

        let stats = compute_statistics(&g);
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_edges, 3);
        assert_eq!(stats.components, 1);
        assert_eq!(stats.diameter, 1);
        assert_eq!(stats.clustering, 1.0);
        assert_eq!(stats.tier_distribution.friend, 2);
        assert_eq!(stats.tier_distribution.intimate, 1);
    }

    #[test]
    fn disconnected_components_counted() {
        let mut g = SocialGraph::new(5);
        g.add_edge(n(0), n(1), Tier::Friend);
        g.add_edge(n(2), n(3), Tier::Friend);
        // Node 4 is isolated.

        let stats = compute_statistics(&g);
        assert_eq!(stats.components, 3);
        assert_eq!(stats.min_degree, 0);
        assert_eq!(stats.diameter, 1);
    }

    #[test]
    fn path_graph_diameter() {
        let mut g = SocialGraph::new(4);
        g.add_edge(n(0), n(1), Tier::Friend);
        g.add_edge(n(1), n(2), Tier::Friend);
        g.add_edge(n(2), n(3), Tier::Friend);

        assert_eq!(compute_statistics(&g).diameter, 3);
    }

    #[test]
    fn degree_distribution_sums_to_node_count() {
        let config = GraphConfig {
            users: 75,
            seed: 21,
            ..GraphConfig::default()
        };
        let graph = build_graph(&config, &mut LehmerRng::new(config.seed));
        let stats = compute_statistics(&graph);

        let total: usize = stats.degree_distribution.values().sum();
        assert_eq!(total, 75);
        assert!(stats.avg_degree > 0.0);
        assert!(stats.clustering >= 0.0 && stats.clustering <= 1.0);
    }

    #[test]
    fn statistics_serialize_camel_case() {
        let g = SocialGraph::new(2);
        let json = serde_json::to_string(&compute_statistics(&g)).unwrap();
        assert!(json.contains("totalNodes"));
        assert!(json.contains("degreeDistribution"));
        assert!(json.contains("tierDistribution"));
    }
}
