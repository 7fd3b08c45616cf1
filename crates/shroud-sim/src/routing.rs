//! Multi-hop path selection with diversity accounting.
//!
//! Every send picks a path under a mix of strategies: the BFS shortest
//! path, a near-shortest path chosen for node/edge diversity, a longer
//! diverse path, or a bounded random walk. Paths that would exceed the hop
//! budget never leave this module; a send with no path inside the budget
//! is skipped by the caller.

use std::collections::{HashMap, HashSet, VecDeque};

use shroud_graph::{LehmerRng, NodeId, PairKey, SocialGraph};

/// Cap on candidate paths enumerated per diverse-path search.
const MAX_DIVERSE_CANDIDATES: usize = 20;

/// Safety cap on partial-path expansions during enumeration.
const MAX_DIVERSE_EXPANSIONS: usize = 5_000;

/// Per-path length discount applied to diversity scores.
const LENGTH_DISCOUNT: f64 = 0.95;

/// Strategy mix for path selection. The remainder after the three listed
/// probabilities is the random-walk share.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub shortest_path_prob: f64,
    pub near_shortest_prob: f64,
    pub diverse_prob: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            shortest_path_prob: 0.40,
            near_shortest_prob: 0.35,
            diverse_prob: 0.20,
        }
    }
}

/// Usage counts over nodes and edges, accumulated across all paths picked
/// in a run. Recently used elements score lower, steering diverse paths
/// away from hot spots.
#[derive(Debug, Default)]
pub struct DiversityTracker {
    node_usage: HashMap<NodeId, u32>,
    edge_usage: HashMap<PairKey, u32>,
}

impl DiversityTracker {
    /// Inverse-usage score of a node.
    pub fn node_score(&self, u: NodeId) -> f64 {
        let usage = self.node_usage.get(&u).copied().unwrap_or(0);
        1.0 / (1.0 + usage as f64 * 0.1)
    }

    /// Inverse-usage score of an edge.
    pub fn edge_score(&self, u: NodeId, v: NodeId) -> f64 {
        let usage = self
            .edge_usage
            .get(&PairKey::new(u, v))
            .copied()
            .unwrap_or(0);
        1.0 / (1.0 + usage as f64 * 0.1)
    }

    /// Record every node and edge of a chosen path.
    pub fn record_path(&mut self, path: &[NodeId]) {
        for &node in path {
            *self.node_usage.entry(node).or_insert(0) += 1;
        }
        for pair in path.windows(2) {
            *self
                .edge_usage
                .entry(PairKey::new(pair[0], pair[1]))
                .or_insert(0) += 1;
        }
    }
}

/// Stateful path selector for one experiment.
#[derive(Debug)]
pub struct PathSelector {
    config: RoutingConfig,
    tracker: DiversityTracker,
}

impl PathSelector {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config,
            tracker: DiversityTracker::default(),
        }
    }

    /// Pick a path from `src` to `dst` within `hmax` hops.
    ///
    /// Returns `None` when no path fits the hop budget; the send is then
    /// skipped. A returned path always starts at `src`, ends at `dst`,
    /// walks existing edges, and has at most `hmax + 1` nodes.
    pub fn select_path(
        &mut self,
        graph: &SocialGraph,
        src: NodeId,
        dst: NodeId,
        hmax: usize,
        rng: &mut LehmerRng,
    ) -> Option<Vec<NodeId>> {
        let max_nodes = hmax + 1;
        let shortest = shortest_path(graph, src, dst, max_nodes)?;

        let c = &self.config;
        let r = rng.next_f64();
        let path = if r < c.shortest_path_prob {
            shortest
        } else if r < c.shortest_path_prob + c.near_shortest_prob {
            let target = shortest.len() + 1 + (rng.next_f64() * 2.0) as usize;
            self.diverse_path(graph, src, dst, target.min(max_nodes), rng)
                .unwrap_or(shortest)
        } else if r < c.shortest_path_prob + c.near_shortest_prob + c.diverse_prob {
            let target = shortest.len() * 3 / 2;
            self.diverse_path(graph, src, dst, target.min(max_nodes), rng)
                .unwrap_or(shortest)
        } else {
            self.random_walk(graph, src, dst, max_nodes, &shortest, rng)
        };

        self.tracker.record_path(&path);
        Some(path)
    }

    /// Enumerate up to [`MAX_DIVERSE_CANDIDATES`] simple paths bounded by
    /// `max_nodes`, score them by accumulated diversity, and roulette-pick
    /// one.
    fn diverse_path(
        &self,
        graph: &SocialGraph,
        src: NodeId,
        dst: NodeId,
        max_nodes: usize,
        rng: &mut LehmerRng,
    ) -> Option<Vec<NodeId>> {
        let mut candidates: Vec<Vec<NodeId>> = Vec::new();
        let mut queue: VecDeque<Vec<NodeId>> = VecDeque::from([vec![src]]);
        let mut expansions = 0usize;

        while let Some(partial) = queue.pop_front() {
            if candidates.len() >= MAX_DIVERSE_CANDIDATES || expansions >= MAX_DIVERSE_EXPANSIONS {
                break;
            }
            expansions += 1;

            let last = *partial.last().expect("partial paths are non-empty");
            if last == dst {
                candidates.push(partial);
                continue;
            }
            if partial.len() >= max_nodes {
                continue;
            }
            for &next in graph.neighbors(last) {
                if !partial.contains(&next) {
                    let mut extended = partial.clone();
                    extended.push(next);
                    queue.push_back(extended);
                }
            }
        }

        if candidates.is_empty() {
            return None;
        }

        let scores: Vec<f64> = candidates.iter().map(|p| self.path_score(p)).collect();
        let total: f64 = scores.iter().sum();
        if total <= 0.0 {
            return candidates.into_iter().next();
        }

        let mut draw = rng.next_f64() * total;
        for (path, score) in candidates.iter().zip(&scores) {
            draw -= score;
            if draw <= 0.0 {
                return Some(path.clone());
            }
        }
        candidates.pop()
    }

    /// Diversity score of a candidate path: node scores plus edge scores,
    /// discounted geometrically by length.
    fn path_score(&self, path: &[NodeId]) -> f64 {
        let nodes: f64 = path.iter().map(|&u| self.tracker.node_score(u)).sum();
        let edges: f64 = path
            .windows(2)
            .map(|w| self.tracker.edge_score(w[0], w[1]))
            .sum();
        (nodes + edges) * LENGTH_DISCOUNT.powi(path.len() as i32)
    }

    /// Bounded random walk toward `dst`.
    ///
    /// Prefers unvisited neighbors; finishes early at the destination with
    /// probability 0.3 when adjacent; closes out via BFS once the hop
    /// budget nears. Falls back to the known shortest path whenever the
    /// walk cannot finish inside the budget.
    fn random_walk(
        &self,
        graph: &SocialGraph,
        src: NodeId,
        dst: NodeId,
        max_nodes: usize,
        shortest: &[NodeId],
        rng: &mut LehmerRng,
    ) -> Vec<NodeId> {
        let mut path = vec![src];
        let mut visited: HashSet<NodeId> = HashSet::from([src]);

        loop {
            let current = *path.last().expect("walk path is non-empty");
            if current == dst {
                return path;
            }

            if graph.has_edge(current, dst) && rng.chance(0.3) {
                path.push(dst);
                return path;
            }

            // Budget nearly spent: only a BFS tail can still reach dst.
            if path.len() + 2 >= max_nodes {
                let remaining_nodes = max_nodes - path.len() + 1;
                match shortest_path(graph, current, dst, remaining_nodes) {
                    Some(tail) => {
                        path.extend(tail.into_iter().skip(1));
                        return path;
                    }
                    None => return shortest.to_vec(),
                }
            }

            let neighbors = graph.neighbors(current);
            if neighbors.is_empty() {
                return shortest.to_vec();
            }
            let unvisited: Vec<NodeId> = neighbors
                .iter()
                .copied()
                .filter(|n| !visited.contains(n))
                .collect();
            let next = if unvisited.is_empty() {
                neighbors[rng.index(neighbors.len())]
            } else {
                unvisited[rng.index(unvisited.len())]
            };
            visited.insert(next);
            path.push(next);
        }
    }
}

/// BFS shortest path with at most `max_nodes` nodes, or `None`.
pub fn shortest_path(
    graph: &SocialGraph,
    src: NodeId,
    dst: NodeId,
    max_nodes: usize,
) -> Option<Vec<NodeId>> {
    if max_nodes == 0 {
        return None;
    }
    if src == dst {
        return Some(vec![src]);
    }

    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut depth: HashMap<NodeId, usize> = HashMap::from([(src, 0)]);
    let mut queue = VecDeque::from([src]);

    while let Some(u) = queue.pop_front() {
        let d = depth[&u];
        if d + 1 >= max_nodes {
            continue;
        }
        for &v in graph.neighbors(u) {
            if depth.contains_key(&v) {
                continue;
            }
            parent.insert(v, u);
            depth.insert(v, d + 1);
            if v == dst {
                let mut path = vec![dst];
                let mut cursor = dst;
                while let Some(&p) = parent.get(&cursor) {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(v);
        }
    }
    None
}
