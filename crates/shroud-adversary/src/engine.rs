//! Local-passive inference engine.
//!
//! Consumes observed sends and link contacts, guesses the recipient of
//! each observed send from temporal volume and co-activity, and
//! periodically rebuilds an estimated social graph with tier labels and
//! confidence scores.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use shroud_graph::{LehmerRng, NodeId, PairKey, SocialGraph};
use shroud_sim::ContactSink;

/// Epochs between estimated-graph rebuilds.
const REBUILD_INTERVAL: u64 = 20;

/// Forward window for immediate volume around a send. Scoring runs at
/// `infer_epoch(t)`, so only epochs <= t can actually contribute.
const IMMEDIATE_DELTA: u64 = 1;

/// Lookback for the co-activity intersection feature.
const INTERSECTION_WINDOW: u64 = 10;

/// Contact-log entries retained for the per-run report sample.
const CONTACT_SAMPLE_LIMIT: usize = 100;

/// Maximum label-propagation passes.
const MAX_LABEL_PASSES: usize = 20;

/// Minimum confidence for an edge to enter the estimate.
const CONFIDENCE_FLOOR: f64 = 0.3;

/// Tier label assigned to an estimated edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatedTier {
    Intimate,
    Friend,
    Acquaintance,
    /// Observed but too quiet to classify.
    Weak,
}

impl EstimatedTier {
    /// Additive scoring bonus for candidates related at this tier.
    fn bonus(self) -> f64 {
        match self {
            EstimatedTier::Intimate => 10.0,
            EstimatedTier::Friend => 5.0,
            EstimatedTier::Acquaintance => 2.0,
            EstimatedTier::Weak => 0.5,
        }
    }

    /// Stable lowercase label, matching the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            EstimatedTier::Intimate => "intimate",
            EstimatedTier::Friend => "friend",
            EstimatedTier::Acquaintance => "acquaintance",
            EstimatedTier::Weak => "weak",
        }
    }
}

/// One edge of the estimated graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedEdge {
    pub tier: EstimatedTier,
    pub confidence: f64,
    /// Composite relationship score; also feeds recipient scoring.
    pub score: f64,
}

/// The adversary's current picture of the social graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimatedGraph {
    edges: BTreeMap<PairKey, EstimatedEdge>,
}

impl EstimatedGraph {
    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<&EstimatedEdge> {
        self.edges.get(&PairKey::new(a, b))
    }

    pub fn edges(&self) -> impl Iterator<Item = (PairKey, &EstimatedEdge)> {
        self.edges.iter().map(|(&k, e)| (k, e))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes appearing on at least one estimated edge, ascending.
    fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = BTreeSet::new();
        for pair in self.edges.keys() {
            nodes.insert(pair.a());
            nodes.insert(pair.b());
        }
        nodes.into_iter().collect()
    }

    fn neighbors(&self, u: NodeId) -> Vec<NodeId> {
        self.edges
            .keys()
            .filter_map(|pair| {
                if pair.a() == u {
                    Some(pair.b())
                } else if pair.b() == u {
                    Some(pair.a())
                } else {
                    None
                }
            })
            .collect()
    }
}

/// A recipient guess for one observed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientGuess {
    pub t: u64,
    pub sender: NodeId,
    pub recipient: NodeId,
}

/// One observed contact, kept for the report sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLogEntry {
    pub t: u64,
    pub a: NodeId,
    pub b: NodeId,
    pub count: u64,
}

/// Everything the adversary produced over a run.
#[derive(Debug, Clone)]
pub struct AdversaryReport {
    pub guesses: Vec<RecipientGuess>,
    pub estimate: EstimatedGraph,
    /// Distinct community labels found by label propagation. Label
    /// identity is deliberately not reported.
    pub communities: usize,
    pub contact_sample: Vec<ContactLogEntry>,
}

/// The local-passive adversary.
pub struct AdversaryEngine {
    observed: BTreeSet<NodeId>,
    /// Per-link packet counts by epoch.
    link_counts: BTreeMap<PairKey, BTreeMap<u64, u64>>,
    /// Observed senders per epoch.
    sends: BTreeMap<u64, Vec<NodeId>>,
    /// Nodes seen on any observed contact, per epoch.
    active: BTreeMap<u64, BTreeSet<NodeId>>,
    /// Directed guess history: how often `s` was guessed to message `v`.
    guess_counts: BTreeMap<(NodeId, NodeId), u64>,
    guesses: Vec<RecipientGuess>,
    estimate: EstimatedGraph,
    contact_sample: Vec<ContactLogEntry>,
    /// Stream for the label-propagation shuffles.
    rng: LehmerRng,
}

impl AdversaryEngine {
    /// Create an engine watching the given nodes.
    pub fn new(observed: BTreeSet<NodeId>, seed: i64) -> Self {
        Self {
            observed,
            link_counts: BTreeMap::new(),
            sends: BTreeMap::new(),
            active: BTreeMap::new(),
            guess_counts: BTreeMap::new(),
            guesses: Vec::new(),
            estimate: EstimatedGraph::default(),
            contact_sample: Vec::new(),
            rng: LehmerRng::new(seed),
        }
    }

    pub fn observed(&self) -> &BTreeSet<NodeId> {
        &self.observed
    }

    pub fn guesses(&self) -> &[RecipientGuess] {
        &self.guesses
    }

    /// Finalize: rebuild the estimate, run community detection, and emit
    /// the report.
    pub fn results(&mut self) -> AdversaryReport {
        self.rebuild_estimate();
        let communities = self.community_count();
        AdversaryReport {
            guesses: self.guesses.clone(),
            estimate: self.estimate.clone(),
            communities,
            contact_sample: self.contact_sample.clone(),
        }
    }

    /// Score one observed send and record the best guess.
    fn score_send(&mut self, t: u64, sender: NodeId, graph: &SocialGraph) {
        let mut adjacent: Vec<NodeId> = graph.neighbors(sender).to_vec();
        adjacent.sort_unstable();

        // Prefer candidates the estimate already links to the sender.
        let known: Vec<NodeId> = adjacent
            .iter()
            .copied()
            .filter(|&v| self.estimate.edge(sender, v).is_some())
            .collect();
        let candidates = if known.is_empty() { adjacent } else { known };
        if candidates.is_empty() {
            return;
        }

        let mut best: Option<(NodeId, f64)> = None;
        for &v in &candidates {
            let score = self.candidate_score(t, sender, v);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((v, score)),
            }
        }

        let (recipient, _) = best.expect("candidates are non-empty");
        self.guesses.push(RecipientGuess {
            t,
            sender,
            recipient,
        });
        *self.guess_counts.entry((sender, recipient)).or_insert(0) += 1;
    }

    /// Combined temporal + relationship score for one candidate.
    fn candidate_score(&self, t: u64, s: NodeId, v: NodeId) -> f64 {
        let pair = PairKey::new(s, v);

        let immediate: u64 = (t..=t + IMMEDIATE_DELTA)
            .filter_map(|tt| self.link_counts.get(&pair).and_then(|c| c.get(&tt)))
            .sum();

        let historical = self.guess_counts.get(&(s, v)).copied().unwrap_or(0);

        let lo = t.saturating_sub(INTERSECTION_WINDOW);
        let mut sent_epochs = 0u64;
        let mut co_active = 0u64;
        for tt in lo..t {
            let sent = self.sends.get(&tt).map(|l| l.contains(&s)).unwrap_or(false);
            if !sent {
                continue;
            }
            sent_epochs += 1;
            let active_now = self.active.get(&tt).map(|a| a.contains(&v)).unwrap_or(false);
            let active_next = self
                .active
                .get(&(tt + 1))
                .map(|a| a.contains(&v))
                .unwrap_or(false);
            if active_now || active_next {
                co_active += 1;
            }
        }
        let intersection = if sent_epochs == 0 {
            0.0
        } else {
            co_active as f64 / sent_epochs as f64
        };

        let (relationship, bonus) = match self.estimate.edge(s, v) {
            Some(edge) => (edge.score, edge.tier.bonus()),
            None => (0.0, 0.0),
        };

        0.7 * (0.5 * immediate as f64 + 0.2 * historical as f64 + 0.1 * intersection)
            + 0.3 * (0.001 * relationship + bonus)
    }

    /// Rebuild the estimated graph from accumulated link evidence.
    fn rebuild_estimate(&mut self) {
        let total_epochs = self.active.len().max(1);
        let mut edges = BTreeMap::new();

        for (&pair, counts) in &self.link_counts {
            let volume: u64 = counts.values().sum();

            let both_active = self
                .active
                .values()
                .filter(|set| set.contains(&pair.a()) && set.contains(&pair.b()))
                .count();
            let co_activity = both_active as f64 / total_epochs as f64;

            let forward = self
                .guess_counts
                .get(&(pair.a(), pair.b()))
                .copied()
                .unwrap_or(0);
            let backward = self
                .guess_counts
                .get(&(pair.b(), pair.a()))
                .copied()
                .unwrap_or(0);
            let reciprocity =
                forward.min(backward) as f64 / (forward.max(backward) + 1) as f64;

            let consistency = 1.0 / (1.0 + count_variance(counts).sqrt());

            let score = 0.4 * volume as f64
                + 0.2 * co_activity * 100.0
                + 0.2 * reciprocity * 50.0
                + 0.2 * consistency * 50.0;

            let vol = volume as f64;
            let (tier, base_confidence) = if vol >= 100.0 {
                (EstimatedTier::Intimate, (vol / 200.0).min(0.9))
            } else if vol >= 30.0 {
                (EstimatedTier::Friend, (vol / 60.0).min(0.8))
            } else if vol >= 5.0 {
                (EstimatedTier::Acquaintance, (vol / 15.0).min(0.7))
            } else {
                (EstimatedTier::Weak, 0.4)
            };
            let confidence =
                base_confidence * (0.7 + 0.3 * reciprocity) * (0.8 + 0.2 * consistency);

            if confidence >= CONFIDENCE_FLOOR {
                edges.insert(
                    pair,
                    EstimatedEdge {
                        tier,
                        confidence,
                        score,
                    },
                );
            }
        }

        self.estimate = EstimatedGraph { edges };
    }

    /// Count communities in the estimate by label propagation.
    ///
    /// Node order is shuffled each pass, so labels are unstable across
    /// seeds; only the distinct count is meaningful.
    fn community_count(&mut self) -> usize {
        let mut nodes = self.estimate.nodes();
        if nodes.is_empty() {
            return 0;
        }

        let mut labels: BTreeMap<NodeId, NodeId> =
            nodes.iter().map(|&u| (u, u)).collect();

        for _ in 0..MAX_LABEL_PASSES {
            self.rng.shuffle(&mut nodes);
            let mut changed = false;

            for &u in &nodes {
                let current = labels[&u];
                let mut tally: BTreeMap<NodeId, usize> = BTreeMap::new();
                for v in self.estimate.neighbors(u) {
                    *tally.entry(labels[&v]).or_insert(0) += 1;
                }
                let Some((&majority, &top)) =
                    tally.iter().max_by_key(|&(label, count)| (*count, *label))
                else {
                    continue;
                };
                // A tie between labels keeps the current one.
                let tied = tally.values().filter(|&&c| c == top).count() > 1;
                if !tied && majority != current {
                    labels.insert(u, majority);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        labels.values().collect::<BTreeSet<_>>().len()
    }
}

impl ContactSink for AdversaryEngine {
    fn note_send(&mut self, t: u64, sender: NodeId) {
        if self.observed.contains(&sender) {
            self.sends.entry(t).or_default().push(sender);
        }
    }

    fn note_contact(&mut self, t: u64, a: NodeId, b: NodeId, count: u64) {
        if !self.observed.contains(&a) && !self.observed.contains(&b) {
            return;
        }
        let pair = PairKey::new(a, b);
        *self
            .link_counts
            .entry(pair)
            .or_default()
            .entry(t)
            .or_insert(0) += count;

        let active = self.active.entry(t).or_default();
        active.insert(a);
        active.insert(b);

        if self.contact_sample.len() < CONTACT_SAMPLE_LIMIT {
            self.contact_sample.push(ContactLogEntry { t, a, b, count });
        }
    }

    fn infer_epoch(&mut self, t: u64, graph: &SocialGraph) {
        let senders = self.sends.get(&t).cloned().unwrap_or_default();
        for sender in senders {
            self.score_send(t, sender, graph);
        }
        if t > 0 && t % REBUILD_INTERVAL == 0 {
            self.rebuild_estimate();
        }
    }
}

/// Population variance of per-epoch counts.
fn count_variance(counts: &BTreeMap<u64, u64>) -> f64 {
    let n = counts.len();
    if n == 0 {
        return 0.0;
    }
    let mean = counts.values().sum::<u64>() as f64 / n as f64;
    counts
        .values()
        .map(|&c| {
            let d = c as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64
}
