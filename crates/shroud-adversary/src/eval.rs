//! Evaluation of adversary output against ground truth.
//!
//! The only place where ground truth and adversary output meet. Nothing
//! here feeds back into inference.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use shroud_graph::{NodeId, PairKey, SocialGraph, Tier};
use shroud_sim::{ConversationStats, SentLog};

use crate::engine::{EstimatedGraph, EstimatedTier, RecipientGuess};

/// Per-guess recipient accuracy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyReport {
    pub correct: u64,
    pub total: u64,
    /// `correct / total`; 0 when there were no guesses.
    pub accuracy: f64,
}

/// Precision/recall/F1 triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Graph reconstruction quality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphReconstructionReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub true_edges: usize,
    pub estimated_edges: usize,
    /// Per-tier metrics keyed by tier label.
    pub tier_metrics: BTreeMap<String, TierMetrics>,
    /// True tier -> predicted label -> count, over edges present in both
    /// graphs. Predicted `weak` keeps its own column.
    pub tier_confusion: BTreeMap<String, BTreeMap<String, u64>>,
    pub communities: usize,
}

/// Cover-traffic figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverTrafficReport {
    pub dummy_count: u64,
    pub total_messages: u64,
    pub dummy_fraction: f64,
    /// Shannon entropy (bits) of the dummy-sender distribution.
    pub sender_entropy: f64,
}

/// Routing behavior over the whole log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingReport {
    /// Mean path length in nodes.
    pub avg_path_length: f64,
    /// Distinct paths over total messages.
    pub path_diversity: f64,
    /// Share of paths with at most 3 nodes.
    pub short_path_share: f64,
}

/// Conversation behavior over the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReport {
    pub replies: u64,
    pub mean_reply_delay: f64,
    pub threads: usize,
    pub mean_thread_messages: f64,
}

/// Score recipient guesses against the majority true recipient.
///
/// For each `(t, sender)` the majority recipient over all logged messages
/// (dummies included; the adversary's send feed does not distinguish them)
/// is the reference; ties resolve to the lowest recipient id.
pub fn guess_accuracy(log: &SentLog, guesses: &[RecipientGuess]) -> AccuracyReport {
    let mut tallies: BTreeMap<(u64, NodeId), BTreeMap<NodeId, u64>> = BTreeMap::new();
    for record in log.iter() {
        *tallies
            .entry((record.t, record.sender))
            .or_default()
            .entry(record.recipient)
            .or_insert(0) += 1;
    }

    let majority: BTreeMap<(u64, NodeId), NodeId> = tallies
        .into_iter()
        .map(|(key, counts)| {
            let mut best: Option<(NodeId, u64)> = None;
            for (recipient, count) in counts {
                match best {
                    Some((_, top)) if count <= top => {}
                    _ => best = Some((recipient, count)),
                }
            }
            (key, best.expect("tally groups are non-empty").0)
        })
        .collect();

    let total = guesses.len() as u64;
    let correct = guesses
        .iter()
        .filter(|g| majority.get(&(g.t, g.sender)) == Some(&g.recipient))
        .count() as u64;

    AccuracyReport {
        correct,
        total,
        accuracy: if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        },
    }
}

/// Precision/recall/F1 of the estimated edge set, plus per-tier metrics
/// and the tier confusion matrix.
pub fn graph_reconstruction(
    truth: &SocialGraph,
    estimate: &EstimatedGraph,
    communities: usize,
) -> GraphReconstructionReport {
    let true_edges: BTreeMap<PairKey, Tier> = truth.edges().collect();
    let estimated: Vec<(PairKey, EstimatedTier)> =
        estimate.edges().map(|(k, e)| (k, e.tier)).collect();

    let tp = estimated
        .iter()
        .filter(|(k, _)| true_edges.contains_key(k))
        .count();
    let (precision, recall, f1) = prf(tp, estimated.len(), true_edges.len());

    // Per-tier metrics over the three real tiers.
    let mut tier_metrics = BTreeMap::new();
    for tier in Tier::ALL {
        let predicted: Vec<&PairKey> = estimated
            .iter()
            .filter(|(_, et)| et.label() == tier.label())
            .map(|(k, _)| k)
            .collect();
        let actual = true_edges.values().filter(|&&t| t == tier).count();
        let hits = predicted
            .iter()
            .filter(|&&&k| true_edges.get(&k) == Some(&tier))
            .count();
        let (p, r, f) = prf(hits, predicted.len(), actual);
        tier_metrics.insert(
            tier.label().to_string(),
            TierMetrics {
                precision: p,
                recall: r,
                f1: f,
            },
        );
    }

    // Confusion over edges present in both graphs.
    let mut tier_confusion: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    for (pair, predicted_tier) in &estimated {
        if let Some(true_tier) = true_edges.get(pair) {
            *tier_confusion
                .entry(true_tier.label().to_string())
                .or_default()
                .entry(predicted_tier.label().to_string())
                .or_insert(0) += 1;
        }
    }

    GraphReconstructionReport {
        precision,
        recall,
        f1,
        true_edges: true_edges.len(),
        estimated_edges: estimated.len(),
        tier_metrics,
        tier_confusion,
        communities,
    }
}

/// Dummy fraction and dummy-sender entropy.
pub fn cover_stats(log: &SentLog) -> CoverTrafficReport {
    let total = log.total() as u64;
    let mut sender_counts: BTreeMap<NodeId, u64> = BTreeMap::new();
    let mut dummies = 0u64;

    for record in log.iter() {
        if record.dummy {
            dummies += 1;
            *sender_counts.entry(record.sender).or_insert(0) += 1;
        }
    }

    let entropy = if dummies == 0 {
        0.0
    } else {
        sender_counts
            .values()
            .map(|&c| {
                let p = c as f64 / dummies as f64;
                -p * p.log2()
            })
            .sum()
    };

    CoverTrafficReport {
        dummy_count: dummies,
        total_messages: total,
        dummy_fraction: if total == 0 {
            0.0
        } else {
            dummies as f64 / total as f64
        },
        sender_entropy: entropy,
    }
}

/// Path length, diversity, and short-path share over the log.
pub fn routing_stats(log: &SentLog) -> RoutingReport {
    let total = log.total();
    if total == 0 {
        return RoutingReport::default();
    }

    let mut length_sum = 0usize;
    let mut short = 0usize;
    let mut unique: HashSet<&[NodeId]> = HashSet::new();
    for record in log.iter() {
        length_sum += record.path.len();
        if record.path.len() <= 3 {
            short += 1;
        }
        unique.insert(record.path.as_slice());
    }

    RoutingReport {
        avg_path_length: length_sum as f64 / total as f64,
        path_diversity: unique.len() as f64 / total as f64,
        short_path_share: short as f64 / total as f64,
    }
}

/// Shape the conversation manager's counters for the report.
pub fn conversation_report(stats: &ConversationStats) -> ConversationReport {
    ConversationReport {
        replies: stats.replies_emitted,
        mean_reply_delay: stats.mean_reply_delay(),
        threads: stats.thread_count,
        mean_thread_messages: stats.mean_thread_messages(),
    }
}

/// Precision, recall, F1 from hit/predicted/actual counts.
fn prf(hits: usize, predicted: usize, actual: usize) -> (f64, f64, f64) {
    let precision = if predicted == 0 {
        0.0
    } else {
        hits as f64 / predicted as f64
    };
    let recall = if actual == 0 {
        0.0
    } else {
        hits as f64 / actual as f64
    };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    (precision, recall, f1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AdversaryEngine;
    use shroud_sim::{ContactSink, MessageRecord};
    use std::collections::BTreeSet;

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    fn message(t: u64, sender: u32, recipient: u32, id: u64, dummy: bool) -> MessageRecord {
        MessageRecord {
            t,
            sender: n(sender),
            recipient: n(recipient),
            id,
            path: vec![n(sender), n(recipient)],
            hop_times: vec![t, t + 1],
            dummy,
            is_reply: false,
        }
    }

    fn guess(t: u64, sender: u32, recipient: u32) -> RecipientGuess {
        RecipientGuess {
            t,
            sender: n(sender),
            recipient: n(recipient),
        }
    }

    #[test]
    fn accuracy_counts_majority_hits() {
        let mut log = SentLog::new(4);
        // Epoch 0: node 0 messages 1 twice and 2 once; majority is 1.
        log.push(message(0, 0, 1, 0, false));
        log.push(message(0, 0, 1, 1, false));
        log.push(message(0, 0, 2, 2, false));
        log.push(message(1, 0, 2, 3, false));

        let report = guess_accuracy(&log, &[guess(0, 0, 1), guess(1, 0, 1)]);
        assert_eq!(report.correct, 1);
        assert_eq!(report.total, 2);
        assert_eq!(report.accuracy, 0.5);
    }

    #[test]
    fn no_guesses_is_zero_accuracy() {
        let log = SentLog::new(1);
        let report = guess_accuracy(&log, &[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.accuracy, 0.0);
    }

    #[test]
    fn majority_tie_takes_lowest_id() {
        let mut log = SentLog::new(1);
        log.push(message(0, 0, 2, 0, false));
        log.push(message(0, 0, 1, 1, false));

        let report = guess_accuracy(&log, &[guess(0, 0, 1)]);
        assert_eq!(report.correct, 1);
    }

    /// Build an estimate over the given links by feeding contacts.
    fn estimate_over(links: &[(u32, u32, u64)]) -> EstimatedGraph {
        let observed: BTreeSet<NodeId> = links
            .iter()
            .flat_map(|&(a, b, _)| [n(a), n(b)])
            .collect();
        let mut engine = AdversaryEngine::new(observed, 1);
        for &(a, b, volume) in links {
            for t in 0..volume {
                engine.note_contact(t, n(a), n(b), 1);
            }
        }
        engine.results().estimate
    }

    #[test]
    fn reconstruction_scores_overlap() {
        let mut truth = SocialGraph::new(4);
        truth.add_edge(n(0), n(1), Tier::Intimate);
        truth.add_edge(n(2), n(3), Tier::Friend);

        // The estimate finds {0,1} but also hallucinates {1,2}.
        let estimate = estimate_over(&[(0, 1, 150), (1, 2, 40)]);
        assert_eq!(estimate.edge_count(), 2);

        let report = graph_reconstruction(&truth, &estimate, 1);
        assert_eq!(report.true_edges, 2);
        assert_eq!(report.estimated_edges, 2);
        assert_eq!(report.precision, 0.5);
        assert_eq!(report.recall, 0.5);
        assert!(report.f1 > 0.0);

        // {0,1} carried 150 packets: classified intimate, confusion
        // intimate -> intimate.
        assert_eq!(
            report.tier_confusion["intimate"]["intimate"], 1,
            "confusion: {:?}",
            report.tier_confusion
        );
    }

    #[test]
    fn cover_stats_on_clean_log_are_zero() {
        let mut log = SentLog::new(2);
        log.push(message(0, 0, 1, 0, false));
        let report = cover_stats(&log);
        assert_eq!(report.dummy_fraction, 0.0);
        assert_eq!(report.sender_entropy, 0.0);
    }

    #[test]
    fn cover_entropy_of_uniform_senders() {
        let mut log = SentLog::new(1);
        log.push(message(0, 0, 1, 0, true));
        log.push(message(0, 1, 2, 1, true));
        log.push(message(0, 2, 3, 2, true));
        log.push(message(0, 3, 0, 3, true));

        let report = cover_stats(&log);
        assert_eq!(report.dummy_fraction, 1.0);
        assert!((report.sender_entropy - 2.0).abs() < 1e-9);
    }

    #[test]
    fn routing_stats_count_short_and_unique_paths() {
        let mut log = SentLog::new(1);
        log.push(message(0, 0, 1, 0, false)); // 2 nodes
        log.push(message(0, 0, 1, 1, false)); // duplicate path
        let mut long = message(0, 0, 3, 2, false);
        long.path = vec![n(0), n(1), n(2), n(3)]; // 4 nodes
        log.push(long);

        let report = routing_stats(&log);
        assert!((report.avg_path_length - 8.0 / 3.0).abs() < 1e-9);
        assert!((report.path_diversity - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.short_path_share - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_log_routing_stats_default() {
        let log = SentLog::new(0);
        assert_eq!(routing_stats(&log), RoutingReport::default());
    }
}
