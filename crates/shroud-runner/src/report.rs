//! Per-run result and sweep summary types.

use serde::{Deserialize, Serialize};
use shroud_adversary::{
    AccuracyReport, ContactLogEntry, ConversationReport, CoverTrafficReport,
    GraphReconstructionReport, Placement, RoutingReport,
};
use shroud_sim::{MessageRecord, SentLog};

/// Epochs included in the message sample.
const SAMPLE_EPOCHS: u64 = 10;

/// Messages per epoch included in the message sample.
const SAMPLE_PER_EPOCH: usize = 5;

/// One experiment's parameter tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    pub users: usize,
    pub seed: i64,
    pub horizon: u64,
    pub hmax: usize,
    pub observers: usize,
    pub placement: Placement,
    /// 0 disables cover traffic; a positive rate is the target multiplier.
    pub cover_rate: f64,
}

/// All metric blocks of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub accuracy: AccuracyReport,
    pub conversation: ConversationReport,
    pub routing: RoutingReport,
    pub cover_traffic: CoverTrafficReport,
    pub graph_reconstruction: GraphReconstructionReport,
}

/// The full per-run JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub params: RunParams,
    pub results: RunResults,
    /// Filename of the ground-truth record this run used.
    pub ground_truth: String,
    /// First observed contacts, capped by the adversary.
    pub observer_contacts: Vec<ContactLogEntry>,
    /// First few messages of the first few epochs.
    pub message_sample: Vec<MessageRecord>,
}

/// Result filename for a parameter tuple, in `key-value` segments.
pub fn run_filename(params: &RunParams) -> String {
    format!(
        "N-{}_seed-{}_hops-{}_obs-{}_place-{}_cover-{}.json",
        params.users,
        params.seed,
        params.hmax,
        params.observers,
        params.placement.label(),
        params.cover_rate
    )
}

/// Extract the report's message sample from a sent log.
pub fn message_sample(log: &SentLog) -> Vec<MessageRecord> {
    let mut sample = Vec::new();
    for t in 0..SAMPLE_EPOCHS.min(log.horizon()) {
        sample.extend(log.epoch(t).iter().take(SAMPLE_PER_EPOCH).cloned());
    }
    sample
}

/// Sweep-wide means written to `summary.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub runs: u64,
    pub mean_accuracy: f64,
    pub mean_dummy_fraction: f64,
    pub mean_graph_f1: f64,
    pub mean_replies: f64,
}

impl Summary {
    /// Aggregate means over completed runs.
    pub fn from_reports(reports: &[RunReport]) -> Self {
        let runs = reports.len() as u64;
        if runs == 0 {
            return Self::default();
        }
        let mean = |f: &dyn Fn(&RunReport) -> f64| {
            reports.iter().map(f).sum::<f64>() / runs as f64
        };
        Self {
            runs,
            mean_accuracy: mean(&|r| r.results.accuracy.accuracy),
            mean_dummy_fraction: mean(&|r| r.results.cover_traffic.dummy_fraction),
            mean_graph_f1: mean(&|r| r.results.graph_reconstruction.f1),
            mean_replies: mean(&|r| r.results.conversation.replies as f64),
        }
    }
}
