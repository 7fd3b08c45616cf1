//! Shroud Adversary
//!
//! A local-passive adversary over the mesh simulation, plus the evaluator
//! that scores it against ground truth.
//!
//! The adversary observes the links adjacent to a small set of nodes. From
//! temporal volume and co-activity it guesses the recipient of every
//! observed send and periodically rebuilds an estimated social graph with
//! tier labels and confidences. It never sees message contents, paths, or
//! the ground-truth log; the evaluator alone consumes those.

mod engine;
mod eval;
mod observer;

pub use engine::{
    AdversaryEngine, AdversaryReport, ContactLogEntry, EstimatedEdge, EstimatedGraph,
    EstimatedTier, RecipientGuess,
};
pub use eval::{
    conversation_report, cover_stats, graph_reconstruction, guess_accuracy, routing_stats,
    AccuracyReport, ConversationReport, CoverTrafficReport, GraphReconstructionReport,
    RoutingReport, TierMetrics,
};
pub use observer::{place_observers, Placement};
