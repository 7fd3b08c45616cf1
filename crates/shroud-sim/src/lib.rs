//! Shroud Mesh Simulation
//!
//! A discrete-event simulation of a community messaging over a tiered
//! social graph.
//!
//! # Architecture
//!
//! - **Temporal model**: per-user daily rates shaped by a diurnal curve
//! - **Schedule**: events bucketed into sub-epochs with bursts
//! - **Routing**: multi-hop path selection with diversity accounting
//! - **Conversations**: reply scheduling with per-pair thread decay
//! - **Cover traffic**: link-level Poisson volume normalization
//! - **Orchestrator**: the epoch loop tying it all together
//!
//! One experiment is one deterministic loop: construct an [`Orchestrator`],
//! hand it a [`ContactSink`] (normally the adversary), call
//! [`Orchestrator::run`]. Same seed, same outputs.

mod conversation;
mod cover;
mod message;
mod orchestrator;
mod routing;
mod schedule;
mod temporal;

pub use conversation::{ConversationManager, ConversationStats, ReplyKind, ReplyTask};
pub use cover::{CoverConfig, CoverTrafficManager, DummyMessage};
pub use message::{MessageRecord, SentLog};
pub use orchestrator::{ContactSink, NullSink, Orchestrator, SimulationParams};
pub use routing::{DiversityTracker, PathSelector, RoutingConfig};
pub use schedule::{distribute_events, ScheduleConfig, SUB_EPOCHS_PER_HOUR};
pub use temporal::{
    generate_events_for_hours, sample_user_means, RawEvent, TemporalConfig, HOUR_MS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_graph::{build_graph, GraphConfig, LehmerRng};

    #[test]
    fn experiment_is_deterministic() {
        let graph_config = GraphConfig {
            users: 30,
            seed: 5,
            ..GraphConfig::default()
        };
        let params = SimulationParams {
            horizon: 24,
            hmax: 3,
            seed: 5,
            noise_edges_per_epoch: 0,
        };

        let run = || {
            let graph = build_graph(&graph_config, &mut LehmerRng::new(graph_config.seed));
            let mut orchestrator = Orchestrator::new(graph, params.clone(), None);
            orchestrator.run(&mut NullSink);
            orchestrator.into_sent_log()
        };

        let a = run();
        let b = run();
        assert_eq!(a.total(), b.total());
        for t in 0..24 {
            assert_eq!(a.epoch(t), b.epoch(t), "epoch {} diverged", t);
        }
    }
}
