//! Experiment orchestration: the sub-epoch loop.
//!
//! One experiment is one deterministic loop over `horizon * 6` sub-epochs.
//! Per sub-epoch, in strict order: due replies fire, new sends fire, cover
//! traffic is injected (first sub-epoch of each hour), and link contacts
//! are materialized and handed to the adversary (last sub-epoch of each
//! hour). For any epoch `t`, every `note_send(t, ..)` reaches the sink
//! before any `note_contact(t, ..)`, which precedes `infer_epoch(t)`.

use std::collections::BTreeMap;

use tracing::debug;

use shroud_graph::{LehmerRng, NodeId, PairKey, SocialGraph};

use crate::conversation::{ConversationManager, ConversationStats, ReplyTask};
use crate::cover::{CoverConfig, CoverTrafficManager};
use crate::message::{MessageRecord, SentLog};
use crate::routing::{PathSelector, RoutingConfig};
use crate::schedule::{distribute_events, ScheduleConfig, SUB_EPOCHS_PER_HOUR};
use crate::temporal::{generate_events_for_hours, sample_user_means, TemporalConfig};

/// Observer interface the simulation reports into.
///
/// The adversary implements this; tests use [`NullSink`]. Within an epoch
/// the call order is sends, then contacts, then inference.
pub trait ContactSink {
    /// A message (real or dummy) originated at epoch `t`.
    fn note_send(&mut self, t: u64, sender: NodeId);

    /// `count` packets crossed the link `{a, b}` during epoch `t`.
    fn note_contact(&mut self, t: u64, a: NodeId, b: NodeId, count: u64);

    /// Epoch `t` is complete.
    fn infer_epoch(&mut self, t: u64, graph: &SocialGraph);
}

/// Sink that discards everything.
pub struct NullSink;

impl ContactSink for NullSink {
    fn note_send(&mut self, _t: u64, _sender: NodeId) {}
    fn note_contact(&mut self, _t: u64, _a: NodeId, _b: NodeId, _count: u64) {}
    fn infer_epoch(&mut self, _t: u64, _graph: &SocialGraph) {}
}

/// Core experiment parameters.
#[derive(Debug, Clone)]
pub struct SimulationParams {
    /// Horizon in epochs (simulated hours).
    pub horizon: u64,
    /// Maximum hops per message.
    pub hmax: usize,
    /// Experiment seed; all RNG streams derive from it.
    pub seed: i64,
    /// Random real-edge packets added per epoch at materialization.
    pub noise_edges_per_epoch: usize,
}

/// Per-user mutable state.
#[derive(Debug, Default)]
struct UserState {
    reply_queue: Vec<ReplyTask>,
    last_contact: BTreeMap<NodeId, u64>,
}

/// Owns the graph, users, managers, and the sent log for one experiment.
pub struct Orchestrator {
    params: SimulationParams,
    graph: SocialGraph,
    users: Vec<UserState>,
    sub_epoch_events: Vec<Vec<NodeId>>,
    selector: PathSelector,
    conversations: ConversationManager,
    cover: Option<CoverTrafficManager>,
    /// Routing/reply stream. Advanced only by real-message decisions.
    rng: LehmerRng,
    sent_log: SentLog,
    /// Future per-link packet counts: epoch -> link -> packets.
    pending_link_load: BTreeMap<u64, BTreeMap<PairKey, u64>>,
    /// Edge list snapshot for noise-packet sampling.
    edge_list: Vec<PairKey>,
    next_message_id: u64,
}

impl Orchestrator {
    /// Build an orchestrator with default temporal, schedule, and routing
    /// configs. Cover traffic runs only when a config is given.
    pub fn new(graph: SocialGraph, params: SimulationParams, cover: Option<CoverConfig>) -> Self {
        Self::with_configs(
            graph,
            params,
            TemporalConfig::default(),
            ScheduleConfig::default(),
            RoutingConfig::default(),
            cover,
        )
    }

    /// Build an orchestrator with explicit component configs.
    ///
    /// The temporal model consumes its own RNG stream so that the event
    /// schedule is pinned by the seed alone.
    pub fn with_configs(
        graph: SocialGraph,
        params: SimulationParams,
        temporal: TemporalConfig,
        schedule: ScheduleConfig,
        routing: RoutingConfig,
        cover: Option<CoverConfig>,
    ) -> Self {
        let n = graph.len();

        let mut temporal_rng = LehmerRng::new(params.seed);
        let rates = sample_user_means(n, &temporal, &mut temporal_rng);
        let events = generate_events_for_hours(&rates, params.horizon as usize, &mut temporal_rng);
        let sub_epoch_events =
            distribute_events(&events, params.horizon as usize, &schedule, &mut temporal_rng);

        let edge_list: Vec<PairKey> = graph.edges().map(|(pair, _)| pair).collect();
        let horizon = params.horizon;
        let cover = cover.map(|config| CoverTrafficManager::new(config, params.seed));

        Self {
            graph,
            users: (0..n).map(|_| UserState::default()).collect(),
            sub_epoch_events,
            selector: PathSelector::new(routing),
            conversations: ConversationManager::new(),
            cover,
            rng: LehmerRng::new(params.seed),
            sent_log: SentLog::new(horizon),
            pending_link_load: BTreeMap::new(),
            edge_list,
            next_message_id: 0,
            params,
        }
    }

    /// Run the full experiment, reporting into `sink`.
    pub fn run<S: ContactSink>(&mut self, sink: &mut S) {
        let total = self.params.horizon * SUB_EPOCHS_PER_HOUR as u64;
        for se in 0..total {
            let t = se / SUB_EPOCHS_PER_HOUR as u64;
            self.process_replies(se, t, sink);
            self.process_new_sends(se, t, sink);
            if se % SUB_EPOCHS_PER_HOUR as u64 == 0 {
                self.inject_cover(t, sink);
            }
            if se % SUB_EPOCHS_PER_HOUR as u64 == SUB_EPOCHS_PER_HOUR as u64 - 1 {
                self.materialize(t, sink);
            }
        }
    }

    /// Fire every queued reply due at this sub-epoch.
    fn process_replies<S: ContactSink>(&mut self, se: u64, t: u64, sink: &mut S) {
        for uid in 0..self.users.len() {
            let user = NodeId(uid as u32);
            let due: Vec<ReplyTask> = {
                let queue = &mut self.users[uid].reply_queue;
                let fired: Vec<ReplyTask> =
                    queue.iter().copied().filter(|r| r.sub_epoch == se).collect();
                // Purge fired entries along with any that missed their slot
                // (an instant reply can land on an already-passed sub-epoch).
                queue.retain(|r| r.sub_epoch > se);
                fired
            };

            for task in due {
                let pair = PairKey::new(user, task.to);
                if !self.conversations.accept_reply(pair, t, &mut self.rng) {
                    continue;
                }
                let Some(path) = self.route(user, task.to) else {
                    debug!(sender = %user, recipient = %task.to, t, "reply skipped: no path");
                    continue;
                };
                self.conversations.commit_reply(pair, t);
                self.log_message(t, user, task.to, path, false, true, sink);

                // Counter-reply: the recipient may come back to us.
                let tier = self.graph.tier(user, task.to);
                if let Some(next) = self
                    .conversations
                    .maybe_schedule_reply(user, t, tier, &mut self.rng)
                {
                    self.users[task.to.index()].reply_queue.push(next);
                }
            }
        }
    }

    /// Fire this sub-epoch's scheduled new sends.
    fn process_new_sends<S: ContactSink>(&mut self, se: u64, t: u64, sink: &mut S) {
        let senders = self.sub_epoch_events[se as usize].clone();
        for sender in senders {
            let Some(recipient) = self.pick_recipient(sender) else {
                continue; // isolated node
            };
            let Some(path) = self.route(sender, recipient) else {
                debug!(%sender, %recipient, t, "send skipped: no path");
                continue;
            };
            self.log_message(t, sender, recipient, path, false, false, sink);

            let tier = self.graph.tier(sender, recipient);
            if let Some(task) = self
                .conversations
                .maybe_schedule_reply(sender, t, tier, &mut self.rng)
            {
                self.users[recipient.index()].reply_queue.push(task);
            }
        }
    }

    /// Tier-weighted recipient choice among the sender's neighbors.
    fn pick_recipient(&mut self, sender: NodeId) -> Option<NodeId> {
        let neighbors = self.graph.neighbors(sender);
        if neighbors.is_empty() {
            return None;
        }

        let weights: Vec<f64> = neighbors
            .iter()
            .map(|&v| {
                self.graph
                    .tier(sender, v)
                    .map(|tier| tier.recipient_weight())
                    .unwrap_or(1.0)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        let mut draw = self.rng.next_f64() * total;
        for (&v, &w) in neighbors.iter().zip(&weights) {
            draw -= w;
            if draw <= 0.0 {
                return Some(v);
            }
        }
        neighbors.last().copied()
    }

    /// Inject cover dummies for epoch `t`, each with its own path.
    ///
    /// Dummy routing draws from the cover manager's stream, never from the
    /// routing/reply stream.
    fn inject_cover<S: ContactSink>(&mut self, t: u64, sink: &mut S) {
        let Some(cover) = self.cover.as_mut() else {
            return;
        };
        let dummies = cover.generate(t, &self.graph);
        for dummy in dummies {
            let path = self.selector.select_path(
                &self.graph,
                dummy.from,
                dummy.to,
                self.params.hmax,
                self.cover
                    .as_mut()
                    .expect("cover manager present")
                    .rng_mut(),
            );
            let Some(path) = path else {
                continue;
            };
            self.log_message(t, dummy.from, dummy.to, path, true, false, sink);
        }
    }

    /// Log a routed message, schedule its hop load, and notify the sink.
    fn log_message<S: ContactSink>(
        &mut self,
        t: u64,
        sender: NodeId,
        recipient: NodeId,
        path: Vec<NodeId>,
        dummy: bool,
        is_reply: bool,
        sink: &mut S,
    ) {
        let horizon = self.params.horizon;

        // Hop i of the path crosses its link at epoch t + i.
        for (i, hop) in path.windows(2).enumerate() {
            let epoch = t + i as u64;
            if epoch >= horizon {
                break;
            }
            *self
                .pending_link_load
                .entry(epoch)
                .or_default()
                .entry(PairKey::new(hop[0], hop[1]))
                .or_insert(0) += 1;
        }

        let hop_times: Vec<u64> = (0..path.len() as u64)
            .map(|i| t + i)
            .take_while(|&e| e < horizon)
            .collect();

        let id = self.next_message_id;
        self.next_message_id += 1;
        self.sent_log.push(MessageRecord {
            t,
            sender,
            recipient,
            id,
            path,
            hop_times,
            dummy,
            is_reply,
        });

        sink.note_send(t, sender);
        if !dummy {
            if let Some(cover) = self.cover.as_mut() {
                cover.record_real_message(sender, recipient, t);
            }
        }
    }

    /// Route a real message within the hop budget, drawing from the
    /// routing/reply stream.
    fn route(&mut self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        self.selector
            .select_path(&self.graph, src, dst, self.params.hmax, &mut self.rng)
    }

    /// Turn this epoch's scheduled hop load into adversary contacts.
    fn materialize<S: ContactSink>(&mut self, t: u64, sink: &mut S) {
        let mut loads = self.pending_link_load.remove(&t).unwrap_or_default();

        for _ in 0..self.params.noise_edges_per_epoch {
            if self.edge_list.is_empty() {
                break;
            }
            let pair = self.edge_list[self.rng.index(self.edge_list.len())];
            *loads.entry(pair).or_insert(0) += 1;
        }

        for (pair, count) in loads {
            if count == 0 {
                continue;
            }
            self.users[pair.a().index()]
                .last_contact
                .insert(pair.b(), t);
            self.users[pair.b().index()]
                .last_contact
                .insert(pair.a(), t);
            sink.note_contact(t, pair.a(), pair.b(), count);
        }

        sink.infer_epoch(t, &self.graph);
    }

    pub fn sent_log(&self) -> &SentLog {
        &self.sent_log
    }

    /// Consume the orchestrator, keeping only the log.
    pub fn into_sent_log(self) -> SentLog {
        self.sent_log
    }

    pub fn conversation_stats(&self) -> ConversationStats {
        self.conversations.stats()
    }

    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_graph::{build_graph, GraphConfig, Tier};

    fn small_params(seed: i64) -> SimulationParams {
        SimulationParams {
            horizon: 24,
            hmax: 3,
            seed,
            noise_edges_per_epoch: 0,
        }
    }

    fn built_graph(users: usize, seed: i64) -> SocialGraph {
        let config = GraphConfig {
            users,
            seed,
            ..GraphConfig::default()
        };
        build_graph(&config, &mut LehmerRng::new(seed))
    }

    /// Sink that checks the send/contact/infer ordering per epoch.
    #[derive(Default)]
    struct OrderingSink {
        current_epoch: Option<u64>,
        contacts_seen: bool,
        inferred: Vec<u64>,
        sends: u64,
        contacts: u64,
    }

    impl ContactSink for OrderingSink {
        fn note_send(&mut self, t: u64, _sender: NodeId) {
            if self.current_epoch == Some(t) {
                assert!(!self.contacts_seen, "send after contact in epoch {}", t);
            } else {
                self.current_epoch = Some(t);
                self.contacts_seen = false;
            }
            self.sends += 1;
        }

        fn note_contact(&mut self, t: u64, _a: NodeId, _b: NodeId, _count: u64) {
            assert!(!self.inferred.contains(&t), "contact after infer_epoch");
            self.contacts_seen = true;
            self.contacts += 1;
        }

        fn infer_epoch(&mut self, t: u64, _graph: &SocialGraph) {
            self.inferred.push(t);
        }
    }

    #[test]
    fn produces_traffic_and_honors_ordering() {
        let graph = built_graph(40, 7);
        let mut orchestrator = Orchestrator::new(graph, small_params(7), None);
        let mut sink = OrderingSink::default();
        orchestrator.run(&mut sink);

        assert!(sink.sends > 0, "no sends in 24 epochs");
        assert!(sink.contacts > 0, "no contacts materialized");
        assert_eq!(sink.inferred, (0..24).collect::<Vec<u64>>());
        assert_eq!(orchestrator.sent_log().total() as u64, sink.sends);
    }

    #[test]
    fn logged_paths_are_valid() {
        let graph = built_graph(50, 11);
        let mut orchestrator = Orchestrator::new(graph, small_params(11), None);
        orchestrator.run(&mut NullSink);

        for record in orchestrator.sent_log().iter() {
            assert_eq!(record.path[0], record.sender);
            assert_eq!(*record.path.last().unwrap(), record.recipient);
            assert!(record.path.len() <= 4);
            for w in record.path.windows(2) {
                assert!(orchestrator.graph().has_edge(w[0], w[1]));
            }
        }
    }

    #[test]
    fn no_dummies_without_cover() {
        let graph = built_graph(30, 3);
        let mut orchestrator = Orchestrator::new(graph, small_params(3), None);
        orchestrator.run(&mut NullSink);

        assert!(orchestrator.sent_log().iter().all(|r| !r.dummy));
    }

    #[test]
    fn cover_produces_tagged_dummies() {
        let graph = built_graph(30, 3);
        let mut orchestrator =
            Orchestrator::new(graph, small_params(3), Some(CoverConfig::default()));
        let mut sink = OrderingSink::default();
        orchestrator.run(&mut sink);

        let dummies = orchestrator.sent_log().iter().filter(|r| r.dummy).count();
        assert!(dummies > 0, "cover enabled but no dummies logged");
        // Dummies reach the sink exactly like real sends.
        assert_eq!(orchestrator.sent_log().total() as u64, sink.sends);
    }

    #[test]
    fn cover_does_not_shift_real_traffic() {
        let graph = built_graph(30, 19);
        let run = |cover: Option<CoverConfig>| {
            let mut orchestrator = Orchestrator::new(graph.clone(), small_params(19), cover);
            orchestrator.run(&mut NullSink);
            orchestrator
                .into_sent_log()
                .iter()
                .filter(|r| !r.dummy)
                .cloned()
                .collect::<Vec<_>>()
        };

        let bare = run(None);
        let covered = run(Some(CoverConfig::default()));
        let strip_ids = |records: &[MessageRecord]| {
            records
                .iter()
                .map(|r| (r.t, r.sender, r.recipient, r.path.clone(), r.is_reply))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip_ids(&bare), strip_ids(&covered));
    }

    #[test]
    fn isolated_node_never_sends() {
        // Two-node graph with a single edge plus one isolated node.
        let mut graph = SocialGraph::new(3);
        graph.add_edge(NodeId(0), NodeId(1), Tier::Friend);

        let mut orchestrator = Orchestrator::new(graph, small_params(5), None);
        orchestrator.run(&mut NullSink);

        assert!(orchestrator
            .sent_log()
            .iter()
            .all(|r| r.sender != NodeId(2)));
    }

    #[test]
    fn replies_match_thread_commits() {
        let graph = built_graph(40, 23);
        let mut orchestrator = Orchestrator::new(graph, small_params(23), None);
        orchestrator.run(&mut NullSink);

        let logged_replies = orchestrator.sent_log().iter().filter(|r| r.is_reply).count();
        assert_eq!(
            logged_replies as u64,
            orchestrator.conversation_stats().replies_emitted
        );
    }

    #[test]
    fn hop_times_start_at_origin_epoch() {
        let graph = built_graph(40, 29);
        let mut orchestrator = Orchestrator::new(graph, small_params(29), None);
        orchestrator.run(&mut NullSink);

        for record in orchestrator.sent_log().iter() {
            assert_eq!(record.hop_times[0], record.t);
            for (i, &e) in record.hop_times.iter().enumerate() {
                assert_eq!(e, record.t + i as u64);
            }
        }
    }
}
