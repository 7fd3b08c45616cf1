//! Reply scheduling and conversation-thread decay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shroud_graph::{LehmerRng, NodeId, PairKey, Tier};

use crate::schedule::SUB_EPOCHS_PER_HOUR;

/// Maximum messages in one conversation thread.
const MAX_THREAD_LEN: u32 = 5;

/// A thread dies after this many epochs of inactivity.
const THREAD_IDLE_CUTOFF: u64 = 10;

/// How eagerly a recipient replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    /// Same epoch.
    Instant,
    /// 1-5 epochs later.
    Delayed,
    /// 5-19 epochs later.
    Eventual,
}

/// A scheduled reply sitting in a user's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTask {
    /// Absolute sub-epoch at which the reply fires.
    pub sub_epoch: u64,
    /// Recipient of the reply (the original sender).
    pub to: NodeId,
    pub kind: ReplyKind,
}

/// State of one conversation between an unordered pair.
#[derive(Debug, Clone)]
struct ConversationThread {
    message_count: u32,
    last_active: u64,
}

impl ConversationThread {
    fn new(t: u64) -> Self {
        Self {
            message_count: 0,
            last_active: t,
        }
    }

    /// Whether the thread admits another message at epoch `t`.
    ///
    /// Bounded by length and inactivity, with a geometrically decaying
    /// continuation probability.
    fn should_continue(&self, t: u64, rng: &mut LehmerRng) -> bool {
        self.message_count < MAX_THREAD_LEN
            && t.saturating_sub(self.last_active) <= THREAD_IDLE_CUTOFF
            && rng.next_f64() < 0.7f64.powi(self.message_count as i32)
    }

    fn record_message(&mut self, t: u64) {
        self.message_count += 1;
        self.last_active = t;
    }
}

/// Aggregate conversation figures for the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    /// Replies actually emitted into the sent log.
    pub replies_emitted: u64,
    /// Replies scheduled (some never fire: thread died or no path).
    pub replies_scheduled: u64,
    /// Sum of scheduled reply delays in epochs.
    pub total_reply_delay: u64,
    pub thread_count: usize,
    pub thread_messages: u64,
}

impl ConversationStats {
    /// Mean scheduled reply delay in epochs.
    pub fn mean_reply_delay(&self) -> f64 {
        if self.replies_scheduled == 0 {
            0.0
        } else {
            self.total_reply_delay as f64 / self.replies_scheduled as f64
        }
    }

    /// Mean messages per thread.
    pub fn mean_thread_messages(&self) -> f64 {
        if self.thread_count == 0 {
            0.0
        } else {
            self.thread_messages as f64 / self.thread_count as f64
        }
    }
}

/// Decides if and when recipients reply, and tracks thread state.
#[derive(Debug, Default)]
pub struct ConversationManager {
    threads: BTreeMap<PairKey, ConversationThread>,
    replies_emitted: u64,
    replies_scheduled: u64,
    total_reply_delay: u64,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample a reply outcome for a message `sender -> recipient` at epoch
    /// `t`. Returns the task to enqueue on the recipient, or `None` for
    /// the no-reply outcome.
    ///
    /// Stronger tiers reply more; the no-reply weight is fixed.
    pub fn maybe_schedule_reply(
        &mut self,
        sender: NodeId,
        t: u64,
        tier: Option<Tier>,
        rng: &mut LehmerRng,
    ) -> Option<ReplyTask> {
        let m = tier.map(Tier::reply_multiplier).unwrap_or(1.0);
        let instant = 0.25 * m;
        let delayed = 0.60 * m;
        let eventual = 0.10 * m;
        let none = 0.05;
        let total = instant + delayed + eventual + none;

        let draw = rng.next_f64() * total;
        let (kind, epoch) = if draw < instant {
            (ReplyKind::Instant, t)
        } else if draw < instant + delayed {
            (ReplyKind::Delayed, t + 1 + (rng.next_f64() * 5.0) as u64)
        } else if draw < instant + delayed + eventual {
            (ReplyKind::Eventual, t + 5 + (rng.next_f64() * 15.0) as u64)
        } else {
            return None;
        };

        let sub_epoch = epoch * SUB_EPOCHS_PER_HOUR as u64 + (rng.next_f64() * 6.0) as u64;
        self.replies_scheduled += 1;
        self.total_reply_delay += epoch - t;

        Some(ReplyTask {
            sub_epoch,
            to: sender,
            kind,
        })
    }

    /// Gate a queued reply for the pair at epoch `t`, creating the thread
    /// on first contact. Does not mutate thread state; call
    /// [`Self::commit_reply`] once the reply actually routes.
    pub fn accept_reply(&mut self, pair: PairKey, t: u64, rng: &mut LehmerRng) -> bool {
        let thread = self
            .threads
            .entry(pair)
            .or_insert_with(|| ConversationThread::new(t));
        thread.should_continue(t, rng)
    }

    /// Record an emitted reply on its thread.
    pub fn commit_reply(&mut self, pair: PairKey, t: u64) {
        if let Some(thread) = self.threads.get_mut(&pair) {
            thread.record_message(t);
        }
        self.replies_emitted += 1;
    }

    pub fn stats(&self) -> ConversationStats {
        ConversationStats {
            replies_emitted: self.replies_emitted,
            replies_scheduled: self.replies_scheduled,
            total_reply_delay: self.total_reply_delay,
            thread_count: self.threads.len(),
            thread_messages: self
                .threads
                .values()
                .map(|th| th.message_count as u64)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> PairKey {
        PairKey::new(NodeId(0), NodeId(1))
    }

    #[test]
    fn fresh_thread_accepts() {
        let mut manager = ConversationManager::new();
        let mut rng = LehmerRng::new(1);
        // message_count = 0 means continuation probability 1.
        assert!(manager.accept_reply(pair(), 3, &mut rng));
    }

    #[test]
    fn thread_caps_at_max_length() {
        let mut manager = ConversationManager::new();
        let mut rng = LehmerRng::new(2);

        manager.accept_reply(pair(), 0, &mut rng);
        for _ in 0..MAX_THREAD_LEN {
            manager.commit_reply(pair(), 0);
        }
        let accepted = (0..100).any(|_| manager.accept_reply(pair(), 0, &mut rng));
        assert!(!accepted, "full thread accepted a reply");
    }

    #[test]
    fn idle_thread_goes_quiet() {
        let mut manager = ConversationManager::new();
        let mut rng = LehmerRng::new(3);

        manager.accept_reply(pair(), 0, &mut rng);
        manager.commit_reply(pair(), 0);
        // Within the cutoff the thread can still continue...
        assert!((0..100).any(|_| manager.accept_reply(pair(), 10, &mut rng)));
        // ...past it, never.
        let accepted = (0..100).any(|_| manager.accept_reply(pair(), 11, &mut rng));
        assert!(!accepted, "idle thread accepted a reply");
    }

    #[test]
    fn reply_delays_match_kind() {
        let mut manager = ConversationManager::new();
        let mut rng = LehmerRng::new(4);
        let t = 20;

        for _ in 0..500 {
            if let Some(task) =
                manager.maybe_schedule_reply(NodeId(7), t, Some(Tier::Friend), &mut rng)
            {
                let epoch = task.sub_epoch / SUB_EPOCHS_PER_HOUR as u64;
                match task.kind {
                    ReplyKind::Instant => assert_eq!(epoch, t),
                    ReplyKind::Delayed => assert!((t + 1..=t + 5).contains(&epoch)),
                    ReplyKind::Eventual => assert!((t + 5..=t + 19).contains(&epoch)),
                }
                assert_eq!(task.to, NodeId(7));
            }
        }
        let stats = manager.stats();
        assert!(stats.replies_scheduled > 0);
    }

    #[test]
    fn intimate_ties_reply_more_often() {
        let mut rng = LehmerRng::new(5);
        let count_replies = |tier: Tier, rng: &mut LehmerRng| {
            let mut manager = ConversationManager::new();
            (0..2000)
                .filter(|_| {
                    manager
                        .maybe_schedule_reply(NodeId(0), 0, Some(tier), rng)
                        .is_some()
                })
                .count()
        };

        let intimate = count_replies(Tier::Intimate, &mut rng);
        let acquaintance = count_replies(Tier::Acquaintance, &mut rng);
        assert!(intimate > acquaintance);
    }

    #[test]
    fn stats_track_threads_and_emissions() {
        let mut manager = ConversationManager::new();
        let mut rng = LehmerRng::new(6);

        let other = PairKey::new(NodeId(2), NodeId(3));
        manager.accept_reply(pair(), 1, &mut rng);
        manager.commit_reply(pair(), 1);
        manager.accept_reply(other, 2, &mut rng);
        manager.commit_reply(other, 2);
        manager.commit_reply(other, 3);

        let stats = manager.stats();
        assert_eq!(stats.thread_count, 2);
        assert_eq!(stats.replies_emitted, 3);
        assert_eq!(stats.thread_messages, 3);
        assert_eq!(stats.mean_thread_messages(), 1.5);
    }
}
