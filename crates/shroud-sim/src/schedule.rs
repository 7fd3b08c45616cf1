//! Sub-epoch bucketing and burst injection.

use shroud_graph::{LehmerRng, NodeId};

use crate::temporal::{RawEvent, HOUR_MS};

/// Sub-epochs per simulated hour.
pub const SUB_EPOCHS_PER_HOUR: usize = 6;

/// Parameters for the sub-epoch distributor.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Probability that an event spawns a burst.
    pub burst_probability: f64,
    /// Burst copies land within this many buckets of the original.
    pub burst_window: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            burst_probability: 0.2,
            burst_window: 2,
        }
    }
}

/// Map raw events onto per-sub-epoch sender lists.
///
/// Each event lands in its timestamp's bucket with one bucket of jitter,
/// then may spawn a burst of 1-4 extra copies at nearby buckets. The
/// result has exactly `horizon_hours * 6` buckets.
pub fn distribute_events(
    events: &[RawEvent],
    horizon_hours: usize,
    config: &ScheduleConfig,
    rng: &mut LehmerRng,
) -> Vec<Vec<NodeId>> {
    let total = horizon_hours * SUB_EPOCHS_PER_HOUR;
    let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); total];
    if total == 0 {
        return buckets;
    }

    let sub_epoch_ms = HOUR_MS / SUB_EPOCHS_PER_HOUR as u64;
    let clamp = |b: i64| b.clamp(0, total as i64 - 1) as usize;

    for event in events {
        let base = (event.timestamp_ms / sub_epoch_ms) as i64;
        let jitter = ((rng.next_f64() - 0.5) * 2.0).floor() as i64;
        let bucket = clamp(base + jitter);
        buckets[bucket].push(event.user);

        if rng.chance(config.burst_probability) {
            let size = 2 + (rng.next_f64() * 4.0) as i64; // 2..=5
            let window = config.burst_window;
            for _ in 0..(size - 1) {
                let offset = (rng.next_f64() * (2 * window + 1) as f64) as i64 - window;
                buckets[clamp(bucket as i64 + offset)].push(event.user);
            }
        }
    }

    buckets
}
