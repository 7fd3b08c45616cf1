//! Per-user message rates shaped by a diurnal activity curve.

use shroud_graph::{LehmerRng, NodeId};

/// Milliseconds in one simulated hour (= one epoch).
pub const HOUR_MS: u64 = 3_600_000;

/// Hourly activity multipliers over a day.
///
/// A campus-style curve: near-dead overnight, ramping through the morning,
/// peaking in the early afternoon, tapering through the evening.
pub(crate) const DIURNAL_MULTIPLIERS: [f64; 24] = [
    0.1, 0.1, 0.1, 0.1, 0.1, 0.1, // 00-05
    0.3, 0.5, 0.8, 1.0, 1.1, 1.2, // 06-11
    1.3, 1.4, 1.4, 1.3, 1.2, 1.1, // 12-17
    1.0, 0.9, 0.7, 0.5, 0.3, 0.2, // 18-23
];

/// Parameters for sampling per-user daily message rates.
#[derive(Debug, Clone)]
pub struct TemporalConfig {
    /// Lower bound on messages per day.
    pub min_per_day: u32,
    /// Upper bound on messages per day.
    pub max_per_day: u32,
    /// Skew exponent for regular users; higher pushes rates toward the
    /// minimum.
    pub skew: f64,
    /// Fraction of users sampled as heavy senders.
    pub heavy_user_fraction: f64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            min_per_day: 4,
            max_per_day: 40,
            skew: 0.6,
            heavy_user_fraction: 0.15,
        }
    }
}

/// A raw send intent before sub-epoch bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Millisecond offset from the start of the simulation.
    pub timestamp_ms: u64,
    /// Originating user.
    pub user: NodeId,
}

/// Sample integer daily rates for `n` users.
///
/// Heavy users draw from the top of the configured range, regular users
/// from a skewed low band.
pub fn sample_user_means(n: usize, config: &TemporalConfig, rng: &mut LehmerRng) -> Vec<u32> {
    let min = config.min_per_day as f64;
    let span = (config.max_per_day - config.min_per_day) as f64;

    (0..n)
        .map(|_| {
            let heavy = rng.chance(config.heavy_user_fraction);
            let rate = if heavy {
                min + rng.next_f64() * span * 0.8
            } else {
                min + rng.next_f64().powf(config.skew) * span * 0.4
            };
            (rate.round() as u32).max(config.min_per_day)
        })
        .collect()
}

/// Generate the timestamped send stream for `hours` simulated hours.
///
/// Each hour, each user emits a small cluster of events with probability
/// `min(0.8, rate/24 * diurnal)`. The result is sorted by timestamp.
pub fn generate_events_for_hours(
    rates: &[u32],
    hours: usize,
    rng: &mut LehmerRng,
) -> Vec<RawEvent> {
    let mut events = Vec::new();

    for hour in 0..hours {
        let multiplier = DIURNAL_MULTIPLIERS[hour % 24];
        let hour_start = hour as u64 * HOUR_MS;

        for (user, &rate) in rates.iter().enumerate() {
            let p = (rate as f64 / 24.0 * multiplier).min(0.8);
            if !rng.chance(p) {
                continue;
            }
            let count = 1 + (rng.next_f64() * 3.0) as u32;
            for _ in 0..count {
                let offset = (rng.next_f64() * HOUR_MS as f64) as u64;
                events.push(RawEvent {
                    timestamp_ms: hour_start + offset.min(HOUR_MS - 1),
                    user: NodeId(user as u32),
                });
            }
        }
    }

    events.sort_by_key(|e| (e.timestamp_ms, e.user));
    events
}
