//! Link-level cover traffic with an adaptive volume target.
//!
//! Each epoch, every social edge is topped up toward a noisy target volume
//! so that observed link activity stops tracking real conversations. The
//! manager owns its own RNG stream: enabling or disabling cover must not
//! shift any routing or reply decision.

use std::collections::BTreeMap;

use shroud_graph::{LehmerRng, NodeId, PairKey, SocialGraph};

/// Extra epochs of per-link history kept beyond the averaging window.
const HISTORY_SLACK: u64 = 10;

/// Parameters for the cover-traffic manager.
#[derive(Debug, Clone)]
pub struct CoverConfig {
    /// Scales the adaptive baseline derived from recent real volume.
    pub target_multiplier: f64,
    /// Lower clamp on the per-link target.
    pub min_target: f64,
    /// Upper clamp on the per-link target.
    pub max_target: f64,
    /// Averaging window in epochs.
    pub window: u64,
    /// Stddev of the Gaussian noise added to each link's target.
    pub noise_stddev: f64,
    /// Independent emission probability per deficit unit.
    pub probability_threshold: f64,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            target_multiplier: 0.3,
            min_target: 0.0,
            max_target: 10.0,
            window: 12,
            noise_stddev: 1.0,
            probability_threshold: 0.7,
        }
    }
}

/// Volume observed on one link during one epoch.
#[derive(Debug, Clone, Copy)]
struct LinkEpochEntry {
    epoch: u64,
    real: u32,
    cover: u32,
}

/// A dummy message to be routed and logged like a real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DummyMessage {
    pub from: NodeId,
    pub to: NodeId,
    pub epoch: u64,
}

/// Emits dummy messages to normalize per-link volume toward an adaptive
/// target.
#[derive(Debug)]
pub struct CoverTrafficManager {
    config: CoverConfig,
    /// Per-link recent history, at most one entry per epoch, trimmed to
    /// `window + HISTORY_SLACK` epochs.
    histories: BTreeMap<PairKey, Vec<LinkEpochEntry>>,
    baseline: f64,
    rng: LehmerRng,
}

impl CoverTrafficManager {
    /// Create a manager with its own RNG stream derived from the
    /// experiment seed.
    pub fn new(config: CoverConfig, seed: i64) -> Self {
        Self {
            config,
            histories: BTreeMap::new(),
            baseline: 0.0,
            rng: LehmerRng::new(seed),
        }
    }

    /// The RNG stream that dummy-path routing must draw from.
    pub fn rng_mut(&mut self) -> &mut LehmerRng {
        &mut self.rng
    }

    /// Record a real message on its originating link.
    pub fn record_real_message(&mut self, a: NodeId, b: NodeId, epoch: u64) {
        let window = self.config.window;
        let entry = Self::entry_mut(&mut self.histories, PairKey::new(a, b), epoch, window);
        entry.real += 1;
    }

    fn record_cover(&mut self, pair: PairKey, epoch: u64) {
        let window = self.config.window;
        let entry = Self::entry_mut(&mut self.histories, pair, epoch, window);
        entry.cover += 1;
    }

    /// Fetch or append the entry for `epoch`, trimming history that fell
    /// out of the window.
    fn entry_mut(
        histories: &mut BTreeMap<PairKey, Vec<LinkEpochEntry>>,
        pair: PairKey,
        epoch: u64,
        window: u64,
    ) -> &mut LinkEpochEntry {
        let history = histories.entry(pair).or_default();
        let cutoff = epoch.saturating_sub(window + HISTORY_SLACK);
        history.retain(|e| e.epoch >= cutoff);

        let needs_new = history.last().map(|e| e.epoch != epoch).unwrap_or(true);
        if needs_new {
            history.push(LinkEpochEntry {
                epoch,
                real: 0,
                cover: 0,
            });
        }
        history.last_mut().expect("entry was just ensured")
    }

    /// Emit this epoch's dummy messages across all social edges.
    ///
    /// Inactive until the averaging window has filled. Each edge's recent
    /// volume (real + cover, exclusive of the current epoch) is compared
    /// against a noisy clamped target; the deficit is filled with a
    /// Poisson-sampled number of dummies, each gated by the emission
    /// probability.
    pub fn generate(&mut self, t: u64, graph: &SocialGraph) -> Vec<DummyMessage> {
        let mut dummies = Vec::new();
        if t < self.config.window {
            return dummies;
        }

        self.update_baseline(t);

        let edges: Vec<PairKey> = graph.edges().map(|(pair, _)| pair).collect();
        for pair in edges {
            let recent = self.recent_volume(pair, t);
            let noisy = self.baseline + self.rng.gaussian(0.0, self.config.noise_stddev);
            let target = noisy.clamp(self.config.min_target, self.config.max_target).floor();
            let deficit = (target - recent as f64).max(0.0);
            if deficit == 0.0 {
                continue;
            }

            let amount = self.rng.poisson(deficit);
            for _ in 0..amount {
                if self.rng.chance(self.config.probability_threshold) {
                    dummies.push(DummyMessage {
                        from: pair.a(),
                        to: pair.b(),
                        epoch: t,
                    });
                    self.record_cover(pair, t);
                }
            }
        }
        dummies
    }

    /// Recompute the adaptive baseline: mean real volume per active link
    /// over the window, scaled and clamped.
    fn update_baseline(&mut self, t: u64) {
        let lo = t - self.config.window;
        let mut real_total = 0u64;
        let mut active_links = 0u64;

        for history in self.histories.values() {
            let link_real: u64 = history
                .iter()
                .filter(|e| e.epoch >= lo && e.epoch < t)
                .map(|e| e.real as u64)
                .sum();
            if link_real > 0 {
                real_total += link_real;
                active_links += 1;
            }
        }

        let mean = if active_links == 0 {
            0.0
        } else {
            real_total as f64 / active_links as f64
        };
        self.baseline = (mean * self.config.target_multiplier)
            .clamp(self.config.min_target, self.config.max_target);
    }

    /// Total real + cover volume on a link over the window before `t`.
    fn recent_volume(&self, pair: PairKey, t: u64) -> u64 {
        let lo = t - self.config.window;
        self.histories
            .get(&pair)
            .map(|history| {
                history
                    .iter()
                    .filter(|e| e.epoch >= lo && e.epoch < t)
                    .map(|e| (e.real + e.cover) as u64)
                    .sum()
            })
            .unwrap_or(0)
    }
}
