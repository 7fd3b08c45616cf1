//! Sweep configuration from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shroud_adversary::Placement;

use crate::error::{Error, Result};

/// Tier edge probabilities, part of every ground-truth key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierProbabilities {
    pub intimate: f64,
    pub friend: f64,
    pub acquaintance: f64,
}

impl Default for TierProbabilities {
    fn default() -> Self {
        Self {
            intimate: 0.02,
            friend: 0.05,
            acquaintance: 0.10,
        }
    }
}

/// The full parameter grid for a sweep, plus output locations.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Community sizes.
    pub users: Vec<usize>,
    /// Hop budgets.
    pub hmax: Vec<usize>,
    /// Experiment seeds.
    pub seeds: Vec<i64>,
    /// Observer counts.
    pub observer_counts: Vec<usize>,
    /// Observer placement strategies.
    pub placements: Vec<Placement>,
    /// Cover-traffic rates; 0 disables cover, a positive rate enables it
    /// as the target multiplier.
    pub cover_rates: Vec<f64>,
    /// Horizon in epochs.
    pub horizon: u64,
    pub tier_probabilities: TierProbabilities,
    /// Per-run result directory.
    pub out_dir: PathBuf,
    /// Ground-truth record directory.
    pub ground_truth_dir: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            users: vec![50, 75, 100, 150, 200, 300, 400],
            hmax: vec![1, 3],
            seeds: (1..=10).collect(),
            observer_counts: vec![5],
            placements: Placement::ALL.to_vec(),
            cover_rates: vec![0.0, 0.05, 0.1],
            horizon: 200,
            tier_probabilities: TierProbabilities::default(),
            out_dir: PathBuf::from("./out"),
            ground_truth_dir: PathBuf::from("./ground_truth"),
        }
    }
}

impl SweepConfig {
    /// Build the config from `SHROUD_*` environment variables, falling
    /// back to the full default grid.
    ///
    /// List variables are comma-separated (`SHROUD_USERS=50,100`). A
    /// malformed value is a configuration error, not a silent default.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            users: env_list("SHROUD_USERS", defaults.users)?,
            hmax: env_list("SHROUD_HMAX", defaults.hmax)?,
            seeds: env_list("SHROUD_SEEDS", defaults.seeds)?,
            observer_counts: env_list("SHROUD_OBSERVERS", defaults.observer_counts)?,
            placements: env_list("SHROUD_PLACEMENTS", defaults.placements)?,
            cover_rates: env_list("SHROUD_COVER_RATES", defaults.cover_rates)?,
            horizon: env_value("SHROUD_HORIZON", defaults.horizon)?,
            tier_probabilities: TierProbabilities {
                intimate: env_value("SHROUD_P_INTIMATE", defaults.tier_probabilities.intimate)?,
                friend: env_value("SHROUD_P_FRIEND", defaults.tier_probabilities.friend)?,
                acquaintance: env_value(
                    "SHROUD_P_ACQUAINTANCE",
                    defaults.tier_probabilities.acquaintance,
                )?,
            },
            out_dir: std::env::var("SHROUD_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.out_dir),
            ground_truth_dir: std::env::var("SHROUD_GROUND_TRUTH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.ground_truth_dir),
        })
    }

    /// Total number of experiments in the grid.
    pub fn run_count(&self) -> usize {
        self.users.len()
            * self.hmax.len()
            * self.seeds.len()
            * self.observer_counts.len()
            * self.placements.len()
            * self.cover_rates.len()
    }

    /// Validate the grid before running.
    pub fn validate(&self) -> Result<()> {
        if self.run_count() == 0 {
            return Err(Error::Config("empty parameter grid".into()));
        }
        if self.horizon == 0 {
            return Err(Error::Config("horizon must be positive".into()));
        }
        let p = &self.tier_probabilities;
        for (name, value) in [
            ("intimate", p.intimate),
            ("friend", p.friend),
            ("acquaintance", p.acquaintance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "tier probability {} out of range: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Parse one scalar env var, or keep the default when unset.
fn env_value<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated env var, or keep the default when unset.
fn env_list<T>(key: &str, default: Vec<T>) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .map_err(|e| Error::Config(format!("{}: {}", key, e)))
            })
            .collect(),
        Err(_) => Ok(default),
    }
}
