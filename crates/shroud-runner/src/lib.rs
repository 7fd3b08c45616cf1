//! Shroud Runner
//!
//! Drives parameter sweeps of the mesh metadata-privacy simulation:
//! ground-truth graphs are generated (or reloaded) per key, each parameter
//! tuple runs one fresh experiment, and results land as JSON under the
//! output directory together with a sweep summary.

pub mod config;
pub mod error;
pub mod export;
pub mod ground_truth;
pub mod report;
pub mod sweep;

pub use config::{SweepConfig, TierProbabilities};
pub use error::{Error, Result};
pub use ground_truth::{GroundTruthRecord, GroundTruthStore};
pub use report::{run_filename, RunParams, RunReport, RunResults, Summary};
pub use sweep::{run_experiment, run_sweep};
