//! Shroud Social Graph
//!
//! Reproducible construction of the tiered small-world graphs that the mesh
//! simulator runs on.
//!
//! # Model
//!
//! Every user is a dense integer id. Edges are undirected and carry one of
//! three relationship tiers (intimate > friend > acquaintance). Construction
//! is fully deterministic: the same seed produces a byte-identical graph.
//!
//! # Determinism
//!
//! All randomness flows through [`LehmerRng`], a seeded multiplicative
//! congruential generator. Components that must not perturb each other's
//! decisions construct their own stream from the experiment seed.

mod builder;
mod graph;
mod rng;
mod stats;
mod tier;

pub use builder::{build_graph, GraphConfig};
pub use graph::{NodeId, PairKey, SocialGraph};
pub use rng::LehmerRng;
pub use stats::{compute_statistics, GraphStatistics, TierDistribution};
pub use tier::Tier;
