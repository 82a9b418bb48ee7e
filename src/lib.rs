//! fairroll - provably fair dice outcomes
//!
//! Commit-reveal fairness for dice-style games. The operator publishes
//! `SHA-256(server_seed)` before any bet, every round derives its roll from
//! `client_seed:server_seed:nonce`, and rotation reveals the server seed so
//! anyone can recompute every historical roll.
//!
//! - [`games::FairnessEngine`] is the pure outcome function.
//! - [`seed_manager::SeedManager`] owns the seed pair lifecycle.
//! - [`games::BetSettlement`] is a reference settlement authority that
//!   serializes nonce allocation per user.

pub mod common;
pub mod errors;
pub mod games;
pub mod metrics;
pub mod seed_manager;
pub mod storage;

pub use common::config::{ConfigBuilder, ConfigLoader, FairRollConfig};
pub use errors::{FairRollError, FairRollResult};
pub use games::{
    BetCondition, BetConfiguration, BetSettlement, BetValidator, FairnessEngine, RoundResult, RotateResult,
    SeedInfo, SeedPair,
};
pub use seed_manager::SeedManager;
pub use storage::{MemoryRoundLedger, MemorySeedStore};
