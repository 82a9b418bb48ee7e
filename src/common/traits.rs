//! Boundary traits for the external backend
//!
//! The fairness core never owns persistence. Seed pairs and settled rounds
//! live behind these interfaces so the hosting application can back them
//! with whatever store it already runs.

use crate::errors::FairRollResult;
use crate::games::types::{RevealedSeedPair, RoundRecord, SeedPair};
use async_trait::async_trait;

/// Storage for each user's active seed pair and retired pairs
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Active pair for a user, if any
    async fn load_active(&self, user_id: &str) -> FairRollResult<Option<SeedPair>>;

    /// Install `pair` only if the user has no active pair. Returns whichever
    /// pair is active afterwards.
    async fn insert_if_absent(&self, user_id: &str, pair: SeedPair) -> FairRollResult<SeedPair>;

    /// Advance the nonce from `expected` to `expected + 1`.
    ///
    /// Fails with a conflict if the active pair is not `server_seed_hash` or
    /// its nonce is not `expected`; a nonce is never handed out twice.
    async fn advance_nonce(&self, user_id: &str, server_seed_hash: &str, expected: u64) -> FairRollResult<u64>;

    /// Swap the active pair for `next` and retain `retired`, as one step.
    /// Fails with a conflict if the active pair's hash is no longer `retired.server_seed_hash`.
    async fn replace_active(&self, user_id: &str, retired: RevealedSeedPair, next: SeedPair) -> FairRollResult<()>;

    /// Record that the ledger reveal for a retired pair completed
    async fn mark_revealed(&self, user_id: &str, server_seed_hash: &str, bets_updated: u64) -> FairRollResult<()>;

    /// Pairs superseded by rotation, oldest first
    async fn retired_pairs(&self, user_id: &str) -> FairRollResult<Vec<RevealedSeedPair>>;
}

/// Ledger of settled rounds, keyed by `(user_id, server_seed_hash, nonce)`
#[async_trait]
pub trait RoundLedger: Send + Sync {
    /// Persist a settled round. Recording the same key twice is an error.
    async fn record_round(&self, record: RoundRecord) -> FairRollResult<()>;

    /// Attach the revealed seed to every round settled under
    /// `server_seed_hash` and return how many rounds were updated.
    ///
    /// Runs after the pair has been retired and must be idempotent: a
    /// rotation that fails here is finished by the next call to rotate.
    async fn reveal_server_seed(&self, user_id: &str, server_seed_hash: &str, server_seed: &str) -> FairRollResult<u64>;

    async fn load_round(&self, user_id: &str, server_seed_hash: &str, nonce: u64) -> FairRollResult<Option<RoundRecord>>;

    /// All rounds for a user, newest first
    async fn rounds_for_user(&self, user_id: &str) -> FairRollResult<Vec<RoundRecord>>;
}
