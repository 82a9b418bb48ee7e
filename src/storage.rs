//! In-memory seed store and round ledger
//!
//! Concurrent maps backing the boundary traits. Used by tests and by hosts
//! that keep seeds in process and persist elsewhere.

use crate::{
    common::traits::{RoundLedger, SeedStore},
    errors::{FairRollResult, StorageError},
    games::types::{RevealedSeedPair, RoundRecord, SeedPair},
};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

#[derive(Default)]
pub struct MemorySeedStore {
    active: DashMap<String, SeedPair>,
    retired: DashMap<String, Vec<RevealedSeedPair>>,
}

impl MemorySeedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeedStore for MemorySeedStore {
    async fn load_active(&self, user_id: &str) -> FairRollResult<Option<SeedPair>> {
        Ok(self.active.get(user_id).map(|pair| pair.clone()))
    }

    async fn insert_if_absent(&self, user_id: &str, pair: SeedPair) -> FairRollResult<SeedPair> {
        let active = self.active.entry(user_id.to_string()).or_insert(pair);
        Ok(active.clone())
    }

    async fn advance_nonce(&self, user_id: &str, server_seed_hash: &str, expected: u64) -> FairRollResult<u64> {
        let mut pair = self
            .active
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound(format!("seed pair for user {}", user_id)))?;

        if pair.server_seed_hash != server_seed_hash || pair.nonce != expected {
            return Err(StorageError::Conflict(format!(
                "nonce {} for user {} already consumed or pair rotated",
                expected, user_id
            ))
            .into());
        }

        pair.nonce += 1;
        Ok(pair.nonce)
    }

    async fn replace_active(&self, user_id: &str, retired: RevealedSeedPair, next: SeedPair) -> FairRollResult<()> {
        match self.active.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().server_seed_hash != retired.server_seed_hash {
                    return Err(StorageError::Conflict(format!(
                        "active pair for user {} changed during rotation",
                        user_id
                    ))
                    .into());
                }
                // Retire before releasing the entry lock so no reader sees the
                // new pair without the old one being on record.
                self.retired.entry(user_id.to_string()).or_default().push(retired);
                entry.insert(next);
                Ok(())
            }
            Entry::Vacant(_) => Err(StorageError::NotFound(format!("seed pair for user {}", user_id)).into()),
        }
    }

    async fn mark_revealed(&self, user_id: &str, server_seed_hash: &str, bets_updated: u64) -> FairRollResult<()> {
        let mut pairs = self
            .retired
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound(format!("retired pairs for user {}", user_id)))?;
        let pair = pairs
            .iter_mut()
            .find(|pair| pair.server_seed_hash == server_seed_hash)
            .ok_or_else(|| StorageError::NotFound(format!("retired pair {} for user {}", server_seed_hash, user_id)))?;
        pair.bets_updated = Some(bets_updated);
        Ok(())
    }

    async fn retired_pairs(&self, user_id: &str) -> FairRollResult<Vec<RevealedSeedPair>> {
        Ok(self.retired.get(user_id).map(|pairs| pairs.clone()).unwrap_or_default())
    }
}

type RoundKey = (String, String, u64);

#[derive(Default)]
pub struct MemoryRoundLedger {
    rounds: DashMap<RoundKey, RoundRecord>,
}

impl MemoryRoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

#[async_trait]
impl RoundLedger for MemoryRoundLedger {
    async fn record_round(&self, record: RoundRecord) -> FairRollResult<()> {
        let key = (record.user_id.clone(), record.server_seed_hash.clone(), record.nonce);
        match self.rounds.entry(key) {
            Entry::Occupied(_) => Err(StorageError::DuplicateRound {
                user_id: record.user_id,
                nonce: record.nonce,
            }
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn reveal_server_seed(&self, user_id: &str, server_seed_hash: &str, server_seed: &str) -> FairRollResult<u64> {
        let mut updated = 0u64;
        for mut round in self.rounds.iter_mut() {
            let (uid, hash, _) = round.key();
            if uid == user_id && hash == server_seed_hash {
                round.value_mut().revealed_server_seed = Some(server_seed.to_string());
                updated += 1;
            }
        }
        debug!(user_id, server_seed_hash, updated, "revealed server seed on rounds");
        Ok(updated)
    }

    async fn load_round(&self, user_id: &str, server_seed_hash: &str, nonce: u64) -> FairRollResult<Option<RoundRecord>> {
        let key = (user_id.to_string(), server_seed_hash.to_string(), nonce);
        Ok(self.rounds.get(&key).map(|round| round.clone()))
    }

    async fn rounds_for_user(&self, user_id: &str) -> FairRollResult<Vec<RoundRecord>> {
        let mut rounds: Vec<RoundRecord> = self
            .rounds
            .iter()
            .filter(|round| round.key().0 == user_id)
            .map(|round| round.value().clone())
            .collect();
        rounds.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.nonce.cmp(&a.nonce)));
        Ok(rounds)
    }
}
