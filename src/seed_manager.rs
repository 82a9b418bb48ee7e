//! Seed pair lifecycle: commit, play, reveal, replace.
//!
//! A pair moves `ACTIVE -> ROTATING -> (superseded, retained)` and is
//! immediately replaced by a fresh `ACTIVE` pair. The raw server seed of an
//! active pair never leaves this module except towards the settlement
//! authority inside the crate.

use crate::{
    common::{
        config::SeedConfig,
        traits::{RoundLedger, SeedStore},
    },
    errors::{CryptoError, FairRollResult, RotationError, StorageError},
    games::{
        betting::validate_client_seed,
        fairness_engine::{rolls_match, FairnessEngine},
        types::{RevealedSeedPair, RotateResult, SeedInfo, SeedPair, VerificationReport},
    },
    metrics::FairnessMetrics,
};
use dashmap::{mapref::entry::Entry, DashMap};
use rand_core::{OsRng, RngCore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Hex-encode `byte_len` bytes from the operating system's secure RNG
pub fn generate_seed(byte_len: usize) -> Result<String, CryptoError> {
    let mut bytes = vec![0u8; byte_len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))?;
    Ok(hex::encode(bytes))
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Marks a user as rotating; cleared on drop so a failed rotation can be retried
struct RotationGuard<'a> {
    rotating: &'a DashMap<String, ()>,
    user_id: String,
}

impl Drop for RotationGuard<'_> {
    fn drop(&mut self) {
        self.rotating.remove(&self.user_id);
    }
}

pub struct SeedManager {
    store: Arc<dyn SeedStore>,
    ledger: Arc<dyn RoundLedger>,
    config: SeedConfig,
    metrics: Arc<FairnessMetrics>,
    pair_locks: DashMap<String, Arc<Mutex<()>>>,
    rotating: DashMap<String, ()>,
}

impl SeedManager {
    pub fn new(store: Arc<dyn SeedStore>, ledger: Arc<dyn RoundLedger>, config: SeedConfig) -> Self {
        Self::with_metrics(store, ledger, config, Arc::new(FairnessMetrics::new()))
    }

    pub fn with_metrics(
        store: Arc<dyn SeedStore>,
        ledger: Arc<dyn RoundLedger>,
        config: SeedConfig,
        metrics: Arc<FairnessMetrics>,
    ) -> Self {
        Self {
            store,
            ledger,
            config,
            metrics,
            pair_locks: DashMap::new(),
            rotating: DashMap::new(),
        }
    }

    pub fn metrics(&self) -> Arc<FairnessMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &Arc<dyn SeedStore> {
        &self.store
    }

    pub(crate) fn ledger(&self) -> &Arc<dyn RoundLedger> {
        &self.ledger
    }

    pub fn generate_client_seed(&self) -> Result<String, CryptoError> {
        generate_seed(self.config.client_seed_bytes)
    }

    pub fn generate_server_seed(&self) -> Result<String, CryptoError> {
        generate_seed(self.config.server_seed_bytes)
    }

    /// The commitment published for a server seed
    pub fn hash(&self, server_seed: &str) -> String {
        FairnessEngine::hash_server_seed(server_seed)
    }

    /// Fresh pair with its hash computed before anything can consume a nonce
    pub fn new_pair(&self, client_seed: Option<String>) -> FairRollResult<SeedPair> {
        let client_seed = match client_seed {
            Some(seed) => {
                validate_client_seed(&seed)?;
                seed
            }
            None => self.generate_client_seed()?,
        };
        let server_seed = self.generate_server_seed()?;
        let server_seed_hash = self.hash(&server_seed);

        Ok(SeedPair {
            client_seed,
            server_seed,
            server_seed_hash,
            nonce: self.config.starting_nonce,
            created_at: now_millis(),
        })
    }

    /// Per-user lock serializing settlement and rotation on a pair
    pub(crate) fn pair_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.pair_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Hand back a lock taken with `pair_lock`, evicting it once nobody else holds it
    pub(crate) fn release_pair_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.pair_locks.remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn pair_lock_count(&self) -> usize {
        self.pair_locks.len()
    }

    /// Active pair for a user, creating one on first use
    pub(crate) async fn active_pair(&self, user_id: &str) -> FairRollResult<SeedPair> {
        if let Some(pair) = self.store.load_active(user_id).await? {
            return Ok(pair);
        }

        let candidate = self.new_pair(None)?;
        let candidate_hash = candidate.server_seed_hash.clone();
        let active = self.store.insert_if_absent(user_id, candidate).await?;
        if active.server_seed_hash == candidate_hash {
            self.metrics.record_pair_created();
            info!(user_id, server_seed_hash = %active.server_seed_hash, "created seed pair");
        }
        Ok(active)
    }

    /// Public view of the user's active pair. Never includes the server seed.
    pub async fn current_seed_info(&self, user_id: &str) -> FairRollResult<SeedInfo> {
        Ok(self.active_pair(user_id).await?.info())
    }

    /// Reveal the active server seed and replace it, keeping the client seed
    pub async fn rotate(&self, user_id: &str) -> FairRollResult<RotateResult> {
        self.rotate_with_client_seed(user_id, None).await
    }

    /// Reveal the active server seed and replace the pair, optionally
    /// installing a new player-chosen client seed.
    ///
    /// The pair is retired in the store before its seed is written to the
    /// ledger, so a revealed seed is never still active. If the ledger write
    /// fails the new pair is already in place and the next call to rotate
    /// finishes the reveal instead of starting another rotation.
    pub async fn rotate_with_client_seed(&self, user_id: &str, client_seed: Option<String>) -> FairRollResult<RotateResult> {
        let _guard = match self.rotating.entry(user_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(RotationError::AlreadyInProgress {
                    user_id: user_id.to_string(),
                }
                .into())
            }
            Entry::Vacant(slot) => {
                slot.insert(());
                RotationGuard {
                    rotating: &self.rotating,
                    user_id: user_id.to_string(),
                }
            }
        };

        if let Some(ref seed) = client_seed {
            validate_client_seed(seed)?;
        }

        let lock = self.pair_lock(user_id);
        let result = {
            let _held = lock.lock().await;
            self.rotate_locked(user_id, client_seed).await
        };
        self.release_pair_lock(user_id, lock);

        match &result {
            Ok(rotated) => {
                self.metrics.record_rotation();
                info!(
                    user_id,
                    revealed_hash = %rotated.revealed_hash,
                    new_server_seed_hash = %rotated.new_server_seed_hash,
                    bets_updated = rotated.bets_updated,
                    "rotated seed pair"
                );
            }
            Err(e) => {
                self.metrics.record_rotation_failure();
                warn!(user_id, error = %e, "seed rotation aborted");
            }
        }
        result
    }

    async fn rotate_locked(&self, user_id: &str, client_seed: Option<String>) -> FairRollResult<RotateResult> {
        if let Some(pending) = self
            .store
            .retired_pairs(user_id)
            .await?
            .into_iter()
            .find(RevealedSeedPair::reveal_pending)
        {
            warn!(user_id, revealed_hash = %pending.server_seed_hash, "finishing interrupted seed reveal");
            return self.finish_reveal(user_id, pending).await;
        }

        let current = self
            .store
            .load_active(user_id)
            .await?
            .ok_or_else(|| RotationError::NoActivePair {
                user_id: user_id.to_string(),
            })?;

        let recomputed = self.hash(&current.server_seed);
        if recomputed != current.server_seed_hash {
            error!(
                user_id,
                expected = %current.server_seed_hash,
                actual = %recomputed,
                "stored server seed does not match its commitment"
            );
            return Err(RotationError::HashMismatch {
                expected: current.server_seed_hash,
                actual: recomputed,
            }
            .into());
        }

        let next = self.new_pair(Some(client_seed.unwrap_or_else(|| current.client_seed.clone())))?;

        let retired = RevealedSeedPair {
            client_seed: current.client_seed,
            server_seed: current.server_seed,
            server_seed_hash: current.server_seed_hash,
            final_nonce: current.nonce,
            created_at: current.created_at,
            revealed_at: now_millis(),
            bets_updated: None,
        };
        self.store.replace_active(user_id, retired.clone(), next).await?;

        self.finish_reveal(user_id, retired).await
    }

    /// Attach a retired seed to its ledger rounds and mark the pair revealed
    async fn finish_reveal(&self, user_id: &str, retired: RevealedSeedPair) -> FairRollResult<RotateResult> {
        let bets_updated = self
            .ledger
            .reveal_server_seed(user_id, &retired.server_seed_hash, &retired.server_seed)
            .await?;
        self.store
            .mark_revealed(user_id, &retired.server_seed_hash, bets_updated)
            .await?;

        let active = self
            .store
            .load_active(user_id)
            .await?
            .ok_or_else(|| RotationError::NoActivePair {
                user_id: user_id.to_string(),
            })?;

        Ok(RotateResult {
            revealed_server_seed: retired.server_seed,
            revealed_hash: retired.server_seed_hash,
            bets_updated,
            new_server_seed_hash: active.server_seed_hash,
            client_seed: active.client_seed,
        })
    }

    /// Pairs retired by earlier rotations
    pub async fn retired_pairs(&self, user_id: &str) -> FairRollResult<Vec<RevealedSeedPair>> {
        self.store.retired_pairs(user_id).await
    }

    /// Re-derive a recorded round once its server seed has been revealed
    pub async fn verify_round(&self, user_id: &str, server_seed_hash: &str, nonce: u64) -> FairRollResult<VerificationReport> {
        let record = self
            .ledger
            .load_round(user_id, server_seed_hash, nonce)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("round {} for user {}", nonce, user_id)))?;

        // A pair retired by a rotation whose ledger write failed is already public.
        let server_seed = match record.revealed_server_seed.clone() {
            Some(seed) => seed,
            None => match self
                .store
                .retired_pairs(user_id)
                .await?
                .into_iter()
                .find(|pair| pair.server_seed_hash == record.server_seed_hash)
            {
                Some(pair) => pair.server_seed,
                None => {
                    return Ok(VerificationReport::Pending {
                        round_id: record.round_id,
                    })
                }
            },
        };

        let computed_roll = FairnessEngine::derive_roll(&record.client_seed, &server_seed, record.nonce);
        let commitment_holds = self.hash(&server_seed) == record.server_seed_hash;

        if commitment_holds && rolls_match(computed_roll, record.roll) {
            return Ok(VerificationReport::Verified {
                round_id: record.round_id,
                roll: computed_roll,
            });
        }

        self.metrics.record_verification_failure();
        warn!(
            user_id,
            nonce,
            recorded_roll = record.roll,
            computed_roll,
            commitment_holds,
            "recorded round failed verification"
        );
        Ok(VerificationReport::Mismatch {
            round_id: record.round_id,
            recorded_roll: record.roll,
            computed_roll,
        })
    }
}
