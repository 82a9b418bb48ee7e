//! Reference settlement authority.
//!
//! Assigns nonces, evaluates bets against the active seed pair and records
//! the results. Nonce allocation is serialized per user through the same lock
//! rotation takes, so no `(client_seed, server_seed, nonce)` triple is ever
//! used twice and no bet lands on a pair that is being revealed. Balances are
//! not touched here.

use crate::{
    errors::FairRollResult,
    games::{
        betting::BetValidator,
        fairness_engine::{FairnessEngine, PROTOCOL_VERSION},
        types::{BetConfiguration, PlaceBetRequest, RoundRecord, RoundResult},
    },
    seed_manager::SeedManager,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A settled bet as returned to the caller
#[derive(Debug, Clone)]
pub struct SettledBet {
    pub round_id: String,
    pub result: RoundResult,
}

pub struct BetSettlement {
    seeds: Arc<SeedManager>,
    validator: BetValidator,
}

impl BetSettlement {
    pub fn new(seeds: Arc<SeedManager>, validator: BetValidator) -> Self {
        Self { seeds, validator }
    }

    pub fn seeds(&self) -> &Arc<SeedManager> {
        &self.seeds
    }

    /// Validate, evaluate and record one bet against the user's active pair
    pub async fn place_bet(&self, request: PlaceBetRequest) -> FairRollResult<SettledBet> {
        let config = self.validator.validate_bet(&request)?;

        let lock = self.seeds.pair_lock(&request.user_id);
        let settled = {
            let _held = lock.lock().await;
            self.settle_locked(&request, config).await
        };
        self.seeds.release_pair_lock(&request.user_id, lock);
        settled
    }

    async fn settle_locked(&self, request: &PlaceBetRequest, config: BetConfiguration) -> FairRollResult<SettledBet> {
        let user_id = request.user_id.as_str();
        let mut pair = self.seeds.active_pair(user_id).await?;

        // A round recorded at the active nonce means an earlier attempt died
        // before advancing it. The recorded round stands; move past it.
        while let Some(stranded) = self
            .seeds
            .ledger()
            .load_round(user_id, &pair.server_seed_hash, pair.nonce)
            .await?
        {
            warn!(
                user_id,
                round_id = %stranded.round_id,
                nonce = pair.nonce,
                "advancing nonce past an already recorded round"
            );
            pair.nonce = self
                .seeds
                .store()
                .advance_nonce(user_id, &pair.server_seed_hash, pair.nonce)
                .await?;
        }

        let result = FairnessEngine::evaluate(&pair.client_seed, &pair.server_seed, pair.nonce, &config, request.stake);

        let round_id = Uuid::new_v4().to_string();
        let record = RoundRecord {
            round_id: round_id.clone(),
            user_id: user_id.to_string(),
            protocol_version: PROTOCOL_VERSION,
            client_seed: pair.client_seed.clone(),
            server_seed_hash: result.server_seed_hash.clone(),
            revealed_server_seed: None,
            nonce: result.nonce,
            config,
            stake: request.stake,
            roll: result.roll,
            won: result.won,
            multiplier: result.multiplier,
            payout: result.payout,
            profit: result.profit,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        // Record first: a recorded round with an unadvanced nonce is skipped
        // by the next bet, never settled twice.
        self.seeds.ledger().record_round(record).await?;
        self.seeds
            .store()
            .advance_nonce(user_id, &pair.server_seed_hash, pair.nonce)
            .await?;

        self.seeds.metrics().record_round();
        info!(
            user_id,
            round_id = %round_id,
            nonce = result.nonce,
            roll = result.roll,
            won = result.won,
            "settled bet"
        );

        Ok(SettledBet { round_id, result })
    }
}
