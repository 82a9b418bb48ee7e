use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the target counts as a win
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BetCondition {
    Over,
    Under,
}

impl fmt::Display for BetCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetCondition::Over => write!(f, "over"),
            BetCondition::Under => write!(f, "under"),
        }
    }
}

impl std::str::FromStr for BetCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "over" => Ok(BetCondition::Over),
            "under" => Ok(BetCondition::Under),
            other => Err(format!("unknown condition '{}', expected over or under", other)),
        }
    }
}

/// Per-round betting parameters supplied by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BetConfiguration {
    pub target: f64,
    pub condition: BetCondition,
    #[serde(default = "default_house_edge")]
    pub house_edge: f64,
}

pub const DEFAULT_HOUSE_EDGE: f64 = 1.0;

fn default_house_edge() -> f64 {
    DEFAULT_HOUSE_EDGE
}

impl BetConfiguration {
    pub fn new(target: f64, condition: BetCondition) -> Self {
        Self {
            target,
            condition,
            house_edge: DEFAULT_HOUSE_EDGE,
        }
    }

    pub fn with_house_edge(mut self, house_edge: f64) -> Self {
        self.house_edge = house_edge;
        self
    }

    /// Probability of winning as a percentage, before any clamping
    pub fn win_chance(&self) -> f64 {
        match self.condition {
            BetCondition::Under => self.target,
            BetCondition::Over => 100.0 - self.target,
        }
    }
}

/// The unit of commitment. The server seed stays secret while the pair is active.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedPair {
    pub client_seed: String,
    pub server_seed: String,
    pub server_seed_hash: String,
    pub nonce: u64,
    /// Unix millis when the commitment was published
    pub created_at: i64,
}

// Keeps the secret seed out of logs and panic messages.
impl fmt::Debug for SeedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedPair")
            .field("client_seed", &self.client_seed)
            .field("server_seed", &"<redacted>")
            .field("server_seed_hash", &self.server_seed_hash)
            .field("nonce", &self.nonce)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl SeedPair {
    /// The public view of this pair
    pub fn info(&self) -> SeedInfo {
        SeedInfo {
            client_seed: self.client_seed.clone(),
            server_seed_hash: self.server_seed_hash.clone(),
            nonce: self.nonce,
        }
    }
}

/// What the caller sees during active play. Never carries the server seed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedInfo {
    pub client_seed: String,
    pub server_seed_hash: String,
    /// Next nonce to be consumed
    pub nonce: u64,
}

/// A superseded pair retained for audit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevealedSeedPair {
    pub client_seed: String,
    pub server_seed: String,
    pub server_seed_hash: String,
    /// Nonce the pair had reached when it was retired
    pub final_nonce: u64,
    pub created_at: i64,
    pub revealed_at: i64,
    /// Rounds the ledger attached the seed to; `None` until the ledger reveal lands
    #[serde(default)]
    pub bets_updated: Option<u64>,
}

impl RevealedSeedPair {
    pub fn reveal_pending(&self) -> bool {
        self.bets_updated.is_none()
    }
}

/// Output of one fairness engine evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResult {
    pub roll: f64,
    pub won: bool,
    pub multiplier: f64,
    pub payout: f64,
    pub profit: f64,
    pub nonce: u64,
    pub server_seed_hash: String,
}

/// Request to evaluate one round against known seeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub client_seed: String,
    pub server_seed: String,
    pub nonce: u64,
    pub config: BetConfiguration,
    pub stake: f64,
}

/// Request to place a bet against a user's active seed pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub user_id: String,
    pub target: f64,
    pub condition: BetCondition,
    pub stake: f64,
}

/// Result of a seed rotation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotateResult {
    pub revealed_server_seed: String,
    pub revealed_hash: String,
    pub bets_updated: u64,
    pub new_server_seed_hash: String,
    pub client_seed: String,
}

/// Request to check a roll against revealed seeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub client_seed: String,
    pub server_seed: String,
    pub nonce: u64,
    pub expected_roll: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyResponse {
    pub is_valid: bool,
    pub computed_roll: f64,
    /// None when no commitment was supplied to check against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_matches: Option<bool>,
}

/// A settled round as held by the round ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    pub round_id: String,
    pub user_id: String,
    pub protocol_version: u32,
    pub client_seed: String,
    pub server_seed_hash: String,
    /// Filled in when the pair is rotated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_server_seed: Option<String>,
    pub nonce: u64,
    pub config: BetConfiguration,
    pub stake: f64,
    pub roll: f64,
    pub won: bool,
    pub multiplier: f64,
    pub payout: f64,
    pub profit: f64,
    pub timestamp: i64,
}

/// Outcome of re-deriving a recorded round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationReport {
    /// Seed revealed and the recorded roll reproduces
    Verified { round_id: String, roll: f64 },
    /// Seed revealed but the recorded roll does not reproduce
    Mismatch {
        round_id: String,
        recorded_roll: f64,
        computed_roll: f64,
    },
    /// Pair still active; nothing can be checked yet
    Pending { round_id: String },
}
