//! Provably fair roll derivation.
//!
//! The public verification protocol (version 1):
//!
//! 1. `input = "{client_seed}:{server_seed}:{nonce}"`
//! 2. `digest = SHA-256(utf8(input))`
//! 3. `value = u32::from_be_bytes(digest[0..4])`
//! 4. `roll = floor(value / 0xFFFFFFFF * 10000) / 100`, clamped to `[0, 99.99]`
//!
//! Field order and separator are frozen; changing either requires bumping
//! [`PROTOCOL_VERSION`] or every historical round becomes unverifiable.

use crate::games::types::{BetCondition, BetConfiguration, EvaluateRequest, RoundResult, VerifyRequest, VerifyResponse};
use sha2::{Digest, Sha256};

pub const PROTOCOL_VERSION: u32 = 1;

const INPUT_SEPARATOR: char = ':';

pub const MIN_ROLL: f64 = 0.0;
pub const MAX_ROLL: f64 = 99.99;

/// Win chance is clamped to this range before it feeds the multiplier
pub const MIN_WIN_CHANCE: f64 = 0.01;
pub const MAX_WIN_CHANCE: f64 = 98.99;

/// How far a claimed roll may sit from the derived one, in hundredths
pub const VERIFY_TOLERANCE_HUNDREDTHS: f64 = 1.0;

const MULTIPLIER_SCALE: f64 = 10_000.0;

/// Stateless outcome generator. Every function is pure and safe to call
/// from any number of threads.
pub struct FairnessEngine;

impl FairnessEngine {
    /// Build the digest input for one round
    pub fn round_input(client_seed: &str, server_seed: &str, nonce: u64) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            client_seed,
            server_seed,
            nonce,
            sep = INPUT_SEPARATOR
        )
    }

    /// Hex-encoded SHA-256 of a server seed; this is the published commitment
    pub fn hash_server_seed(server_seed: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(server_seed.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Derive the two-decimal roll in `[0.00, 99.99]` for a round
    pub fn derive_roll(client_seed: &str, server_seed: &str, nonce: u64) -> f64 {
        let input = Self::round_input(client_seed, server_seed, nonce);

        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        let digest = hasher.finalize();

        let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        roll_from_u32(value)
    }

    /// Evaluate one round: derive the roll and settle the stake against it
    pub fn evaluate(
        client_seed: &str,
        server_seed: &str,
        nonce: u64,
        config: &BetConfiguration,
        stake: f64,
    ) -> RoundResult {
        let roll = Self::derive_roll(client_seed, server_seed, nonce);
        let settlement = settle_roll(roll, config, stake);

        tracing::debug!(
            nonce,
            roll,
            won = settlement.won,
            multiplier = settlement.multiplier,
            "evaluated round"
        );

        RoundResult {
            roll,
            won: settlement.won,
            multiplier: settlement.multiplier,
            payout: settlement.payout,
            profit: settlement.profit,
            nonce,
            server_seed_hash: Self::hash_server_seed(server_seed),
        }
    }

    /// Recompute a roll and compare it with a claimed value. Never fails.
    pub fn verify(client_seed: &str, server_seed: &str, nonce: u64, expected_roll: f64) -> bool {
        let computed = Self::derive_roll(client_seed, server_seed, nonce);
        rolls_match(computed, expected_roll)
    }

    pub fn evaluate_request(request: &EvaluateRequest) -> RoundResult {
        Self::evaluate(
            &request.client_seed,
            &request.server_seed,
            request.nonce,
            &request.config,
            request.stake,
        )
    }

    /// Check a claimed roll and, when given, the commitment it was played under
    pub fn verify_request(request: &VerifyRequest) -> VerifyResponse {
        let computed_roll = Self::derive_roll(&request.client_seed, &request.server_seed, request.nonce);
        let hash_matches = request
            .server_seed_hash
            .as_deref()
            .map(|hash| hash.eq_ignore_ascii_case(&Self::hash_server_seed(&request.server_seed)));

        VerifyResponse {
            is_valid: rolls_match(computed_roll, request.expected_roll) && hash_matches.unwrap_or(true),
            computed_roll,
            hash_matches,
        }
    }
}

/// Map the leading digest word onto the two-decimal roll scale
pub fn roll_from_u32(value: u32) -> f64 {
    let normalized = value as f64 / u32::MAX as f64;
    let roll = (normalized * 10_000.0).floor() / 100.0;
    roll.clamp(MIN_ROLL, MAX_ROLL)
}

/// Compared in whole hundredths so both neighbours of a roll match
/// regardless of how their difference rounds in binary.
pub fn rolls_match(computed: f64, expected: f64) -> bool {
    expected.is_finite()
        && ((computed * 100.0).round() - (expected * 100.0).round()).abs() <= VERIFY_TOLERANCE_HUNDREDTHS
}

pub fn clamp_win_chance(win_chance: f64) -> f64 {
    win_chance.clamp(MIN_WIN_CHANCE, MAX_WIN_CHANCE)
}

/// `(100 - house_edge) / win_chance`, truncated to four decimals.
///
/// Truncation keeps payouts at or below the edge-adjusted expectation.
pub fn compute_multiplier(win_chance: f64, house_edge: f64) -> f64 {
    let raw = (100.0 - house_edge) / clamp_win_chance(win_chance);
    // The epsilon absorbs representation error such as 1.98 * 1e4 = 19799.999...
    ((raw * MULTIPLIER_SCALE) + 1e-7).floor() / MULTIPLIER_SCALE
}

/// Ties always lose, for both conditions
pub fn is_winning_roll(roll: f64, target: f64, condition: BetCondition) -> bool {
    match condition {
        BetCondition::Under => roll < target,
        BetCondition::Over => roll > target,
    }
}

/// Settlement of a stake against an already derived roll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollSettlement {
    pub won: bool,
    pub multiplier: f64,
    pub payout: f64,
    pub profit: f64,
}

pub fn settle_roll(roll: f64, config: &BetConfiguration, stake: f64) -> RollSettlement {
    let multiplier = compute_multiplier(config.win_chance(), config.house_edge);
    let won = is_winning_roll(roll, config.target, config.condition);

    let (payout, profit) = if won {
        let payout = stake * multiplier;
        (payout, payout - stake)
    } else {
        (0.0, -stake)
    };

    RollSettlement {
        won,
        multiplier,
        payout,
        profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(FairnessEngine::round_input("abc", "def", 0), "abc:def:0");
        assert_eq!(FairnessEngine::derive_roll("abc", "def", 0), 76.32);
        assert_eq!(FairnessEngine::derive_roll("abc", "def", 1), 0.96);
        assert_eq!(FairnessEngine::derive_roll("abc", "def", 2), 75.06);
        assert_eq!(
            FairnessEngine::hash_server_seed("def"),
            "cb8379ac2098aa165029e3938a51da0bcecfc008fd6795f401178647f96c5b34"
        );
    }

    #[test]
    fn test_derive_roll_deterministic() {
        for nonce in 0..50 {
            let a = FairnessEngine::derive_roll("client", "server", nonce);
            let b = FairnessEngine::derive_roll("client", "server", nonce);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_roll_range_and_resolution() {
        for nonce in 0..500 {
            let roll = FairnessEngine::derive_roll("range-check", "seed", nonce);
            assert!((MIN_ROLL..=MAX_ROLL).contains(&roll), "roll {} out of range", roll);
            let hundredths = roll * 100.0;
            assert!(approx(hundredths, hundredths.round()), "roll {} has more than two decimals", roll);
        }
    }

    #[test]
    fn test_roll_extremes() {
        assert_eq!(roll_from_u32(0), 0.0);
        assert_eq!(roll_from_u32(u32::MAX), MAX_ROLL);
        assert!(roll_from_u32(u32::MAX - 1) <= MAX_ROLL);
    }

    #[test]
    fn test_empty_server_seed_still_deterministic() {
        let a = FairnessEngine::derive_roll("abc", "", 0);
        assert_eq!(a, FairnessEngine::derive_roll("abc", "", 0));
    }

    #[test]
    fn test_verify_round_trip() {
        for nonce in 0..100 {
            let roll = FairnessEngine::derive_roll("abc", "def", nonce);
            assert!(FairnessEngine::verify("abc", "def", nonce, roll));
        }
        assert!(!FairnessEngine::verify("abc", "def", 0, 76.32 + 0.5));
        assert!(!FairnessEngine::verify("abc", "def", 0, f64::NAN));
    }

    #[test]
    fn test_verify_request_checks_commitment() {
        let mut request = VerifyRequest {
            client_seed: "abc".to_string(),
            server_seed: "def".to_string(),
            nonce: 0,
            expected_roll: 76.32,
            server_seed_hash: None,
        };
        let response = FairnessEngine::verify_request(&request);
        assert!(response.is_valid);
        assert_eq!(response.computed_roll, 76.32);
        assert_eq!(response.hash_matches, None);

        request.server_seed_hash = Some(FairnessEngine::hash_server_seed("def").to_uppercase());
        assert_eq!(FairnessEngine::verify_request(&request).hash_matches, Some(true));

        request.server_seed_hash = Some("00".repeat(32));
        let response = FairnessEngine::verify_request(&request);
        assert_eq!(response.hash_matches, Some(false));
        assert!(!response.is_valid);
    }

    #[test]
    fn test_evaluate_request_matches_evaluate() {
        let request = EvaluateRequest {
            client_seed: "abc".to_string(),
            server_seed: "def".to_string(),
            nonce: 1,
            config: BetConfiguration::new(2.0, BetCondition::Under),
            stake: 2.0,
        };
        let result = FairnessEngine::evaluate_request(&request);
        // Roll 0.96 under 2.00 wins at 49.5x.
        assert_eq!(result.roll, 0.96);
        assert!(result.won);
        assert!(approx(result.payout, 99.0));
        assert!(approx(result.profit, 97.0));
    }

    #[test]
    fn test_verify_tolerance_is_symmetric() {
        assert!(FairnessEngine::verify("abc", "def", 0, 76.32));
        assert!(FairnessEngine::verify("abc", "def", 0, 76.31));
        assert!(FairnessEngine::verify("abc", "def", 0, 76.33));
        assert!(!FairnessEngine::verify("abc", "def", 0, 76.30));
        assert!(!FairnessEngine::verify("abc", "def", 0, 76.34));

        for nonce in 0..2000 {
            let roll = FairnessEngine::derive_roll("grid", "seed", nonce);
            let cents = (roll * 100.0).round();
            for neighbour in [cents - 1.0, cents + 1.0] {
                assert!(rolls_match(roll, neighbour / 100.0), "neighbour of {} rejected", roll);
            }
            for far in [cents - 2.0, cents + 2.0] {
                assert!(!rolls_match(roll, far / 100.0), "{} accepted for {}", far / 100.0, roll);
            }
        }
    }

    #[test]
    fn test_multiplier_vectors() {
        assert!(approx(compute_multiplier(50.0, 1.0), 1.98));
        assert!(approx(compute_multiplier(2.0, 1.0), 49.5));
        assert!(approx(compute_multiplier(3.0, 1.0), 33.0));
        // 97 / 3 = 32.3333..., truncated rather than rounded
        assert!(approx(compute_multiplier(3.0, 3.0), 32.3333));
        // 99 / 7 = 14.142857..., rounding would give 14.1429
        assert!(approx(compute_multiplier(7.0, 1.0), 14.1428));
    }

    #[test]
    fn test_multiplier_monotonic_in_win_chance() {
        let mut previous = f64::INFINITY;
        for step in 1..=98 {
            let m = compute_multiplier(step as f64, 1.0);
            assert!(m < previous, "multiplier not decreasing at win chance {}", step);
            previous = m;
        }
    }

    #[test]
    fn test_win_chance_clamped() {
        assert_eq!(clamp_win_chance(0.0), MIN_WIN_CHANCE);
        assert_eq!(clamp_win_chance(99.5), MAX_WIN_CHANCE);
        assert!(compute_multiplier(0.0, 1.0).is_finite());
        assert!(compute_multiplier(99.99, 1.0) >= 1.0);
    }

    #[test]
    fn test_tie_always_loses() {
        for target in [2.0, 50.0, 76.32, 98.0] {
            assert!(!is_winning_roll(target, target, BetCondition::Under));
            assert!(!is_winning_roll(target, target, BetCondition::Over));
        }
    }

    #[test]
    fn test_under_two_boundary() {
        let config = BetConfiguration::new(2.0, BetCondition::Under);
        let win = settle_roll(1.99, &config, 10.0);
        assert!(win.won);
        assert!(approx(win.multiplier, 49.5));
        assert!(approx(win.payout, 495.0));
        assert!(approx(win.profit, 485.0));

        let loss = settle_roll(2.00, &config, 10.0);
        assert!(!loss.won);
        assert_eq!(loss.payout, 0.0);
        assert_eq!(loss.profit, -10.0);
    }

    #[test]
    fn test_evaluate_fixture() {
        let over = BetConfiguration::new(50.0, BetCondition::Over);
        let result = FairnessEngine::evaluate("abc", "def", 0, &over, 1.0);
        assert_eq!(result.roll, 76.32);
        assert!(result.won);
        assert!(approx(result.multiplier, 1.98));
        assert!(approx(result.payout, 1.98));
        assert_eq!(result.nonce, 0);
        assert_eq!(result.server_seed_hash, FairnessEngine::hash_server_seed("def"));

        let under = BetConfiguration::new(50.0, BetCondition::Under);
        let result = FairnessEngine::evaluate("abc", "def", 0, &under, 1.0);
        assert!(!result.won);
        assert_eq!(result.profit, -1.0);
    }
}
