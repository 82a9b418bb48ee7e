//! Betting-configuration layer.
//!
//! Everything here runs before the fairness engine sees a bet: the engine
//! assumes its input is already valid and never rejects anything itself.

use crate::common::config::EngineConfig;
use crate::errors::ValidationError;
use crate::games::fairness_engine::{clamp_win_chance, compute_multiplier, MAX_WIN_CHANCE, MIN_WIN_CHANCE};
use crate::games::types::{BetCondition, BetConfiguration, EvaluateRequest, PlaceBetRequest};

const MAX_CLIENT_SEED_LEN: usize = 64;
const SERVER_SEED_HEX_LEN: usize = 64;

/// Highest target an over bet can still win against, one step below the top roll
pub const MAX_OVER_TARGET: f64 = 99.98;

/// Validates bets against the operator's configured limits
#[derive(Debug, Clone)]
pub struct BetValidator {
    config: EngineConfig,
}

impl BetValidator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn house_edge(&self) -> f64 {
        self.config.house_edge
    }

    /// Build the configuration for a bet using the game's house edge
    pub fn configure(&self, target: f64, condition: BetCondition) -> Result<BetConfiguration, ValidationError> {
        let config = BetConfiguration::new(target, condition).with_house_edge(self.config.house_edge);
        self.validate_configuration(&config)?;
        Ok(config)
    }

    pub fn validate_configuration(&self, config: &BetConfiguration) -> Result<(), ValidationError> {
        validate_house_edge(config.house_edge)?;

        let target = config.target;
        // An over bet at the top roll can never win; `>` is strict.
        let max = match config.condition {
            BetCondition::Over => self.config.max_target.min(MAX_OVER_TARGET),
            BetCondition::Under => self.config.max_target,
        };
        if !target.is_finite() || target <= self.config.min_target || target > max {
            return Err(ValidationError::InvalidTarget {
                target,
                min: self.config.min_target,
                max,
            });
        }

        let win_chance = config.win_chance();
        if win_chance <= 0.0 || win_chance >= 100.0 {
            return Err(ValidationError::InvalidWinChance(win_chance));
        }

        Ok(())
    }

    pub fn validate_stake(&self, stake: f64) -> Result<(), ValidationError> {
        if !stake.is_finite() || stake <= 0.0 {
            return Err(ValidationError::InvalidStake(stake));
        }
        if let Some(max) = self.config.max_stake {
            if stake > max {
                return Err(ValidationError::StakeTooLarge { stake, max });
            }
        }
        Ok(())
    }

    /// Validate a placed bet and return its configuration
    pub fn validate_bet(&self, request: &PlaceBetRequest) -> Result<BetConfiguration, ValidationError> {
        self.validate_stake(request.stake)?;
        self.configure(request.target, request.condition)
    }

    /// Validate a standalone evaluation request, seeds included
    pub fn validate_evaluate(&self, request: &EvaluateRequest) -> Result<(), ValidationError> {
        validate_client_seed(&request.client_seed)?;
        validate_server_seed(&request.server_seed)?;
        self.validate_configuration(&request.config)?;
        self.validate_stake(request.stake)
    }
}

pub fn validate_house_edge(house_edge: f64) -> Result<(), ValidationError> {
    if !house_edge.is_finite() || !(0.0..100.0).contains(&house_edge) {
        return Err(ValidationError::InvalidHouseEdge(house_edge));
    }
    Ok(())
}

/// Client seeds are player-visible strings. The `:` separator is rejected so
/// that the digest input of a round can never be ambiguous.
pub fn validate_client_seed(seed: &str) -> Result<(), ValidationError> {
    if seed.is_empty() {
        return Err(ValidationError::InvalidClientSeed("must not be empty".to_string()));
    }
    if seed.len() > MAX_CLIENT_SEED_LEN {
        return Err(ValidationError::InvalidClientSeed(format!(
            "must be at most {} characters",
            MAX_CLIENT_SEED_LEN
        )));
    }
    if !seed.chars().all(|c| c.is_ascii_graphic() && c != ':') {
        return Err(ValidationError::InvalidClientSeed(
            "must be printable ASCII without ':'".to_string(),
        ));
    }
    Ok(())
}

/// Server seeds are 32 random bytes, hex-encoded
pub fn validate_server_seed(seed: &str) -> Result<(), ValidationError> {
    if seed.len() != SERVER_SEED_HEX_LEN {
        return Err(ValidationError::InvalidServerSeed(format!(
            "expected {} hex characters, got {}",
            SERVER_SEED_HEX_LEN,
            seed.len()
        )));
    }
    if !seed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidServerSeed("not hex-encoded".to_string()));
    }
    Ok(())
}

/// Win chance that yields `multiplier` under `house_edge`, for UIs that let
/// the player pick a payout instead of a target
pub fn win_chance_for_multiplier(multiplier: f64, house_edge: f64) -> Result<f64, ValidationError> {
    validate_house_edge(house_edge)?;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(ValidationError::InvalidWinChance(multiplier));
    }
    let win_chance = (100.0 - house_edge) / multiplier;
    if !(MIN_WIN_CHANCE..=MAX_WIN_CHANCE).contains(&win_chance) {
        return Err(ValidationError::InvalidWinChance(win_chance));
    }
    // Two-decimal targets only.
    Ok((win_chance * 100.0).round() / 100.0)
}

/// Target that gives `win_chance` for the chosen side
pub fn target_for_win_chance(win_chance: f64, condition: BetCondition) -> f64 {
    let win_chance = clamp_win_chance(win_chance);
    match condition {
        BetCondition::Under => win_chance,
        BetCondition::Over => ((100.0 - win_chance) * 100.0).round() / 100.0,
    }
}

/// Payout table row as shown before a bet is placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetQuote {
    pub win_chance: f64,
    pub multiplier: f64,
}

pub fn quote(config: &BetConfiguration) -> BetQuote {
    let win_chance = clamp_win_chance(config.win_chance());
    BetQuote {
        win_chance,
        multiplier: compute_multiplier(win_chance, config.house_edge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> BetValidator {
        BetValidator::new(EngineConfig::default())
    }

    #[test]
    fn test_target_bounds() {
        let v = validator();
        assert!(v.configure(50.0, BetCondition::Under).is_ok());
        assert!(v.configure(0.02, BetCondition::Under).is_ok());
        assert!(v.configure(99.99, BetCondition::Under).is_ok());
        assert!(v.configure(99.98, BetCondition::Over).is_ok());
        assert!(matches!(
            v.configure(0.01, BetCondition::Under),
            Err(ValidationError::InvalidTarget { .. })
        ));
        assert_eq!(
            v.configure(99.99, BetCondition::Over),
            Err(ValidationError::InvalidTarget {
                target: 99.99,
                min: 0.01,
                max: MAX_OVER_TARGET,
            })
        );
        assert!(matches!(
            v.configure(0.0, BetCondition::Under),
            Err(ValidationError::InvalidTarget { .. })
        ));
        assert!(matches!(
            v.configure(100.0, BetCondition::Over),
            Err(ValidationError::InvalidTarget { .. })
        ));
        assert!(v.configure(f64::NAN, BetCondition::Over).is_err());
    }

    #[test]
    fn test_configure_applies_house_edge() {
        let mut engine = EngineConfig::default();
        engine.house_edge = 2.5;
        let config = BetValidator::new(engine).configure(40.0, BetCondition::Over).unwrap();
        assert_eq!(config.house_edge, 2.5);
    }

    #[test]
    fn test_stake_validation() {
        let v = validator();
        assert!(v.validate_stake(0.5).is_ok());
        assert_eq!(v.validate_stake(0.0), Err(ValidationError::InvalidStake(0.0)));
        assert!(v.validate_stake(-3.0).is_err());
        assert!(v.validate_stake(f64::INFINITY).is_err());

        let mut engine = EngineConfig::default();
        engine.max_stake = Some(100.0);
        let capped = BetValidator::new(engine);
        assert!(matches!(
            capped.validate_stake(150.0),
            Err(ValidationError::StakeTooLarge { .. })
        ));
    }

    #[test]
    fn test_house_edge_validation() {
        assert!(validate_house_edge(0.0).is_ok());
        assert!(validate_house_edge(1.0).is_ok());
        assert!(validate_house_edge(100.0).is_err());
        assert!(validate_house_edge(-0.1).is_err());
    }

    #[test]
    fn test_seed_validation() {
        assert!(validate_client_seed("lucky-7").is_ok());
        assert!(validate_client_seed("").is_err());
        assert!(validate_client_seed("a:b").is_err());
        assert!(validate_client_seed("has space").is_err());
        assert!(validate_client_seed(&"x".repeat(65)).is_err());

        assert!(validate_server_seed(&"ab".repeat(32)).is_ok());
        assert!(validate_server_seed("def").is_err());
        assert!(validate_server_seed(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_validate_bet_request() {
        let request = PlaceBetRequest {
            user_id: "u1".to_string(),
            target: 25.0,
            condition: BetCondition::Under,
            stake: 5.0,
        };
        let config = validator().validate_bet(&request).unwrap();
        assert_eq!(config.target, 25.0);

        let bad = PlaceBetRequest { stake: 0.0, ..request };
        assert!(validator().validate_bet(&bad).is_err());
    }

    #[test]
    fn test_validate_evaluate_request() {
        let request = EvaluateRequest {
            client_seed: "abc".to_string(),
            server_seed: "ab".repeat(32),
            nonce: 0,
            config: BetConfiguration::new(50.0, BetCondition::Over),
            stake: 1.0,
        };
        assert!(validator().validate_evaluate(&request).is_ok());

        let short_seed = EvaluateRequest {
            server_seed: "def".to_string(),
            ..request.clone()
        };
        assert!(matches!(
            validator().validate_evaluate(&short_seed),
            Err(ValidationError::InvalidServerSeed(_))
        ));

        let bad_edge = EvaluateRequest {
            config: BetConfiguration::new(50.0, BetCondition::Over).with_house_edge(-1.0),
            ..request
        };
        assert_eq!(
            validator().validate_evaluate(&bad_edge),
            Err(ValidationError::InvalidHouseEdge(-1.0))
        );
    }

    #[test]
    fn test_multiplier_to_target() {
        let chance = win_chance_for_multiplier(2.0, 1.0).unwrap();
        assert_eq!(chance, 49.5);
        assert_eq!(target_for_win_chance(chance, BetCondition::Under), 49.5);
        assert_eq!(target_for_win_chance(chance, BetCondition::Over), 50.5);
        assert!(win_chance_for_multiplier(0.5, 1.0).is_err());
        assert!(win_chance_for_multiplier(20_000.0, 1.0).is_err());
    }

    #[test]
    fn test_quote() {
        let q = quote(&BetConfiguration::new(50.0, BetCondition::Under));
        assert_eq!(q.win_chance, 50.0);
        assert!((q.multiplier - 1.98).abs() < 1e-9);
    }
}
