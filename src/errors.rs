//! Error types for the fairroll core
//!
//! Errors are split by who is expected to act on them: validation errors are
//! rejected immediately, crypto and storage errors are retryable, and rotation
//! consistency errors abort the rotation and leave the active pair untouched.

use thiserror::Error;

/// Root error type for all fairroll operations
#[derive(Debug, Error)]
pub enum FairRollError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Rotation error: {0}")]
    Rotation(#[from] RotationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Input rejected before it reaches the fairness engine
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid target {target}: must be within ({min}, {max}]")]
    InvalidTarget { target: f64, min: f64, max: f64 },

    #[error("invalid stake {0}: must be a positive finite amount")]
    InvalidStake(f64),

    #[error("stake {stake} exceeds maximum {max}")]
    StakeTooLarge { stake: f64, max: f64 },

    #[error("invalid house edge {0}: must be within [0, 100)")]
    InvalidHouseEdge(f64),

    #[error("win chance {0} is outside (0, 100)")]
    InvalidWinChance(f64),

    #[error("invalid client seed: {0}")]
    InvalidClientSeed(String),

    #[error("invalid server seed: {0}")]
    InvalidServerSeed(String),
}

/// Failures of the cryptographic primitives
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("secure random source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Seed rotation failures
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("server seed does not match its commitment (expected {expected}, computed {actual})")]
    HashMismatch { expected: String, actual: String },

    #[error("rotation already in progress for user {user_id}")]
    AlreadyInProgress { user_id: String },

    #[error("no active seed pair for user {user_id}")]
    NoActivePair { user_id: String },
}

/// Failures reported by the external seed store or round ledger
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("round already recorded for user {user_id} at nonce {nonce}")]
    DuplicateRound { user_id: String, nonce: u64 },

    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl FairRollError {
    /// Whether the caller should retry the whole operation.
    ///
    /// Validation errors never succeed on retry. Rotation hash mismatches
    /// indicate corrupted storage and need an operator, not a retry loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            FairRollError::Crypto(_) | FairRollError::Storage(_) => true,
            FairRollError::Rotation(RotationError::AlreadyInProgress { .. }) => true,
            FairRollError::Rotation(_) => false,
            FairRollError::Validation(_) | FairRollError::Configuration(_) => false,
        }
    }
}

pub type FairRollResult<T> = Result<T, FairRollError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err: FairRollError = ValidationError::InvalidStake(-1.0).into();
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn test_error_source() {
        let err: FairRollError = ConfigurationError::LoadFailed("missing".to_string()).into();
        assert!(err.source().is_some());
    }

    #[test]
    fn test_retry_classification() {
        let invalid: FairRollError = ValidationError::InvalidTarget {
            target: 120.0,
            min: 0.01,
            max: 99.99,
        }
        .into();
        assert!(!invalid.is_retryable());

        let entropy: FairRollError = CryptoError::EntropyUnavailable("os".to_string()).into();
        assert!(entropy.is_retryable());

        let corrupt: FairRollError = RotationError::HashMismatch {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        }
        .into();
        assert!(!corrupt.is_retryable());

        let busy: FairRollError = RotationError::AlreadyInProgress {
            user_id: "u1".to_string(),
        }
        .into();
        assert!(busy.is_retryable());
    }
}
