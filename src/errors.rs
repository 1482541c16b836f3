//! Error types for the wagerflip engine
//!
//! Every engine call fails fast with exactly one `WagerError`; nothing has been
//! moved or mutated by the time it is returned.

use crate::common::types::TokenType;

/// Failure reasons for game, batch and admin calls.
///
/// Each variant carries a stable numeric abort code so that callers and indexers can
/// match on failures without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WagerError {
    #[error("Invalid bet amount")]
    InvalidBetAmount,

    #[error("Game not found or no longer active")]
    GameNotFound,

    #[error("Cannot join a game you created")]
    CannotJoinOwnGame,

    #[error("Insufficient payment: required {required}, provided {provided}")]
    InsufficientPayment { required: u64, provided: u64 },

    #[error("Only the game creator can cancel this game")]
    NotGameCreator,

    #[error("Invalid admin capability")]
    InvalidAdminCapability,

    #[error("Invalid fee percentage: {0} bps (max 10000)")]
    InvalidFeePercentage(u16),

    #[error("Bet too small: {amount} < {min_bet}")]
    BetTooSmall { amount: u64, min_bet: u64 },

    #[error("Bet too large: {amount} > {max_bet}")]
    BetTooLarge { amount: u64, max_bet: u64 },

    #[error("Contract is paused")]
    ContractPaused,

    #[error("Too many games in batch: {count} > {max}")]
    TooManyGames { count: usize, max: usize },

    #[error("Invalid max games per batch: {0}")]
    InvalidMaxGames(usize),

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Token not whitelisted or disabled: {0}")]
    TokenNotWhitelisted(TokenType),

    #[error("Token mismatch: game uses {expected}, payment is {actual}")]
    TokenMismatch { expected: TokenType, actual: TokenType },

    #[error("Arithmetic overflow in bet or balance arithmetic")]
    ArithmeticOverflow,

    #[error("Insufficient funds: balance {available}, needed {needed}")]
    InsufficientFunds { available: u64, needed: u64 },

    #[error("Token listed more than once: {0}")]
    DuplicateToken(TokenType),
}

impl WagerError {
    /// Stable abort code for this failure.
    pub fn code(&self) -> u64 {
        match self {
            WagerError::InvalidBetAmount => 0,
            WagerError::GameNotFound => 1,
            WagerError::CannotJoinOwnGame => 2,
            WagerError::InsufficientPayment { .. } => 3,
            WagerError::NotGameCreator => 4,
            WagerError::InvalidAdminCapability => 5,
            WagerError::InvalidFeePercentage(_) => 6,
            WagerError::BetTooSmall { .. } => 7,
            WagerError::BetTooLarge { .. } => 8,
            WagerError::ContractPaused => 9,
            WagerError::TooManyGames { .. } => 10,
            WagerError::InvalidMaxGames(_) => 11,
            WagerError::InvalidAddress => 12,
            WagerError::TokenNotWhitelisted(_) => 13,
            WagerError::TokenMismatch { .. } => 14,
            WagerError::ArithmeticOverflow => 15,
            WagerError::InsufficientFunds { .. } => 16,
            WagerError::DuplicateToken(_) => 17,
        }
    }
}

/// Settings loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Randomness attestation errors
#[derive(Debug, thiserror::Error)]
pub enum RandomnessError {
    #[error("Invalid hex in {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Oracle key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Root error type for the crate
#[derive(Debug, thiserror::Error)]
pub enum FlipError {
    #[error("Wager error: {0}")]
    Wager(#[from] WagerError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Randomness error: {0}")]
    Randomness(#[from] RandomnessError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type FlipResult<T> = Result<T, FlipError>;
