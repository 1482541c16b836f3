//! WagerFlip - escrow-backed two-party coin flip wagers
//!
//! Creators escrow a bet on heads or tails. A joiner matches any number of open
//! games with one payment and every game in the batch is resolved from a single
//! verifiable randomness stream. A protocol fee on each pot goes to the treasury.
//! Protocol parameters change only through calls that present the admin capability.

pub mod admin;
pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod escrow;
pub mod events;
pub mod games;
pub mod protocol;

pub use common::traits::{Clock, Ledger, ManualClock, SystemClock};
pub use common::types::{Address, GameId, TokenType, TxContext};
pub use config::{EngineSettings, SettingsLoader};
pub use engine::WagerEngine;
pub use errors::{ConfigurationError, FlipError, FlipResult, RandomnessError, WagerError};
pub use escrow::{AccountBook, Balance};
pub use events::{ConfigUpdated, GameCancelled, GameCreated, GameEvent, GameJoined};
pub use games::{BatchReceipt, CoinChoice, Game, GameSummary, SeededOracle, VrfBundle, VrfOracle};
pub use protocol::{AdminCapability, ProtocolConfig, TokenLimits};
