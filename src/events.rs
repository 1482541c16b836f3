//! Outcome records emitted by the engine for off-chain indexers

use crate::common::types::{Address, GameId, TokenType};
use crate::protocol::{ProtocolConfig, TokenLimits};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCreated {
    pub game_id: GameId,
    pub creator: Address,
    pub bet_amount: u64,
    pub choice_is_heads: bool,
    pub token_type: TokenType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameJoined {
    pub game_id: GameId,
    pub creator: Address,
    pub joiner: Address,
    pub winner: Address,
    pub loser: Address,
    pub bet_amount: u64,
    pub total_pot: u64,
    pub winner_payout: u64,
    pub fee_collected: u64,
    pub outcome_is_heads: bool,
    pub token_type: TokenType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCancelled {
    pub game_id: GameId,
    pub creator: Address,
    pub refund_amount: u64,
    pub token_type: TokenType,
}

/// Full config snapshot after an admin change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdated {
    pub fee_bps: u16,
    pub is_paused: bool,
    pub treasury: Address,
    pub max_games_per_batch: usize,
    /// Limits of the token the change touched, if any. `None` after removal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_limits: Option<TokenLimits>,
}

impl ConfigUpdated {
    pub fn snapshot(config: &ProtocolConfig, token: Option<&TokenType>) -> Self {
        Self {
            fee_bps: config.fee_bps(),
            is_paused: config.is_paused(),
            treasury: config.treasury(),
            max_games_per_batch: config.max_games_per_batch(),
            token_type: token.cloned(),
            token_limits: token.and_then(|t| config.token_limits(t).copied()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    GameCreated(GameCreated),
    GameJoined(GameJoined),
    GameCancelled(GameCancelled),
    ConfigUpdated(ConfigUpdated),
}

/// Append-only log of emitted events
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Hand all buffered events to the caller
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
