use crate::common::types::{Address, GameId, TokenType};
use crate::escrow::Balance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coin flip choice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CoinChoice {
    Heads,
    Tails,
}

impl CoinChoice {
    pub fn from_heads(is_heads: bool) -> Self {
        if is_heads {
            CoinChoice::Heads
        } else {
            CoinChoice::Tails
        }
    }

    pub fn is_heads(self) -> bool {
        self == CoinChoice::Heads
    }

    pub fn opposite(self) -> Self {
        Self::from_heads(!self.is_heads())
    }
}

impl fmt::Display for CoinChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinChoice::Heads => write!(f, "heads"),
            CoinChoice::Tails => write!(f, "tails"),
        }
    }
}

/// An open wager: the creator's escrowed bet waiting for a joiner.
///
/// A game is consumed exactly once, either by cancellation or by settlement.
#[derive(Debug)]
pub struct Game {
    pub(crate) id: GameId,
    pub(crate) creator: Address,
    pub(crate) token: TokenType,
    pub(crate) bet_amount: u64,
    pub(crate) creator_choice: CoinChoice,
    pub(crate) escrow: Balance,
    pub(crate) is_active: bool,
    pub(crate) created_at_ms: u64,
}

impl Game {
    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn creator(&self) -> Address {
        self.creator
    }

    pub fn token(&self) -> &TokenType {
        &self.token
    }

    pub fn bet_amount(&self) -> u64 {
        self.bet_amount
    }

    pub fn creator_choice(&self) -> CoinChoice {
        self.creator_choice
    }

    pub fn escrow_value(&self) -> u64 {
        self.escrow.value()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_id: self.id,
            creator: self.creator,
            token_type: self.token.clone(),
            bet_amount: self.bet_amount,
            creator_choice: self.creator_choice,
            escrow_value: self.escrow.value(),
            is_active: self.is_active,
            created_at_ms: self.created_at_ms,
        }
    }
}

/// Serializable read-only view of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: GameId,
    pub creator: Address,
    pub token_type: TokenType,
    pub bet_amount: u64,
    pub creator_choice: CoinChoice,
    pub escrow_value: u64,
    pub is_active: bool,
    pub created_at_ms: u64,
}
