//! Protocol config store and admin capability
//!
//! A single `ProtocolConfig` lives inside the engine for its whole lifetime. It is
//! read by every game call and written only by admin calls that present the
//! `AdminCapability` minted at initialization.

use crate::common::types::{Address, TokenType};
use crate::errors::WagerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Fee rates are expressed in basis points of the pot
pub const MAX_FEE_BPS: u16 = 10_000;
/// Hard ceiling on `max_games_per_batch`
pub const MAX_GAMES_PER_BATCH_LIMIT: usize = 1_000;
pub const DEFAULT_FEE_BPS: u16 = 250;
pub const DEFAULT_MAX_GAMES_PER_BATCH: usize = 100;

const BPS_DENOMINATOR: u128 = 10_000;

/// Bet bounds and switch for one whitelisted token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLimits {
    pub enabled: bool,
    pub min_bet: u64,
    pub max_bet: u64,
}

impl TokenLimits {
    pub fn new(min_bet: u64, max_bet: u64) -> Result<Self, WagerError> {
        validate_bet_bounds(min_bet, max_bet)?;
        Ok(Self {
            enabled: true,
            min_bet,
            max_bet,
        })
    }

    /// Check `amount` against these bounds (both ends inclusive)
    pub fn check_bet(&self, amount: u64) -> Result<(), WagerError> {
        if amount == 0 {
            return Err(WagerError::InvalidBetAmount);
        }
        if amount < self.min_bet {
            return Err(WagerError::BetTooSmall {
                amount,
                min_bet: self.min_bet,
            });
        }
        if amount > self.max_bet {
            return Err(WagerError::BetTooLarge {
                amount,
                max_bet: self.max_bet,
            });
        }
        Ok(())
    }
}

pub fn validate_bet_bounds(min_bet: u64, max_bet: u64) -> Result<(), WagerError> {
    if min_bet == 0 || min_bet > max_bet {
        return Err(WagerError::InvalidBetAmount);
    }
    Ok(())
}

pub fn validate_fee_bps(fee_bps: u16) -> Result<(), WagerError> {
    if fee_bps > MAX_FEE_BPS {
        return Err(WagerError::InvalidFeePercentage(fee_bps));
    }
    Ok(())
}

pub fn validate_max_games(max_games: usize) -> Result<(), WagerError> {
    if max_games == 0 || max_games > MAX_GAMES_PER_BATCH_LIMIT {
        return Err(WagerError::InvalidMaxGames(max_games));
    }
    Ok(())
}

pub fn validate_treasury(treasury: &Address) -> Result<(), WagerError> {
    if treasury.is_zero() {
        return Err(WagerError::InvalidAddress);
    }
    Ok(())
}

/// Unforgeable admin token.
///
/// Only `WagerEngine::initialize` can mint one. It is neither `Clone` nor `Copy`, so
/// handing it to another principal means moving it.
#[derive(Debug, PartialEq, Eq)]
pub struct AdminCapability {
    id: Uuid,
}

impl AdminCapability {
    pub(crate) fn mint() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Reject `cap` unless it is the capability this config was created with
pub fn assert_owner(cap: &AdminCapability, config: &ProtocolConfig) -> Result<(), WagerError> {
    if cap.id != config.admin_cap_id {
        return Err(WagerError::InvalidAdminCapability);
    }
    Ok(())
}

/// Singleton protocol configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub(crate) admin_cap_id: Uuid,
    pub(crate) fee_bps: u16,
    pub(crate) is_paused: bool,
    pub(crate) treasury: Address,
    pub(crate) max_games_per_batch: usize,
    pub(crate) token_limits: BTreeMap<TokenType, TokenLimits>,
}

impl ProtocolConfig {
    /// Build the initial config bound to `cap`, enforcing every config invariant
    pub fn genesis(
        cap: &AdminCapability,
        fee_bps: u16,
        treasury: Address,
        max_games_per_batch: usize,
        tokens: impl IntoIterator<Item = (TokenType, TokenLimits)>,
    ) -> Result<Self, WagerError> {
        validate_fee_bps(fee_bps)?;
        validate_treasury(&treasury)?;
        validate_max_games(max_games_per_batch)?;

        let mut token_limits = BTreeMap::new();
        for (token, limits) in tokens {
            validate_bet_bounds(limits.min_bet, limits.max_bet)?;
            if token_limits.contains_key(&token) {
                return Err(WagerError::DuplicateToken(token));
            }
            token_limits.insert(token, limits);
        }

        Ok(Self {
            admin_cap_id: cap.id,
            fee_bps,
            is_paused: false,
            treasury,
            max_games_per_batch,
            token_limits,
        })
    }

    pub fn admin_cap_id(&self) -> Uuid {
        self.admin_cap_id
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn max_games_per_batch(&self) -> usize {
        self.max_games_per_batch
    }

    /// Limits for `token` whether or not it is currently enabled
    pub fn token_limits(&self, token: &TokenType) -> Option<&TokenLimits> {
        self.token_limits.get(token)
    }

    pub fn whitelisted_tokens(&self) -> impl Iterator<Item = (&TokenType, &TokenLimits)> {
        self.token_limits.iter()
    }

    /// Limits for `token`, failing unless it is whitelisted and enabled
    pub fn enabled_limits(&self, token: &TokenType) -> Result<&TokenLimits, WagerError> {
        match self.token_limits.get(token) {
            Some(limits) if limits.enabled => Ok(limits),
            _ => Err(WagerError::TokenNotWhitelisted(token.clone())),
        }
    }

    pub(crate) fn ensure_not_paused(&self) -> Result<(), WagerError> {
        if self.is_paused {
            return Err(WagerError::ContractPaused);
        }
        Ok(())
    }

    /// Protocol fee on `pot`, rounded down
    pub fn fee_for(&self, pot: u64) -> u64 {
        ((pot as u128 * self.fee_bps as u128) / BPS_DENOMINATOR) as u64
    }
}
