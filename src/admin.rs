//! Capability-gated config changes
//!
//! Every operation checks the presented capability first, changes one aspect of
//! the protocol config, and emits a `ConfigUpdated` snapshot.

use crate::common::traits::{Clock, Ledger};
use crate::common::types::{Address, TokenType};
use crate::engine::WagerEngine;
use crate::errors::WagerError;
use crate::events::{ConfigUpdated, GameEvent};
use crate::games::vrf_engine::RandomnessOracle;
use crate::protocol::{
    assert_owner, validate_bet_bounds, validate_fee_bps, validate_max_games, validate_treasury, AdminCapability,
    TokenLimits,
};
use tracing::{info, warn};

impl<O, C, L> WagerEngine<O, C, L>
where
    O: RandomnessOracle,
    C: Clock,
    L: Ledger,
{
    fn authorize(&self, cap: &AdminCapability, action: &str) -> Result<(), WagerError> {
        assert_owner(cap, &self.config).inspect_err(|_| {
            warn!(action, presented = %cap.id(), "Admin call with foreign capability");
        })
    }

    fn emit_config_updated(&mut self, token: Option<&TokenType>) {
        let snapshot = ConfigUpdated::snapshot(&self.config, token);
        self.events.emit(GameEvent::ConfigUpdated(snapshot));
    }

    /// Halt or resume game creation and joining. Cancellation is never paused.
    pub fn set_pause_state(&mut self, cap: &AdminCapability, paused: bool) -> Result<(), WagerError> {
        self.authorize(cap, "set_pause_state")?;
        self.config.is_paused = paused;
        self.emit_config_updated(None);
        info!(paused, "Pause state updated");
        Ok(())
    }

    pub fn update_fee_percentage(&mut self, cap: &AdminCapability, fee_bps: u16) -> Result<(), WagerError> {
        self.authorize(cap, "update_fee_percentage")?;
        validate_fee_bps(fee_bps)?;
        self.config.fee_bps = fee_bps;
        self.emit_config_updated(None);
        info!(fee_bps, "Fee updated");
        Ok(())
    }

    /// Replace the bet bounds of a whitelisted token, keeping its enabled flag
    pub fn update_token_limits(
        &mut self,
        cap: &AdminCapability,
        token: &TokenType,
        min_bet: u64,
        max_bet: u64,
    ) -> Result<(), WagerError> {
        self.authorize(cap, "update_token_limits")?;
        validate_bet_bounds(min_bet, max_bet)?;
        let limits = self
            .config
            .token_limits
            .get_mut(token)
            .ok_or_else(|| WagerError::TokenNotWhitelisted(token.clone()))?;
        limits.min_bet = min_bet;
        limits.max_bet = max_bet;
        self.emit_config_updated(Some(token));
        info!(%token, min_bet, max_bet, "Token limits updated");
        Ok(())
    }

    /// Apply one pair of bounds to every whitelisted token.
    #[deprecated(note = "bet limits are per token; use `update_token_limits`")]
    pub fn update_global_bet_limits(
        &mut self,
        cap: &AdminCapability,
        min_bet: u64,
        max_bet: u64,
    ) -> Result<(), WagerError> {
        self.authorize(cap, "update_global_bet_limits")?;
        validate_bet_bounds(min_bet, max_bet)?;
        for limits in self.config.token_limits.values_mut() {
            limits.min_bet = min_bet;
            limits.max_bet = max_bet;
        }
        self.emit_config_updated(None);
        info!(min_bet, max_bet, tokens = self.config.token_limits.len(), "Global bet limits applied");
        Ok(())
    }

    /// Whitelist `token` with the given bounds, enabled.
    ///
    /// Adding a token that is already whitelisted replaces its bounds and enables it.
    pub fn add_whitelisted_token(
        &mut self,
        cap: &AdminCapability,
        token: &TokenType,
        min_bet: u64,
        max_bet: u64,
    ) -> Result<(), WagerError> {
        self.authorize(cap, "add_whitelisted_token")?;
        let limits = TokenLimits::new(min_bet, max_bet)?;
        self.config.token_limits.insert(token.clone(), limits);
        self.emit_config_updated(Some(token));
        info!(%token, min_bet, max_bet, "Token whitelisted");
        Ok(())
    }

    /// Drop `token` from the whitelist. Games already escrowed in it can still be
    /// cancelled.
    pub fn remove_whitelisted_token(&mut self, cap: &AdminCapability, token: &TokenType) -> Result<(), WagerError> {
        self.authorize(cap, "remove_whitelisted_token")?;
        if self.config.token_limits.remove(token).is_none() {
            return Err(WagerError::TokenNotWhitelisted(token.clone()));
        }
        self.emit_config_updated(Some(token));
        info!(%token, "Token removed from whitelist");
        Ok(())
    }

    pub fn set_token_enabled(
        &mut self,
        cap: &AdminCapability,
        token: &TokenType,
        enabled: bool,
    ) -> Result<(), WagerError> {
        self.authorize(cap, "set_token_enabled")?;
        let limits = self
            .config
            .token_limits
            .get_mut(token)
            .ok_or_else(|| WagerError::TokenNotWhitelisted(token.clone()))?;
        limits.enabled = enabled;
        self.emit_config_updated(Some(token));
        info!(%token, enabled, "Token enabled flag updated");
        Ok(())
    }

    pub fn update_max_games_per_batch(&mut self, cap: &AdminCapability, max_games: usize) -> Result<(), WagerError> {
        self.authorize(cap, "update_max_games_per_batch")?;
        validate_max_games(max_games)?;
        self.config.max_games_per_batch = max_games;
        self.emit_config_updated(None);
        info!(max_games, "Max games per batch updated");
        Ok(())
    }

    pub fn update_treasury_address(&mut self, cap: &AdminCapability, treasury: Address) -> Result<(), WagerError> {
        self.authorize(cap, "update_treasury_address")?;
        validate_treasury(&treasury)?;
        self.config.treasury = treasury;
        self.emit_config_updated(None);
        info!(%treasury, "Treasury updated");
        Ok(())
    }
}
