//! Batch resolution of open games against a single payment
//!
//! `join_games` validates the whole batch before moving any funds, draws one
//! randomness generator for the call, then settles every game in list order.
//! Settlement performs the same splits, transfers and emissions whichever side
//! wins; only the destination addresses differ. A caller therefore cannot learn or
//! select outcomes from how much work a batch did.

use crate::common::traits::{Clock, Ledger};
use crate::common::types::{Address, GameId, TokenType, TxContext};
use crate::engine::WagerEngine;
use crate::errors::{RandomnessError, WagerError};
use crate::escrow::Balance;
use crate::events::{GameEvent, GameJoined};
use crate::games::types::Game;
use crate::games::vrf_engine::{RandomGenerator, RandomnessOracle, VrfBundle, VrfOracle};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Result of a successful batch join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipt {
    /// One record per game, in the order the games were given
    pub results: Vec<GameJoined>,
    /// Sum of the bets the joiner matched
    pub required_total: u64,
    /// Payment left over and returned to the joiner
    pub refund: u64,
    /// Proof for the batch's randomness, when the oracle provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<VrfBundle>,
}

impl BatchReceipt {
    pub fn total_fees(&self) -> u64 {
        self.results.iter().map(|r| r.fee_collected).sum()
    }

    pub fn total_payouts(&self) -> u64 {
        self.results.iter().map(|r| r.winner_payout).sum()
    }

    /// Check the attestation signature and that replaying it reproduces every
    /// recorded outcome. Receipts without an attestation never verify.
    pub fn verify_attestation(&self) -> Result<bool, RandomnessError> {
        let Some(bundle) = &self.attestation else {
            return Ok(false);
        };
        if !VrfOracle::verify_vrf_proof(bundle, &bundle.input_message)? {
            return Ok(false);
        }
        let replayed = VrfOracle::replay_outcomes(bundle, self.results.len())?;
        Ok(replayed
            .iter()
            .zip(&self.results)
            .all(|(outcome, result)| *outcome == result.outcome_is_heads))
    }
}

impl<O, C, L> WagerEngine<O, C, L>
where
    O: RandomnessOracle,
    C: Clock,
    L: Ledger,
{
    /// Match every game in `game_ids` with one payment of `payment_amount` in
    /// `token`, resolve them and pay out winners and the treasury.
    pub fn join_games(
        &mut self,
        ctx: &TxContext,
        game_ids: &[GameId],
        token: &TokenType,
        payment_amount: u64,
    ) -> Result<BatchReceipt, WagerError> {
        let required_total = self
            .validate_batch(ctx, game_ids, token, payment_amount)
            .inspect_err(|e| {
                warn!(joiner = %ctx.sender, games = game_ids.len(), %token, error = %e, "Rejected batch join");
            })?;

        // First mutation. The ledger check is atomic, so a failure here still
        // leaves the batch untouched.
        let mut payment = self.ledger.withdraw(&ctx.sender, token, payment_amount)?;

        let games: Vec<Game> = game_ids
            .iter()
            .filter_map(|id| self.games.remove(id))
            .collect();
        debug_assert_eq!(games.len(), game_ids.len());

        self.batch_nonce += 1;
        let context = batch_context(self.batch_nonce, &ctx.sender, game_ids);
        let mut generator = self.oracle.new_generator(&context);

        let mut results = Vec::with_capacity(games.len());
        for game in games {
            results.push(self.settle_game(game, ctx.sender, &mut payment, &mut generator));
        }

        let refund = match payment.destroy_zero() {
            Ok(()) => 0,
            Err(leftover) => {
                let refund = leftover.value();
                self.credit(&ctx.sender, leftover);
                refund
            }
        };

        let receipt = BatchReceipt {
            results,
            required_total,
            refund,
            attestation: generator.attestation(),
        };

        info!(
            joiner = %ctx.sender,
            %token,
            games = receipt.results.len(),
            required_total,
            refund,
            fees = receipt.total_fees(),
            "Batch resolved"
        );
        Ok(receipt)
    }

    /// Every precondition of a batch join, including room in every account that may
    /// be credited. Returns the total the joiner must match.
    fn validate_batch(
        &self,
        ctx: &TxContext,
        game_ids: &[GameId],
        token: &TokenType,
        payment_amount: u64,
    ) -> Result<u64, WagerError> {
        self.config.ensure_not_paused()?;

        if game_ids.is_empty() {
            return Err(WagerError::GameNotFound);
        }
        if game_ids.len() > self.config.max_games_per_batch {
            return Err(WagerError::TooManyGames {
                count: game_ids.len(),
                max: self.config.max_games_per_batch,
            });
        }
        self.config.enabled_limits(token)?;

        let mut seen = HashSet::with_capacity(game_ids.len());
        let mut stakes = Vec::with_capacity(game_ids.len());
        let mut required_total: u64 = 0;
        for id in game_ids {
            let game = match self.games.get(id) {
                Some(game) if game.is_active && seen.insert(*id) => game,
                _ => return Err(WagerError::GameNotFound),
            };
            if game.creator == ctx.sender {
                return Err(WagerError::CannotJoinOwnGame);
            }
            if &game.token != token {
                return Err(WagerError::TokenMismatch {
                    expected: game.token.clone(),
                    actual: token.clone(),
                });
            }
            // The pot must be representable as well as the running total
            let pot = game.bet_amount
                .checked_mul(2)
                .ok_or(WagerError::ArithmeticOverflow)?;
            required_total = required_total
                .checked_add(game.bet_amount)
                .ok_or(WagerError::ArithmeticOverflow)?;
            stakes.push((game.creator, pot));
        }

        if payment_amount < required_total {
            return Err(WagerError::InsufficientPayment {
                required: required_total,
                provided: payment_amount,
            });
        }

        let available = self.ledger.balance_of(&ctx.sender, token);
        if available < payment_amount {
            return Err(WagerError::InsufficientFunds {
                available,
                needed: payment_amount,
            });
        }

        // Either side may win any game, so both are credited the payout here
        let treasury = self.config.treasury;
        let mut credits: BTreeMap<Address, u128> = BTreeMap::new();
        let mut joiner_credit = u128::from(payment_amount - required_total);
        for (creator, pot) in stakes {
            let fee = self.config.fee_for(pot);
            let payout = u128::from(pot - fee);
            *credits.entry(creator).or_default() += payout;
            *credits.entry(treasury).or_default() += u128::from(fee);
            joiner_credit += payout;
        }
        *credits.entry(ctx.sender).or_default() += joiner_credit;
        self.ensure_headroom(token, &credits, Some((ctx.sender, payment_amount)))?;

        Ok(required_total)
    }

    /// Settle one validated game. Both outcomes run the same sequence of balance
    /// operations; only `winner` and `loser` differ. Validation established that the
    /// payment covers the stake, the pot fits in `u64` and every credit has room.
    fn settle_game<G: RandomGenerator>(
        &mut self,
        mut game: Game,
        joiner: Address,
        payment: &mut Balance,
        generator: &mut G,
    ) -> GameJoined {
        game.is_active = false;

        let stake = payment.take(game.bet_amount);
        let total_pot = game.escrow.absorb(stake);

        let outcome_is_heads = generator.generate_bool();
        let creator_wins = outcome_is_heads == game.creator_choice.is_heads();
        let (winner, loser) = if creator_wins {
            (game.creator, joiner)
        } else {
            (joiner, game.creator)
        };

        let fee_collected = self.config.fee_for(total_pot);
        let fee = game.escrow.take(fee_collected);
        let winner_payout = game.escrow.value();

        let treasury = self.config.treasury;
        self.credit(&treasury, fee);
        self.credit(&winner, game.escrow);

        let joined = GameJoined {
            game_id: game.id,
            creator: game.creator,
            joiner,
            winner,
            loser,
            bet_amount: game.bet_amount,
            total_pot,
            winner_payout,
            fee_collected,
            outcome_is_heads,
            token_type: game.token,
        };
        self.events.emit(GameEvent::GameJoined(joined.clone()));

        debug!(
            game_id = %joined.game_id,
            %winner,
            total_pot,
            winner_payout,
            fee_collected,
            outcome_is_heads,
            "Game settled"
        );
        joined
    }
}

/// Seed context for one batch: unique per call and bound to its games
fn batch_context(nonce: u64, sender: &Address, game_ids: &[GameId]) -> String {
    let ids: Vec<String> = game_ids.iter().map(GameId::to_string).collect();
    format!("batch:{}:joiner:{}:games:{}", nonce, sender, ids.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_framework::EngineFixture;
    use crate::games::types::CoinChoice;

    #[test]
    fn test_one_generator_per_batch() {
        let mut fx = EngineFixture::new();
        let ids = fx.open_games(fx.alice, 5, 10_000, CoinChoice::Heads);
        let token = fx.token.clone();

        fx.engine
            .join_games(&TxContext::new(fx.bob), &ids, &token, 50_000)
            .unwrap();
        assert_eq!(fx.engine.oracle().generators_drawn(), 1);
    }

    #[test]
    fn test_outcomes_follow_generator_stream_in_list_order() {
        let mut fx = EngineFixture::new();
        let ids = fx.open_games(fx.alice, 4, 10_000, CoinChoice::Heads);
        let token = fx.token.clone();
        fx.script(vec![true, false, false, true]);

        let receipt = fx
            .engine
            .join_games(&TxContext::new(fx.bob), &ids, &token, 40_000)
            .unwrap();

        let winners: Vec<Address> = receipt.results.iter().map(|r| r.winner).collect();
        assert_eq!(winners, vec![fx.alice, fx.bob, fx.bob, fx.alice]);
        let order: Vec<GameId> = receipt.results.iter().map(|r| r.game_id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_duplicate_id_in_batch_is_rejected() {
        let mut fx = EngineFixture::new();
        let ids = fx.open_games(fx.alice, 1, 10_000, CoinChoice::Tails);
        let token = fx.token.clone();

        let err = fx
            .engine
            .join_games(&TxContext::new(fx.bob), &[ids[0], ids[0]], &token, 20_000)
            .unwrap_err();
        assert_eq!(err, WagerError::GameNotFound);
        assert!(fx.engine.game(&ids[0]).is_some());
    }

    #[test]
    fn test_batch_context_is_unique_per_call() {
        let ids = vec![GameId::new()];
        let sender = Address::repeat_byte(1);
        assert_ne!(batch_context(1, &sender, &ids), batch_context(2, &sender, &ids));
    }

    #[test]
    fn test_zero_fee_still_settles_full_pot() {
        let mut settings = EngineFixture::default_settings();
        settings.protocol.fee_bps = 0;
        let mut fx = EngineFixture::with_settings(settings);
        let ids = fx.open_games(fx.alice, 1, 7_777, CoinChoice::Heads);
        let token = fx.token.clone();
        fx.script(vec![false]);

        let receipt = fx
            .engine
            .join_games(&TxContext::new(fx.carol), &ids, &token, 7_777)
            .unwrap();
        assert_eq!(receipt.results[0].fee_collected, 0);
        assert_eq!(receipt.results[0].winner_payout, 15_554);
        assert_eq!(fx.balance(&fx.treasury), 0);
    }

    #[test]
    fn test_unattested_receipt_does_not_verify() {
        let mut fx = EngineFixture::new();
        let ids = fx.open_games(fx.alice, 1, 10_000, CoinChoice::Heads);
        let token = fx.token.clone();

        let receipt = fx
            .engine
            .join_games(&TxContext::new(fx.bob), &ids, &token, 10_000)
            .unwrap();
        assert!(receipt.attestation.is_none());
        assert!(!receipt.verify_attestation().unwrap());
    }

    #[test]
    fn test_batch_refused_when_a_payout_would_overflow() {
        let mut fx = EngineFixture::new();
        let token = fx.token.clone();
        let ids = fx.open_games(fx.alice, 1, 10_000, CoinChoice::Heads);
        let headroom = u64::MAX - fx.balance(&fx.alice);
        fx.engine.ledger_mut().mint(&fx.alice, &token, headroom - 5_000).unwrap();
        let bob_before = fx.balance(&fx.bob);
        let supply = fx.total_value();

        let err = fx
            .engine
            .join_games(&TxContext::new(fx.bob), &ids, &token, 10_000)
            .unwrap_err();

        assert_eq!(err, WagerError::ArithmeticOverflow);
        assert_eq!(fx.balance(&fx.bob), bob_before);
        assert!(fx.engine.game(&ids[0]).is_some());
        assert_eq!(fx.total_value(), supply);
        assert_eq!(fx.engine.oracle().generators_drawn(), 0);
    }

    #[test]
    fn test_payout_filling_account_exactly_is_allowed() {
        let mut fx = EngineFixture::new();
        let token = fx.token.clone();
        let ids = fx.open_games(fx.alice, 1, 10_000, CoinChoice::Heads);
        // 20_000 pot minus 500 fee at 250 bps
        let headroom = u64::MAX - fx.balance(&fx.alice);
        fx.engine.ledger_mut().mint(&fx.alice, &token, headroom - 19_500).unwrap();
        let supply = fx.total_value();
        fx.script(vec![true]);

        let receipt = fx
            .engine
            .join_games(&TxContext::new(fx.bob), &ids, &token, 10_000)
            .unwrap();

        assert_eq!(receipt.results[0].winner, fx.alice);
        assert_eq!(fx.balance(&fx.alice), u64::MAX);
        assert_eq!(fx.total_value(), supply);
    }
}
