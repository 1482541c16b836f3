//! Game creation and cancellation

use crate::common::traits::{Clock, Ledger};
use crate::common::types::{GameId, TokenType, TxContext};
use crate::engine::WagerEngine;
use crate::errors::WagerError;
use crate::events::{GameCancelled, GameCreated, GameEvent};
use crate::games::types::{CoinChoice, Game};
use crate::games::vrf_engine::RandomnessOracle;
use std::collections::BTreeMap;
use tracing::{info, warn};

impl<O, C, L> WagerEngine<O, C, L>
where
    O: RandomnessOracle,
    C: Clock,
    L: Ledger,
{
    /// Escrow `bet_amount` of `token` from the sender and open a game on `choice`.
    pub fn create_game(
        &mut self,
        ctx: &TxContext,
        token: &TokenType,
        bet_amount: u64,
        choice: CoinChoice,
    ) -> Result<GameId, WagerError> {
        self.config.ensure_not_paused()?;
        let limits = self.config.enabled_limits(token)?;
        limits.check_bet(bet_amount).inspect_err(|e| {
            warn!(creator = %ctx.sender, %token, bet_amount, error = %e, "Rejected game creation");
        })?;

        let escrow = self.ledger.withdraw(&ctx.sender, token, bet_amount)?;

        let game = Game {
            id: GameId::new(),
            creator: ctx.sender,
            token: token.clone(),
            bet_amount,
            creator_choice: choice,
            escrow,
            is_active: true,
            created_at_ms: self.clock.now_ms(),
        };
        let game_id = game.id;

        self.events.emit(GameEvent::GameCreated(GameCreated {
            game_id,
            creator: ctx.sender,
            bet_amount,
            choice_is_heads: choice.is_heads(),
            token_type: token.clone(),
        }));
        self.games.insert(game_id, game);

        info!(%game_id, creator = %ctx.sender, %token, bet_amount, %choice, "Game created");
        Ok(game_id)
    }

    /// Refund the full escrow to the creator and close the game.
    ///
    /// Pause and token disablement never block this; creators can always exit.
    pub fn cancel_game(&mut self, ctx: &TxContext, game_id: &GameId) -> Result<u64, WagerError> {
        let (token, refund) = match self.games.get(game_id) {
            Some(game) if game.is_active => {
                if game.creator != ctx.sender {
                    warn!(%game_id, caller = %ctx.sender, "Cancel rejected: caller is not the creator");
                    return Err(WagerError::NotGameCreator);
                }
                (game.token.clone(), game.escrow.value())
            }
            _ => return Err(WagerError::GameNotFound),
        };
        let credits = BTreeMap::from([(ctx.sender, u128::from(refund))]);
        self.ensure_headroom(&token, &credits, None)?;

        let Some(mut game) = self.games.remove(game_id) else {
            return Err(WagerError::GameNotFound);
        };
        game.is_active = false;

        let refund_amount = game.escrow.value();
        self.credit(&game.creator, game.escrow);

        self.events.emit(GameEvent::GameCancelled(GameCancelled {
            game_id: game.id,
            creator: game.creator,
            refund_amount,
            token_type: game.token.clone(),
        }));

        info!(%game_id, creator = %game.creator, refund_amount, token = %game.token, "Game cancelled");
        Ok(refund_amount)
    }
}

#[cfg(test)]
mod tests {
    use crate::common::traits::Ledger;
    use crate::common::types::TxContext;
    use crate::errors::WagerError;
    use crate::events::GameEvent;
    use crate::games::test_framework::EngineFixture;
    use crate::games::types::CoinChoice;

    #[test]
    fn test_create_escrows_bet() {
        let mut fx = EngineFixture::new();
        let token = fx.token.clone();
        let before = fx.engine.ledger().balance_of(&fx.alice, &token);

        let id = fx
            .engine
            .create_game(&TxContext::new(fx.alice), &token, 5_000, CoinChoice::Heads)
            .unwrap();

        let game = fx.engine.game(&id).unwrap();
        assert!(game.is_active());
        assert_eq!(game.escrow_value(), 5_000);
        assert_eq!(game.bet_amount(), 5_000);
        assert_eq!(game.created_at_ms(), fx.start_ms);
        assert_eq!(fx.engine.ledger().balance_of(&fx.alice, &token), before - 5_000);
        assert!(matches!(fx.engine.events().last(), Some(GameEvent::GameCreated(e)) if e.choice_is_heads));
    }

    #[test]
    fn test_create_without_funds_moves_nothing() {
        let mut fx = EngineFixture::new();
        let token = fx.token.clone();
        let pauper = crate::common::types::Address::repeat_byte(0x99);

        let err = fx
            .engine
            .create_game(&TxContext::new(pauper), &token, 5_000, CoinChoice::Tails)
            .unwrap_err();
        assert_eq!(err, WagerError::InsufficientFunds { available: 0, needed: 5_000 });
        assert!(fx.engine.open_games().is_empty());
        assert!(fx.engine.events().is_empty());
    }

    #[test]
    fn test_cancel_twice_is_not_found() {
        let mut fx = EngineFixture::new();
        let token = fx.token.clone();
        let ctx = TxContext::new(fx.alice);
        let id = fx.engine.create_game(&ctx, &token, 5_000, CoinChoice::Heads).unwrap();

        assert_eq!(fx.engine.cancel_game(&ctx, &id), Ok(5_000));
        assert_eq!(fx.engine.cancel_game(&ctx, &id), Err(WagerError::GameNotFound));
    }

    #[test]
    fn test_cancel_refused_when_refund_would_overflow() {
        let mut fx = EngineFixture::new();
        let token = fx.token.clone();
        let ctx = TxContext::new(fx.alice);
        let id = fx.engine.create_game(&ctx, &token, 5_000, CoinChoice::Heads).unwrap();
        let headroom = u64::MAX - fx.balance(&fx.alice);
        fx.engine.ledger_mut().mint(&fx.alice, &token, headroom - 1_000).unwrap();

        assert_eq!(fx.engine.cancel_game(&ctx, &id), Err(WagerError::ArithmeticOverflow));
        assert!(fx.engine.game(&id).is_some());
        assert_eq!(fx.engine.escrowed_total(&token), 5_000);
    }
}
