//! The wager engine: owner of the protocol config, the open games and the host
//! facilities they run against.
//!
//! Each public call takes `&mut self`, so exactly one call mutates the engine at a
//! time and every call observes a consistent config. Calls validate every
//! precondition before their first mutation; a returned error means nothing moved.
//!
//! Game lifecycle calls live in `games::lifecycle`, batch resolution in
//! `games::processor` and capability-gated config changes in `admin`.

use crate::common::traits::{Clock, Ledger, SystemClock};
use crate::common::types::{Address, GameId, TokenType};
use crate::config::EngineSettings;
use crate::errors::{FlipResult, WagerError};
use crate::escrow::{AccountBook, Balance};
use crate::events::{EventLog, GameEvent};
use crate::games::types::Game;
use crate::games::vrf_engine::RandomnessOracle;
use crate::protocol::{AdminCapability, ProtocolConfig};
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info};

pub struct WagerEngine<O, C = SystemClock, L = AccountBook> {
    pub(crate) config: ProtocolConfig,
    pub(crate) games: HashMap<GameId, Game>,
    pub(crate) oracle: O,
    pub(crate) clock: C,
    pub(crate) ledger: L,
    pub(crate) events: EventLog,
    /// Number of batch calls that drew randomness, part of each batch's seed context
    pub(crate) batch_nonce: u64,
}

impl<O, C, L> WagerEngine<O, C, L>
where
    O: RandomnessOracle,
    C: Clock,
    L: Ledger,
{
    /// Create the engine from settings and mint its single admin capability
    pub fn initialize(
        settings: &EngineSettings,
        oracle: O,
        clock: C,
        ledger: L,
    ) -> FlipResult<(Self, AdminCapability)> {
        let cap = AdminCapability::mint();
        let treasury = settings.treasury_address()?;
        let mut config = ProtocolConfig::genesis(
            &cap,
            settings.protocol.fee_bps,
            treasury,
            settings.protocol.max_games_per_batch,
            settings.token_entries(),
        )?;
        config.is_paused = settings.protocol.paused;

        info!(
            fee_bps = config.fee_bps,
            max_games_per_batch = config.max_games_per_batch,
            treasury = %config.treasury,
            tokens = config.token_limits.len(),
            paused = config.is_paused,
            "Wager engine initialized"
        );

        let engine = Self {
            config,
            games: HashMap::new(),
            oracle,
            clock,
            ledger,
            events: EventLog::default(),
            batch_nonce: 0,
        };
        Ok((engine, cap))
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Active game by id
    pub fn game(&self, id: &GameId) -> Option<&Game> {
        self.games.get(id).filter(|g| g.is_active)
    }

    /// All joinable games, oldest first
    pub fn open_games(&self) -> Vec<&Game> {
        let mut games: Vec<&Game> = self.games.values().filter(|g| g.is_active).collect();
        games.sort_by_key(|g| (g.created_at_ms, g.id));
        games
    }

    /// Joinable games denominated in `token`, oldest first
    pub fn open_games_for(&self, token: &TokenType) -> Vec<&Game> {
        self.open_games()
            .into_iter()
            .filter(|g| &g.token == token)
            .collect()
    }

    /// Total value currently held in game escrows for `token`
    pub fn escrowed_total(&self, token: &TokenType) -> u128 {
        self.games
            .values()
            .filter(|g| &g.token == token)
            .map(|g| u128::from(g.escrow.value()))
            .sum()
    }

    pub fn events(&self) -> &[GameEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable ledger access for funding accounts outside engine calls
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Fail unless every account in `credits` can receive its worst-case credit.
    /// `debit` is taken out of one account before the credits land.
    pub(crate) fn ensure_headroom(
        &self,
        token: &TokenType,
        credits: &BTreeMap<Address, u128>,
        debit: Option<(Address, u64)>,
    ) -> Result<(), WagerError> {
        for (owner, credit) in credits {
            let mut balance = u128::from(self.ledger.balance_of(owner, token));
            if let Some((debited, amount)) = debit {
                if debited == *owner {
                    balance = balance.saturating_sub(u128::from(amount));
                }
            }
            if balance + credit > u128::from(u64::MAX) {
                return Err(WagerError::ArithmeticOverflow);
            }
        }
        Ok(())
    }

    /// Hand `balance` to `owner` after its headroom was checked
    pub(crate) fn credit(&mut self, owner: &Address, balance: Balance) {
        let value = balance.value();
        if let Err(e) = self.ledger.deposit(owner, balance) {
            error!(%owner, value, error = %e, "Ledger refused a checked credit");
        }
    }
}
