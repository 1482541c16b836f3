//! Coin flip testing framework
//!
//! Deterministic oracle and a ready-made engine fixture shared by unit tests,
//! integration tests and benchmarks. Test support only: the fixture panics on
//! setup failures and the scripted oracle is not a source of randomness, so
//! nothing here belongs in a production engine.

use crate::common::traits::{Clock, Ledger, ManualClock};
use crate::common::types::{Address, GameId, TokenType, TxContext};
use crate::config::EngineSettings;
use crate::engine::WagerEngine;
use crate::escrow::AccountBook;
use crate::games::types::CoinChoice;
use crate::games::vrf_engine::{RandomGenerator, RandomnessOracle};
use crate::protocol::AdminCapability;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Oracle that replays a fixed outcome script, cycling when it runs out.
#[derive(Debug)]
pub struct ScriptedOracle {
    script: Mutex<Vec<bool>>,
    generators_drawn: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(outcomes: Vec<bool>) -> Self {
        Self {
            script: Mutex::new(outcomes),
            generators_drawn: AtomicUsize::new(0),
        }
    }

    /// Replace the script used by generators drawn from now on
    pub fn script(&self, outcomes: Vec<bool>) {
        *self.script.lock().unwrap_or_else(PoisonError::into_inner) = outcomes;
    }

    /// How many generators have been handed out
    pub fn generators_drawn(&self) -> usize {
        self.generators_drawn.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new(vec![true])
    }
}

pub struct ScriptedGenerator {
    outcomes: Vec<bool>,
    next: usize,
}

impl RandomGenerator for ScriptedGenerator {
    fn generate_bool(&mut self) -> bool {
        if self.outcomes.is_empty() {
            return true;
        }
        let outcome = self.outcomes[self.next % self.outcomes.len()];
        self.next += 1;
        outcome
    }
}

impl RandomnessOracle for ScriptedOracle {
    type Generator = ScriptedGenerator;

    fn new_generator(&self, _context: &str) -> ScriptedGenerator {
        self.generators_drawn.fetch_add(1, Ordering::SeqCst);
        let outcomes = self.script.lock().unwrap_or_else(PoisonError::into_inner).clone();
        ScriptedGenerator { outcomes, next: 0 }
    }
}

pub type TestEngine = WagerEngine<ScriptedOracle, ManualClock, AccountBook>;

/// Engine with one whitelisted token and three funded players
pub struct EngineFixture {
    pub engine: TestEngine,
    pub cap: AdminCapability,
    pub token: TokenType,
    pub alice: Address,
    pub bob: Address,
    pub carol: Address,
    pub treasury: Address,
    pub start_ms: u64,
}

impl EngineFixture {
    pub const MIN_BET: u64 = 1_000;
    pub const MAX_BET: u64 = 1_000_000_000_000;
    pub const STARTING_FUNDS: u64 = 10_000_000_000_000;
    pub const FEE_BPS: u16 = 250;

    pub fn new() -> Self {
        Self::with_settings(Self::default_settings())
    }

    pub fn default_settings() -> EngineSettings {
        let mut settings = EngineSettings::with_token("SUI", Self::MIN_BET, Self::MAX_BET);
        settings.protocol.fee_bps = Self::FEE_BPS;
        settings.protocol.max_games_per_batch = 50;
        settings.protocol.treasury = Address::repeat_byte(0xee).to_string();
        settings
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let start_ms = 1_700_000_000_000;
        let treasury = settings
            .treasury_address()
            .unwrap_or(Address::repeat_byte(0xee));
        let token = settings
            .tokens
            .first()
            .map(|t| t.token_type())
            .unwrap_or_else(|| TokenType::new("SUI"));

        let (mut engine, cap) = match WagerEngine::initialize(
            &settings,
            ScriptedOracle::default(),
            ManualClock::new(start_ms),
            AccountBook::new(),
        ) {
            Ok(pair) => pair,
            Err(e) => panic!("fixture settings must be valid: {}", e),
        };

        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        let carol = Address::repeat_byte(0xca);
        for player in [alice, bob, carol] {
            if let Err(e) = engine.ledger_mut().mint(&player, &token, Self::STARTING_FUNDS) {
                panic!("fixture funding failed: {}", e);
            }
        }

        Self {
            engine,
            cap,
            token,
            alice,
            bob,
            carol,
            treasury,
            start_ms,
        }
    }

    /// Force the outcomes of the next batch
    pub fn script(&self, outcomes: Vec<bool>) {
        self.engine.oracle().script(outcomes);
    }

    /// Open `count` games for `creator`, each betting `bet` on `choice`
    pub fn open_games(&mut self, creator: Address, count: usize, bet: u64, choice: CoinChoice) -> Vec<GameId> {
        let token = self.token.clone();
        (0..count)
            .map(|_| {
                self.engine.clock().advance(1);
                match self.engine.create_game(&TxContext::new(creator), &token, bet, choice) {
                    Ok(id) => id,
                    Err(e) => panic!("fixture game creation failed: {}", e),
                }
            })
            .collect()
    }

    pub fn balance(&self, owner: &Address) -> u64 {
        self.engine.ledger().balance_of(owner, &self.token)
    }

    /// Ledger supply plus everything held in escrow
    pub fn total_value(&self) -> u128 {
        self.engine.ledger().total_supply(&self.token) + self.engine.escrowed_total(&self.token)
    }

    pub fn now_ms(&self) -> u64 {
        self.engine.clock().now_ms()
    }
}

impl Default for EngineFixture {
    fn default() -> Self {
        Self::new()
    }
}
