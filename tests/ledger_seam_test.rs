//! Host ledgers implemented outside the crate, and the ledger traffic of a
//! settlement for each outcome.

use std::collections::HashMap;
use wagerflip::games::test_framework::{EngineFixture, ScriptedOracle};
use wagerflip::{
    AccountBook, Address, Balance, CoinChoice, GameEvent, Ledger, ManualClock, TokenType, TxContext, WagerEngine,
    WagerError,
};

/// Minimal host ledger keyed by owner and token
#[derive(Default)]
struct HostLedger {
    accounts: HashMap<(Address, TokenType), u64>,
}

impl HostLedger {
    fn fund(&mut self, owner: Address, token: &TokenType, amount: u64) {
        self.accounts.insert((owner, token.clone()), amount);
    }
}

impl Ledger for HostLedger {
    fn balance_of(&self, owner: &Address, token: &TokenType) -> u64 {
        self.accounts.get(&(*owner, token.clone())).copied().unwrap_or(0)
    }

    fn withdraw(&mut self, owner: &Address, token: &TokenType, amount: u64) -> Result<Balance, WagerError> {
        let available = self.balance_of(owner, token);
        if available < amount {
            return Err(WagerError::InsufficientFunds {
                available,
                needed: amount,
            });
        }
        self.accounts.insert((*owner, token.clone()), available - amount);
        Ok(Balance::issue(token.clone(), amount))
    }

    fn deposit(&mut self, owner: &Address, balance: Balance) -> Result<(), WagerError> {
        let (token, value) = balance.into_parts();
        let account = self.accounts.entry((*owner, token)).or_insert(0);
        *account = account.checked_add(value).ok_or(WagerError::ArithmeticOverflow)?;
        Ok(())
    }

    fn total_supply(&self, token: &TokenType) -> u128 {
        self.accounts
            .iter()
            .filter(|((_, t), _)| t == token)
            .map(|(_, v)| u128::from(*v))
            .sum()
    }
}

/// Wraps a ledger and counts every call that moves value
#[derive(Default)]
struct CountingLedger<L> {
    inner: L,
    withdraws: usize,
    deposits: usize,
}

impl<L> CountingLedger<L> {
    fn reset(&mut self) {
        self.withdraws = 0;
        self.deposits = 0;
    }

    fn counts(&self) -> (usize, usize) {
        (self.withdraws, self.deposits)
    }
}

impl<L: Ledger> Ledger for CountingLedger<L> {
    fn balance_of(&self, owner: &Address, token: &TokenType) -> u64 {
        self.inner.balance_of(owner, token)
    }

    fn withdraw(&mut self, owner: &Address, token: &TokenType, amount: u64) -> Result<Balance, WagerError> {
        self.withdraws += 1;
        self.inner.withdraw(owner, token, amount)
    }

    fn deposit(&mut self, owner: &Address, balance: Balance) -> Result<(), WagerError> {
        self.deposits += 1;
        self.inner.deposit(owner, balance)
    }

    fn total_supply(&self, token: &TokenType) -> u128 {
        self.inner.total_supply(token)
    }
}

fn event_kind(event: &GameEvent) -> &'static str {
    match event {
        GameEvent::GameCreated(_) => "created",
        GameEvent::GameJoined(_) => "joined",
        GameEvent::GameCancelled(_) => "cancelled",
        GameEvent::ConfigUpdated(_) => "config",
    }
}

#[test]
fn test_engine_runs_on_a_host_ledger() {
    let settings = EngineFixture::default_settings();
    let token = TokenType::new("SUI");
    let alice = Address::repeat_byte(0xa1);
    let bob = Address::repeat_byte(0xb0);
    let treasury = Address::repeat_byte(0xee);

    let mut ledger = HostLedger::default();
    ledger.fund(alice, &token, 50_000);
    ledger.fund(bob, &token, 50_000);
    let (mut engine, _cap) =
        WagerEngine::initialize(&settings, ScriptedOracle::new(vec![true]), ManualClock::new(0), ledger).unwrap();

    let id = engine
        .create_game(&TxContext::new(alice), &token, 10_000, CoinChoice::Heads)
        .unwrap();
    assert_eq!(engine.ledger().balance_of(&alice, &token), 40_000);

    let receipt = engine
        .join_games(&TxContext::new(bob), &[id], &token, 12_000)
        .unwrap();

    assert_eq!(receipt.refund, 2_000);
    assert_eq!(receipt.results[0].winner, alice);
    assert_eq!(receipt.results[0].fee_collected, 500);
    assert_eq!(engine.ledger().balance_of(&alice, &token), 59_500);
    assert_eq!(engine.ledger().balance_of(&bob, &token), 40_000);
    assert_eq!(engine.ledger().balance_of(&treasury, &token), 500);
    assert_eq!(engine.ledger().total_supply(&token), 100_000);
}

#[test]
fn test_host_ledger_overflow_is_caught_before_settlement() {
    let settings = EngineFixture::default_settings();
    let token = TokenType::new("SUI");
    let alice = Address::repeat_byte(0xa1);
    let bob = Address::repeat_byte(0xb0);

    let mut ledger = HostLedger::default();
    ledger.fund(alice, &token, u64::MAX);
    ledger.fund(bob, &token, 50_000);
    let (mut engine, _cap) =
        WagerEngine::initialize(&settings, ScriptedOracle::new(vec![true]), ManualClock::new(0), ledger).unwrap();
    let id = engine
        .create_game(&TxContext::new(alice), &token, 10_000, CoinChoice::Heads)
        .unwrap();
    let supply = engine.ledger().total_supply(&token) + engine.escrowed_total(&token);

    assert_eq!(
        engine.join_games(&TxContext::new(bob), &[id], &token, 10_000),
        Err(WagerError::ArithmeticOverflow)
    );
    assert!(engine.game(&id).is_some());
    assert_eq!(engine.ledger().balance_of(&bob, &token), 50_000);
    assert_eq!(engine.ledger().total_supply(&token) + engine.escrowed_total(&token), supply);
}

#[test]
fn test_settlement_traffic_is_identical_for_both_outcomes() {
    for fee_bps in [250u16, 0] {
        let mut runs = Vec::new();
        for outcome in [true, false] {
            let mut settings = EngineFixture::default_settings();
            settings.protocol.fee_bps = fee_bps;
            let token = TokenType::new("SUI");
            let alice = Address::repeat_byte(0xa1);
            let bob = Address::repeat_byte(0xb0);

            let mut ledger = CountingLedger::<AccountBook>::default();
            ledger.inner.mint(&alice, &token, 1_000_000).unwrap();
            ledger.inner.mint(&bob, &token, 1_000_000).unwrap();
            let (mut engine, _cap) =
                WagerEngine::initialize(&settings, ScriptedOracle::new(vec![outcome]), ManualClock::new(0), ledger)
                    .unwrap();

            let id = engine
                .create_game(&TxContext::new(alice), &token, 10_000, CoinChoice::Heads)
                .unwrap();
            engine.ledger_mut().reset();
            engine.drain_events();

            let receipt = engine
                .join_games(&TxContext::new(bob), &[id], &token, 10_000)
                .unwrap();
            let kinds: Vec<_> = engine.events().iter().map(event_kind).collect();
            runs.push((engine.ledger().counts(), kinds, receipt.results[0].clone()));
        }

        let (heads_counts, heads_kinds, heads) = &runs[0];
        let (tails_counts, tails_kinds, tails) = &runs[1];
        assert_eq!(heads_counts, tails_counts, "fee_bps={}", fee_bps);
        assert_eq!(*heads_counts, (1, 2), "fee_bps={}", fee_bps);
        assert_eq!(heads_kinds, tails_kinds);
        assert_eq!(heads_kinds, &vec!["joined"]);
        assert_eq!(heads.fee_collected, tails.fee_collected);
        assert_eq!(heads.winner_payout, tails.winner_payout);
        assert_ne!(heads.winner, tails.winner);
    }
}
