//! Host-facility traits
//!
//! The engine talks to the surrounding platform only through these seams: a ledger
//! that holds account balances and a clock for creation timestamps.

use crate::common::types::{current_timestamp_ms, Address, TokenType};
use crate::errors::WagerError;
use crate::escrow::Balance;
use std::sync::atomic::{AtomicU64, Ordering};

/// Account-balance store backing every escrow movement
pub trait Ledger {
    /// Spendable balance of `owner` in `token`
    fn balance_of(&self, owner: &Address, token: &TokenType) -> u64;

    /// Move `amount` out of `owner`'s account into a loose balance.
    /// Implementations create the returned value with `Balance::issue`.
    fn withdraw(&mut self, owner: &Address, token: &TokenType, amount: u64) -> Result<Balance, WagerError>;

    /// Credit a balance to `owner`. Zero-value balances are accepted and dropped.
    ///
    /// Fails with `ArithmeticOverflow`, leaving the account untouched, when the
    /// credit does not fit. The engine checks headroom with `balance_of` before its
    /// first mutation, so a checked credit must not fail.
    fn deposit(&mut self, owner: &Address, balance: Balance) -> Result<(), WagerError>;

    /// Sum of all account balances in `token`
    fn total_supply(&self, token: &TokenType) -> u128;
}

/// Timestamp source used at game creation
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1_500);
        clock.set(42);
        assert_eq!(clock.now_ms(), 42);
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now_ms() > 0);
    }
}
