//! Token escrow primitive
//!
//! `Balance` is a loose amount of one token kind. It cannot be cloned; value only
//! moves by splitting, joining, or handing the balance to a `Ledger`. This keeps
//! escrow arithmetic conservative by construction.

use crate::common::traits::Ledger;
use crate::common::types::{Address, TokenType};
use crate::errors::WagerError;
use std::collections::BTreeMap;

/// A loose fungible amount tagged with its token type
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a non-zero balance destroys value"]
pub struct Balance {
    token: TokenType,
    value: u64,
}

impl Balance {
    /// Empty balance of `token`
    pub fn zero(token: TokenType) -> Self {
        Self { token, value: 0 }
    }

    /// Loose balance for value a `Ledger` implementation has just debited from an
    /// account. Calling this anywhere else creates value from nothing.
    pub fn issue(token: TokenType, value: u64) -> Self {
        Self { token, value }
    }

    /// Consume the balance, handing its token and value to a ledger crediting it
    pub fn into_parts(self) -> (TokenType, u64) {
        (self.token, self.value)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn token(&self) -> &TokenType {
        &self.token
    }

    /// Take exactly `amount` out of this balance
    pub fn split(&mut self, amount: u64) -> Result<Balance, WagerError> {
        if amount > self.value {
            return Err(WagerError::InsufficientFunds {
                available: self.value,
                needed: amount,
            });
        }
        self.value -= amount;
        Ok(Balance::issue(self.token.clone(), amount))
    }

    /// Take `amount` out of a balance already checked to cover it
    pub(crate) fn take(&mut self, amount: u64) -> Balance {
        debug_assert!(amount <= self.value);
        let amount = amount.min(self.value);
        self.value -= amount;
        Balance::issue(self.token.clone(), amount)
    }

    /// Merge `other` into this balance, returning the new value
    pub fn join(&mut self, other: Balance) -> Result<u64, WagerError> {
        if other.token != self.token {
            return Err(WagerError::TokenMismatch {
                expected: self.token.clone(),
                actual: other.token,
            });
        }
        self.value = self
            .value
            .checked_add(other.value)
            .ok_or(WagerError::ArithmeticOverflow)?;
        Ok(self.value)
    }

    /// Merge a same-token balance whose sum was checked to fit in `u64`
    pub(crate) fn absorb(&mut self, other: Balance) -> u64 {
        debug_assert_eq!(self.token, other.token);
        debug_assert!(self.value.checked_add(other.value).is_some());
        self.value = self.value.saturating_add(other.value);
        self.value
    }

    /// Destroy an empty balance. A non-zero balance is handed back untouched.
    pub fn destroy_zero(self) -> Result<(), Balance> {
        if self.value == 0 {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// In-memory account book implementing the host ledger
#[derive(Debug, Default)]
pub struct AccountBook {
    accounts: BTreeMap<(Address, TokenType), u64>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit freshly issued funds to `owner` (faucet for simulations and tests)
    pub fn mint(&mut self, owner: &Address, token: &TokenType, amount: u64) -> Result<(), WagerError> {
        self.deposit(owner, Balance::issue(token.clone(), amount))
    }

    /// All non-zero accounts holding `token`
    pub fn holders(&self, token: &TokenType) -> Vec<(Address, u64)> {
        self.accounts
            .iter()
            .filter(|((_, t), value)| t == token && **value > 0)
            .map(|((owner, _), value)| (*owner, *value))
            .collect()
    }
}

impl Ledger for AccountBook {
    fn balance_of(&self, owner: &Address, token: &TokenType) -> u64 {
        self.accounts
            .get(&(*owner, token.clone()))
            .copied()
            .unwrap_or(0)
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
        if value == 0 {
            return Ok(());
        }
        let key = (*owner, token);
        let current = self.accounts.get(&key).copied().unwrap_or(0);
        let updated = current.checked_add(value).ok_or(WagerError::ArithmeticOverflow)?;
        self.accounts.insert(key, updated);
        Ok(())
    }

    fn total_supply(&self, token: &TokenType) -> u128 {
        self.accounts
            .iter()
            .filter(|((_, t), _)| t == token)
            .map(|(_, value)| u128::from(*value))
            .sum()
    }
}
