//! Accounts and their coin stacks
//!
//! The stack is private: the only way to move coins in or out is through
//! [`Account::push_coin`] and [`Account::pop_coin`], and both recompute the
//! balance so it never drifts from the stack size.

use crate::types::{AccountName, AccountSummary, Coin};

/// A named participant holding a reputation score and a stack of coins
#[derive(Debug, Clone)]
pub struct Account {
    name: AccountName,
    reputation: u64,
    balance: u64,
    coins: Vec<Coin>,
}

impl Account {
    /// Create an account with no coins
    pub fn new(name: AccountName, reputation: u64) -> Self {
        Self {
            name,
            reputation,
            balance: 0,
            coins: Vec::new(),
        }
    }

    /// Account name
    pub fn name(&self) -> &AccountName {
        &self.name
    }

    /// Reputation score
    pub fn reputation(&self) -> u64 {
        self.reputation
    }

    /// Number of coins held
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Coins from most to least recently received
    pub fn coins(&self) -> impl Iterator<Item = &Coin> {
        self.coins.iter().rev()
    }

    /// Receive a coin on top of the stack
    pub fn push_coin(&mut self, coin: Coin) {
        self.coins.push(coin);
        self.refresh_balance();
    }

    /// Give up the most recently received coin
    pub fn pop_coin(&mut self) -> Option<Coin> {
        let coin = self.coins.pop();
        self.refresh_balance();
        coin
    }

    /// Name and balance
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            name: self.name.clone(),
            balance: self.balance,
        }
    }

    fn refresh_balance(&mut self) {
        self.balance = self.coins.len() as u64;
    }
}
