//! Core types for the coin ledger
//!
//! Coins are plain values: an id handed out once by the ledger counter and a
//! history string recording every account the coin has passed through.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter between account names in a coin history
pub const HISTORY_DELIMITER: char = '-';

/// Account name (unique within a ledger)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountName(String);

impl AccountName {
    /// Create new account name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the name can appear as a single history segment
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !self.0.contains(HISTORY_DELIMITER)
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for AccountName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Globally unique coin identifier, assigned in minting order starting at 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinId(pub(crate) u64);

impl CoinId {
    /// Raw id value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delimited list of the accounts a coin has passed through
///
/// Never empty: it starts with the minting account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History(String);

impl History {
    /// History of a freshly minted coin
    pub fn minted_by(account: &AccountName) -> Self {
        Self(account.as_str().to_string())
    }

    /// Record a transfer to `account`
    pub fn append(&mut self, account: &AccountName) {
        self.0.push(HISTORY_DELIMITER);
        self.0.push_str(account.as_str());
    }

    /// Number of segments (transfers + 1)
    pub fn len(&self) -> usize {
        self.0.split(HISTORY_DELIMITER).count()
    }

    /// Iterate segments from minting account to current holder
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(HISTORY_DELIMITER)
    }

    /// Account that minted the coin
    pub fn origin(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    /// Most recent account in the history
    pub fn last(&self) -> &str {
        self.0
            .rsplit(HISTORY_DELIMITER)
            .next()
            .unwrap_or_default()
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A uniquely numbered unit of value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique id
    pub id: CoinId,

    /// Accounts the coin has passed through
    pub history: History,
}

impl Coin {
    /// Mint a coin for `account`
    pub(crate) fn mint(id: CoinId, account: &AccountName) -> Self {
        Self {
            id,
            history: History::minted_by(account),
        }
    }

    /// Number of transfers this coin has undergone
    pub fn transfers(&self) -> usize {
        self.history.len() - 1
    }
}

/// Account identity as seen by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Account name
    pub name: AccountName,

    /// Current number of coins held
    pub balance: u64,
}
