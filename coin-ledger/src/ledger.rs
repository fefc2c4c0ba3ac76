//! Main ledger orchestration layer
//!
//! The ledger owns the fixed account population and the coin-id counter.
//! Everything sits behind one reader/writer lock: emission and transfer hold
//! the write side for their whole effect, enumeration and queries hold the
//! read side, so no reader ever sees a half-applied mutation.
//!
//! # Example
//!
//! ```
//! use coin_ledger::{AccountSeed, Ledger};
//!
//! # fn main() -> coin_ledger::Result<()> {
//! let ledger = Ledger::new(vec![
//!     AccountSeed::new("boris", 5000),
//!     AccountSeed::new("maria", 1000),
//!     AccountSeed::new("oleg", 800),
//! ])?;
//!
//! ledger.emit(10)?;
//! ledger.transfer("boris", "maria", 2)?;
//!
//! let coin = ledger.longest_history_coin()?;
//! assert_eq!(coin.history.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::{
    account::Account,
    config::{AccountSeed, EmissionConfig},
    emission::{self, EmissionPlan},
    metrics::Metrics,
    types::{AccountSummary, Coin, CoinId},
    Config, Error, Result,
};
use parking_lot::RwLock;
use std::collections::HashSet;

/// Outcome of a successful emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionReceipt {
    /// Coins minted
    pub minted: u64,

    /// First id minted
    pub first_id: CoinId,

    /// Last id minted
    pub last_id: CoinId,
}

/// Outcome of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Coins moved, in the order they left the source
    pub moved: Vec<CoinId>,

    /// Source balance after the transfer
    pub source_balance: u64,

    /// Destination balance after the transfer
    pub destination_balance: u64,
}

#[derive(Debug)]
struct LedgerState {
    accounts: Vec<Account>,
    next_coin_id: u64,
}

impl LedgerState {
    fn mint(&mut self, index: usize) -> CoinId {
        let id = CoinId(self.next_coin_id);
        self.next_coin_id += 1;

        let account = &mut self.accounts[index];
        let coin = Coin::mint(id, account.name());
        account.push_coin(coin);
        id
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        let mut matches = self
            .accounts
            .iter()
            .enumerate()
            .filter(|(_, account)| account.name() == name)
            .map(|(index, _)| index);

        match (matches.next(), matches.count()) {
            (Some(index), 0) => Ok(index),
            (Some(_), rest) => Err(Error::AmbiguousAccount {
                name: name.to_string(),
                matches: rest + 1,
            }),
            (None, _) => Err(Error::AccountNotFound(name.to_string())),
        }
    }
}

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Accounts and coin counter, one unit of mutual exclusion
    state: RwLock<LedgerState>,

    /// Largest accepted emission request
    max_emission: u64,

    /// Operation metrics
    metrics: Metrics,
}

impl Ledger {
    /// Create ledger with the given population and the default emission limit
    pub fn new(population: Vec<AccountSeed>) -> Result<Self> {
        Self::with_limit(population, EmissionConfig::default().max_amount)
    }

    /// Create ledger from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_limit(config.population.clone(), config.emission.max_amount)
    }

    fn with_limit(population: Vec<AccountSeed>, max_emission: u64) -> Result<Self> {
        validate_population(&population)?;

        let accounts: Vec<Account> = population
            .into_iter()
            .map(|seed| Account::new(seed.name, seed.reputation))
            .collect();

        tracing::info!(
            "Ledger created with {} accounts: {}",
            accounts.len(),
            accounts
                .iter()
                .map(|a| a.name().as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            state: RwLock::new(LedgerState {
                accounts,
                next_coin_id: 0,
            }),
            max_emission,
            metrics: Metrics::new()?,
        })
    }

    /// Operation metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Number of accounts
    pub fn population(&self) -> usize {
        self.state.read().accounts.len()
    }

    /// Enumerate accounts in creation order
    ///
    /// Every summary is copied under a single read lock, so the whole
    /// sequence reflects one state of the ledger. The copy is walked lazily:
    /// dropping it early has no effect on the ledger, and calling
    /// `accounts()` again takes a fresh snapshot.
    pub fn accounts(&self) -> Accounts {
        let state = self.state.read();
        Accounts {
            inner: state
                .accounts
                .iter()
                .map(Account::summary)
                .collect::<Vec<_>>()
                .into_iter(),
        }
    }

    /// Summary of a single account
    pub fn account(&self, name: &str) -> Result<AccountSummary> {
        let state = self.state.read();
        let index = state.resolve(name)?;
        Ok(state.accounts[index].summary())
    }

    /// Coins held by an account, most recently received first
    pub fn coins_of(&self, name: &str) -> Result<Vec<Coin>> {
        let state = self.state.read();
        let index = state.resolve(name)?;
        Ok(state.accounts[index].coins().cloned().collect())
    }

    /// Total coins held across all accounts
    pub fn total_coins(&self) -> u64 {
        self.state.read().accounts.iter().map(Account::balance).sum()
    }

    /// Id the next minted coin will get
    pub fn next_coin_id(&self) -> CoinId {
        CoinId(self.state.read().next_coin_id)
    }

    /// Mint `amount` coins and distribute them by reputation
    ///
    /// Either every coin of the plan is minted or none is.
    pub fn emit(&self, amount: u64) -> Result<EmissionReceipt> {
        let result = self.try_emit(amount);
        match &result {
            Ok(receipt) => {
                self.metrics.record_emission(receipt.minted);
                tracing::info!(
                    "Emitted {} coins (ids {}..={})",
                    receipt.minted,
                    receipt.first_id,
                    receipt.last_id
                );
            }
            Err(e) => {
                self.metrics.record_rejection("emit", e.kind());
                tracing::warn!("Emission of {} coins rejected: {}", amount, e);
            }
        }
        result
    }

    fn try_emit(&self, amount: u64) -> Result<EmissionReceipt> {
        if amount > self.max_emission {
            return Err(Error::InvalidAmount(format!(
                "emission of {} exceeds limit {}",
                amount, self.max_emission
            )));
        }

        let mut state = self.state.write();

        let reputations: Vec<u64> = state.accounts.iter().map(Account::reputation).collect();
        let plan = emission::plan(&reputations, amount)?;

        let first_id = CoinId(state.next_coin_id);
        apply_plan(&mut state, &plan);
        let last_id = CoinId(state.next_coin_id.saturating_sub(1));

        Ok(EmissionReceipt {
            minted: plan.requested,
            first_id,
            last_id,
        })
    }

    /// Move `amount` coins from `source` to `destination`
    ///
    /// Coins leave the source from the top of its stack, one at a time, each
    /// stamped with the destination name before the next one is popped.
    pub fn transfer(&self, source: &str, destination: &str, amount: u64) -> Result<TransferReceipt> {
        let result = self.try_transfer(source, destination, amount);
        match &result {
            Ok(receipt) => {
                self.metrics.record_transfer(amount);
                tracing::info!(
                    "Transferred {} coins from {} to {}",
                    amount,
                    source,
                    destination
                );
                tracing::debug!("Moved coin ids: {:?}", receipt.moved);
            }
            Err(e) => {
                self.metrics.record_rejection("transfer", e.kind());
                tracing::warn!(
                    "Transfer of {} coins from {} to {} rejected: {}",
                    amount,
                    source,
                    destination,
                    e
                );
            }
        }
        result
    }

    fn try_transfer(&self, source: &str, destination: &str, amount: u64) -> Result<TransferReceipt> {
        let mut state = self.state.write();

        let src = state.resolve(source)?;
        let dst = state.resolve(destination)?;

        let available = state.accounts[src].balance();
        if available < amount {
            return Err(Error::InsufficientFunds {
                account: source.to_string(),
                required: amount,
                available,
            });
        }

        let destination_name = state.accounts[dst].name().clone();
        let mut moved = Vec::with_capacity(amount as usize);

        for _ in 0..amount {
            let mut coin = state.accounts[src].pop_coin().ok_or_else(|| {
                Error::InvariantViolation(format!("{} ran out of coins mid-transfer", source))
            })?;
            coin.history.append(&destination_name);
            moved.push(coin.id);
            state.accounts[dst].push_coin(coin);
        }

        Ok(TransferReceipt {
            moved,
            source_balance: state.accounts[src].balance(),
            destination_balance: state.accounts[dst].balance(),
        })
    }

    /// Coin with the most history segments
    ///
    /// Accounts are scanned in creation order and each stack from top to
    /// bottom; the first coin found with the maximum length wins.
    pub fn longest_history_coin(&self) -> Result<Coin> {
        let state = self.state.read();

        let mut best: Option<&Coin> = None;
        for coin in state.accounts.iter().flat_map(Account::coins) {
            match best {
                Some(current) if coin.transfers() <= current.transfers() => {}
                _ => best = Some(coin),
            }
        }

        best.cloned().ok_or(Error::EmptyLedger)
    }

    /// Check structural invariants of the whole ledger
    ///
    /// - every balance equals its stack size
    /// - coin ids are unique and below the counter
    /// - every history starts with an account of the population
    /// - every history ends with the account currently holding the coin
    pub fn verify_invariants(&self) -> Result<()> {
        let state = self.state.read();
        let names: HashSet<&str> = state.accounts.iter().map(|a| a.name().as_str()).collect();
        let mut seen = HashSet::new();

        for account in &state.accounts {
            let held = account.coins().count() as u64;
            if held != account.balance() {
                return Err(Error::InvariantViolation(format!(
                    "{} balance {} but holds {} coins",
                    account.name(),
                    account.balance(),
                    held
                )));
            }

            for coin in account.coins() {
                if coin.id.value() >= state.next_coin_id {
                    return Err(Error::InvariantViolation(format!(
                        "coin {} was never minted",
                        coin.id
                    )));
                }
                if !seen.insert(coin.id) {
                    return Err(Error::InvariantViolation(format!(
                        "coin {} held twice",
                        coin.id
                    )));
                }
                if !names.contains(coin.history.origin()) {
                    return Err(Error::InvariantViolation(format!(
                        "coin {} minted by unknown account {}",
                        coin.id,
                        coin.history.origin()
                    )));
                }
                if coin.history.last() != account.name().as_str() {
                    return Err(Error::InvariantViolation(format!(
                        "coin {} held by {} but history is {}",
                        coin.id,
                        account.name(),
                        coin.history
                    )));
                }
            }
        }

        Ok(())
    }
}

fn validate_population(population: &[AccountSeed]) -> Result<()> {
    if population.is_empty() {
        return Err(Error::InvalidPopulation("no accounts".to_string()));
    }

    let mut names = HashSet::new();
    for seed in population {
        if !seed.name.is_valid() {
            return Err(Error::InvalidPopulation(format!(
                "invalid account name {:?}",
                seed.name.as_str()
            )));
        }
        if !names.insert(seed.name.as_str()) {
            return Err(Error::InvalidPopulation(format!(
                "duplicate account name {}",
                seed.name
            )));
        }
    }

    Ok(())
}

fn apply_plan(state: &mut LedgerState, plan: &EmissionPlan) {
    for index in 0..state.accounts.len() {
        state.mint(index);
    }

    for (index, share) in plan.shares.iter().enumerate() {
        for _ in 0..*share {
            state.mint(index);
        }
    }

    for &index in &plan.leftover {
        state.mint(index);
    }
}

/// Enumeration of account summaries taken at one point in time, see
/// [`Ledger::accounts`]
#[derive(Debug, Clone)]
pub struct Accounts {
    inner: std::vec::IntoIter<AccountSummary>,
}

impl Iterator for Accounts {
    type Item = AccountSummary;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Accounts {}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_ledger() -> Ledger {
        Ledger::new(vec![
            AccountSeed::new("boris", 5000),
            AccountSeed::new("maria", 1000),
            AccountSeed::new("oleg", 800),
        ])
        .unwrap()
    }

    fn balances(ledger: &Ledger) -> Vec<u64> {
        ledger.accounts().map(|a| a.balance).collect()
    }

    fn ids(coins: &[Coin]) -> Vec<u64> {
        coins.iter().map(|c| c.id.value()).collect()
    }

    #[test]
    fn test_accounts_in_creation_order() {
        let ledger = create_test_ledger();
        let names: Vec<String> = ledger.accounts().map(|a| a.name.to_string()).collect();
        assert_eq!(names, vec!["boris", "maria", "oleg"]);
        assert_eq!(balances(&ledger), vec![0, 0, 0]);

        // Early stop then restart
        let mut accounts = ledger.accounts();
        assert_eq!(accounts.next().unwrap().name.as_str(), "boris");
        drop(accounts);
        assert_eq!(ledger.accounts().count(), 3);
    }

    #[test]
    fn test_accounts_snapshot_ignores_later_transfer() {
        let ledger = create_test_ledger();
        ledger.emit(10).unwrap();

        let mut accounts = ledger.accounts();
        let boris = accounts.next().unwrap();
        assert_eq!(boris.balance, 7);

        ledger.transfer("boris", "oleg", 5).unwrap();

        let rest: Vec<u64> = accounts.map(|a| a.balance).collect();
        assert_eq!(rest, vec![2, 1]);
        assert_eq!(boris.balance + rest.iter().sum::<u64>(), ledger.total_coins());

        // A new enumeration sees the transfer
        assert_eq!(balances(&ledger), vec![2, 2, 6]);
    }

    #[test]
    fn test_emit_one_per_account() {
        let ledger = create_test_ledger();
        let receipt = ledger.emit(3).unwrap();

        assert_eq!(receipt.minted, 3);
        assert_eq!(receipt.first_id, CoinId(0));
        assert_eq!(receipt.last_id, CoinId(2));
        assert_eq!(balances(&ledger), vec![1, 1, 1]);

        let coins = ledger.coins_of("maria").unwrap();
        assert_eq!(coins[0].history.as_str(), "maria");
        assert_eq!(coins[0].id, CoinId(1));
    }

    #[test]
    fn test_emit_four_over_three_accounts() {
        let ledger = create_test_ledger();
        ledger.emit(4).unwrap();
        assert_eq!(balances(&ledger), vec![2, 1, 1]);
        assert_eq!(ledger.total_coins(), 4);
    }

    #[test]
    fn test_emit_minting_order() {
        let ledger = create_test_ledger();
        ledger.emit(10).unwrap();

        assert_eq!(balances(&ledger), vec![7, 2, 1]);
        // Floor coins 0..=2, boris share 3..=7, maria share 8, boris leftover 9
        assert_eq!(
            ids(&ledger.coins_of("boris").unwrap()),
            vec![9, 7, 6, 5, 4, 3, 0]
        );
        assert_eq!(ids(&ledger.coins_of("maria").unwrap()), vec![8, 1]);
        assert_eq!(ids(&ledger.coins_of("oleg").unwrap()), vec![2]);
        assert_eq!(ledger.next_coin_id(), CoinId(10));
        ledger.verify_invariants().unwrap();
    }

    #[test]
    fn test_emit_rejections_leave_ledger_unchanged() {
        let ledger = create_test_ledger();
        ledger.emit(3).unwrap();

        assert!(matches!(
            ledger.emit(2),
            Err(Error::NotEnoughCoins { .. })
        ));
        assert!(matches!(
            ledger.emit(6804),
            Err(Error::DegenerateFactor { .. })
        ));
        assert!(matches!(
            ledger.emit(4003),
            Err(Error::Overallocated { .. })
        ));

        assert_eq!(balances(&ledger), vec![1, 1, 1]);
        assert_eq!(ledger.next_coin_id(), CoinId(3));
        assert_eq!(
            ledger
                .metrics()
                .rejections
                .with_label_values(&["emit", "degenerate_arithmetic"])
                .get(),
            2
        );
    }

    #[test]
    fn test_emit_limit() {
        let mut config = Config::default();
        config.emission.max_amount = 50;
        let ledger = Ledger::from_config(&config).unwrap();

        let err = ledger.emit(51).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
        assert!(ledger.emit(50).is_ok());
        assert_eq!(ledger.total_coins(), 50);
    }

    #[test]
    fn test_default_emit_limit() {
        let ledger = create_test_ledger();
        let limit = EmissionConfig::default().max_amount;

        let err = ledger.emit(limit + 1).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
        assert_eq!(ledger.total_coins(), 0);
        assert_eq!(ledger.next_coin_id(), CoinId(0));
    }

    #[test]
    fn test_transfer_moves_top_coins() {
        let ledger = create_test_ledger();
        ledger.emit(10).unwrap();

        let receipt = ledger.transfer("boris", "oleg", 2).unwrap();
        assert_eq!(receipt.moved, vec![CoinId(9), CoinId(7)]);
        assert_eq!(receipt.source_balance, 5);
        assert_eq!(receipt.destination_balance, 3);

        let oleg = ledger.coins_of("oleg").unwrap();
        assert_eq!(ids(&oleg), vec![7, 9, 2]);
        assert_eq!(oleg[0].history.as_str(), "boris-oleg");
        assert_eq!(oleg[1].history.as_str(), "boris-oleg");
        assert_eq!(oleg[2].history.as_str(), "oleg");

        assert_eq!(ledger.metrics().coins_transferred.get(), 2);
        ledger.verify_invariants().unwrap();
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let ledger = create_test_ledger();
        ledger.emit(3).unwrap();

        let err = ledger.transfer("oleg", "boris", 2).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFunds {
                required: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(balances(&ledger), vec![1, 1, 1]);
    }

    #[test]
    fn test_transfer_unknown_account() {
        let ledger = create_test_ledger();
        ledger.emit(3).unwrap();

        let err = ledger.transfer("boris", "ivan", 1).unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(ref name) if name == "ivan"));
        let err = ledger.transfer("ivan", "boris", 0).unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
        assert_eq!(balances(&ledger), vec![1, 1, 1]);
    }

    #[test]
    fn test_transfer_zero_and_self() {
        let ledger = create_test_ledger();
        ledger.emit(3).unwrap();

        let receipt = ledger.transfer("maria", "oleg", 0).unwrap();
        assert!(receipt.moved.is_empty());

        ledger.transfer("maria", "maria", 1).unwrap();
        let maria = ledger.coins_of("maria").unwrap();
        assert_eq!(maria[0].history.as_str(), "maria-maria");
        assert_eq!(balances(&ledger), vec![1, 1, 1]);
    }

    #[test]
    fn test_longest_history_coin() {
        let ledger = create_test_ledger();
        assert!(matches!(
            ledger.longest_history_coin(),
            Err(Error::EmptyLedger)
        ));

        ledger.emit(3).unwrap();
        // All histories have one segment: boris's top coin is found first
        assert_eq!(ledger.longest_history_coin().unwrap().id, CoinId(0));

        ledger.transfer("oleg", "maria", 1).unwrap();
        let coin = ledger.longest_history_coin().unwrap();
        assert_eq!(coin.id, CoinId(2));
        assert_eq!(coin.history.as_str(), "oleg-maria");

        ledger.transfer("maria", "boris", 2).unwrap();
        let coin = ledger.longest_history_coin().unwrap();
        assert_eq!(coin.id, CoinId(2));
        assert_eq!(coin.history.as_str(), "oleg-maria-boris");
    }

    #[test]
    fn test_verify_invariants_rejects_foreign_coin() {
        let ledger = create_test_ledger();
        ledger.emit(3).unwrap();
        ledger.verify_invariants().unwrap();

        {
            let mut state = ledger.state.write();
            let id = CoinId(state.next_coin_id);
            state.next_coin_id += 1;
            let mut coin = Coin::mint(id, &crate::AccountName::new("ivan"));
            coin.history.append(&crate::AccountName::new("boris"));
            state.accounts[0].push_coin(coin);
        }

        let err = ledger.verify_invariants().unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(ref msg) if msg.contains("ivan")));
    }

    #[test]
    fn test_ambiguous_lookup() {
        let state = LedgerState {
            accounts: vec![
                Account::new(crate::AccountName::new("twin"), 1),
                Account::new(crate::AccountName::new("twin"), 2),
            ],
            next_coin_id: 0,
        };

        let err = state.resolve("twin").unwrap_err();
        assert!(matches!(err, Error::AmbiguousAccount { matches: 2, .. }));
    }

    #[test]
    fn test_invalid_population() {
        assert!(matches!(
            Ledger::new(vec![]),
            Err(Error::InvalidPopulation(_))
        ));
        assert!(Ledger::new(vec![AccountSeed::new("a-b", 1)]).is_err());
        assert!(Ledger::new(vec![AccountSeed::new("a", 1), AccountSeed::new("a", 2)]).is_err());
    }
}
