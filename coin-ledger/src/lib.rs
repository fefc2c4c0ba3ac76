//! Coin Ledger Core
//!
//! Closed-population coin ledger with reputation-weighted emission and
//! history-stamped transfers.
//!
//! # Architecture
//!
//! - **Fixed population**: accounts are created once and never added or removed
//! - **Coin stacks**: each account holds its coins last-in, first-out
//! - **Single lock**: the whole ledger is one unit of mutual exclusion
//! - **Plan then mint**: emission is fully computed before anything changes
//!
//! # Invariants
//!
//! - Balance == coins held, for every account, after every operation
//! - Coin ids are unique, strictly increasing and never reused
//! - History segments == transfers + 1, ending with the current holder
//! - Coins are never destroyed: the total only grows

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod account;
pub mod emission;
pub mod ledger;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, ErrorKind, Result};
pub use types::{AccountName, AccountSummary, Coin, CoinId, History};
pub use account::Account;
pub use ledger::{Accounts, EmissionReceipt, Ledger, TransferReceipt};
pub use config::{AccountSeed, Config};
pub use metrics::Metrics;
