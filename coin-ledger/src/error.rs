//! Error types for the coin ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Emission request smaller than the account population
    #[error("Not enough coins for population: requested {requested}, population {population}")]
    NotEnoughCoins {
        /// Requested emission amount
        requested: u64,
        /// Number of accounts in the ledger
        population: usize,
    },

    /// Malformed or out-of-range amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Account name does not resolve to any account
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account name resolves to more than one account
    #[error("Account name {name} is ambiguous: {matches} accounts match")]
    AmbiguousAccount {
        /// Account name that was looked up
        name: String,
        /// Number of matching accounts
        matches: usize,
    },

    /// Transfer exceeds the source balance
    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        /// Source account
        account: String,
        /// Requested transfer amount
        required: u64,
        /// Source balance
        available: u64,
    },

    /// Proportional emission factor truncated to zero
    #[error(
        "Degenerate emission factor: aggregate reputation {aggregate_reputation} \
         cannot spread {remainder} coins"
    )]
    DegenerateFactor {
        /// Sum of all reputations
        aggregate_reputation: u64,
        /// Coins left after the one-per-account floor
        remainder: u64,
    },

    /// Proportional rounding awarded more coins than requested
    #[error("Emission over-allocated: requested {requested}, proportional share awarded {allocated}")]
    Overallocated {
        /// Requested emission amount
        requested: u64,
        /// Coins awarded before leftover distribution
        allocated: u64,
    },

    /// Query over an empty coin set
    #[error("Ledger holds no coins")]
    EmptyLedger,

    /// Population rejected at construction
    #[error("Invalid population: {0}")]
    InvalidPopulation(String),

    /// Invariant violation (balance drift, duplicated coin, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or insufficient request amount
    Validation,
    /// Account name does not resolve to exactly one account
    NotFound,
    /// Transfer exceeds source balance
    InsufficientFunds,
    /// Emission arithmetic cannot produce a valid allocation
    DegenerateArithmetic,
    /// Query over an empty coin set
    Empty,
    /// Anything else (configuration, IO, broken invariants)
    Internal,
}

impl ErrorKind {
    /// Stable lowercase label, used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::DegenerateArithmetic => "degenerate_arithmetic",
            ErrorKind::Empty => "empty",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Error {
    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotEnoughCoins { .. } | Error::InvalidAmount(_) => ErrorKind::Validation,
            Error::AccountNotFound(_) | Error::AmbiguousAccount { .. } => ErrorKind::NotFound,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::DegenerateFactor { .. } | Error::Overallocated { .. } => {
                ErrorKind::DegenerateArithmetic
            }
            Error::EmptyLedger => ErrorKind::Empty,
            Error::InvalidPopulation(_)
            | Error::InvariantViolation(_)
            | Error::Config(_)
            | Error::Metrics(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }
}
