use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] coin_ledger::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BillingError>;
