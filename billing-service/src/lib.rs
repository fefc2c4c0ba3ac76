pub mod error;
pub mod grpc;
pub mod server;

pub use coin_ledger::Config;
pub use error::{BillingError, Result};
pub use grpc::BillingGrpcServer;
pub use server::BillingServer;
