pub mod server;

pub use server::{billing, BillingGrpcServer};
