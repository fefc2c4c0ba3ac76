//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_coins_minted_total` - Total number of coins minted
//! - `ledger_emissions_total` - Total number of successful emissions
//! - `ledger_transfers_total` - Total number of successful transfers
//! - `ledger_coins_transferred_total` - Total number of coins moved between accounts
//! - `ledger_rejections_total` - Rejected operations by operation and failure kind

use crate::error::ErrorKind;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total coins minted
    pub coins_minted: IntCounter,

    /// Successful emissions
    pub emissions_total: IntCounter,

    /// Successful transfers
    pub transfers_total: IntCounter,

    /// Coins moved by transfers
    pub coins_transferred: IntCounter,

    /// Rejected operations
    pub rejections: IntCounterVec,

    registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let coins_minted =
            IntCounter::new("ledger_coins_minted_total", "Total number of coins minted")?;
        registry.register(Box::new(coins_minted.clone()))?;

        let emissions_total = IntCounter::new(
            "ledger_emissions_total",
            "Total number of successful emissions",
        )?;
        registry.register(Box::new(emissions_total.clone()))?;

        let transfers_total = IntCounter::new(
            "ledger_transfers_total",
            "Total number of successful transfers",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let coins_transferred = IntCounter::new(
            "ledger_coins_transferred_total",
            "Total number of coins moved between accounts",
        )?;
        registry.register(Box::new(coins_transferred.clone()))?;

        let rejections = IntCounterVec::new(
            Opts::new("ledger_rejections_total", "Rejected ledger operations"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(rejections.clone()))?;

        Ok(Self {
            coins_minted,
            emissions_total,
            transfers_total,
            coins_transferred,
            rejections,
            registry,
        })
    }

    /// Record a successful emission
    pub fn record_emission(&self, minted: u64) {
        self.emissions_total.inc();
        self.coins_minted.inc_by(minted);
    }

    /// Record a successful transfer
    pub fn record_transfer(&self, moved: u64) {
        self.transfers_total.inc();
        self.coins_transferred.inc_by(moved);
    }

    /// Record a rejected operation
    pub fn record_rejection(&self, operation: &str, kind: ErrorKind) {
        self.rejections
            .with_label_values(&[operation, kind.as_str()])
            .inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("coins_minted", &self.coins_minted.get())
            .field("emissions_total", &self.emissions_total.get())
            .field("transfers_total", &self.transfers_total.get())
            .field("coins_transferred", &self.coins_transferred.get())
            .finish_non_exhaustive()
    }
}
