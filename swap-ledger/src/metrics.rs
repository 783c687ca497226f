//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `swap_ledger_events_total` - Audit events appended
//! - `swap_ledger_deposits_credited_total` - Deposit-credit settlements
//! - `swap_ledger_payouts_requested_total` - Claims recorded
//! - `swap_ledger_payouts_confirmed_total` - Payout confirmations recorded
//! - `swap_ledger_operations_rejected_total` - Operations failed validation
//! - `swap_ledger_commit_duration_seconds` - Commit latency histogram

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Histogram, IntCounter,
    Registry,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total audit events appended
    pub events_total: IntCounter,

    /// Total deposit-credit settlements
    pub deposits_credited_total: IntCounter,

    /// Total payout requests (claims)
    pub payouts_requested_total: IntCounter,

    /// Total payout confirmations
    pub payouts_confirmed_total: IntCounter,

    /// Total operations rejected by validation
    pub operations_rejected_total: IntCounter,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let events_total = register_int_counter_with_registry!(
            "swap_ledger_events_total",
            "Audit events appended",
            registry
        )?;

        let deposits_credited_total = register_int_counter_with_registry!(
            "swap_ledger_deposits_credited_total",
            "Deposit-credit settlements",
            registry
        )?;

        let payouts_requested_total = register_int_counter_with_registry!(
            "swap_ledger_payouts_requested_total",
            "Claims recorded",
            registry
        )?;

        let payouts_confirmed_total = register_int_counter_with_registry!(
            "swap_ledger_payouts_confirmed_total",
            "Payout confirmations recorded",
            registry
        )?;

        let operations_rejected_total = register_int_counter_with_registry!(
            "swap_ledger_operations_rejected_total",
            "Operations failed validation",
            registry
        )?;

        let commit_duration = register_histogram_with_registry!(
            "swap_ledger_commit_duration_seconds",
            "Commit latency",
            vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0],
            registry
        )?;

        Ok(Self {
            events_total,
            deposits_credited_total,
            payouts_requested_total,
            payouts_confirmed_total,
            operations_rejected_total,
            commit_duration,
            registry,
        })
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("events_total", &self.events_total.get())
            .finish()
    }
}
