//! Swap Ledger
//!
//! Settlement accounting state machine for a cross-network token swap:
//! a fungible-token balance table on the primary ledger, administrator-gated
//! rate and routing configuration, and the two settlement workflows
//! (deposit-credit and withdrawal-claim) that bridge it to an
//! independently-operated external settlement network.
//!
//! # Architecture
//!
//! - **Event Sourcing**: every state change commits atomically with an
//!   immutable audit event; the event log is the operator's reconciliation
//!   and idempotency source
//! - **Single Writer**: one actor task executes each mutation to completion
//!   before the next, so no interleaving is observable within an operation
//! - **Indexed Audit Log**: events are queryable by reference id, by
//!   customer, and by contiguous log range
//!
//! # Invariants
//!
//! - Conservation: sum of all balances == total supply after every operation
//! - Authorization: privileged operations require the administrator and
//!   reject all other callers with no state change
//! - Append-only: events are never modified or deleted
//! - Duplicate settlement references are rejected

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::{Config, DEFAULT_CONVERSION_RATIO};
pub use error::{Error, Result};
pub use ledger::SwapLedger;
pub use metrics::Metrics;
pub use types::{
    AccountId, Amount, AuditEvent, AuditKind, ExternalAddress, ReferenceId,
};
