//! Core types for the swap ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (u64 minimal token units, checked)

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Token amount in minimal units
pub type Amount = u64;

/// Account identifier on the primary ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The void identifier, used as mint source and burn destination
    pub fn void() -> Self {
        Self("0x0".to_string())
    }

    /// True for the void identifier
    pub fn is_void(&self) -> bool {
        self.0 == "0x0"
    }

    /// True for an identifier that cannot name an account
    pub fn is_malformed(&self) -> bool {
        self.0.is_empty() || self.is_void()
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External address on the settlement network (opaque to the ledger)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalAddress(String);

impl ExternalAddress {
    /// Create new external address
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction reference correlating an audit event with a settlement action
/// on either network (external deposit tx id, primary-ledger claim tx id, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Create new reference ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audit event appended atomically with the state change it records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the append-only log (contiguous from 0)
    pub seq: u64,

    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Event timestamp (nanoseconds since Unix epoch)
    pub timestamp_nanos: i64,

    /// What happened
    pub kind: AuditKind,
}

impl AuditEvent {
    /// Reference ID carried by this event, if any (index key)
    pub fn reference(&self) -> Option<&ReferenceId> {
        match &self.kind {
            AuditKind::DepositCredited { reference, .. } => Some(reference),
            AuditKind::PayoutConfirmed { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// Accounts this event concerns (index keys)
    pub fn customers(&self) -> Vec<&AccountId> {
        match &self.kind {
            AuditKind::Transfer { from, to, .. } => {
                let mut accounts = Vec::with_capacity(2);
                if !from.is_void() {
                    accounts.push(from);
                }
                if !to.is_void() {
                    accounts.push(to);
                }
                accounts
            }
            AuditKind::DepositCredited { customer, .. } => vec![customer],
            AuditKind::PayoutRequested { customer, .. } => vec![customer],
            AuditKind::PayoutConfirmed { customer, .. } => vec![customer],
            AuditKind::RatioChanged { .. }
            | AuditKind::TokenPoolChanged { .. }
            | AuditKind::ExternalPoolChanged { .. } => vec![],
        }
    }
}

/// Audit event kind with kind-specific fields
///
/// The external operator reconciles against these records; field content is
/// part of the contract, see `events_by_reference` / `events_by_customer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditKind {
    /// Balance movement. Mint uses the void identifier as `from`,
    /// burn uses it as `to`.
    Transfer {
        /// Source account
        from: AccountId,
        /// Destination account
        to: AccountId,
        /// Amount moved
        amount: Amount,
    },

    /// Tokens credited to a customer for an observed external deposit
    DepositCredited {
        /// External-network deposit transaction id
        reference: ReferenceId,
        /// Credited account
        customer: AccountId,
        /// Tokens delivered
        token_amount: Amount,
        /// Conversion ratio at settlement time (audit context)
        ratio: u64,
    },

    /// A holder surrendered tokens and requested external payout
    PayoutRequested {
        /// Requesting account
        customer: AccountId,
        /// Where the external payment should go
        external_address: ExternalAddress,
        /// Tokens surrendered to the pool
        token_amount: Amount,
    },

    /// Operator confirmation that an external payout was made
    PayoutConfirmed {
        /// Settlement transaction reference
        reference: ReferenceId,
        /// Paid account
        customer: AccountId,
        /// External-network amount paid out
        external_amount: u64,
        /// Conversion ratio at settlement time (audit context)
        ratio: u64,
    },

    /// Conversion ratio replaced
    RatioChanged {
        /// Previous ratio
        old: u64,
        /// New ratio
        new: u64,
    },

    /// Token pool address replaced
    TokenPoolChanged {
        /// Previous pool account
        old: AccountId,
        /// New pool account
        new: AccountId,
    },

    /// External pool address replaced
    ExternalPoolChanged {
        /// Previous pool address
        old: ExternalAddress,
        /// New pool address
        new: ExternalAddress,
    },
}
