//! Main ledger orchestration layer
//!
//! Ties storage, the single-writer actor and metrics together into the
//! public API of the settlement accounting state machine.
//!
//! # Example
//!
//! ```no_run
//! use swap_ledger::{AccountId, Config, SwapLedger};
//!
//! #[tokio::main]
//! async fn main() -> swap_ledger::Result<()> {
//!     let config = Config::default();
//!     let admin = config.admin.clone();
//!     let ledger = SwapLedger::open(config)?;
//!
//!     ledger.mint(&admin, &AccountId::new("user-1"), 666).await?;
//!     assert_eq!(ledger.balance_of(&AccountId::new("user-1"))?, 666);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    metrics::Metrics,
    storage::Storage,
    types::{AccountId, Amount, AuditEvent, ExternalAddress, ReferenceId},
    Config, Result,
};
use std::sync::Arc;

/// Main ledger interface
///
/// Mutations are routed through the single-writer actor; pure reads are
/// served directly from storage and may run concurrently with the writer.
#[derive(Debug)]
pub struct SwapLedger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,
}

impl SwapLedger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| crate::Error::Config(format!("Failed to create metrics: {}", e)))?;
        let handle = spawn_ledger_actor(storage.clone(), metrics.clone());

        Ok(Self {
            handle,
            storage,
            metrics,
        })
    }

    // Balance ledger

    /// Mint `amount` tokens to `account` (administrator only)
    pub async fn mint(
        &self,
        caller: &AccountId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<AuditEvent> {
        self.handle
            .mint(caller.clone(), account.clone(), amount)
            .await
    }

    /// Burn `amount` of the caller's tokens
    pub async fn burn(&self, caller: &AccountId, amount: Amount) -> Result<AuditEvent> {
        self.handle.burn(caller.clone(), amount).await
    }

    /// Transfer `amount` from the caller to `to`
    pub async fn transfer(
        &self,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<AuditEvent> {
        self.handle.transfer(caller.clone(), to.clone(), amount).await
    }

    /// Account balance
    pub fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        self.storage.balance_of(account)
    }

    /// Total token supply
    pub fn total_supply(&self) -> Result<Amount> {
        self.storage.total_supply()
    }

    // Rate & routing registry

    /// Replace the conversion ratio (administrator only)
    pub async fn set_conversion_ratio(
        &self,
        caller: &AccountId,
        value: u64,
    ) -> Result<AuditEvent> {
        self.handle.set_conversion_ratio(caller.clone(), value).await
    }

    /// Replace the token pool account (administrator only)
    pub async fn set_token_pool(
        &self,
        caller: &AccountId,
        pool: &AccountId,
    ) -> Result<AuditEvent> {
        self.handle.set_token_pool(caller.clone(), pool.clone()).await
    }

    /// Replace the external pool address (administrator only)
    pub async fn set_external_pool(
        &self,
        caller: &AccountId,
        pool: &ExternalAddress,
    ) -> Result<AuditEvent> {
        self.handle
            .set_external_pool(caller.clone(), pool.clone())
            .await
    }

    /// Current conversion ratio
    pub fn conversion_ratio(&self) -> Result<u64> {
        self.storage.conversion_ratio()
    }

    /// Current token pool account
    pub fn token_pool(&self) -> Result<AccountId> {
        self.storage.token_pool()
    }

    /// Current external pool address
    pub fn external_pool(&self) -> Result<ExternalAddress> {
        self.storage.external_pool()
    }

    /// Administrator account
    pub fn admin(&self) -> Result<AccountId> {
        self.storage.admin()
    }

    // Settlement workflows

    /// Credit `customer` with `token_amount` from the token pool for the
    /// external deposit identified by `reference` (administrator only).
    /// A reference that was already credited is rejected.
    pub async fn credit_deposit(
        &self,
        caller: &AccountId,
        reference: &ReferenceId,
        customer: &AccountId,
        token_amount: Amount,
    ) -> Result<AuditEvent> {
        self.handle
            .credit_deposit(
                caller.clone(),
                reference.clone(),
                customer.clone(),
                token_amount,
            )
            .await
    }

    /// Surrender `token_amount` to the token pool and request payout to
    /// `external_address`. The external payment itself happens out-of-band;
    /// the operator watches `PayoutRequested` events.
    pub async fn claim_external_payout(
        &self,
        caller: &AccountId,
        token_amount: Amount,
        external_address: &ExternalAddress,
    ) -> Result<AuditEvent> {
        self.handle
            .claim_external_payout(caller.clone(), token_amount, external_address.clone())
            .await
    }

    /// Record that the external payout identified by `reference` was made
    /// (administrator only). Emits an audit event, moves no balances.
    pub async fn confirm_payout(
        &self,
        caller: &AccountId,
        reference: &ReferenceId,
        customer: &AccountId,
        external_amount: u64,
    ) -> Result<AuditEvent> {
        self.handle
            .confirm_payout(
                caller.clone(),
                reference.clone(),
                customer.clone(),
                external_amount,
            )
            .await
    }

    // Audit event log

    /// Events carrying the given reference, in log order
    pub fn events_by_reference(&self, reference: &ReferenceId) -> Result<Vec<AuditEvent>> {
        self.storage.events_by_reference(reference)
    }

    /// Events concerning the given account, in log order
    pub fn events_by_customer(&self, customer: &AccountId) -> Result<Vec<AuditEvent>> {
        self.storage.events_by_customer(customer)
    }

    /// Contiguous range scan over [from_seq, to_seq]
    pub fn events_in_range(&self, from_seq: u64, to_seq: u64) -> Result<Vec<AuditEvent>> {
        self.storage.events_in_range(from_seq, to_seq)
    }

    /// Position of the most recent event, if any
    pub fn latest_seq(&self) -> Result<Option<u64>> {
        self.storage.latest_seq()
    }

    /// Check the conservation invariant: sum of balances equals supply
    pub fn verify_conservation(&self) -> Result<bool> {
        self.storage.verify_conservation()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
