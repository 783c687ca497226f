//! Single-writer actor for the ledger
//!
//! Every mutating operation flows through one task with a bounded mailbox.
//! The actor runs read-validate-write to completion for each command before
//! dequeuing the next, which gives the total ordering the settlement
//! contract requires without any locking. Pure reads bypass the actor and
//! go straight to storage.

use crate::{
    metrics::Metrics,
    storage::{Mutation, Storage},
    types::{AccountId, Amount, AuditEvent, AuditKind, ExternalAddress, ReferenceId},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerCommand {
    /// Create tokens (administrator only)
    Mint {
        /// Calling account
        caller: AccountId,
        /// Credited account
        account: AccountId,
        /// Amount to create
        amount: Amount,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Destroy caller's tokens
    Burn {
        /// Calling account
        caller: AccountId,
        /// Amount to destroy
        amount: Amount,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Move tokens from caller to another account
    Transfer {
        /// Calling account
        caller: AccountId,
        /// Destination account
        to: AccountId,
        /// Amount to move
        amount: Amount,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Replace the conversion ratio (administrator only)
    SetConversionRatio {
        /// Calling account
        caller: AccountId,
        /// New ratio
        value: u64,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Replace the token pool account (administrator only)
    SetTokenPool {
        /// Calling account
        caller: AccountId,
        /// New pool account
        pool: AccountId,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Replace the external pool address (administrator only)
    SetExternalPool {
        /// Calling account
        caller: AccountId,
        /// New pool address
        pool: ExternalAddress,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Credit a customer for an observed external deposit (administrator only)
    CreditDeposit {
        /// Calling account
        caller: AccountId,
        /// External deposit reference
        reference: ReferenceId,
        /// Credited account
        customer: AccountId,
        /// Tokens to deliver from the pool
        token_amount: Amount,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Surrender tokens and request an external payout
    ClaimExternalPayout {
        /// Calling account
        caller: AccountId,
        /// Tokens to surrender
        token_amount: Amount,
        /// External destination address
        external_address: ExternalAddress,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Record that an external payout was made (administrator only)
    ConfirmPayout {
        /// Calling account
        caller: AccountId,
        /// Settlement transaction reference
        reference: ReferenceId,
        /// Paid account
        customer: AccountId,
        /// External-network amount paid
        external_amount: u64,
        /// Reply channel
        respond: oneshot::Sender<Result<AuditEvent>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that executes ledger commands serially
#[derive(Debug)]
pub struct LedgerActor {
    storage: Arc<Storage>,
    mailbox: mpsc::Receiver<LedgerCommand>,
    metrics: Metrics,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<LedgerCommand>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(cmd) = self.mailbox.recv().await {
            if matches!(cmd, LedgerCommand::Shutdown) {
                break;
            }
            self.handle_command(cmd);
        }
    }

    fn handle_command(&self, cmd: LedgerCommand) {
        let timer = self.metrics.commit_duration.start_timer();

        let (result, respond) = match cmd {
            LedgerCommand::Mint {
                caller,
                account,
                amount,
                respond,
            } => (self.mint(&caller, &account, amount), respond),
            LedgerCommand::Burn {
                caller,
                amount,
                respond,
            } => (self.burn(&caller, amount), respond),
            LedgerCommand::Transfer {
                caller,
                to,
                amount,
                respond,
            } => (self.transfer(&caller, &to, amount), respond),
            LedgerCommand::SetConversionRatio {
                caller,
                value,
                respond,
            } => (self.set_conversion_ratio(&caller, value), respond),
            LedgerCommand::SetTokenPool {
                caller,
                pool,
                respond,
            } => (self.set_token_pool(&caller, pool), respond),
            LedgerCommand::SetExternalPool {
                caller,
                pool,
                respond,
            } => (self.set_external_pool(&caller, pool), respond),
            LedgerCommand::CreditDeposit {
                caller,
                reference,
                customer,
                token_amount,
                respond,
            } => (
                self.credit_deposit(&caller, reference, &customer, token_amount),
                respond,
            ),
            LedgerCommand::ClaimExternalPayout {
                caller,
                token_amount,
                external_address,
                respond,
            } => (
                self.claim_external_payout(&caller, token_amount, external_address),
                respond,
            ),
            LedgerCommand::ConfirmPayout {
                caller,
                reference,
                customer,
                external_amount,
                respond,
            } => (
                self.confirm_payout(&caller, reference, &customer, external_amount),
                respond,
            ),
            LedgerCommand::Shutdown => return,
        };

        timer.observe_duration();

        match &result {
            Ok(event) => {
                self.metrics.events_total.inc();
                match event.kind {
                    AuditKind::DepositCredited { .. } => self.metrics.deposits_credited_total.inc(),
                    AuditKind::PayoutRequested { .. } => self.metrics.payouts_requested_total.inc(),
                    AuditKind::PayoutConfirmed { .. } => self.metrics.payouts_confirmed_total.inc(),
                    _ => {}
                }
            }
            Err(e) => {
                self.metrics.operations_rejected_total.inc();
                tracing::debug!("Command rejected: {}", e);
            }
        }

        let _ = respond.send(result);
    }

    // Validation helpers

    fn ensure_admin(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.storage.admin()? {
            return Err(Error::Unauthorized(caller.to_string()));
        }
        Ok(())
    }

    fn ensure_positive(amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidValue("Amount must be positive".to_string()));
        }
        Ok(())
    }

    fn debit_balance(&self, account: &AccountId, amount: Amount) -> Result<Amount> {
        let balance = self.storage.balance_of(account)?;
        if balance < amount {
            return Err(Error::InsufficientBalance {
                account: account.to_string(),
                balance,
                requested: amount,
            });
        }
        Ok(balance - amount)
    }

    fn credit_balance(&self, account: &AccountId, amount: Amount) -> Result<Amount> {
        self.storage
            .balance_of(account)?
            .checked_add(amount)
            .ok_or_else(|| Error::Overflow(format!("Balance of {} would exceed u64", account)))
    }

    fn next_event(&self, kind: AuditKind) -> Result<AuditEvent> {
        Ok(AuditEvent {
            seq: self.storage.next_seq()?,
            event_id: Uuid::now_v7(),
            timestamp_nanos: chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
            kind,
        })
    }

    fn commit(&self, mut mutation: Mutation, kind: AuditKind) -> Result<AuditEvent> {
        let event = self.next_event(kind)?;
        mutation.event = Some(event.clone());
        self.storage.commit(mutation)?;
        Ok(event)
    }

    // Balance ledger operations

    fn mint(&self, caller: &AccountId, account: &AccountId, amount: Amount) -> Result<AuditEvent> {
        self.ensure_admin(caller)?;
        Self::ensure_positive(amount)?;
        if account.is_malformed() {
            return Err(Error::InvalidRecipient(account.to_string()));
        }

        let new_balance = self.credit_balance(account, amount)?;
        let new_supply = self
            .storage
            .total_supply()?
            .checked_add(amount)
            .ok_or_else(|| Error::Overflow("Total supply would exceed u64".to_string()))?;

        self.commit(
            Mutation {
                balance_updates: vec![(account.clone(), new_balance)],
                new_supply: Some(new_supply),
                ..Default::default()
            },
            AuditKind::Transfer {
                from: AccountId::void(),
                to: account.clone(),
                amount,
            },
        )
    }

    fn burn(&self, caller: &AccountId, amount: Amount) -> Result<AuditEvent> {
        Self::ensure_positive(amount)?;

        let new_balance = self.debit_balance(caller, amount)?;
        let new_supply = self
            .storage
            .total_supply()?
            .checked_sub(amount)
            .ok_or_else(|| Error::Storage("Supply below burned amount".to_string()))?;

        self.commit(
            Mutation {
                balance_updates: vec![(caller.clone(), new_balance)],
                new_supply: Some(new_supply),
                ..Default::default()
            },
            AuditKind::Transfer {
                from: caller.clone(),
                to: AccountId::void(),
                amount,
            },
        )
    }

    fn transfer(&self, caller: &AccountId, to: &AccountId, amount: Amount) -> Result<AuditEvent> {
        Self::ensure_positive(amount)?;
        if to.is_malformed() {
            return Err(Error::InvalidRecipient(to.to_string()));
        }

        let balance_updates = self.move_balance(caller, to, amount)?;

        self.commit(
            Mutation {
                balance_updates,
                ..Default::default()
            },
            AuditKind::Transfer {
                from: caller.clone(),
                to: to.clone(),
                amount,
            },
        )
    }

    /// Compute the absolute balances after moving `amount` from `from` to `to`.
    /// A self-move only checks the balance and changes nothing.
    fn move_balance(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<Vec<(AccountId, Amount)>> {
        let new_from = self.debit_balance(from, amount)?;
        if from == to {
            return Ok(vec![]);
        }
        let new_to = self.credit_balance(to, amount)?;
        Ok(vec![(from.clone(), new_from), (to.clone(), new_to)])
    }

    // Rate & routing registry operations

    fn set_conversion_ratio(&self, caller: &AccountId, value: u64) -> Result<AuditEvent> {
        self.ensure_admin(caller)?;
        if value == 0 {
            return Err(Error::InvalidValue(
                "Conversion ratio must be non-zero".to_string(),
            ));
        }

        let old = self.storage.conversion_ratio()?;
        let event = self.commit(
            Mutation {
                new_ratio: Some(value),
                ..Default::default()
            },
            AuditKind::RatioChanged { old, new: value },
        )?;

        tracing::info!(old, new = value, "Conversion ratio changed");
        Ok(event)
    }

    fn set_token_pool(&self, caller: &AccountId, pool: AccountId) -> Result<AuditEvent> {
        self.ensure_admin(caller)?;
        if pool.is_malformed() {
            return Err(Error::InvalidValue(
                "Token pool must not be void or empty".to_string(),
            ));
        }

        let old = self.storage.token_pool()?;
        let event = self.commit(
            Mutation {
                new_token_pool: Some(pool.clone()),
                ..Default::default()
            },
            AuditKind::TokenPoolChanged {
                old,
                new: pool.clone(),
            },
        )?;

        tracing::info!(pool = %pool, "Token pool changed");
        Ok(event)
    }

    fn set_external_pool(&self, caller: &AccountId, pool: ExternalAddress) -> Result<AuditEvent> {
        self.ensure_admin(caller)?;
        if pool.as_str().is_empty() {
            return Err(Error::InvalidValue(
                "External pool must not be empty".to_string(),
            ));
        }

        let old = self.storage.external_pool()?;
        let event = self.commit(
            Mutation {
                new_external_pool: Some(pool.clone()),
                ..Default::default()
            },
            AuditKind::ExternalPoolChanged {
                old,
                new: pool.clone(),
            },
        )?;

        tracing::info!(pool = %pool, "External pool changed");
        Ok(event)
    }

    // Settlement workflows

    fn credit_deposit(
        &self,
        caller: &AccountId,
        reference: ReferenceId,
        customer: &AccountId,
        token_amount: Amount,
    ) -> Result<AuditEvent> {
        self.ensure_admin(caller)?;
        Self::ensure_positive(token_amount)?;
        if customer.is_malformed() {
            return Err(Error::InvalidRecipient(customer.to_string()));
        }

        let already_credited = self
            .storage
            .events_by_reference(&reference)?
            .iter()
            .any(|e| matches!(e.kind, AuditKind::DepositCredited { .. }));
        if already_credited {
            return Err(Error::DuplicateReference(reference.to_string()));
        }

        let pool = self.storage.token_pool()?;
        let balance_updates = self.move_balance(&pool, customer, token_amount)?;
        let ratio = self.storage.conversion_ratio()?;

        let event = self.commit(
            Mutation {
                balance_updates,
                ..Default::default()
            },
            AuditKind::DepositCredited {
                reference: reference.clone(),
                customer: customer.clone(),
                token_amount,
                ratio,
            },
        )?;

        tracing::info!(
            reference = %reference,
            customer = %customer,
            token_amount,
            ratio,
            "Deposit credited"
        );
        Ok(event)
    }

    fn claim_external_payout(
        &self,
        caller: &AccountId,
        token_amount: Amount,
        external_address: ExternalAddress,
    ) -> Result<AuditEvent> {
        Self::ensure_positive(token_amount)?;
        if external_address.as_str().is_empty() {
            return Err(Error::InvalidValue(
                "External destination address must not be empty".to_string(),
            ));
        }

        let pool = self.storage.token_pool()?;
        let balance_updates = self.move_balance(caller, &pool, token_amount)?;

        let event = self.commit(
            Mutation {
                balance_updates,
                ..Default::default()
            },
            AuditKind::PayoutRequested {
                customer: caller.clone(),
                external_address: external_address.clone(),
                token_amount,
            },
        )?;

        tracing::info!(
            customer = %caller,
            external_address = %external_address,
            token_amount,
            "Payout requested"
        );
        Ok(event)
    }

    fn confirm_payout(
        &self,
        caller: &AccountId,
        reference: ReferenceId,
        customer: &AccountId,
        external_amount: u64,
    ) -> Result<AuditEvent> {
        self.ensure_admin(caller)?;

        let already_confirmed = self
            .storage
            .events_by_reference(&reference)?
            .iter()
            .any(|e| matches!(e.kind, AuditKind::PayoutConfirmed { .. }));
        if already_confirmed {
            return Err(Error::DuplicateReference(reference.to_string()));
        }

        let ratio = self.storage.conversion_ratio()?;

        // Pure audit record; the tokens moved when the claim was recorded
        let event = self.commit(
            Mutation::default(),
            AuditKind::PayoutConfirmed {
                reference: reference.clone(),
                customer: customer.clone(),
                external_amount,
                ratio,
            },
        )?;

        tracing::info!(
            reference = %reference,
            customer = %customer,
            external_amount,
            ratio,
            "Payout confirmed"
        );
        Ok(event)
    }
}

/// Handle for sending commands to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerCommand>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerCommand>) -> Self {
        Self { sender }
    }

    async fn dispatch<F>(&self, make: F) -> Result<AuditEvent>
    where
        F: FnOnce(oneshot::Sender<Result<AuditEvent>>) -> LedgerCommand,
    {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Mint tokens to an account
    pub async fn mint(
        &self,
        caller: AccountId,
        account: AccountId,
        amount: Amount,
    ) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::Mint {
            caller,
            account,
            amount,
            respond,
        })
        .await
    }

    /// Burn caller's tokens
    pub async fn burn(&self, caller: AccountId, amount: Amount) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::Burn {
            caller,
            amount,
            respond,
        })
        .await
    }

    /// Transfer tokens
    pub async fn transfer(
        &self,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::Transfer {
            caller,
            to,
            amount,
            respond,
        })
        .await
    }

    /// Replace the conversion ratio
    pub async fn set_conversion_ratio(
        &self,
        caller: AccountId,
        value: u64,
    ) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::SetConversionRatio {
            caller,
            value,
            respond,
        })
        .await
    }

    /// Replace the token pool account
    pub async fn set_token_pool(&self, caller: AccountId, pool: AccountId) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::SetTokenPool {
            caller,
            pool,
            respond,
        })
        .await
    }

    /// Replace the external pool address
    pub async fn set_external_pool(
        &self,
        caller: AccountId,
        pool: ExternalAddress,
    ) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::SetExternalPool {
            caller,
            pool,
            respond,
        })
        .await
    }

    /// Credit a customer for an external deposit
    pub async fn credit_deposit(
        &self,
        caller: AccountId,
        reference: ReferenceId,
        customer: AccountId,
        token_amount: Amount,
    ) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::CreditDeposit {
            caller,
            reference,
            customer,
            token_amount,
            respond,
        })
        .await
    }

    /// Surrender tokens and request an external payout
    pub async fn claim_external_payout(
        &self,
        caller: AccountId,
        token_amount: Amount,
        external_address: ExternalAddress,
    ) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::ClaimExternalPayout {
            caller,
            token_amount,
            external_address,
            respond,
        })
        .await
    }

    /// Record an external payout confirmation
    pub async fn confirm_payout(
        &self,
        caller: AccountId,
        reference: ReferenceId,
        customer: AccountId,
        external_amount: u64,
    ) -> Result<AuditEvent> {
        self.dispatch(|respond| LedgerCommand::ConfirmPayout {
            caller,
            reference,
            customer,
            external_amount,
            respond,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerCommand::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(storage: Arc<Storage>, metrics: Metrics) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
