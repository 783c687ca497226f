//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Balance table (key: account id)
//! - `meta` - Registry singletons (supply, ratio, pools, admin, next_seq)
//! - `events` - Append-only audit log (key: big-endian seq)
//! - `idx_reference` - Secondary index len(reference_id) || reference_id || seq
//! - `idx_customer` - Secondary index len(customer) || customer || seq
//!
//! A [`Mutation`] commits balance changes, registry changes and the audit
//! event in a single `WriteBatch`: an observer never sees an event without
//! its state change or vice versa.

use crate::{
    error::{Error, Result},
    types::{AccountId, Amount, AuditEvent, ExternalAddress, ReferenceId},
    Config,
};
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::Arc;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_META: &str = "meta";
const CF_EVENTS: &str = "events";
const CF_IDX_REFERENCE: &str = "idx_reference";
const CF_IDX_CUSTOMER: &str = "idx_customer";

/// Meta keys
const META_SUPPLY: &[u8] = b"supply";
const META_RATIO: &[u8] = b"ratio";
const META_TOKEN_POOL: &[u8] = b"token_pool";
const META_EXTERNAL_POOL: &[u8] = b"external_pool";
const META_ADMIN: &[u8] = b"admin";
const META_NEXT_SEQ: &[u8] = b"next_seq";

/// Atomic state transition: balance/registry updates plus the audit event
/// that records them
#[derive(Debug, Default)]
pub struct Mutation {
    /// Absolute new balances (not deltas)
    pub balance_updates: Vec<(AccountId, Amount)>,

    /// New total supply, if changed
    pub new_supply: Option<Amount>,

    /// New conversion ratio, if changed
    pub new_ratio: Option<u64>,

    /// New token pool, if changed
    pub new_token_pool: Option<AccountId>,

    /// New external pool, if changed
    pub new_external_pool: Option<ExternalAddress>,

    /// Audit event emitted by this transition
    pub event: Option<AuditEvent>,
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.db.path()).finish()
    }
}

impl Storage {
    /// Open or create database, seeding genesis state on first open
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_META, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_events()),
            ColumnFamilyDescriptor::new(CF_IDX_REFERENCE, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_IDX_CUSTOMER, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let storage = Self { db: Arc::new(db) };
        storage.seed_genesis(config)?;

        tracing::info!("Opened swap-ledger storage at {:?}", path);

        Ok(storage)
    }

    fn cf_options_events() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // Balances and registry are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    /// Write genesis registry values unless the ledger was opened before
    fn seed_genesis(&self, config: &Config) -> Result<()> {
        let cf = self.cf_handle(CF_META)?;

        if self.db.get_cf(&cf, META_ADMIN)?.is_some() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, META_ADMIN, bincode::serialize(&config.admin)?);
        batch.put_cf(&cf, META_TOKEN_POOL, bincode::serialize(&config.token_pool)?);
        batch.put_cf(
            &cf,
            META_EXTERNAL_POOL,
            bincode::serialize(&config.external_pool)?,
        );
        batch.put_cf(&cf, META_RATIO, bincode::serialize(&config.initial_ratio)?);
        batch.put_cf(&cf, META_SUPPLY, bincode::serialize(&0u64)?);
        batch.put_cf(&cf, META_NEXT_SEQ, bincode::serialize(&0u64)?);
        self.db.write(batch)?;

        tracing::info!(
            admin = %config.admin,
            token_pool = %config.token_pool,
            ratio = config.initial_ratio,
            "Seeded genesis registry"
        );

        Ok(())
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn get_meta<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<T> {
        let cf = self.cf_handle(CF_META)?;
        let value = self.db.get_cf(&cf, key)?.ok_or_else(|| {
            Error::Storage(format!("Meta key {} missing", String::from_utf8_lossy(key)))
        })?;
        Ok(bincode::deserialize(&value)?)
    }

    // Registry reads

    /// Administrator account
    pub fn admin(&self) -> Result<AccountId> {
        self.get_meta(META_ADMIN)
    }

    /// Current conversion ratio
    pub fn conversion_ratio(&self) -> Result<u64> {
        self.get_meta(META_RATIO)
    }

    /// Current token pool account
    pub fn token_pool(&self) -> Result<AccountId> {
        self.get_meta(META_TOKEN_POOL)
    }

    /// Current external pool address
    pub fn external_pool(&self) -> Result<ExternalAddress> {
        self.get_meta(META_EXTERNAL_POOL)
    }

    /// Total token supply
    pub fn total_supply(&self) -> Result<Amount> {
        self.get_meta(META_SUPPLY)
    }

    /// Log position the next event will take
    pub fn next_seq(&self) -> Result<u64> {
        self.get_meta(META_NEXT_SEQ)
    }

    // Balance reads

    /// Account balance; an account that never held funds reads as zero
    pub fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(&cf, account.as_str().as_bytes())? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(0),
        }
    }

    /// Sum all balances and compare with the recorded supply
    pub fn verify_conservation(&self) -> Result<bool> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;

        let mut sum: u64 = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            let balance: Amount = bincode::deserialize(&value)?;
            sum = sum
                .checked_add(balance)
                .ok_or_else(|| Error::Overflow("Balance sum exceeds u64".to_string()))?;
        }

        Ok(sum == self.total_supply()?)
    }

    // Event reads

    /// Get event by log position
    pub fn get_event(&self, seq: u64) -> Result<AuditEvent> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let value = self
            .db
            .get_cf(&cf, seq.to_be_bytes())?
            .ok_or_else(|| Error::Storage(format!("Event {} not found", seq)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Position of the most recent event, if any
    pub fn latest_seq(&self) -> Result<Option<u64>> {
        let next = self.next_seq()?;
        Ok(next.checked_sub(1))
    }

    /// Contiguous range scan over [from_seq, to_seq], both inclusive
    pub fn events_in_range(&self, from_seq: u64, to_seq: u64) -> Result<Vec<AuditEvent>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let mut events = Vec::new();

        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(&from_seq.to_be_bytes(), rocksdb::Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            let key_bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Malformed event key".to_string()))?;
            if u64::from_be_bytes(key_bytes) > to_seq {
                break;
            }
            events.push(bincode::deserialize(&value)?);
        }

        Ok(events)
    }

    /// All events carrying the given reference, in log order
    pub fn events_by_reference(&self, reference: &ReferenceId) -> Result<Vec<AuditEvent>> {
        self.scan_index(CF_IDX_REFERENCE, reference.as_str().as_bytes())
    }

    /// All events concerning the given account, in log order
    pub fn events_by_customer(&self, customer: &AccountId) -> Result<Vec<AuditEvent>> {
        self.scan_index(CF_IDX_CUSTOMER, customer.as_str().as_bytes())
    }

    fn scan_index(&self, cf_name: &str, id: &[u8]) -> Result<Vec<AuditEvent>> {
        let cf = self.cf_handle(cf_name)?;
        let prefix = Self::index_prefix(id);

        let mut events = Vec::new();
        let iter = self.db.prefix_iterator_cf(&cf, &prefix);
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            // Seq suffix is the last 8 bytes
            if key.len() != prefix.len() + 8 {
                return Err(Error::Storage("Malformed index key".to_string()));
            }
            let seq_bytes: [u8; 8] = key[key.len() - 8..]
                .try_into()
                .map_err(|_| Error::Storage("Malformed index key".to_string()))?;
            events.push(self.get_event(u64::from_be_bytes(seq_bytes))?);
        }

        Ok(events)
    }

    /// Index keys are length-prefixed so ids remain unconstrained strings:
    /// an id can never be a key-prefix of a different id.
    fn index_prefix(id: &[u8]) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(4 + id.len());
        prefix.extend_from_slice(&(id.len() as u32).to_be_bytes());
        prefix.extend_from_slice(id);
        prefix
    }

    fn index_key(id: &[u8], seq: u64) -> Vec<u8> {
        let mut key = Self::index_prefix(id);
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    // Writes

    /// Commit a state transition atomically
    ///
    /// The event seq must equal the stored next_seq; the single-writer actor
    /// is the only caller, so a mismatch indicates corruption.
    pub fn commit(&self, mutation: Mutation) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        for (account, balance) in &mutation.balance_updates {
            batch.put_cf(
                &cf_accounts,
                account.as_str().as_bytes(),
                bincode::serialize(balance)?,
            );
        }

        let cf_meta = self.cf_handle(CF_META)?;
        if let Some(supply) = mutation.new_supply {
            batch.put_cf(&cf_meta, META_SUPPLY, bincode::serialize(&supply)?);
        }
        if let Some(ratio) = mutation.new_ratio {
            batch.put_cf(&cf_meta, META_RATIO, bincode::serialize(&ratio)?);
        }
        if let Some(ref pool) = mutation.new_token_pool {
            batch.put_cf(&cf_meta, META_TOKEN_POOL, bincode::serialize(pool)?);
        }
        if let Some(ref pool) = mutation.new_external_pool {
            batch.put_cf(&cf_meta, META_EXTERNAL_POOL, bincode::serialize(pool)?);
        }

        if let Some(ref event) = mutation.event {
            let expected = self.next_seq()?;
            if event.seq != expected {
                return Err(Error::Storage(format!(
                    "Event seq {} does not match log position {}",
                    event.seq, expected
                )));
            }

            let cf_events = self.cf_handle(CF_EVENTS)?;
            batch.put_cf(&cf_events, event.seq.to_be_bytes(), bincode::serialize(event)?);
            batch.put_cf(&cf_meta, META_NEXT_SEQ, bincode::serialize(&(event.seq + 1))?);

            let cf_idx_ref = self.cf_handle(CF_IDX_REFERENCE)?;
            if let Some(reference) = event.reference() {
                let key = Self::index_key(reference.as_str().as_bytes(), event.seq);
                batch.put_cf(&cf_idx_ref, &key, b"");
            }

            let cf_idx_cust = self.cf_handle(CF_IDX_CUSTOMER)?;
            for customer in event.customers() {
                let key = Self::index_key(customer.as_str().as_bytes(), event.seq);
                batch.put_cf(&cf_idx_cust, &key, b"");
            }

            tracing::debug!(seq = event.seq, event_id = %event.event_id, "Event appended");
        }

        self.db.write(batch)?;

        Ok(())
    }
}
