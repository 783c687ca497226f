//! Error types for the swap ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every failure is synchronous and all-or-nothing: a failing operation
/// leaves no partial state change behind.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller is not the administrator
    #[error("Unauthorized: caller {0} is not the administrator")]
    Unauthorized(String),

    /// Attempted debit exceeds the holding
    #[error("Insufficient balance: account {account} holds {balance}, requested {requested}")]
    InsufficientBalance {
        /// Debited account
        account: String,
        /// Current balance
        balance: u64,
        /// Requested debit
        requested: u64,
    },

    /// Transfer destination cannot receive funds
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Malformed argument
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Arithmetic bound exceeded
    #[error("Overflow: {0}")]
    Overflow(String),

    /// A settlement event of this kind already exists for the reference
    #[error("Duplicate reference: {0} was already processed")]
    DuplicateReference(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
