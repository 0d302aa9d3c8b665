//! Persistence
//!
//! Per-account data behind a pluggable key-value backend.

pub mod account;
pub mod kv;

pub use account::{
    AccountData, AccountKey, AccountStore, Inclusion, OnChainAction, TxMetadata, TxStatus, TxUpdate,
};
pub use kv::{FileStore, KeyValueStore, MemoryStore, StorageError};
