// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Embedded persistence backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `tips`: tip_id → serialized StoredTip
//! - `tip_streamer_index`: composite key (username|!id_be) → tip_id
//! - `used_signatures`: signature → unix timestamp of first use
//! - `wallet_blacklist`: lowercase address → serialized BlacklistEntry
//! - `wallet_sessions`: token → serialized WalletSessionRecord
//! - `user_sessions`: token → serialized UserSessionRecord
//! - `users`: username → serialized StoredUser
//! - `user_wallet_index`: lowercase wallet address → username
//! - `user_widget_index`: widget token → username
//! - `meta`: counter key → next id
//!
//! The used-signature table doubles as the replay guard: marking a signature
//! used is a check-and-insert inside a single write transaction, so two
//! concurrent logins with the same signature cannot both succeed.

pub mod auth;
pub mod tips;
pub mod users;

use std::path::Path;

use redb::{Database, TableDefinition};

/// Primary tip table: tip_id → serialized StoredTip (JSON bytes).
pub(crate) const TIPS: TableDefinition<u64, &[u8]> = TableDefinition::new("tips");

/// Index: composite key → tip_id.
/// Key format: `username|!id_be` for descending-id range scans.
pub(crate) const TIP_STREAMER_INDEX: TableDefinition<&[u8], u64> =
    TableDefinition::new("tip_streamer_index");

/// Replay guard: signature → unix seconds of first use.
pub(crate) const USED_SIGNATURES: TableDefinition<&str, i64> =
    TableDefinition::new("used_signatures");

/// Blacklist: lowercase address → serialized BlacklistEntry.
pub(crate) const WALLET_BLACKLIST: TableDefinition<&str, &[u8]> =
    TableDefinition::new("wallet_blacklist");

/// Wallet sessions: token → serialized WalletSessionRecord.
pub(crate) const WALLET_SESSIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("wallet_sessions");

/// User sessions: token → serialized UserSessionRecord.
pub(crate) const USER_SESSIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("user_sessions");

/// Users: username → serialized StoredUser.
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Map: lowercase wallet address → username.
pub(crate) const USER_WALLET_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("user_wallet_index");

/// Map: widget token → username.
pub(crate) const USER_WIDGET_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("user_widget_index");

/// Counters: key → next id (e.g. "next_tip_id").
pub(crate) const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Embedded ACID store shared by handlers and background tasks.
pub struct Store {
    pub(crate) db: Database,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TIPS)?;
            let _ = write_txn.open_table(TIP_STREAMER_INDEX)?;
            let _ = write_txn.open_table(USED_SIGNATURES)?;
            let _ = write_txn.open_table(WALLET_BLACKLIST)?;
            let _ = write_txn.open_table(WALLET_SESSIONS)?;
            let _ = write_txn.open_table(USER_SESSIONS)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_WALLET_INDEX)?;
            let _ = write_txn.open_table(USER_WIDGET_INDEX)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::Store;
    use std::sync::Arc;

    /// Open a store in a fresh temp directory, keeping the directory alive
    /// for the test's duration.
    pub fn temp_store() -> (Arc<Store>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Store::open(&dir.path().join("streamtip.redb")).expect("open store");
        (Arc::new(store), dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::ReadableDatabase;

    #[test]
    fn open_creates_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("db.redb")).unwrap();

        // A read transaction on a fresh database must see every table.
        let read_txn = store.db.begin_read().unwrap();
        assert!(read_txn.open_table(TIPS).is_ok());
        assert!(read_txn.open_table(USED_SIGNATURES).is_ok());
        assert!(read_txn.open_table(USERS).is_ok());
        assert!(read_txn.open_table(META).is_ok());
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.redb");

        {
            let store = Store::open(&path).unwrap();
            let txn = store.db.begin_write().unwrap();
            {
                let mut table = txn.open_table(META).unwrap();
                table.insert("next_tip_id", 42u64).unwrap();
            }
            txn.commit().unwrap();
        }

        let store = Store::open(&path).unwrap();
        let read_txn = store.db.begin_read().unwrap();
        let table = read_txn.open_table(META).unwrap();
        assert_eq!(table.get("next_tip_id").unwrap().unwrap().value(), 42);
    }
}
