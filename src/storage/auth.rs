// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Authentication state: used signatures, wallet blacklist, sessions.
//!
//! The used-signature insert is the critical section of the replay guard:
//! check and insert happen inside one write transaction, so a signature can
//! be marked used at most once across concurrent logins.

use chrono::{DateTime, Duration, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::{
    StorageError, StorageResult, Store, USED_SIGNATURES, USER_SESSIONS, WALLET_BLACKLIST,
    WALLET_SESSIONS,
};

/// Blacklist entry; absence of a non-expired entry means "not blacklisted".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub address: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Proof of wallet control, bound to one address. Never mutated; expires or
/// is revoked when the wallet is blacklisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSessionRecord {
    pub token: String,
    pub wallet_address: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Full account login session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSessionRecord {
    pub token: String,
    pub user_id: u64,
    pub username: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Repository for authentication state.
pub struct AuthRepository<'a> {
    store: &'a Store,
}

impl<'a> AuthRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    // =========================================================================
    // Used signatures (replay guard)
    // =========================================================================

    pub fn is_signature_used(&self, signature: &str) -> StorageResult<bool> {
        let read_txn = self.store.db.begin_read()?;
        let table = read_txn.open_table(USED_SIGNATURES)?;
        Ok(table.get(signature)?.is_some())
    }

    /// Record a signature as used, atomically with the existence check.
    ///
    /// Returns `AlreadyExists` if the signature was used before; the caller
    /// must treat that as a replay, not as success.
    pub fn mark_signature_used(&self, signature: &str) -> StorageResult<()> {
        let write_txn = self.store.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USED_SIGNATURES)?;
            if table.get(signature)?.is_some() {
                return Err(StorageError::AlreadyExists("signature".to_string()));
            }
            table.insert(signature, Utc::now().timestamp())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Wallet blacklist
    // =========================================================================

    pub fn is_wallet_blacklisted(&self, address: &str) -> StorageResult<bool> {
        let key = address.to_lowercase();
        let read_txn = self.store.db.begin_read()?;
        let table = read_txn.open_table(WALLET_BLACKLIST)?;
        match table.get(key.as_str())? {
            Some(bytes) => {
                let entry: BlacklistEntry = serde_json::from_slice(bytes.value())?;
                Ok(entry.expires_at > Utc::now())
            }
            None => Ok(false),
        }
    }

    /// Blacklist a wallet and revoke all of its live wallet sessions.
    pub fn blacklist_wallet(
        &self,
        address: &str,
        reason: &str,
        ttl: Duration,
    ) -> StorageResult<()> {
        let key = address.to_lowercase();
        let now = Utc::now();
        let entry = BlacklistEntry {
            address: key.clone(),
            reason: reason.to_string(),
            created_at: now,
            expires_at: now + ttl,
        };
        let json = serde_json::to_vec(&entry)?;

        let write_txn = self.store.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLET_BLACKLIST)?;
            table.insert(key.as_str(), json.as_slice())?;

            // Revoke sessions for the banned wallet
            let mut sessions = write_txn.open_table(WALLET_SESSIONS)?;
            let mut revoked = Vec::new();
            for session_entry in sessions.iter()? {
                let (token, bytes) = session_entry?;
                let record: WalletSessionRecord = serde_json::from_slice(bytes.value())?;
                if record.wallet_address.eq_ignore_ascii_case(address) {
                    revoked.push(token.value().to_string());
                }
            }
            for token in revoked {
                sessions.remove(token.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub fn save_wallet_session(&self, record: &WalletSessionRecord) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.store.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLET_SESSIONS)?;
            table.insert(record.token.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a wallet session; expired sessions read as not found.
    pub fn get_wallet_session(&self, token: &str) -> StorageResult<WalletSessionRecord> {
        let read_txn = self.store.db.begin_read()?;
        let table = read_txn.open_table(WALLET_SESSIONS)?;
        match table.get(token)? {
            Some(bytes) => {
                let record: WalletSessionRecord = serde_json::from_slice(bytes.value())?;
                if record.expires_at <= Utc::now() {
                    return Err(StorageError::NotFound("wallet session".to_string()));
                }
                Ok(record)
            }
            None => Err(StorageError::NotFound("wallet session".to_string())),
        }
    }

    pub fn save_user_session(&self, record: &UserSessionRecord) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.store.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_SESSIONS)?;
            table.insert(record.token.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_user_session(&self, token: &str) -> StorageResult<UserSessionRecord> {
        let read_txn = self.store.db.begin_read()?;
        let table = read_txn.open_table(USER_SESSIONS)?;
        match table.get(token)? {
            Some(bytes) => {
                let record: UserSessionRecord = serde_json::from_slice(bytes.value())?;
                if record.expires_at <= Utc::now() {
                    return Err(StorageError::NotFound("user session".to_string()));
                }
                Ok(record)
            }
            None => Err(StorageError::NotFound("user session".to_string())),
        }
    }

    /// Delete expired wallet sessions, user sessions, and blacklist entries.
    /// Returns the number of rows removed.
    pub fn cleanup_expired(&self) -> StorageResult<usize> {
        let now = Utc::now();
        let mut removed = 0;

        let write_txn = self.store.db.begin_write()?;
        {
            let mut wallet_sessions = write_txn.open_table(WALLET_SESSIONS)?;
            removed += remove_expired(&mut wallet_sessions, |bytes| {
                serde_json::from_slice::<WalletSessionRecord>(bytes)
                    .map(|r| r.expires_at <= now)
                    .unwrap_or(true)
            })?;

            let mut user_sessions = write_txn.open_table(USER_SESSIONS)?;
            removed += remove_expired(&mut user_sessions, |bytes| {
                serde_json::from_slice::<UserSessionRecord>(bytes)
                    .map(|r| r.expires_at <= now)
                    .unwrap_or(true)
            })?;

            let mut blacklist = write_txn.open_table(WALLET_BLACKLIST)?;
            removed += remove_expired(&mut blacklist, |bytes| {
                serde_json::from_slice::<BlacklistEntry>(bytes)
                    .map(|e| e.expires_at <= now)
                    .unwrap_or(true)
            })?;
        }
        write_txn.commit()?;
        Ok(removed)
    }
}

fn remove_expired<F>(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    is_expired: F,
) -> StorageResult<usize>
where
    F: Fn(&[u8]) -> bool,
{
    let mut stale = Vec::new();
    for entry in table.iter()? {
        let (key, bytes) = entry?;
        if is_expired(bytes.value()) {
            stale.push(key.value().to_string());
        }
    }
    let count = stale.len();
    for key in stale {
        table.remove(key.as_str())?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::temp_store;

    #[test]
    fn signature_marked_once_then_rejected() {
        let (store, _dir) = temp_store();
        let repo = AuthRepository::new(&store);

        assert!(!repo.is_signature_used("0xsig").unwrap());
        repo.mark_signature_used("0xsig").unwrap();
        assert!(repo.is_signature_used("0xsig").unwrap());

        let err = repo.mark_signature_used("0xsig").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn signature_rejection_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.redb");

        {
            let store = Store::open(&path).unwrap();
            AuthRepository::new(&store)
                .mark_signature_used("0xsig")
                .unwrap();
        }

        let store = Store::open(&path).unwrap();
        let repo = AuthRepository::new(&store);
        assert!(repo.is_signature_used("0xsig").unwrap());
        assert!(matches!(
            repo.mark_signature_used("0xsig"),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn blacklist_is_case_insensitive_and_expires() {
        let (store, _dir) = temp_store();
        let repo = AuthRepository::new(&store);

        repo.blacklist_wallet("0xABCD", "abuse", Duration::hours(1))
            .unwrap();
        assert!(repo.is_wallet_blacklisted("0xabcd").unwrap());
        assert!(repo.is_wallet_blacklisted("0xABCD").unwrap());

        // An entry that expired in the past reads as not blacklisted.
        repo.blacklist_wallet("0xold", "old ban", Duration::hours(-1))
            .unwrap();
        assert!(!repo.is_wallet_blacklisted("0xold").unwrap());
    }

    #[test]
    fn blacklisting_revokes_wallet_sessions() {
        let (store, _dir) = temp_store();
        let repo = AuthRepository::new(&store);

        let record = WalletSessionRecord {
            token: "tok-1".to_string(),
            wallet_address: "0xABCD".to_string(),
            expires_at: Utc::now() + Duration::hours(24),
            created_at: Utc::now(),
        };
        repo.save_wallet_session(&record).unwrap();
        repo.get_wallet_session("tok-1").unwrap();

        repo.blacklist_wallet("0xabcd", "abuse", Duration::hours(1))
            .unwrap();
        assert!(matches!(
            repo.get_wallet_session("tok-1"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn expired_sessions_read_as_not_found_and_get_swept() {
        let (store, _dir) = temp_store();
        let repo = AuthRepository::new(&store);

        let expired = WalletSessionRecord {
            token: "tok-old".to_string(),
            wallet_address: "0x1".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
            created_at: Utc::now() - Duration::hours(25),
        };
        let live = WalletSessionRecord {
            token: "tok-live".to_string(),
            wallet_address: "0x2".to_string(),
            expires_at: Utc::now() + Duration::hours(24),
            created_at: Utc::now(),
        };
        repo.save_wallet_session(&expired).unwrap();
        repo.save_wallet_session(&live).unwrap();

        assert!(matches!(
            repo.get_wallet_session("tok-old"),
            Err(StorageError::NotFound(_))
        ));

        let removed = repo.cleanup_expired().unwrap();
        assert_eq!(removed, 1);
        repo.get_wallet_session("tok-live").unwrap();
    }
}
