// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Tip repository.
//!
//! A tip is created `pending` at submission time and moved exactly once to a
//! terminal state (`confirmed` or `failed`) by the transaction monitor.
//! [`TipRepository::mark_terminal`] enforces that transition inside a single
//! write transaction, so a poll result racing the overall timeout cannot
//! produce two terminal writes (and therefore cannot double-fire the overlay
//! notification).

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::{StorageError, StorageResult, Store, META, TIPS, TIP_STREAMER_INDEX};

const NEXT_TIP_ID: &str = "next_tip_id";

/// Tip lifecycle state. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipStatus::Pending => "pending",
            TipStatus::Confirmed => "confirmed",
            TipStatus::Failed => "failed",
        }
    }
}

/// One tip, keyed by its assigned numeric id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTip {
    pub id: u64,
    /// Username of the recipient streamer.
    pub streamer_id: String,
    /// Display name of the tipper (possibly an ENS-style name).
    pub sender: String,
    pub message: String,
    pub amount: String,
    pub asset: String,
    pub tx_hash: String,
    /// Chain the transaction landed on; drives adapter selection.
    pub chain_id: String,
    pub source_chain: String,
    pub dest_chain: String,
    /// Wallet that must match the on-chain sender.
    pub source_address: String,
    pub dest_address: String,
    pub status: TipStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by tip intake; id and status are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewTip {
    pub streamer_id: String,
    pub sender: String,
    pub message: String,
    pub amount: String,
    pub asset: String,
    pub tx_hash: String,
    pub chain_id: String,
    pub source_chain: String,
    pub dest_chain: String,
    pub source_address: String,
    pub dest_address: String,
}

/// Build the composite index key `username|!id_be`.
///
/// The inverted id gives newest-first ordering when scanning forward.
fn make_index_key(streamer_id: &str, tip_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(streamer_id.len() + 1 + 8);
    key.extend_from_slice(streamer_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!tip_id).to_be_bytes());
    key
}

fn make_prefix(streamer_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(streamer_id.len() + 1);
    prefix.extend_from_slice(streamer_id.as_bytes());
    prefix.push(b'|');
    prefix
}

fn make_prefix_end(streamer_id: &str) -> Vec<u8> {
    let mut end = make_prefix(streamer_id);
    end.extend_from_slice(&[0xFF; 9]);
    end
}

/// Repository for tip operations.
pub struct TipRepository<'a> {
    store: &'a Store,
}

impl<'a> TipRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Persist a new tip as `pending` and assign its id.
    pub fn create(&self, new_tip: NewTip) -> StorageResult<StoredTip> {
        let write_txn = self.store.db.begin_write()?;
        let tip = {
            let mut meta = write_txn.open_table(META)?;
            let id = meta.get(NEXT_TIP_ID)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(NEXT_TIP_ID, id + 1)?;
            drop(meta);

            let tip = StoredTip {
                id,
                streamer_id: new_tip.streamer_id,
                sender: new_tip.sender,
                message: new_tip.message,
                amount: new_tip.amount,
                asset: new_tip.asset,
                tx_hash: new_tip.tx_hash,
                chain_id: new_tip.chain_id,
                source_chain: new_tip.source_chain,
                dest_chain: new_tip.dest_chain,
                source_address: new_tip.source_address,
                dest_address: new_tip.dest_address,
                status: TipStatus::Pending,
                created_at: Utc::now(),
            };

            let json = serde_json::to_vec(&tip)?;
            let mut tips = write_txn.open_table(TIPS)?;
            tips.insert(id, json.as_slice())?;
            drop(tips);

            let mut index = write_txn.open_table(TIP_STREAMER_INDEX)?;
            index.insert(make_index_key(&tip.streamer_id, id).as_slice(), id)?;

            tip
        };
        write_txn.commit()?;
        Ok(tip)
    }

    /// Get a tip by id.
    pub fn get(&self, tip_id: u64) -> StorageResult<StoredTip> {
        let read_txn = self.store.db.begin_read()?;
        let tips = read_txn.open_table(TIPS)?;
        match tips.get(tip_id)? {
            Some(bytes) => Ok(serde_json::from_slice(bytes.value())?),
            None => Err(StorageError::NotFound(format!("Tip {tip_id}"))),
        }
    }

    /// Move a pending tip to a terminal state.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// tip was already terminal. Callers must only act on the notification
    /// side effect when `true` is returned.
    pub fn mark_terminal(&self, tip_id: u64, status: TipStatus) -> StorageResult<bool> {
        debug_assert!(status != TipStatus::Pending);

        let write_txn = self.store.db.begin_write()?;
        let transitioned = {
            let mut tips = write_txn.open_table(TIPS)?;
            let mut tip: StoredTip = match tips.get(tip_id)? {
                Some(bytes) => serde_json::from_slice(bytes.value())?,
                None => return Err(StorageError::NotFound(format!("Tip {tip_id}"))),
            };

            if tip.status != TipStatus::Pending {
                false
            } else {
                tip.status = status;
                let json = serde_json::to_vec(&tip)?;
                tips.insert(tip_id, json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(transitioned)
    }

    /// All tips still pending. Used by the startup recovery pass to re-attach
    /// monitors after a restart.
    pub fn list_pending(&self) -> StorageResult<Vec<StoredTip>> {
        let read_txn = self.store.db.begin_read()?;
        let tips = read_txn.open_table(TIPS)?;

        let mut pending = Vec::new();
        for entry in tips.iter()? {
            let (_, bytes) = entry?;
            let tip: StoredTip = serde_json::from_slice(bytes.value())?;
            if tip.status == TipStatus::Pending {
                pending.push(tip);
            }
        }
        Ok(pending)
    }

    /// Page through a streamer's tips, newest first.
    ///
    /// `cursor` of 0 starts at the newest tip; otherwise only tips with
    /// `id < cursor` are returned.
    pub fn list_by_streamer(
        &self,
        streamer_id: &str,
        limit: usize,
        cursor: u64,
    ) -> StorageResult<Vec<StoredTip>> {
        let read_txn = self.store.db.begin_read()?;
        let index = read_txn.open_table(TIP_STREAMER_INDEX)?;
        let tips = read_txn.open_table(TIPS)?;

        let start = if cursor > 0 {
            // id < cursor  <=>  !id >= !(cursor - 1) under the inverted encoding
            make_index_key(streamer_id, cursor - 1)
        } else {
            make_prefix(streamer_id)
        };
        let end = make_prefix_end(streamer_id);

        let mut out = Vec::with_capacity(limit);
        for entry in index.range(start.as_slice()..end.as_slice())? {
            if out.len() >= limit {
                break;
            }
            let (_, id) = entry?;
            if let Some(bytes) = tips.get(id.value())? {
                out.push(serde_json::from_slice(bytes.value())?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::temp_store;

    fn sample_tip(streamer: &str) -> NewTip {
        NewTip {
            streamer_id: streamer.to_string(),
            sender: "bob.eth".to_string(),
            message: "great stream, keep it up!".to_string(),
            amount: "5".to_string(),
            asset: "USDC".to_string(),
            tx_hash: "0x1234".to_string(),
            chain_id: "8453".to_string(),
            source_chain: "Base".to_string(),
            dest_chain: "Base".to_string(),
            source_address: "0xabc".to_string(),
            dest_address: "0xdef".to_string(),
        }
    }

    #[test]
    fn create_assigns_sequential_ids_and_pending_status() {
        let (store, _dir) = temp_store();
        let repo = TipRepository::new(&store);

        let first = repo.create(sample_tip("alice")).unwrap();
        let second = repo.create(sample_tip("alice")).unwrap();

        assert_eq!(first.status, TipStatus::Pending);
        assert_eq!(second.id, first.id + 1);
    }

    #[test]
    fn mark_terminal_transitions_exactly_once() {
        let (store, _dir) = temp_store();
        let repo = TipRepository::new(&store);
        let tip = repo.create(sample_tip("alice")).unwrap();

        assert!(repo.mark_terminal(tip.id, TipStatus::Confirmed).unwrap());
        // Second transition attempt is a no-op, regardless of target state.
        assert!(!repo.mark_terminal(tip.id, TipStatus::Failed).unwrap());

        let stored = repo.get(tip.id).unwrap();
        assert_eq!(stored.status, TipStatus::Confirmed);
    }

    #[test]
    fn list_pending_skips_terminal_tips() {
        let (store, _dir) = temp_store();
        let repo = TipRepository::new(&store);

        let a = repo.create(sample_tip("alice")).unwrap();
        let b = repo.create(sample_tip("alice")).unwrap();
        repo.mark_terminal(a.id, TipStatus::Failed).unwrap();

        let pending = repo.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }

    #[test]
    fn list_by_streamer_pages_newest_first() {
        let (store, _dir) = temp_store();
        let repo = TipRepository::new(&store);

        for _ in 0..5 {
            repo.create(sample_tip("alice")).unwrap();
        }
        repo.create(sample_tip("carol")).unwrap();

        let first_page = repo.list_by_streamer("alice", 3, 0).unwrap();
        assert_eq!(first_page.len(), 3);
        assert!(first_page[0].id > first_page[1].id);

        let cursor = first_page.last().unwrap().id;
        let second_page = repo.list_by_streamer("alice", 3, cursor).unwrap();
        assert_eq!(second_page.len(), 2);
        assert!(second_page.iter().all(|t| t.id < cursor));
        assert!(second_page.iter().all(|t| t.streamer_id == "alice"));
    }
}
