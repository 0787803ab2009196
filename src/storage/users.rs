// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! User accounts, keyed by username with wallet and widget-token indexes.
//!
//! The widget token is a stable per-account UUID used by the OBS overlay to
//! open its websocket without exposing the username in the scene URL.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    StorageError, StorageResult, Store, META, USERS, USER_WALLET_INDEX, USER_WIDGET_INDEX,
};

const NEXT_USER_ID: &str = "next_user_id";

/// Streamer account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: u64,
    pub username: String,
    pub wallet_address: String,
    pub main_wallet: bool,
    /// Private UUID for the overlay websocket URL.
    pub widget_token: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Create an account with a fresh widget token.
    ///
    /// Fails with `AlreadyExists` when the username is taken.
    pub fn create(
        &self,
        username: &str,
        wallet_address: &str,
        main_wallet: bool,
    ) -> StorageResult<StoredUser> {
        let write_txn = self.store.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;
            if users.get(username)?.is_some() {
                return Err(StorageError::AlreadyExists(format!("User {username}")));
            }

            let mut meta = write_txn.open_table(META)?;
            let id = meta.get(NEXT_USER_ID)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(NEXT_USER_ID, id + 1)?;
            drop(meta);

            let user = StoredUser {
                id,
                username: username.to_string(),
                wallet_address: wallet_address.to_string(),
                main_wallet,
                widget_token: Uuid::new_v4().to_string(),
                created_at: Utc::now(),
            };

            let json = serde_json::to_vec(&user)?;
            users.insert(username, json.as_slice())?;
            drop(users);

            if !wallet_address.is_empty() {
                let mut wallet_index = write_txn.open_table(USER_WALLET_INDEX)?;
                wallet_index.insert(wallet_address.to_lowercase().as_str(), username)?;
            }

            let mut widget_index = write_txn.open_table(USER_WIDGET_INDEX)?;
            widget_index.insert(user.widget_token.as_str(), username)?;

            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    pub fn get_by_username(&self, username: &str) -> StorageResult<StoredUser> {
        let read_txn = self.store.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        match users.get(username)? {
            Some(bytes) => Ok(serde_json::from_slice(bytes.value())?),
            None => Err(StorageError::NotFound(format!("User {username}"))),
        }
    }

    pub fn get_by_wallet(&self, wallet_address: &str) -> StorageResult<StoredUser> {
        let key = wallet_address.to_lowercase();
        let read_txn = self.store.db.begin_read()?;
        let index = read_txn.open_table(USER_WALLET_INDEX)?;
        let username = match index.get(key.as_str())? {
            Some(name) => name.value().to_string(),
            None => return Err(StorageError::NotFound(format!("Wallet {wallet_address}"))),
        };
        drop(index);
        drop(read_txn);
        self.get_by_username(&username)
    }

    pub fn get_by_widget_token(&self, token: &str) -> StorageResult<StoredUser> {
        let read_txn = self.store.db.begin_read()?;
        let index = read_txn.open_table(USER_WIDGET_INDEX)?;
        let username = match index.get(token)? {
            Some(name) => name.value().to_string(),
            None => return Err(StorageError::NotFound("widget token".to_string())),
        };
        drop(index);
        drop(read_txn);
        self.get_by_username(&username)
    }

    /// Rotate the widget token, invalidating existing overlay URLs.
    pub fn regenerate_widget_token(&self, username: &str) -> StorageResult<String> {
        let new_token = Uuid::new_v4().to_string();

        let write_txn = self.store.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let mut user: StoredUser = match users.get(username)? {
                Some(bytes) => serde_json::from_slice(bytes.value())?,
                None => return Err(StorageError::NotFound(format!("User {username}"))),
            };

            let mut widget_index = write_txn.open_table(USER_WIDGET_INDEX)?;
            widget_index.remove(user.widget_token.as_str())?;
            widget_index.insert(new_token.as_str(), username)?;
            drop(widget_index);

            user.widget_token = new_token.clone();
            let json = serde_json::to_vec(&user)?;
            users.insert(username, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(new_token)
    }
}
