// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{TokenIssuer, WalletAuthenticator};
use crate::chains::{ChainError, ChainRegistry};
use crate::config::Config;
use crate::monitor::TipMonitor;
use crate::notify::NotificationHub;
use crate::ratelimit::TipRateLimiter;
use crate::storage::{StorageError, Store};

/// Shared state handed to every handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub hub: Arc<NotificationHub>,
    pub authenticator: Arc<WalletAuthenticator>,
    pub registry: Arc<ChainRegistry>,
    pub monitor: Arc<TipMonitor>,
    pub rate_limiter: Arc<TipRateLimiter>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl AppState {
    /// Wire up storage, chain adapters, and background collaborators.
    pub fn build(config: Config, shutdown: CancellationToken) -> Result<Self, StateError> {
        let store = Arc::new(Store::open(
            std::path::Path::new(&config.data_dir).join("streamtip.redb").as_path(),
        )?);
        let hub = Arc::new(NotificationHub::new());
        let registry = Arc::new(ChainRegistry::from_config(&config)?);
        let tokens = TokenIssuer::new(&config.jwt_secret, &config.jwt_issuer);
        let authenticator = Arc::new(WalletAuthenticator::new(store.clone(), tokens));
        let monitor = Arc::new(TipMonitor::new(store.clone(), hub.clone(), shutdown));

        Ok(Self {
            config: Arc::new(config),
            store,
            hub,
            authenticator,
            registry,
            monitor,
            rate_limiter: Arc::new(TipRateLimiter::default()),
        })
    }
}
