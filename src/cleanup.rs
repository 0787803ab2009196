// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Periodic sweep of expired sessions and blacklist entries.
//!
//! Expired rows are already invisible to reads; the sweep only reclaims
//! space, so the interval is generous.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::storage::auth::AuthRepository;
use crate::storage::Store;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Background task deleting expired auth rows.
pub struct SessionSweeper {
    store: Arc<Store>,
    shutdown: CancellationToken,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<Store>, shutdown: CancellationToken) -> Self {
        Self {
            store,
            shutdown,
            interval: SWEEP_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_interval(store: Arc<Store>, shutdown: CancellationToken, interval: Duration) -> Self {
        Self {
            store,
            shutdown,
            interval,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The immediate first tick doubles as a startup sweep.
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::debug!("Session sweeper stopped");
                    return;
                }
                _ = interval.tick() => {
                    self.sweep_once();
                }
            }
        }
    }

    fn sweep_once(&self) {
        match AuthRepository::new(&self.store).cleanup_expired() {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Swept expired auth rows"),
            Err(err) => tracing::error!(error = %err, "Session sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::auth::WalletSessionRecord;
    use crate::storage::test_util::temp_store;
    use chrono::{Duration as ChronoDuration, Utc};

    #[tokio::test(start_paused = true)]
    async fn sweeper_removes_expired_sessions_and_stops_on_shutdown() {
        let (store, _dir) = temp_store();
        let repo = AuthRepository::new(&store);
        repo.save_wallet_session(&WalletSessionRecord {
            token: "tok-old".to_string(),
            wallet_address: "0x1".to_string(),
            expires_at: Utc::now() - ChronoDuration::minutes(1),
            created_at: Utc::now() - ChronoDuration::hours(25),
        })
        .unwrap();

        let shutdown = CancellationToken::new();
        let sweeper =
            SessionSweeper::with_interval(store.clone(), shutdown.clone(), Duration::from_secs(1));
        let handle = sweeper.spawn();

        // Let the first (immediate) tick run.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let repo = AuthRepository::new(&store);
        assert_eq!(repo.cleanup_expired().unwrap(), 0, "sweep already ran");

        shutdown.cancel();
        handle.await.unwrap();
    }
}
