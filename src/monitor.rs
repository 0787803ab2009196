// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! # Tip Confirmation Monitor
//!
//! One background task per pending tip polls the tip's chain adapter until
//! the transaction confirms, fails, or the overall budget runs out.
//!
//! ## Strategy
//!
//! Every poll resolves to a [`TxCheck`]:
//!
//! - `Confirmed` ends the task; the overlay is notified only if this task
//!   performed the pending-to-confirmed transition in storage.
//! - `StillPending` and `TransientError` keep polling.
//! - `PermanentFailure` marks the tip failed immediately.
//!
//! Hitting the overall timeout marks the tip failed. Graceful shutdown
//! cancels the task and leaves the tip pending; the startup recovery pass
//! re-attaches a monitor on the next boot with a fresh budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::chains::{ChainAdapter, ChainRegistry, TxCheck};
use crate::config::{MONITOR_POLL_INTERVAL, MONITOR_TIMEOUT};
use crate::models::TipNotification;
use crate::notify::NotificationHub;
use crate::storage::tips::{StoredTip, TipRepository, TipStatus};
use crate::storage::Store;

/// Spawns and runs per-tip confirmation tasks.
pub struct TipMonitor {
    store: Arc<Store>,
    hub: Arc<NotificationHub>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    timeout: Duration,
}

impl TipMonitor {
    pub fn new(store: Arc<Store>, hub: Arc<NotificationHub>, shutdown: CancellationToken) -> Self {
        Self::with_timing(store, hub, shutdown, MONITOR_POLL_INTERVAL, MONITOR_TIMEOUT)
    }

    pub fn with_timing(
        store: Arc<Store>,
        hub: Arc<NotificationHub>,
        shutdown: CancellationToken,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            hub,
            shutdown,
            poll_interval,
            timeout,
        }
    }

    /// Spawn the confirmation task for one tip.
    pub fn spawn(self: &Arc<Self>, tip: StoredTip, adapter: Arc<dyn ChainAdapter>) {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            monitor.run(tip, adapter).await;
        });
    }

    /// Poll until the tip reaches a terminal state or shutdown.
    pub async fn run(&self, tip: StoredTip, adapter: Arc<dyn ChainAdapter>) {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::debug!(tip_id = tip.id, "Shutdown; leaving tip pending for recovery");
                    return;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(tip_id = tip.id, tx_hash = %tip.tx_hash, "Confirmation timed out");
                    self.finish(&tip, TipStatus::Failed);
                    return;
                }
                _ = interval.tick() => {
                    match adapter.check_transaction(&tip.tx_hash, &tip.source_address).await {
                        TxCheck::Confirmed => {
                            tracing::info!(tip_id = tip.id, chain = adapter.chain(), "Transaction confirmed");
                            self.finish(&tip, TipStatus::Confirmed);
                            return;
                        }
                        TxCheck::StillPending => {}
                        TxCheck::PermanentFailure(reason) => {
                            tracing::warn!(tip_id = tip.id, chain = adapter.chain(), %reason, "Transaction verification failed");
                            self.finish(&tip, TipStatus::Failed);
                            return;
                        }
                        TxCheck::TransientError(reason) => {
                            tracing::warn!(tip_id = tip.id, chain = adapter.chain(), %reason, "RPC error; will retry");
                        }
                    }
                }
            }
        }
    }

    /// Record the terminal state; notify overlays only when this call won the
    /// transition and the tip confirmed.
    fn finish(&self, tip: &StoredTip, status: TipStatus) {
        let repo = TipRepository::new(&self.store);
        match repo.mark_terminal(tip.id, status) {
            Ok(true) => {
                if status == TipStatus::Confirmed {
                    let event =
                        TipNotification::new(&tip.streamer_id, &tip.sender, &tip.message, &tip.amount);
                    let delivered = self.hub.broadcast(&tip.streamer_id, &event);
                    tracing::info!(tip_id = tip.id, delivered, "Overlay notified");
                }
            }
            Ok(false) => {
                tracing::debug!(tip_id = tip.id, "Tip already terminal; skipping");
            }
            Err(err) => {
                tracing::error!(tip_id = tip.id, error = %err, "Failed to record tip status");
            }
        }
    }
}

/// Re-attach monitors for tips left pending by a previous run.
///
/// Tips on chains with no adapter (config changed across restarts) are
/// marked failed instead of pending forever. Returns the number of monitors
/// spawned.
pub fn recover_pending(monitor: &Arc<TipMonitor>, registry: &ChainRegistry) -> usize {
    let repo = TipRepository::new(&monitor.store);
    let pending = match repo.list_pending() {
        Ok(pending) => pending,
        Err(err) => {
            tracing::error!(error = %err, "Could not list pending tips for recovery");
            return 0;
        }
    };

    let mut spawned = 0;
    for tip in pending {
        match registry.adapter_for(&tip.chain_id) {
            Some(adapter) => {
                tracing::info!(tip_id = tip.id, chain_id = %tip.chain_id, "Resuming confirmation");
                monitor.spawn(tip, adapter);
                spawned += 1;
            }
            None => {
                tracing::warn!(tip_id = tip.id, chain_id = %tip.chain_id, "No adapter for pending tip; marking failed");
                if let Err(err) = repo.mark_terminal(tip.id, TipStatus::Failed) {
                    tracing::error!(tip_id = tip.id, error = %err, "Failed to mark orphaned tip");
                }
            }
        }
    }
    spawned
}
