// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! # Notification Hub
//!
//! Registry of live overlay connections and confirmed-tip fan-out.
//!
//! Each websocket connection registers an outbound channel keyed by the
//! recipient streamer's username. `broadcast` delivers to every connection
//! of that recipient and to no one else; a connection whose channel is
//! closed is evicted from both indexes on the spot, so dead connections
//! never accumulate.
//!
//! Delivery is at-most-once and best-effort: there is no queue and no
//! replay for overlays that connect after the broadcast.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::models::TipNotification;

#[derive(Default)]
struct HubInner {
    /// recipient username -> connection ids
    by_recipient: HashMap<String, HashSet<Uuid>>,
    /// connection id -> (recipient username, outbound channel)
    connections: HashMap<Uuid, (String, UnboundedSender<TipNotification>)>,
}

/// Live overlay connection registry.
#[derive(Default)]
pub struct NotificationHub {
    inner: Mutex<HubInner>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a recipient, returning its connection id.
    pub fn register(&self, recipient: &str, sender: UnboundedSender<TipNotification>) -> Uuid {
        let conn_id = Uuid::new_v4();
        let mut inner = self.inner.lock().expect("hub lock poisoned");
        inner
            .by_recipient
            .entry(recipient.to_string())
            .or_default()
            .insert(conn_id);
        inner
            .connections
            .insert(conn_id, (recipient.to_string(), sender));
        conn_id
    }

    /// Remove a connection from both indexes. Idempotent.
    pub fn unregister(&self, conn_id: Uuid) {
        let mut inner = self.inner.lock().expect("hub lock poisoned");
        remove_connection(&mut inner, conn_id);
    }

    /// Deliver an event to every live connection of `recipient`.
    ///
    /// Connections that fail to accept the event are evicted. Returns the
    /// number of successful deliveries.
    pub fn broadcast(&self, recipient: &str, event: &TipNotification) -> usize {
        let mut inner = self.inner.lock().expect("hub lock poisoned");

        let Some(conn_ids) = inner.by_recipient.get(recipient) else {
            return 0;
        };
        let conn_ids: Vec<Uuid> = conn_ids.iter().copied().collect();

        let mut delivered = 0;
        for conn_id in conn_ids {
            let ok = inner
                .connections
                .get(&conn_id)
                .map(|(_, tx)| tx.send(event.clone()).is_ok())
                .unwrap_or(false);

            if ok {
                delivered += 1;
            } else {
                tracing::debug!(%conn_id, recipient, "Evicting dead overlay connection");
                remove_connection(&mut inner, conn_id);
            }
        }
        delivered
    }

    /// Number of live connections for a recipient.
    pub fn connection_count(&self, recipient: &str) -> usize {
        let inner = self.inner.lock().expect("hub lock poisoned");
        inner
            .by_recipient
            .get(recipient)
            .map(|set| set.len())
            .unwrap_or(0)
    }
}

fn remove_connection(inner: &mut HubInner, conn_id: Uuid) {
    if let Some((recipient, _)) = inner.connections.remove(&conn_id) {
        if let Some(set) = inner.by_recipient.get_mut(&recipient) {
            set.remove(&conn_id);
            if set.is_empty() {
                inner.by_recipient.remove(&recipient);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn event(streamer: &str) -> TipNotification {
        TipNotification::new(streamer, "bob", "gg", "5")
    }

    #[test]
    fn broadcast_reaches_all_recipient_connections_and_no_others() {
        let hub = NotificationHub::new();
        let (tx_a1, mut rx_a1) = unbounded_channel();
        let (tx_a2, mut rx_a2) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();

        hub.register("alice", tx_a1);
        hub.register("alice", tx_a2);
        hub.register("bob", tx_b);

        let delivered = hub.broadcast("alice", &event("alice"));
        assert_eq!(delivered, 2);
        assert!(rx_a1.try_recv().is_ok());
        assert!(rx_a2.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn failed_delivery_evicts_connection() {
        let hub = NotificationHub::new();
        let (tx_live, mut rx_live) = unbounded_channel();
        let (tx_dead, rx_dead) = unbounded_channel();

        hub.register("alice", tx_live);
        hub.register("alice", tx_dead);
        drop(rx_dead); // connection went away

        assert_eq!(hub.broadcast("alice", &event("alice")), 1);
        assert_eq!(hub.connection_count("alice"), 1);

        // Dead connection is absent on the next broadcast.
        assert_eq!(hub.broadcast("alice", &event("alice")), 1);
        assert!(rx_live.try_recv().is_ok());
    }

    #[test]
    fn unregister_cleans_both_indexes() {
        let hub = NotificationHub::new();
        let (tx, _rx) = unbounded_channel();
        let conn_id = hub.register("alice", tx);

        hub.unregister(conn_id);
        assert_eq!(hub.connection_count("alice"), 0);
        assert_eq!(hub.broadcast("alice", &event("alice")), 0);

        // Idempotent
        hub.unregister(conn_id);
    }

    #[test]
    fn broadcast_without_connections_is_a_noop() {
        let hub = NotificationHub::new();
        assert_eq!(hub.broadcast("nobody", &event("nobody")), 0);
    }
}
