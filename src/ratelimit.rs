// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Per-wallet tip submission cooldown.
//!
//! In-memory and intentionally not persisted: after a restart the worst case
//! is one early tip per wallet, which the chain verification still has to
//! confirm anyway.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::TIP_COOLDOWN;

/// Tracks the last accepted submission per wallet address.
pub struct TipRateLimiter {
    cooldown: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl Default for TipRateLimiter {
    fn default() -> Self {
        Self::new(TIP_COOLDOWN)
    }
}

impl TipRateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` and records the attempt if the wallet is outside its
    /// cooldown window; `false` if the submission must be rejected.
    ///
    /// Addresses are compared case-insensitively so an EVM wallet cannot
    /// bypass the cooldown by re-casing its hex address.
    pub fn check_and_update(&self, wallet_address: &str) -> bool {
        let key = wallet_address.to_lowercase();
        let now = Instant::now();

        let mut last_seen = self.last_seen.lock().expect("rate limiter lock poisoned");
        if let Some(last) = last_seen.get(&key) {
            if now.duration_since(*last) < self.cooldown {
                return false;
            }
        }
        last_seen.insert(key, now);
        true
    }
}
