// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Streamtip - Multi-Chain Streamer Tipping Service
//!
//! Viewers prove control of a blockchain wallet by signing a canonical
//! challenge, submit tips tied to on-chain transactions, and the service
//! confirms each transaction independently on its origin chain before the
//! tip reaches the streamer's overlay.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet signature login, replay protection, token issuance
//! - `chains` - Per-chain transaction confirmation adapters
//! - `monitor` - Per-tip background confirmation state machine
//! - `notify` - Live overlay connection registry and fan-out
//! - `storage` - Embedded redb persistence

pub mod api;
pub mod auth;
pub mod chains;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod ratelimit;
pub mod state;
pub mod storage;
