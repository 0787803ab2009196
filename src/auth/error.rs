// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

use crate::storage::StorageError;

/// Authentication failures.
///
/// Display strings are the user-visible messages; they intentionally avoid
/// leaking which verification step failed beyond the broad category.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Signature already used")]
    SignatureAlreadyUsed,

    #[error("Wallet is blacklisted")]
    Blacklisted,

    #[error("Timestamp too old or invalid")]
    InvalidTimestamp,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid username")]
    InvalidUsername,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
