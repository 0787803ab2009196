// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Challenge timestamp window.
//!
//! The signed challenge embeds a client-chosen unix timestamp. Limiting how
//! old (and how far in the future) that timestamp may be bounds the lifetime
//! of any captured signature; the used-signature table closes the rest of
//! the replay window.

use super::error::AuthError;

/// Oldest acceptable challenge age, in seconds.
pub const MAX_AGE_SECS: i64 = 3600;

/// Tolerated clock skew into the future, in seconds.
pub const MAX_SKEW_SECS: i64 = 300;

/// Accepts timestamps in `[now - MAX_AGE_SECS, now + MAX_SKEW_SECS]`,
/// boundaries included.
pub fn check_timestamp(timestamp: i64, now: i64) -> Result<(), AuthError> {
    if timestamp < now - MAX_AGE_SECS || timestamp > now + MAX_SKEW_SECS {
        return Err(AuthError::InvalidTimestamp);
    }
    Ok(())
}
