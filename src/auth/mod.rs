// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! # Wallet Authentication
//!
//! Login with a wallet signature instead of a password. The client signs a
//! canonical challenge embedding its address and a fresh timestamp; the
//! server verifies the signature, enforces the replay guard, and either
//! issues sessions (known wallet) or hands back a short-lived signup token
//! (unknown wallet).
//!
//! ## Strategy
//!
//! Checks run cheapest-first and fail closed:
//!
//! 1. timestamp inside the acceptance window
//! 2. wallet not blacklisted
//! 3. signature valid for the claimed address
//! 4. signature never seen before (atomic check-and-insert)
//!
//! Only after all four does the wallet get tokens. Step 4 burns the
//! signature even when the wallet is unknown, so the same signature cannot
//! be replayed to mint a second signup token.

pub mod error;
pub mod replay;
pub mod signature;
pub mod tokens;

use std::sync::Arc;

use chrono::Utc;

use crate::models::WalletLoginRequest;
use crate::storage::auth::{AuthRepository, UserSessionRecord, WalletSessionRecord};
use crate::storage::users::{StoredUser, UserRepository};
use crate::storage::{StorageError, Store};

pub use error::AuthError;
pub use tokens::TokenIssuer;

/// Result of a verified wallet login.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Wallet maps to an account; both sessions are live and persisted.
    ExistingUser {
        token: String,
        wallet_token: String,
        expires_in: u64,
    },
    /// Wallet is unknown; the signup token is the only credential issued.
    SignupNeeded { signup_token: String },
}

/// Outcome of completing signup: the new account plus its initial sessions.
#[derive(Debug)]
pub struct SignupOutcome {
    pub user: StoredUser,
    pub token: String,
    pub wallet_token: String,
    pub expires_in: u64,
}

/// Orchestrates signature login, replay protection, and token issuance.
pub struct WalletAuthenticator {
    store: Arc<Store>,
    tokens: TokenIssuer,
}

impl WalletAuthenticator {
    pub fn new(store: Arc<Store>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Run the full login check chain for a signed challenge.
    pub fn login(&self, request: &WalletLoginRequest) -> Result<LoginOutcome, AuthError> {
        replay::check_timestamp(request.timestamp, Utc::now().timestamp())?;

        let auth_repo = AuthRepository::new(&self.store);
        if auth_repo.is_wallet_blacklisted(&request.address)? {
            return Err(AuthError::Blacklisted);
        }

        let message = signature::canonical_login_message(&request.address, request.timestamp);
        signature::verify_signature(&request.address, &message, &request.signature)?;

        match auth_repo.mark_signature_used(&request.signature) {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(_)) => return Err(AuthError::SignatureAlreadyUsed),
            Err(err) => return Err(err.into()),
        }

        let user_repo = UserRepository::new(&self.store);
        match user_repo.get_by_wallet(&request.address) {
            Ok(user) => {
                let (token, wallet_token) = self.open_sessions(&user, &request.address)?;
                Ok(LoginOutcome::ExistingUser {
                    token,
                    wallet_token,
                    expires_in: tokens::USER_SESSION_TTL.num_seconds() as u64,
                })
            }
            Err(StorageError::NotFound(_)) => {
                let signup_token = self.tokens.issue_signup_token(&request.address)?;
                Ok(LoginOutcome::SignupNeeded { signup_token })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Create an account for a wallet holding a valid signup token.
    pub fn complete_signup(
        &self,
        username: &str,
        signup_token: &str,
        main_wallet: bool,
    ) -> Result<SignupOutcome, AuthError> {
        let claims = self.tokens.verify_signup_token(signup_token)?;
        let wallet_address = claims.sub;

        if !is_valid_username(username) {
            return Err(AuthError::InvalidUsername);
        }

        let user_repo = UserRepository::new(&self.store);
        let user = match user_repo.create(username, &wallet_address, main_wallet) {
            Ok(user) => user,
            Err(StorageError::AlreadyExists(_)) => return Err(AuthError::UsernameTaken),
            Err(err) => return Err(err.into()),
        };

        let (token, wallet_token) = self.open_sessions(&user, &wallet_address)?;
        Ok(SignupOutcome {
            user,
            token,
            wallet_token,
            expires_in: tokens::USER_SESSION_TTL.num_seconds() as u64,
        })
    }

    /// Issue and persist both a user session and a wallet session.
    fn open_sessions(
        &self,
        user: &StoredUser,
        wallet_address: &str,
    ) -> Result<(String, String), AuthError> {
        let now = Utc::now();
        let auth_repo = AuthRepository::new(&self.store);

        let token = self.tokens.issue_user_session(&user.username, user.id)?;
        auth_repo.save_user_session(&UserSessionRecord {
            token: token.clone(),
            user_id: user.id,
            username: user.username.clone(),
            expires_at: now + tokens::USER_SESSION_TTL,
            created_at: now,
        })?;

        let wallet_token = self.tokens.issue_wallet_session(wallet_address)?;
        auth_repo.save_wallet_session(&WalletSessionRecord {
            token: wallet_token.clone(),
            wallet_address: wallet_address.to_string(),
            expires_at: now + tokens::WALLET_SESSION_TTL,
            created_at: now,
        })?;

        Ok((token, wallet_token))
    }
}

/// Usernames: 3-20 chars from a fixed alphanumeric-plus-symbols alphabet.
pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return false;
    }
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!@#$%^&*()".contains(c))
}
