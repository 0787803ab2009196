// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! JWT issuance and verification (HS256).
//!
//! Three token kinds, separated by issuer suffix so one kind can never pass
//! verification as another:
//!
//! | Kind | Issuer | Lifetime | Grants |
//! |------|--------|----------|--------|
//! | user session | `<issuer>` | 48 h | account endpoints |
//! | wallet session | `<issuer>-wallet` | 24 h | tip submission |
//! | signup token | `<issuer>-signup` | 15 min | completing signup only |

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

pub const USER_SESSION_TTL: Duration = Duration::hours(48);
pub const WALLET_SESSION_TTL: Duration = Duration::hours(24);
pub const SIGNUP_TOKEN_TTL: Duration = Duration::minutes(15);

/// Full account login session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username.
    pub sub: String,
    pub user_id: u64,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Proof of wallet control; authorizes tip submission only.
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletClaims {
    /// Wallet address, lowercased for EVM wallets.
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Short-lived credential carried from wallet login into signup.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupClaims {
    /// Wallet address the signup is bound to.
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies all three token kinds from one HS256 secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
        }
    }

    fn wallet_issuer(&self) -> String {
        format!("{}-wallet", self.issuer)
    }

    fn signup_issuer(&self) -> String {
        format!("{}-signup", self.issuer)
    }

    pub fn issue_user_session(
        &self,
        username: &str,
        user_id: u64,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: username.to_string(),
            user_id,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + USER_SESSION_TTL).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }

    pub fn issue_wallet_session(&self, wallet_address: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = WalletClaims {
            sub: wallet_address.to_string(),
            iss: self.wallet_issuer(),
            iat: now.timestamp(),
            exp: (now + WALLET_SESSION_TTL).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }

    pub fn issue_signup_token(&self, wallet_address: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SignupClaims {
            sub: wallet_address.to_string(),
            iss: self.signup_issuer(),
            iat: now.timestamp(),
            exp: (now + SIGNUP_TOKEN_TTL).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }

    pub fn verify_user_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify::<SessionClaims>(token, &self.issuer)
    }

    pub fn verify_wallet_session(&self, token: &str) -> Result<WalletClaims, AuthError> {
        self.verify::<WalletClaims>(token, &self.wallet_issuer())
    }

    pub fn verify_signup_token(&self, token: &str) -> Result<SignupClaims, AuthError> {
        self.verify::<SignupClaims>(token, &self.signup_issuer())
    }

    fn verify<T: for<'de> Deserialize<'de>>(
        &self,
        token: &str,
        issuer: &str,
    ) -> Result<T, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
