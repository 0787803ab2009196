// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

use axum::{extract::State, Json};

use crate::{
    auth::LoginOutcome,
    error::ApiError,
    models::{SignupRequest, SignupResponse, WalletLoginRequest, WalletLoginResponse},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/auth/wallet-login",
    request_body = WalletLoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = WalletLoginResponse),
        (status = 401, description = "Invalid signature, stale timestamp, or replay"),
        (status = 403, description = "Wallet is blacklisted")
    )
)]
pub async fn wallet_login(
    State(state): State<AppState>,
    Json(request): Json<WalletLoginRequest>,
) -> Result<Json<WalletLoginResponse>, ApiError> {
    if request.address.is_empty() || request.signature.is_empty() {
        return Err(ApiError::bad_request("Missing address or signature"));
    }

    let outcome = state.authenticator.login(&request)?;
    let response = match outcome {
        LoginOutcome::ExistingUser {
            token,
            wallet_token,
            expires_in,
        } => {
            tracing::info!(address = %request.address, "Wallet login succeeded");
            WalletLoginResponse {
                status: "success".to_string(),
                token: Some(token),
                wallet_token: Some(wallet_token),
                expires_in: Some(expires_in),
                signup_token: None,
            }
        }
        LoginOutcome::SignupNeeded { signup_token } => {
            tracing::info!(address = %request.address, "Unknown wallet; signup required");
            WalletLoginResponse {
                status: "signup_needed".to_string(),
                token: None,
                wallet_token: None,
                expires_in: None,
                signup_token: Some(signup_token),
            }
        }
    };
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    tag = "Auth",
    responses(
        (status = 200, body = SignupResponse),
        (status = 400, description = "Invalid username"),
        (status = 401, description = "Invalid or expired signup token"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, ApiError> {
    let outcome = state.authenticator.complete_signup(
        &request.username,
        &request.signup_token,
        request.main_wallet,
    )?;

    tracing::info!(username = %outcome.user.username, "Account created");
    Ok(Json(SignupResponse {
        status: "success".to_string(),
        token: outcome.token,
        wallet_token: outcome.wallet_token,
        expires_in: outcome.expires_in,
        username: outcome.user.username,
        widget_token: outcome.user.widget_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::users::UserRepository;
    use alloy::primitives::keccak256;
    use k256::ecdsa::SigningKey;
    use tokio_util::sync::CancellationToken;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::from_env();
        config.data_dir = dir.path().to_string_lossy().into_owned();
        config.jwt_secret = "test-secret".to_string();
        let state = AppState::build(config, CancellationToken::new()).unwrap();
        (state, dir)
    }

    fn signed_login(seed: u8, timestamp: i64) -> WalletLoginRequest {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let address = format!("0x{}", hex::encode(&hash[12..]));

        let message = crate::auth::signature::canonical_login_message(&address, timestamp);
        let digest = keccak256(
            [
                b"\x19Ethereum Signed Message:\n".as_slice(),
                message.len().to_string().as_bytes(),
                message.as_bytes(),
            ]
            .concat(),
        );
        let (sig, recovery_id) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        WalletLoginRequest {
            address,
            timestamp,
            signature: format!("0x{}", hex::encode(bytes)),
        }
    }

    #[tokio::test]
    async fn login_then_signup_creates_account() {
        let (state, _dir) = test_state();
        let request = signed_login(0x31, chrono::Utc::now().timestamp());

        let Json(response) = wallet_login(State(state.clone()), Json(request))
            .await
            .unwrap();
        assert_eq!(response.status, "signup_needed");
        let signup_token = response.signup_token.unwrap();

        let Json(response) = signup(
            State(state.clone()),
            Json(SignupRequest {
                username: "alice".to_string(),
                signup_token,
                main_wallet: true,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status, "success");
        assert!(!response.widget_token.is_empty());

        UserRepository::new(&state.store)
            .get_by_username("alice")
            .unwrap();
    }

    #[tokio::test]
    async fn known_wallet_logs_straight_in() {
        let (state, _dir) = test_state();
        let first = signed_login(0x32, chrono::Utc::now().timestamp());

        UserRepository::new(&state.store)
            .create("bob", &first.address, true)
            .unwrap();

        let Json(response) = wallet_login(State(state), Json(first)).await.unwrap();
        assert_eq!(response.status, "success");
        assert!(response.token.is_some());
        assert!(response.wallet_token.is_some());
    }

    #[tokio::test]
    async fn empty_request_rejected() {
        let (state, _dir) = test_state();
        let err = wallet_login(
            State(state),
            Json(WalletLoginRequest {
                address: String::new(),
                timestamp: chrono::Utc::now().timestamp(),
                signature: String::new(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
