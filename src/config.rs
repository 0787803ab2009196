// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup into a [`Config`]
//! value shared across the application.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 secret for session tokens | dev fallback |
//! | `JWT_ISSUER` | Issuer claim on issued tokens | `streamtip` |
//! | `EVM_RPC_URLS` | Comma-separated `chain_id=url` overrides | built-ins |
//! | `SOLANA_RPC_URL` | Solana JSON-RPC endpoint | mainnet-beta |
//! | `SUI_RPC_URL` | Sui JSON-RPC endpoint | mainnet fullnode |
//! | `BITCOIN_API_URL` | Esplora-style REST base URL | mempool.space |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Chain id used by the frontend for Sui tips. Sui has no EVM-style numeric
/// chain id, so the tip widget sends this sentinel value.
pub const SUI_CHAIN_ID: &str = "100003";

/// How often a tip monitor polls its chain adapter.
pub const MONITOR_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Overall budget for confirming one tip before it is marked failed.
/// Generous to cover L1/L2 settlement delays and bridged transfers.
pub const MONITOR_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Per-RPC-call timeout inside one poll iteration. A stuck endpoint must not
/// stall the monitor past a single iteration.
pub const CHAIN_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum gap between two tip submissions from the same wallet.
pub const TIP_COOLDOWN: Duration = Duration::from_secs(5);

/// Runtime configuration shared across handlers and background tasks.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// EVM chain id (decimal string) -> JSON-RPC URL.
    pub evm_rpc_urls: HashMap<String, String>,
    pub solana_rpc_url: String,
    pub sui_rpc_url: String,
    /// Esplora-compatible REST base, e.g. `https://mempool.space/api`.
    pub bitcoin_api_url: String,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let mut evm_rpc_urls = default_evm_rpc_urls();
        if let Ok(overrides) = env::var("EVM_RPC_URLS") {
            for pair in overrides.split(',') {
                if let Some((chain_id, url)) = pair.split_once('=') {
                    evm_rpc_urls.insert(chain_id.trim().to_string(), url.trim().to_string());
                }
            }
        }

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "/data".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-do-not-use-in-prod".to_string()),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "streamtip".to_string()),
            evm_rpc_urls,
            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string()),
            sui_rpc_url: env::var("SUI_RPC_URL")
                .unwrap_or_else(|_| "https://fullnode.mainnet.sui.io:443".to_string()),
            bitcoin_api_url: env::var("BITCOIN_API_URL")
                .unwrap_or_else(|_| "https://mempool.space/api".to_string()),
        }
    }
}

/// Public RPC endpoints for the EVM chains the tip widget offers.
fn default_evm_rpc_urls() -> HashMap<String, String> {
    [
        ("1", "https://eth.llamarpc.com"),
        ("10", "https://mainnet.optimism.io"),
        ("137", "https://polygon-rpc.com"),
        ("8453", "https://mainnet.base.org"),
        ("42161", "https://arb1.arbitrum.io/rpc"),
        ("43114", "https://api.avax.network/ext/bc/C/rpc"),
    ]
    .into_iter()
    .map(|(id, url)| (id.to_string(), url.to_string()))
    .collect()
}
