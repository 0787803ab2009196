// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use streamtip_server::api::router;
use streamtip_server::cleanup::SessionSweeper;
use streamtip_server::config::Config;
use streamtip_server::monitor::recover_pending;
use streamtip_server::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Config::from_env();
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!(error = %err, "Invalid bind address");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let state = match AppState::build(config, shutdown.clone()) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "Startup failed");
            std::process::exit(1);
        }
    };

    // Tips left pending by the previous run get their monitors back, each
    // with a fresh confirmation budget.
    let resumed = recover_pending(&state.monitor, &state.registry);
    if resumed > 0 {
        tracing::info!(resumed, "Resumed pending tip monitors");
    }

    SessionSweeper::new(state.store.clone(), shutdown.clone()).spawn();

    let app = router(state);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "Could not bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "Streamtip server listening (docs at /docs)");

    let serve_shutdown = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            serve_shutdown.cancel();
        })
        .await;

    // Stop background tasks even if the server errored out.
    shutdown.cancel();

    if let Err(err) = result {
        tracing::error!(error = %err, "Server exited with error");
        std::process::exit(1);
    }
}

/// `LOG_FORMAT=json` switches to machine-readable logs; anything else gets
/// the human-readable default. `RUST_LOG` filters as usual.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
