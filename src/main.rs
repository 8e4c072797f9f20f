// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use strix_auth_gateway::{
    api::router,
    config::{LogFormat, ProxyConfig, DEFAULT_LOG_FILTER},
    state::AppState,
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let state = AppState::from_config(&config).expect("Failed to build auth node forwarder");
    let app = router(state);

    info!(
        nodes = ?config.nodes,
        timeout_ms = config.node_timeout.as_millis() as u64,
        verify_attestation = config.verify_attestation,
        "Auth node pool configured"
    );

    match &config.tls {
        Some(paths) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");

            let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key)
                .await
                .expect("Failed to load TLS certificate and key");

            info!("StriX auth gateway listening on https://{} (docs at /docs)", config.bind);
            axum_server::bind_rustls(config.bind, tls_config)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            info!("StriX auth gateway listening on http://{} (docs at /docs)", config.bind);
            axum_server::bind(config.bind)
                .serve(app.into_make_service())
                .await
                .expect("HTTP server failed");
        }
    }
}
