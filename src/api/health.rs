// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with per-node status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Result of probing each configured auth node.
    pub nodes: Vec<NodeStatus>,
}

/// Probe result for one auth node.
#[derive(Debug, Serialize, ToSchema)]
pub struct NodeStatus {
    pub url: String,
    /// "ok" or "unavailable".
    pub status: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// Probes every auth node's `/health`. Returns 200 while at least one node
/// answers, 503 otherwise. The forwarding rotation is not affected.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "At least one auth node is reachable", body = ReadyResponse),
        (status = 503, description = "No auth node is reachable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let mut nodes = Vec::with_capacity(state.forwarder.nodes().len());
    for url in state.forwarder.nodes() {
        let up = state.forwarder.probe(url).await;
        nodes.push(NodeStatus {
            url: url.clone(),
            status: if up { "ok" } else { "unavailable" }.to_string(),
        });
    }

    let any_ok = nodes.iter().any(|n| n.status == "ok");
    let response = ReadyResponse {
        status: if any_ok { "ok" } else { "degraded" }.to_string(),
        nodes,
    };

    let status = if any_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
