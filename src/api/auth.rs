// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login and register ingress endpoints.
//!
//! Both routes accept a [`RequestEnvelope`], flatten it into the shape a
//! node's `/api/auth/sign` expects and relay it through the round-robin
//! forwarder. The node's status and body are returned unchanged.
//!
//! Once relaying starts it runs in its own task, so a caller that hangs up
//! does not cut a forwarding pass short.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
};
use serde_json::{Map, Value};
use tracing::error;

use crate::{
    attestation::{verify_attestation, verify_attestation_hash, Attestation},
    error::{ApiError, ErrorBody},
    forwarder::{ForwardResponse, NODE_SIGN_PATH},
    models::{AuthRoute, IncomingEnvelope, IngressError, MergedNodeRequest, RequestEnvelope},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = RequestEnvelope,
    tag = "Auth",
    responses(
        (status = 200, description = "Auth node response, forwarded verbatim"),
        (status = 400, description = "Empty, oversized or invalid body, or missing fields", body = ErrorBody),
        (status = 500, description = "Unexpected server error", body = ErrorBody),
        (status = 503, description = "All auth nodes failed")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<ForwardResponse, ApiError> {
    relay(&state, AuthRoute::Login, body).await
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RequestEnvelope,
    tag = "Auth",
    responses(
        (status = 200, description = "Auth node response, forwarded verbatim"),
        (status = 400, description = "Empty, oversized or invalid body, or missing fields", body = ErrorBody),
        (status = 500, description = "Unexpected server error", body = ErrorBody),
        (status = 503, description = "All auth nodes failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<ForwardResponse, ApiError> {
    relay(&state, AuthRoute::Register, body).await
}

async fn relay(
    state: &AppState,
    route: AuthRoute,
    body: Result<Bytes, BytesRejection>,
) -> Result<ForwardResponse, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            IngressError::TooLarge
        } else {
            IngressError::InvalidJson
        }
    })?;
    let envelope = IncomingEnvelope::parse(&body)?;

    if state.verify_attestation {
        check_attestation(&envelope.attest)
            .map_err(|reason| ApiError::bad_request(format!("invalid attestation: {reason}")))?;
    }

    let merged = MergedNodeRequest::merge(route, envelope);
    let node_body = serde_json::to_string(&merged).map_err(|e| ApiError::internal(e.to_string()))?;

    let forwarder = Arc::clone(&state.forwarder);
    tokio::spawn(async move { forwarder.forward(NODE_SIGN_PATH, &node_body).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Forwarding task failed");
            ApiError::internal(String::new())
        })
}

fn attest_str<'a>(attest: &'a Map<String, Value>, field: &str) -> Result<&'a str, String> {
    attest
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing {field}"))
}

/// Verify the parent/child chain and hash carried in `attest`.
fn check_attestation(attest: &Map<String, Value>) -> Result<(), String> {
    let parent_pub_b64 = attest_str(attest, "parent_pub_b64")?;
    let child_sig_b64 = attest_str(attest, "child_sig_b64")?;
    let node_id = attest_str(attest, "node_id")?;
    let attestation_hash = attest_str(attest, "attestation_hash")?;
    let attestation: Attestation = attest
        .get("attestation")
        .cloned()
        .ok_or_else(|| "missing attestation".to_string())
        .and_then(|v| serde_json::from_value(v).map_err(|e| format!("malformed attestation: {e}")))?;

    verify_attestation(parent_pub_b64, node_id, child_sig_b64, &attestation)
        .map_err(|e| e.to_string())?;
    verify_attestation_hash(&attestation, attestation_hash).map_err(|e| e.to_string())
}
