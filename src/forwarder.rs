// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Round-Robin Forwarder
//!
//! Relays a serialized request to one backend auth node out of a fixed pool.
//!
//! ## Strategy
//!
//! For every call the forwarder walks the pool once, starting at the current
//! rotation index:
//! 1. POST the body to `<node><path>` with a per-attempt timeout.
//! 2. On a 2xx reply, set the rotation index to the slot after the node that
//!    answered and return that reply unchanged.
//! 3. On a non-2xx reply, timeout or transport error, log it and move on to
//!    the next slot. The rotation index is left alone.
//!
//! If no node succeeds the caller gets a synthetic `503` listing every node
//! that was tried, in order.
//!
//! ## Concurrency
//!
//! Attempts within one call are strictly sequential. The rotation index is an
//! atomic, so concurrent calls never race on memory, but two calls that start
//! at the same time may read the same start slot. Fairness across concurrent
//! callers is best-effort.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

/// Node endpoint that accepts merged login/register requests.
pub const NODE_SIGN_PATH: &str = "/api/auth/sign";

/// Node liveness endpoint used by readiness probes.
pub const NODE_HEALTH_PATH: &str = "/health";

/// Default per-attempt timeout (15 s).
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Timeout for readiness probes against a node.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub const ALL_NODES_UNAVAILABLE: &str = "All auth backends unavailable";

#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("At least one auth node is required")]
    NoNodes,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared start position for the next forwarding pass.
#[derive(Debug)]
pub struct Rotation {
    index: AtomicUsize,
    len: usize,
}

impl Rotation {
    pub fn new(len: usize) -> Self {
        Self {
            index: AtomicUsize::new(0),
            len,
        }
    }

    /// Slot the next pass starts from.
    pub fn start(&self) -> usize {
        self.index.load(Ordering::Acquire) % self.len
    }

    /// Record that slot `served` answered successfully.
    pub fn advance_past(&self, served: usize) {
        self.index.store((served + 1) % self.len, Ordering::Release);
    }

    /// Slots visited by a pass beginning at `start`.
    pub fn order_from(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).map(move |i| (start + i) % self.len)
    }
}

/// Status and JSON body handed back to the ingress caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub body: Value,
    /// Node that produced the reply, `None` for the synthetic 503.
    pub node: Option<String>,
}

impl ForwardResponse {
    fn exhausted(tried: Vec<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: json!({ "error": ALL_NODES_UNAVAILABLE, "tried": tried }),
            node: None,
        }
    }
}

impl IntoResponse for ForwardResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Reply from a single node attempt.
struct NodeReply {
    status: StatusCode,
    body: Value,
}

/// Round-robin dispatcher over a fixed pool of auth nodes.
pub struct RoundRobinForwarder {
    nodes: Vec<String>,
    rotation: Rotation,
    http: reqwest::Client,
}

impl RoundRobinForwarder {
    /// Create a forwarder over `nodes` (base URLs without trailing slash).
    pub fn new(nodes: Vec<String>, timeout: Duration) -> Result<Self, ForwarderError> {
        if nodes.is_empty() {
            return Err(ForwarderError::NoNodes);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            rotation: Rotation::new(nodes.len()),
            nodes,
            http,
        })
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Slot the next call will try first.
    pub fn rotation_index(&self) -> usize {
        self.rotation.start()
    }

    /// Forward `body` to `path` on the first node that answers with 2xx.
    pub async fn forward(&self, path: &str, body: &str) -> ForwardResponse {
        let start = self.rotation.start();
        let mut tried = Vec::with_capacity(self.nodes.len());

        for idx in self.rotation.order_from(start) {
            let node = &self.nodes[idx];
            tried.push(node.clone());

            match self.forward_to_node(node, path, body).await {
                Ok(reply) if reply.status.is_success() => {
                    self.rotation.advance_past(idx);
                    return ForwardResponse {
                        status: reply.status,
                        body: reply.body,
                        node: Some(node.clone()),
                    };
                }
                Ok(reply) => {
                    warn!(
                        node = %node,
                        status = reply.status.as_u16(),
                        body = %reply.body,
                        "Auth node returned non-success status, trying next"
                    );
                }
                Err(e) => {
                    warn!(node = %node, error = %e, "Auth node unreachable, trying next");
                }
            }
        }

        error!(tried = ?tried, "All auth nodes failed");
        ForwardResponse::exhausted(tried)
    }

    async fn forward_to_node(
        &self,
        node: &str,
        path: &str,
        body: &str,
    ) -> Result<NodeReply, reqwest::Error> {
        debug!(node = %node, path = %path, "Forwarding to auth node");

        let response = self
            .http
            .post(format!("{node}{path}"))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));

        debug!(node = %node, status = status.as_u16(), "Auth node responded");
        Ok(NodeReply { status, body })
    }

    /// `GET <node>/health` and report whether it answered 2xx.
    pub async fn probe(&self, node: &str) -> bool {
        match self
            .http
            .get(format!("{node}{NODE_HEALTH_PATH}"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(node = %node, error = %e, "Auth node health probe failed");
                false
            }
        }
    }
}
