// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the gateway's login and register endpoints.

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::envelope::{EnvelopeBuilder, EnvelopeError};
use crate::models::{LoginPayload, RegisterPayload, RequestEnvelope};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";

const LOGIN_FAILED: &str = "Sign-in failed";
const REGISTER_FAILED: &str = "Registration failed";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx reply; carries the server's `error` message or a fallback.
    #[error("{0}")]
    Rejected(String),
}

#[derive(Clone)]
pub struct AuthClient {
    base_url: String,
    http: Client,
    builder: EnvelopeBuilder,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_builder(base_url, EnvelopeBuilder::default())
    }

    pub fn with_builder(base_url: impl Into<String>, builder: EnvelopeBuilder) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            builder,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign, attest and submit a login. Returns the node's JSON reply.
    pub async fn apply_login(
        &self,
        payload: &LoginPayload,
        secret_key_b64: &str,
    ) -> Result<Value, ClientError> {
        let envelope = self.builder.login(payload, secret_key_b64)?;
        self.submit(LOGIN_PATH, &envelope, LOGIN_FAILED).await
    }

    /// Sign, attest and submit a registration. Returns the node's JSON reply.
    pub async fn apply_register(
        &self,
        payload: &RegisterPayload,
        secret_key_b64: &str,
    ) -> Result<Value, ClientError> {
        let envelope = self.builder.register(payload, secret_key_b64)?;
        self.submit(REGISTER_PATH, &envelope, REGISTER_FAILED).await
    }

    async fn submit(
        &self,
        path: &str,
        envelope: &RequestEnvelope,
        fallback: &str,
    ) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(envelope)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
                .unwrap_or_else(|| fallback.to_string());
            debug!(path = %path, status = status.as_u16(), error = %message, "Gateway rejected envelope");
            return Err(ClientError::Rejected(message));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::crypto::{verify_payload, SigningKeyPair};
    use crate::entropy::OsEntropy;
    use crate::forwarder::{RoundRobinForwarder, DEFAULT_NODE_TIMEOUT};
    use crate::state::AppState;
    use crate::test_support::{dead_node_url, spawn_node, NodeBehavior};
    use serde_json::{json, Map};
    use tokio::net::TcpListener;

    async fn spawn_gateway(nodes: Vec<String>) -> String {
        let forwarder = RoundRobinForwarder::new(nodes, DEFAULT_NODE_TIMEOUT).unwrap();
        let app = router(AppState::new(forwarder).with_attestation_check(true));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn key() -> SigningKeyPair {
        SigningKeyPair::generate(&OsEntropy).unwrap()
    }

    #[tokio::test]
    async fn login_round_trip_through_gateway() {
        let node = spawn_node(NodeBehavior::ok(
            json!({"success": true, "user_id": "demo-user", "token": "stub-token"}),
        ))
        .await;
        let client = AuthClient::new(spawn_gateway(vec![node.url.clone()]).await);
        let key = key();

        let reply = client
            .apply_login(
                &LoginPayload {
                    email_or_username: "alice".into(),
                    password: "hunter2".into(),
                    user_pub: Some(key.public_b64()),
                    node_id: None,
                },
                &key.secret_b64(),
            )
            .await
            .unwrap();
        assert_eq!(reply["token"], "stub-token");

        // The node sees the signed payload fields at the top level; stripping
        // the gateway's additions leaves exactly what the client signed.
        let sent = node.last_body().unwrap();
        let mut signed = Map::new();
        for field in ["emailOrUsername", "password", "user_pub", "event_type", "ts", "nonce"] {
            signed.insert(field.to_string(), sent[field].clone());
        }
        verify_payload(
            &signed,
            sent["client_signature"].as_str().unwrap(),
            &key.public_b64(),
        )
        .unwrap();
        assert!(sent["node_id"]
            .as_str()
            .unwrap()
            .starts_with("node-ephemeral-"));
    }

    #[tokio::test]
    async fn register_round_trip_through_gateway() {
        let node = spawn_node(NodeBehavior::ok(
            json!({"success": true, "account_id": "demo-account"}),
        ))
        .await;
        let client = AuthClient::new(spawn_gateway(vec![node.url.clone()]).await);
        let key = key();

        let reply = client
            .apply_register(
                &RegisterPayload {
                    username: "bob".into(),
                    email: "bob@example.com".into(),
                    password: "pw".into(),
                    user_pub: None,
                    node_id: Some("auth-node-3".into()),
                },
                &key.secret_b64(),
            )
            .await
            .unwrap();

        assert_eq!(reply["account_id"], "demo-account");
        let sent = node.last_body().unwrap();
        assert_eq!(sent["event_type"], "register");
        assert_eq!(sent["node_id"], "auth-node-3");
    }

    #[tokio::test]
    async fn exhausted_pool_surfaces_gateway_error() {
        let client = AuthClient::new(spawn_gateway(vec![dead_node_url().await]).await);
        let key = key();

        let err = client
            .apply_login(
                &LoginPayload {
                    email_or_username: "alice".into(),
                    password: "pw".into(),
                    user_pub: None,
                    node_id: None,
                },
                &key.secret_b64(),
            )
            .await
            .unwrap_err();

        assert!(matches!(&err, ClientError::Rejected(msg) if msg == "All auth backends unavailable"));
    }

    #[tokio::test]
    async fn missing_error_field_uses_fallback() {
        // A bare mock node has no ingress routes, so the POST gets an empty 404.
        let node = spawn_node(NodeBehavior::ok(json!({}))).await;
        let client = AuthClient::new(node.url.clone());
        let key = key();

        let err = client
            .apply_register(
                &RegisterPayload {
                    username: "bob".into(),
                    email: "bob@example.com".into(),
                    password: "pw".into(),
                    user_pub: None,
                    node_id: None,
                },
                &key.secret_b64(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[tokio::test]
    async fn bad_key_fails_before_any_request() {
        let node = spawn_node(NodeBehavior::ok(json!({}))).await;
        let client = AuthClient::new(spawn_gateway(vec![node.url.clone()]).await);

        let err = client
            .apply_login(
                &LoginPayload {
                    email_or_username: "alice".into(),
                    password: "pw".into(),
                    user_pub: None,
                    node_id: None,
                },
                "c2hvcnQ=",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Envelope(_)));
        assert_eq!(node.hits(), 0);
    }
}
