// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wire Models
//!
//! Request shapes exchanged between the client, the ingress handlers and the
//! backend auth nodes.
//!
//! ## Envelope (client -> ingress)
//!
//! ```text
//! { payload: {...}, signature: "<b64>", password: "...",
//!   attest: { parent_pub_b64, child_sig_b64, attestation, attestation_hash, node_id } }
//! ```
//!
//! ## Merged node request (ingress -> node `/api/auth/sign`)
//!
//! Payload fields are promoted to the top level, then the envelope fields are
//! laid over them in place:
//!
//! | Field | Source | Default |
//! |-------|--------|---------|
//! | `password` | envelope `password` | `null` |
//! | `client_signature` | envelope `signature` | `null` |
//! | `parent_pub_b64`, `child_sig_b64`, `attestation`, `attestation_hash`, `node_id` | `attest` | omitted when absent |
//! | `event_type` | payload | `"sign"` / `"register"` |
//! | `event_payload` | payload | route-specific object |
//! | `parents` | payload | `[]` |
//! | `node_signature` | payload | `""` |

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use crate::attestation::{Attestation, EphemeralAttestation};

// =============================================================================
// Client Payloads
// =============================================================================

/// Login form fields supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginPayload {
    #[serde(rename = "emailOrUsername")]
    pub email_or_username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pub: Option<String>,
    /// Node id to bind the attestation heartbeat to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

/// Registration form fields supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

// =============================================================================
// Envelope
// =============================================================================

/// Attestation fields carried next to the signed payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AttestFields {
    pub parent_pub_b64: String,
    pub child_sig_b64: String,
    pub attestation: Attestation,
    pub attestation_hash: String,
    pub node_id: String,
}

impl From<EphemeralAttestation> for AttestFields {
    fn from(att: EphemeralAttestation) -> Self {
        Self {
            parent_pub_b64: att.parent_pub_b64,
            child_sig_b64: att.child_sig_b64,
            attestation: att.attestation,
            attestation_hash: att.attestation_hash,
            node_id: att.node_id,
        }
    }
}

/// Signed and attested login/register request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct RequestEnvelope {
    /// Payload exactly as signed (canonicalized before signing).
    #[schema(value_type = Object)]
    pub payload: Map<String, Value>,
    /// Base64 Ed25519 signature over the canonical payload.
    pub signature: String,
    pub password: String,
    pub attest: AttestFields,
}

// =============================================================================
// Ingress Parsing
// =============================================================================

/// Which ingress route received the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRoute {
    Login,
    Register,
}

impl AuthRoute {
    pub fn default_event_type(self) -> &'static str {
        match self {
            AuthRoute::Login => "sign",
            AuthRoute::Register => "register",
        }
    }

    /// Minimal `event_payload` derived from the payload when the client sent none.
    fn default_event_payload(self, payload: &Map<String, Value>) -> Value {
        let keys: &[&str] = match self {
            AuthRoute::Login => &["emailOrUsername"],
            AuthRoute::Register => &["username", "email"],
        };
        let mut event_payload = Map::new();
        for key in keys {
            if let Some(value) = payload.get(*key) {
                event_payload.insert((*key).to_string(), value.clone());
            }
        }
        Value::Object(event_payload)
    }
}

/// Client input rejected before any backend is contacted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngressError {
    #[error("empty body")]
    EmptyBody,

    #[error("invalid JSON")]
    InvalidJson,

    #[error("missing payload or attest")]
    MissingFields,

    #[error("body too large")]
    TooLarge,
}

/// Envelope as received by the ingress handlers.
///
/// Only `payload` and `attest` are required; everything else is passed
/// through to the node as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingEnvelope {
    pub payload: Map<String, Value>,
    pub attest: Map<String, Value>,
    pub password: Value,
    pub signature: Value,
}

/// Value of `key` unless it is absent or `null`.
fn present(map: &Map<String, Value>, key: &str) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).cloned()
}

impl IncomingEnvelope {
    /// Parse a raw request body.
    ///
    /// `payload` and `attest` must both be JSON objects. Bytes that are not
    /// UTF-8 count as invalid JSON.
    pub fn parse(body: impl AsRef<[u8]>) -> Result<Self, IngressError> {
        let body = body.as_ref();
        if body.is_empty() {
            return Err(IngressError::EmptyBody);
        }
        let value: Value = serde_json::from_slice(body).map_err(|_| IngressError::InvalidJson)?;
        let Value::Object(mut root) = value else {
            return Err(IngressError::MissingFields);
        };

        let payload = match root.remove("payload") {
            Some(Value::Object(map)) => map,
            _ => return Err(IngressError::MissingFields),
        };
        let attest = match root.remove("attest") {
            Some(Value::Object(map)) => map,
            _ => return Err(IngressError::MissingFields),
        };

        Ok(Self {
            password: present(&root, "password").unwrap_or(Value::Null),
            signature: present(&root, "signature").unwrap_or(Value::Null),
            payload,
            attest,
        })
    }
}

// =============================================================================
// Merged Node Request
// =============================================================================

/// Flattened request body accepted by a node's `/api/auth/sign`.
///
/// Serializes as the payload with the envelope fields laid over it. A laid
/// over key already present in the payload keeps its position there; new
/// keys follow in table order. Attest fields the client did not send are
/// left out entirely, while explicit `null`s are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedNodeRequest {
    /// Client payload, in its original key order.
    pub fields: Map<String, Value>,
    pub password: Value,
    pub client_signature: Value,
    pub parent_pub_b64: Option<Value>,
    pub child_sig_b64: Option<Value>,
    pub attestation: Option<Value>,
    pub attestation_hash: Option<Value>,
    pub node_id: Option<Value>,
    pub event_type: Value,
    pub event_payload: Value,
    pub parents: Value,
    pub node_signature: Value,
}

impl MergedNodeRequest {
    pub fn merge(route: AuthRoute, envelope: IncomingEnvelope) -> Self {
        let IncomingEnvelope {
            payload,
            attest,
            password,
            signature,
        } = envelope;

        let event_type = present(&payload, "event_type")
            .unwrap_or_else(|| json!(route.default_event_type()));
        let event_payload = present(&payload, "event_payload")
            .unwrap_or_else(|| route.default_event_payload(&payload));
        let parents = present(&payload, "parents").unwrap_or_else(|| json!([]));
        let node_signature = present(&payload, "node_signature").unwrap_or_else(|| json!(""));

        Self {
            password,
            client_signature: signature,
            parent_pub_b64: attest.get("parent_pub_b64").cloned(),
            child_sig_b64: attest.get("child_sig_b64").cloned(),
            attestation: attest.get("attestation").cloned(),
            attestation_hash: attest.get("attestation_hash").cloned(),
            node_id: attest.get("node_id").cloned(),
            event_type,
            event_payload,
            parents,
            node_signature,
            fields: payload,
        }
    }

    /// The JSON object sent to the node.
    pub fn to_map(&self) -> Map<String, Value> {
        let laid_over = [
            ("password", Some(&self.password)),
            ("client_signature", Some(&self.client_signature)),
            ("parent_pub_b64", self.parent_pub_b64.as_ref()),
            ("child_sig_b64", self.child_sig_b64.as_ref()),
            ("attestation", self.attestation.as_ref()),
            ("attestation_hash", self.attestation_hash.as_ref()),
            ("node_id", self.node_id.as_ref()),
            ("event_type", Some(&self.event_type)),
            ("event_payload", Some(&self.event_payload)),
            ("parents", Some(&self.parents)),
            ("node_signature", Some(&self.node_signature)),
        ];

        let mut out = self.fields.clone();
        for (key, value) in laid_over {
            match value {
                Some(value) => {
                    out.insert(key.to_string(), value.clone());
                }
                None => {
                    out.shift_remove(key);
                }
            }
        }
        out
    }
}

impl Serialize for MergedNodeRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}
