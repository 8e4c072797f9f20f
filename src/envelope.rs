// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Construction of signed, attested login and register envelopes.
//!
//! A builder owns the clock and randomness it stamps into payloads, so the
//! exact canonical bytes (and therefore signatures) are reproducible when it
//! is given deterministic sources.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::attestation::{make_ephemeral_attestation, AttestationError};
use crate::clock::{Clock, SystemClock};
use crate::crypto::{sign_payload, CryptoError};
use crate::entropy::{Entropy, EntropyError, OsEntropy};
use crate::models::{LoginPayload, RegisterPayload, RequestEnvelope};

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Entropy(#[from] EntropyError),

    #[error("Payload must serialize to a JSON object: {0}")]
    Payload(String),
}

#[derive(Clone)]
pub struct EnvelopeBuilder {
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn Entropy>,
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(OsEntropy))
    }
}

impl EnvelopeBuilder {
    pub fn new(clock: Arc<dyn Clock>, entropy: Arc<dyn Entropy>) -> Self {
        Self { clock, entropy }
    }

    /// Build a login envelope (`event_type: "sign"`).
    pub fn login(
        &self,
        payload: &LoginPayload,
        secret_key_b64: &str,
    ) -> Result<RequestEnvelope, EnvelopeError> {
        let full = self.stamp(payload, "sign", None)?;
        self.seal(full, &payload.password, payload.node_id.as_deref(), secret_key_b64)
    }

    /// Build a register envelope (`event_type: "register"`) carrying
    /// `event_payload: { username, email }`.
    pub fn register(
        &self,
        payload: &RegisterPayload,
        secret_key_b64: &str,
    ) -> Result<RequestEnvelope, EnvelopeError> {
        let event_payload = json!({
            "username": payload.username,
            "email": payload.email,
        });
        let full = self.stamp(payload, "register", Some(event_payload))?;
        self.seal(full, &payload.password, payload.node_id.as_deref(), secret_key_b64)
    }

    /// Caller fields followed by `event_type`, `ts`, `nonce` and the optional
    /// `event_payload`.
    fn stamp<P: Serialize>(
        &self,
        payload: &P,
        event_type: &str,
        event_payload: Option<Value>,
    ) -> Result<Map<String, Value>, EnvelopeError> {
        let Value::Object(mut full) =
            serde_json::to_value(payload).map_err(|e| EnvelopeError::Payload(e.to_string()))?
        else {
            return Err(EnvelopeError::Payload("not an object".into()));
        };

        full.insert("event_type".into(), json!(event_type));
        full.insert("ts".into(), json!(self.clock.iso8601()));
        full.insert("nonce".into(), json!(self.entropy.nonce()?));
        if let Some(event_payload) = event_payload {
            full.insert("event_payload".into(), event_payload);
        }
        Ok(full)
    }

    fn seal(
        &self,
        payload: Map<String, Value>,
        password: &str,
        node_id: Option<&str>,
        secret_key_b64: &str,
    ) -> Result<RequestEnvelope, EnvelopeError> {
        let signature = sign_payload(&payload, secret_key_b64)?;
        let attestation =
            make_ephemeral_attestation(node_id, self.clock.as_ref(), self.entropy.as_ref())?;

        Ok(RequestEnvelope {
            payload,
            signature,
            password: password.to_string(),
            attest: attestation.into(),
        })
    }
}
