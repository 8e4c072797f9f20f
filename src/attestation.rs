// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ephemeral Attestation
//!
//! Software stand-in for a hardware root of trust. Every login or register
//! attempt mints a one-shot parent/child Ed25519 pair:
//!
//! - the **parent** signs a small attestation payload naming the child key
//! - the **child** signs the heartbeat message `heartbeat:<node_id>`
//!
//! Nothing is persisted. The `counter` field is always `0`, so an attestation
//! offers no replay protection on its own; backend nodes are responsible for
//! any freshness checks.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::crypto::signing::{decode_public_key, verify_bytes};
use crate::crypto::{canonicalize, CryptoError, SigningKeyPair};
use crate::entropy::Entropy;

/// Policy label carried by every ephemeral attestation.
pub const DEMO_POLICY: &str = "demo-policy";

/// Prefix of node ids synthesized when the caller does not supply one.
pub const EPHEMERAL_NODE_PREFIX: &str = "node-ephemeral-";

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("Crypto primitives unavailable: {0}")]
    CryptoUnavailable(String),

    #[error(transparent)]
    Crypto(CryptoError),

    #[error("Attestation serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Attestation verification failed: {0}")]
    Verification(String),
}

impl From<CryptoError> for AttestationError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Entropy(e) => AttestationError::CryptoUnavailable(e.to_string()),
            other => AttestationError::Crypto(other),
        }
    }
}

/// Parent-signed statement about an ephemeral child identity.
///
/// Field order is significant: [`attestation_hash`] hashes the plain JSON
/// serialization in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attestation {
    pub child_pub_b64: String,
    pub created_at_unix: i64,
    pub policy: String,
    pub counter: u64,
    /// Parent signature over the bytes in `signed_payload_b64`.
    pub sig_b64: String,
    /// Exact bytes the parent signed, base64-encoded.
    #[serde(default)]
    pub signed_payload_b64: String,
}

/// Output of [`make_ephemeral_attestation`].
#[derive(Debug, Clone)]
pub struct EphemeralAttestation {
    pub node_id: String,
    pub parent_pub_b64: String,
    /// Child signature over `heartbeat:<node_id>`.
    pub child_sig_b64: String,
    pub attestation: Attestation,
    /// Hex SHA-256 of the JSON serialization of `attestation`.
    pub attestation_hash: String,
}

/// Canonical bytes of the four attested fields.
fn attested_fields(
    child_pub_b64: &str,
    created_at_unix: i64,
    policy: &str,
    counter: u64,
) -> String {
    let mut fields = Map::new();
    fields.insert("child_pub_b64".into(), json!(child_pub_b64));
    fields.insert("created_at_unix".into(), json!(created_at_unix));
    fields.insert("policy".into(), json!(policy));
    fields.insert("counter".into(), json!(counter));
    canonicalize(&fields)
}

fn heartbeat_message(node_id: &str) -> String {
    format!("heartbeat:{node_id}")
}

/// Mint a fresh attestation for `node_id`, or for a synthesized
/// `node-ephemeral-<unix millis>` id when none is given.
pub fn make_ephemeral_attestation(
    node_id: Option<&str>,
    clock: &dyn Clock,
    entropy: &dyn Entropy,
) -> Result<EphemeralAttestation, AttestationError> {
    let node_id = match node_id {
        Some(id) => id.to_string(),
        None => format!("{EPHEMERAL_NODE_PREFIX}{}", clock.unix_millis()),
    };

    let parent = SigningKeyPair::generate(entropy)?;
    let child = SigningKeyPair::generate(entropy)?;

    let child_pub_b64 = child.public_b64();
    let created_at_unix = clock.unix_seconds();
    let signed_payload = attested_fields(&child_pub_b64, created_at_unix, DEMO_POLICY, 0);

    let sig_b64 = parent.sign_b64(signed_payload.as_bytes());
    let child_sig_b64 = child.sign_b64(heartbeat_message(&node_id).as_bytes());

    let attestation = Attestation {
        child_pub_b64,
        created_at_unix,
        policy: DEMO_POLICY.to_string(),
        counter: 0,
        sig_b64,
        signed_payload_b64: Base64::encode_string(signed_payload.as_bytes()),
    };
    let attestation_hash = attestation_hash(&attestation)?;

    Ok(EphemeralAttestation {
        node_id,
        parent_pub_b64: parent.public_b64(),
        child_sig_b64,
        attestation,
        attestation_hash,
    })
}

/// Hex SHA-256 of the attestation's JSON serialization.
pub fn attestation_hash(attestation: &Attestation) -> Result<String, AttestationError> {
    let encoded = serde_json::to_string(attestation)?;
    Ok(hex::encode(Sha256::digest(encoded.as_bytes())))
}

/// Check that `expected_hex` matches [`attestation_hash`] of `attestation`.
pub fn verify_attestation_hash(
    attestation: &Attestation,
    expected_hex: &str,
) -> Result<(), AttestationError> {
    let actual = attestation_hash(attestation)?;
    if actual.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(AttestationError::Verification(
            "attestation_hash does not match attestation".into(),
        ))
    }
}

/// Verify the parent -> child -> heartbeat chain of an attestation.
pub fn verify_attestation(
    parent_pub_b64: &str,
    node_id: &str,
    child_sig_b64: &str,
    attestation: &Attestation,
) -> Result<(), AttestationError> {
    let parent_pub = decode_public_key(parent_pub_b64)?;
    let child_pub = decode_public_key(&attestation.child_pub_b64)?;

    let signed = if attestation.signed_payload_b64.is_empty() {
        attested_fields(
            &attestation.child_pub_b64,
            attestation.created_at_unix,
            &attestation.policy,
            attestation.counter,
        )
        .into_bytes()
    } else {
        Base64::decode_vec(&attestation.signed_payload_b64).map_err(|e| {
            AttestationError::Verification(format!("bad signed_payload_b64: {e}"))
        })?
    };

    verify_bytes(&parent_pub, &signed, &attestation.sig_b64).map_err(|e| match e {
        CryptoError::InvalidSignature => {
            AttestationError::Verification("invalid attestation signature".into())
        }
        other => other.into(),
    })?;

    let claimed: Value = serde_json::from_slice(&signed)
        .map_err(|e| AttestationError::Verification(format!("signed payload is not JSON: {e}")))?;
    let matches = claimed["child_pub_b64"] == json!(attestation.child_pub_b64)
        && claimed["created_at_unix"] == json!(attestation.created_at_unix)
        && claimed["policy"] == json!(attestation.policy)
        && claimed["counter"] == json!(attestation.counter);
    if !matches {
        return Err(AttestationError::Verification(
            "signed payload does not describe this attestation".into(),
        ));
    }

    verify_bytes(&child_pub, heartbeat_message(node_id).as_bytes(), child_sig_b64).map_err(
        |e| match e {
            CryptoError::InvalidSignature => {
                AttestationError::Verification("invalid child signature".into())
            }
            other => other.into(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, SystemClock};
    use crate::entropy::{EntropyError, OsEntropy, SeededEntropy};

    const NOW_MS: i64 = 1_760_000_000_123;

    fn deterministic(node_id: Option<&str>) -> EphemeralAttestation {
        make_ephemeral_attestation(
            node_id,
            &FixedClock::from_unix_millis(NOW_MS),
            &SeededEntropy::new(42),
        )
        .unwrap()
    }

    #[test]
    fn uses_supplied_node_id() {
        let att = deterministic(Some("auth-node-2"));
        assert_eq!(att.node_id, "auth-node-2");
    }

    #[test]
    fn synthesizes_node_id_from_clock() {
        let att = deterministic(None);
        assert_eq!(att.node_id, "node-ephemeral-1760000000123");
    }

    #[test]
    fn payload_fields_are_fixed() {
        let att = deterministic(None);
        assert_eq!(att.attestation.created_at_unix, 1_760_000_000);
        assert_eq!(att.attestation.policy, "demo-policy");
        assert_eq!(att.attestation.counter, 0);
    }

    #[test]
    fn signed_payload_is_canonical_json() {
        let att = deterministic(None);
        let signed = Base64::decode_vec(&att.attestation.signed_payload_b64).unwrap();
        let expected = format!(
            r#"{{"child_pub_b64":"{}","counter":0,"created_at_unix":1760000000,"policy":"demo-policy"}}"#,
            att.attestation.child_pub_b64
        );
        assert_eq!(String::from_utf8(signed).unwrap(), expected);
    }

    #[test]
    fn hash_matches_plain_serialization() {
        let att = deterministic(Some("n1"));
        let json = serde_json::to_string(&att.attestation).unwrap();
        assert!(json.starts_with(r#"{"child_pub_b64":"#));
        assert!(json.ends_with(&format!(
            r#""signed_payload_b64":"{}"}}"#,
            att.attestation.signed_payload_b64
        )));

        let expected = hex::encode(Sha256::digest(json.as_bytes()));
        assert_eq!(att.attestation_hash, expected);
        assert_eq!(att.attestation_hash.len(), 64);
        verify_attestation_hash(&att.attestation, &att.attestation_hash).unwrap();
    }

    #[test]
    fn deterministic_sources_reproduce_attestation() {
        let a = deterministic(Some("n1"));
        let b = deterministic(Some("n1"));
        assert_eq!(a.attestation, b.attestation);
        assert_eq!(a.attestation_hash, b.attestation_hash);
        assert_eq!(a.parent_pub_b64, b.parent_pub_b64);
    }

    #[test]
    fn fresh_keys_every_call() {
        let a = make_ephemeral_attestation(Some("n1"), &SystemClock, &OsEntropy).unwrap();
        let b = make_ephemeral_attestation(Some("n1"), &SystemClock, &OsEntropy).unwrap();
        assert_ne!(a.parent_pub_b64, b.parent_pub_b64);
        assert_ne!(a.attestation.child_pub_b64, b.attestation.child_pub_b64);
    }

    #[test]
    fn chain_verifies() {
        let att = deterministic(Some("auth-node-1"));
        verify_attestation(
            &att.parent_pub_b64,
            "auth-node-1",
            &att.child_sig_b64,
            &att.attestation,
        )
        .unwrap();
    }

    #[test]
    fn chain_verifies_without_signed_payload_bytes() {
        let mut att = deterministic(Some("auth-node-1"));
        att.attestation.signed_payload_b64.clear();
        verify_attestation(
            &att.parent_pub_b64,
            "auth-node-1",
            &att.child_sig_b64,
            &att.attestation,
        )
        .unwrap();
    }

    #[test]
    fn heartbeat_for_other_node_is_rejected() {
        let att = deterministic(Some("auth-node-1"));
        let err = verify_attestation(
            &att.parent_pub_b64,
            "auth-node-2",
            &att.child_sig_b64,
            &att.attestation,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid child signature"));
    }

    #[test]
    fn swapped_child_key_is_rejected() {
        let mut att = deterministic(Some("n1"));
        let other = make_ephemeral_attestation(Some("n1"), &SystemClock, &OsEntropy).unwrap();
        att.attestation.child_pub_b64 = other.attestation.child_pub_b64;

        let err = verify_attestation(
            &att.parent_pub_b64,
            "n1",
            &att.child_sig_b64,
            &att.attestation,
        )
        .unwrap_err();
        assert!(matches!(err, AttestationError::Verification(_)));
    }

    #[test]
    fn wrong_parent_is_rejected() {
        let att = deterministic(Some("n1"));
        let stranger = make_ephemeral_attestation(Some("n1"), &SystemClock, &OsEntropy).unwrap();
        let err = verify_attestation(
            &stranger.parent_pub_b64,
            "n1",
            &att.child_sig_b64,
            &att.attestation,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid attestation signature"));
    }

    #[test]
    fn tampered_hash_is_rejected() {
        let att = deterministic(Some("n1"));
        let mut altered = att.attestation.clone();
        altered.counter = 1;
        assert!(verify_attestation_hash(&altered, &att.attestation_hash).is_err());
    }

    struct BrokenEntropy;

    impl Entropy for BrokenEntropy {
        fn fill_bytes(&self, _dest: &mut [u8]) -> Result<(), EntropyError> {
            Err(EntropyError("no entropy device".into()))
        }
    }

    #[test]
    fn entropy_failure_maps_to_crypto_unavailable() {
        let err = make_ephemeral_attestation(None, &SystemClock, &BrokenEntropy).unwrap_err();
        assert!(matches!(err, AttestationError::CryptoUnavailable(_)));
    }
}
