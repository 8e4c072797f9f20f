// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ed25519 keypairs and detached payload signatures.

use base64ct::{Base64, Encoding};
use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};
use serde_json::{Map, Value};

use super::canonical::canonicalize;
use crate::entropy::{Entropy, EntropyError};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Invalid signature encoding: {0}")]
    Encoding(String),

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

/// Ed25519 signing keypair.
#[derive(Clone)]
pub struct SigningKeyPair {
    key: SigningKey,
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &self.public_b64())
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generate a fresh keypair from 32 bytes of seed entropy.
    pub fn generate(entropy: &dyn Entropy) -> Result<Self, CryptoError> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        entropy.fill_bytes(&mut seed)?;
        let key = SigningKey::from_bytes(&seed);
        seed.fill(0);
        Ok(Self { key })
    }

    /// Parse a base64 64-byte secret key (seed followed by public key).
    pub fn from_secret_b64(secret_key_b64: &str) -> Result<Self, CryptoError> {
        let raw = Base64::decode_vec(secret_key_b64)
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("bad base64: {e}")))?;
        let bytes: [u8; KEYPAIR_LENGTH] = raw.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKeyMaterial(format!(
                "expected {KEYPAIR_LENGTH} bytes, got {}",
                raw.len()
            ))
        })?;
        let key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn public_b64(&self) -> String {
        Base64::encode_string(self.key.verifying_key().as_bytes())
    }

    pub fn secret_b64(&self) -> String {
        Base64::encode_string(&self.key.to_keypair_bytes())
    }

    /// Detached signature over `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.key.sign(message).to_bytes()
    }

    /// Detached signature over `message`, base64-encoded.
    pub fn sign_b64(&self, message: &[u8]) -> String {
        Base64::encode_string(&self.sign(message))
    }
}

/// Sign the canonical form of `payload` and return the base64 signature.
pub fn sign_payload(
    payload: &Map<String, Value>,
    secret_key_b64: &str,
) -> Result<String, CryptoError> {
    let keypair = SigningKeyPair::from_secret_b64(secret_key_b64)?;
    let canonical = canonicalize(payload);
    Ok(keypair.sign_b64(canonical.as_bytes()))
}

/// Check a base64 signature produced by [`sign_payload`].
pub fn verify_payload(
    payload: &Map<String, Value>,
    signature_b64: &str,
    public_key_b64: &str,
) -> Result<(), CryptoError> {
    let public_key = decode_public_key(public_key_b64)?;
    let canonical = canonicalize(payload);
    verify_bytes(&public_key, canonical.as_bytes(), signature_b64)
}

/// Decode a base64 32-byte Ed25519 public key.
pub fn decode_public_key(public_key_b64: &str) -> Result<VerifyingKey, CryptoError> {
    let raw = Base64::decode_vec(public_key_b64)
        .map_err(|e| CryptoError::InvalidKeyMaterial(format!("bad base64: {e}")))?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = raw.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidKeyMaterial(format!(
            "expected {PUBLIC_KEY_LENGTH} byte public key, got {}",
            raw.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))
}

/// Verify a base64 detached signature over raw bytes.
pub fn verify_bytes(
    public_key: &VerifyingKey,
    message: &[u8],
    signature_b64: &str,
) -> Result<(), CryptoError> {
    let raw = Base64::decode_vec(signature_b64)
        .map_err(|e| CryptoError::Encoding(format!("bad base64: {e}")))?;
    let signature = Signature::from_slice(&raw).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    public_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}
