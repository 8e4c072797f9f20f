// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Randomness source for key generation and envelope nonces.
//!
//! Production code draws from the operating system RNG. Tests and demos can
//! plug in [`SeededEntropy`] to get reproducible keys, nonces and signatures.

use std::sync::Mutex;

use rand::{rngs::OsRng, rngs::StdRng, RngCore, SeedableRng};

const NONCE_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the lowercase alphanumeric nonce attached to envelopes.
pub const NONCE_LEN: usize = 11;

#[derive(Debug, thiserror::Error)]
#[error("Entropy source failed: {0}")]
pub struct EntropyError(pub String);

/// Source of random bytes.
pub trait Entropy: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), EntropyError>;

    /// Random lowercase alphanumeric string of [`NONCE_LEN`] characters.
    fn nonce(&self) -> Result<String, EntropyError> {
        let mut raw = [0u8; NONCE_LEN];
        self.fill_bytes(&mut raw)?;
        Ok(raw
            .iter()
            .map(|b| NONCE_ALPHABET[(*b as usize) % NONCE_ALPHABET.len()] as char)
            .collect())
    }
}

/// Operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| EntropyError(e.to_string()))
    }
}

/// Deterministic RNG seeded from a `u64`. Not for production keys.
pub struct SeededEntropy {
    rng: Mutex<StdRng>,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Entropy for SeededEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.fill_bytes(dest);
        Ok(())
    }
}
