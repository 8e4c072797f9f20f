// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payload canonicalization and Ed25519 detached signatures.
//!
//! Keys and signatures travel as standard (padded) base64 strings. Secret keys
//! use the 64-byte NaCl layout (32-byte seed followed by the public key).

pub mod canonical;
pub mod signing;

pub use canonical::canonicalize;
pub use signing::{sign_payload, verify_payload, CryptoError, SigningKeyPair};
