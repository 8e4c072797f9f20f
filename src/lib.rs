// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! StriX Auth Gateway - round-robin relay for signed, attested auth requests
//!
//! This crate sits between the banking frontend and a fixed pool of backend
//! auth nodes. Clients build an envelope (signed payload + ephemeral
//! attestation), the gateway flattens it and forwards it to the first node
//! that answers.
//!
//! ## Modules
//!
//! - `api` - HTTP ingress handlers (Axum)
//! - `attestation` - Ephemeral parent/child attestation and chain verification
//! - `client` - Envelope submission over HTTP
//! - `crypto` - Canonical JSON and Ed25519 signatures
//! - `envelope` - Login/register envelope construction
//! - `forwarder` - Round-robin failover across auth nodes

pub mod api;
pub mod attestation;
pub mod client;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod entropy;
pub mod envelope;
pub mod error;
pub mod forwarder;
pub mod models;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
