// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::{ProxyConfig, DEFAULT_MAX_BODY_BYTES};
use crate::forwarder::{ForwarderError, RoundRobinForwarder};

#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<RoundRobinForwarder>,
    /// Reject envelopes whose attestation chain does not verify.
    pub verify_attestation: bool,
    /// Ingress bodies above this size are rejected before parsing.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(forwarder: RoundRobinForwarder) -> Self {
        Self {
            forwarder: Arc::new(forwarder),
            verify_attestation: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_attestation_check(mut self, enabled: bool) -> Self {
        self.verify_attestation = enabled;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, ForwarderError> {
        let forwarder = RoundRobinForwarder::new(config.nodes.clone(), config.node_timeout)?;
        Ok(Self::new(forwarder)
            .with_attestation_check(config.verify_attestation)
            .with_body_limit(config.max_body_bytes))
    }
}
