// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deterministic JSON encoding of payload objects.

use serde_json::{Map, Value};

/// Serialize `payload` with its top-level keys in ascending code-point order.
///
/// Only the top level is reordered. Nested objects keep their insertion
/// order, so two payloads that differ only in nested key order produce
/// different output.
pub fn canonicalize(payload: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = payload.keys().collect();
    keys.sort();

    let mut ordered = Map::with_capacity(payload.len());
    for key in keys {
        ordered.insert(key.clone(), payload[key.as_str()].clone());
    }
    Value::Object(ordered).to_string()
}
