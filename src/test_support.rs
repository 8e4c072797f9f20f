// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process mock auth nodes for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::forwarder::{NODE_HEALTH_PATH, NODE_SIGN_PATH};

#[derive(Debug, Clone)]
pub(crate) enum NodeBehavior {
    Json(u16, Value),
    Text(u16, &'static str),
    Delay(Duration),
}

impl NodeBehavior {
    pub(crate) fn ok(body: Value) -> Self {
        Self::Json(200, body)
    }

    pub(crate) fn status(code: u16, body: Value) -> Self {
        Self::Json(code, body)
    }

    pub(crate) fn text(code: u16, body: &'static str) -> Self {
        Self::Text(code, body)
    }

    pub(crate) fn delayed(delay: Duration) -> Self {
        Self::Delay(delay)
    }
}

struct MockState {
    behavior: Mutex<NodeBehavior>,
    hits: AtomicUsize,
    last_body: Mutex<Option<Value>>,
    last_content_type: Mutex<Option<String>>,
}

pub(crate) struct MockNode {
    pub url: String,
    state: Arc<MockState>,
}

impl MockNode {
    /// Requests received on the sign endpoint.
    pub(crate) fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().unwrap().clone()
    }

    pub(crate) fn last_content_type(&self) -> Option<String> {
        self.state.last_content_type.lock().unwrap().clone()
    }

    pub(crate) fn set_behavior(&self, behavior: NodeBehavior) {
        *self.state.behavior.lock().unwrap() = behavior;
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

async fn sign(State(state): State<Arc<MockState>>, headers: HeaderMap, body: String) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().unwrap() = serde_json::from_str(&body).ok();
    *state.last_content_type.lock().unwrap() = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let behavior = state.behavior.lock().unwrap().clone();
    match behavior {
        NodeBehavior::Json(code, value) => (status(code), Json(value)).into_response(),
        NodeBehavior::Text(code, text) => (status(code), text).into_response(),
        NodeBehavior::Delay(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({"late": true})).into_response()
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Start a mock node on an ephemeral local port.
pub(crate) async fn spawn_node(behavior: NodeBehavior) -> MockNode {
    let state = Arc::new(MockState {
        behavior: Mutex::new(behavior),
        hits: AtomicUsize::new(0),
        last_body: Mutex::new(None),
        last_content_type: Mutex::new(None),
    });
    let app = Router::new()
        .route(NODE_SIGN_PATH, post(sign))
        .route(NODE_HEALTH_PATH, get(health))
        .layer(DefaultBodyLimit::disable())
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockNode {
        url: format!("http://{addr}"),
        state,
    }
}

/// URL of a local port with nothing listening.
pub(crate) async fn dead_node_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
