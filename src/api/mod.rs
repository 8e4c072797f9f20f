// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use tracing::error;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    attestation::Attestation,
    error::{ApiError, ErrorBody},
    models::{AttestFields, RequestEnvelope},
    state::AppState,
};

pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    let routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    with_middleware(
        Router::new()
            .merge(routes)
            .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi())),
    )
}

fn with_middleware(app: Router) -> Router {
    app.layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// A panicking handler still answers with the JSON error contract.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(panic = %detail, "Request handler panicked");
    ApiError::internal(String::new()).into_response()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            RequestEnvelope,
            AttestFields,
            Attestation,
            ErrorBody,
            health::ReadyResponse,
            health::NodeStatus,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Login and registration relay to auth nodes"),
        (name = "Health", description = "Liveness and auth node readiness")
    )
)]
struct ApiDoc;
