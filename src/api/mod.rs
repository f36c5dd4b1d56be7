// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{gate, proxy, state::AppState};

pub mod health;
pub mod session;

/// Build the gatekeeper service.
///
/// Health and logout are served locally; everything else falls through to
/// the upstream proxy. The gate middleware wraps all of it but only acts on
/// paths in the route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/logout", get(session::logout))
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(state.clone(), gate::middleware::gate))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
