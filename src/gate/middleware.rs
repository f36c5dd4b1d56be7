// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum middleware applying gatekeeper decisions to live requests.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .fallback(proxy::forward)
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), gate));
//! ```

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::cookie;
use super::cors::CorsPolicy;
use super::decision::{Decision, Outcome};
use super::gatekeeper::{Gatekeeper, RequestContext};
use crate::state::AppState;

/// Gate every request whose path is in the route table; let the rest through.
pub async fn gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let gatekeeper = state.gatekeeper.as_ref();
    if !gatekeeper.routes().is_gated(request.uri().path()) {
        return next.run(request).await;
    }

    let decision = gatekeeper
        .evaluate(RequestContext {
            method: request.method(),
            path: request.uri().path(),
            headers: request.headers(),
        })
        .await;
    let origin = CorsPolicy::origin_of(request.headers());

    tracing::debug!(
        method = %request.method(),
        path = request.uri().path(),
        outcome = ?decision.outcome,
        "Gate decision"
    );

    let response = match &decision.outcome {
        Outcome::RespondDirect => return gatekeeper.cors().preflight(origin.as_ref()),
        Outcome::Forward => {
            cookie::apply_to_request(request.headers_mut(), &decision.cookies);
            next.run(request).await
        }
        Outcome::RedirectTo(target) => Redirect::temporary(target).into_response(),
    };

    finish(gatekeeper, origin.as_ref(), &decision, response)
}

/// Apply a decision's cookie instructions and the CORS headers to a response.
pub fn finish(
    gatekeeper: &Gatekeeper,
    origin: Option<&HeaderValue>,
    decision: &Decision,
    mut response: Response,
) -> Response {
    cookie::apply_to_response(response.headers_mut(), &decision.cookies);
    gatekeeper.cors().apply(origin, response.headers_mut());
    response
}
