// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

use crate::gate::{middleware::finish, CorsPolicy, Outcome};
use crate::state::AppState;

/// `GET /logout`: revoke the refresh session and clear the access token.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let gatekeeper = state.gatekeeper.as_ref();
    let decision = gatekeeper.logout(&headers).await;
    tracing::info!("Session logged out");

    let response = match &decision.outcome {
        Outcome::RedirectTo(target) => Redirect::temporary(target).into_response(),
        Outcome::Forward | Outcome::RespondDirect => StatusCode::NO_CONTENT.into_response(),
    };
    finish(gatekeeper, CorsPolicy::origin_of(&headers).as_ref(), &decision, response)
}
