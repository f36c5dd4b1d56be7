// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reverse proxy to the front-end server.
//!
//! Requests the gatekeeper forwards, and every request outside the gated
//! route set, are re-issued to the upstream with the same method, path,
//! query, headers and body. Upstream redirects are passed back to the
//! browser rather than followed.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{
            CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
            TRAILER, TRANSFER_ENCODING, UPGRADE,
        },
        HeaderMap, HeaderName,
    },
    response::Response,
};
use thiserror::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest request body buffered for forwarding (10 MiB).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Bound on a whole upstream exchange.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("request body too large or unreadable")]
    BodyTooLarge,
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("invalid upstream response: {0}")]
    InvalidResponse(#[from] axum::http::Error),
}

/// Headers that describe one connection and must not be forwarded, plus
/// the ones the outbound client recomputes.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    [
        CONNECTION,
        TRANSFER_ENCODING,
        TE,
        TRAILER,
        UPGRADE,
        PROXY_AUTHORIZATION,
        PROXY_AUTHENTICATE,
        HOST,
        CONTENT_LENGTH,
    ]
    .contains(name)
        || name.as_str() == "keep-alive"
}

/// Copy of `headers` without hop-by-hop headers.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            forwarded.append(name.clone(), value.clone());
        }
    }
    forwarded
}

/// Client for the front-end server.
#[derive(Clone)]
pub struct Upstream {
    base_url: String,
    client: reqwest::Client,
}

impl Upstream {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(UPSTREAM_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Re-issue `request` against the upstream and return its response.
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);

        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| ProxyError::BodyTooLarge)?;

        let mut headers = forwardable_headers(&parts.headers);
        if let Some(host) = parts.headers.get(HOST) {
            headers.insert(X_FORWARDED_HOST, host.clone());
        }

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let mut response = Response::builder().status(upstream.status());
        for (name, value) in upstream.headers() {
            if !is_hop_by_hop(name) {
                response = response.header(name, value);
            }
        }
        let bytes = upstream.bytes().await?;
        Ok(response.body(Body::from(bytes))?)
    }
}

/// Fallback handler: forward to the upstream front-end.
pub async fn forward(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    state.upstream.forward(request).await.map_err(|e| {
        tracing::warn!(error = %e, upstream = state.upstream.base_url(), "Upstream request failed");
        ApiError::from(e)
    })
}
