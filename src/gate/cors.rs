// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CORS headers for gated responses and preflight answers.

use axum::{
    body::Body,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
        },
        HeaderMap, HeaderValue, StatusCode,
    },
    response::Response,
};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Exact-match origin allow-list.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed_origins: allowed_origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    /// The request's `Origin` header, if any.
    pub fn origin_of(request_headers: &HeaderMap) -> Option<HeaderValue> {
        request_headers.get(ORIGIN).cloned()
    }

    /// The origin to reflect back, if allow-listed.
    fn reflected_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        let origin = origin?;
        let origin_str = origin.to_str().ok()?;
        self.is_allowed(origin_str).then(|| origin.clone())
    }

    /// Merge the fixed CORS headers, plus the reflected origin when allowed.
    pub fn apply(&self, origin: Option<&HeaderValue>, response_headers: &mut HeaderMap) {
        response_headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        response_headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        // The answer depends on the origin whether or not it is allowed.
        if origin.is_some() {
            response_headers.append(VARY, HeaderValue::from_static("Origin"));
        }
        match self.reflected_origin(origin) {
            Some(origin) => {
                response_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }
            // An upstream must not leak its own allow-origin past the list.
            None => {
                response_headers.remove(ACCESS_CONTROL_ALLOW_ORIGIN);
            }
        }
    }

    /// Answer a preflight request: `200`, empty body, CORS headers only.
    pub fn preflight(&self, origin: Option<&HeaderValue>) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        self.apply(origin, response.headers_mut());
        response
    }
}
