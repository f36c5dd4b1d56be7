// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client side of the external authorization service.
//!
//! ## Endpoints
//!
//! | Call | Request | Success |
//! |------|---------|---------|
//! | authorize | `GET {base}/auth/authorize` with `Authorization: Bearer <token>` | `200` |
//! | refresh | `GET {base}/auth/refresh` with the browser's cookies | `200 {"access_token": ...}` |
//! | logout | `GET {base}/auth/logout` with the browser's cookies | `2xx` |
//! | health | `GET {base}/health` | `2xx` |
//!
//! Any other status, a transport error or a timeout counts as a rejection.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue, StatusCode,
};
use serde::Deserialize;

use super::cookie::{read_cookie, SESSION_COOKIE};
use super::decision::Verdict;
use super::error::GateError;
use crate::proxy::forwardable_headers;

/// A new access token plus cookies the service wants set in the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    pub access_token: String,
    pub relay: Vec<HeaderValue>,
}

/// Operations the gatekeeper needs from the authorization service.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Check an access token. `request_headers` are the inbound request's
    /// headers, forwarded alongside the credential.
    async fn authorize(&self, token: &str, request_headers: &HeaderMap) -> Verdict;

    /// Trade the browser's refresh cookie for a new access token.
    async fn refresh(&self, request_headers: &HeaderMap) -> Result<RefreshGrant, GateError>;

    /// Revoke the browser's refresh session. Returns cookies to relay.
    async fn logout(&self, request_headers: &HeaderMap) -> Result<Vec<HeaderValue>, GateError>;

    /// Whether the service currently answers its health check.
    async fn is_ready(&self) -> bool;
}

#[derive(Deserialize)]
struct RefreshBody {
    #[serde(alias = "token")]
    access_token: String,
}

/// Bearer credential for a possibly absent token.
///
/// An absent token yields a bare `Bearer` credential rather than an error.
pub fn bearer(token: Option<&str>) -> HeaderValue {
    let value = format!("Bearer {}", token.unwrap_or_default());
    HeaderValue::from_str(value.trim_end()).unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
}

/// [`Authority`] over HTTP.
#[derive(Clone)]
pub struct HttpAuthority {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthority {
    /// Create a client for the service rooted at `base_url`
    /// (e.g. `http://localhost:8200/api/v1`). Every call is bounded by
    /// `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_cookies(
        request: reqwest::RequestBuilder,
        request_headers: &HeaderMap,
    ) -> reqwest::RequestBuilder {
        request_headers
            .get_all(COOKIE)
            .iter()
            .fold(request, |request, cookie| request.header(COOKIE, cookie))
    }
}

#[async_trait]
impl Authority for HttpAuthority {
    async fn authorize(&self, token: &str, request_headers: &HeaderMap) -> Verdict {
        let mut headers = forwardable_headers(request_headers);
        headers.insert(AUTHORIZATION, bearer(Some(token)));

        let response = self
            .client
            .get(self.endpoint("/auth/authorize"))
            .headers(headers)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => Verdict::Valid,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Access token rejected");
                Verdict::Invalid(GateError::TokenRejected(response.status()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Authorization service unreachable");
                Verdict::Invalid(GateError::ServiceUnreachable(e.to_string()))
            }
        }
    }

    async fn refresh(&self, request_headers: &HeaderMap) -> Result<RefreshGrant, GateError> {
        let request = self.client.get(self.endpoint("/auth/refresh"));
        let response = Self::with_cookies(request, request_headers)
            .send()
            .await
            .map_err(|e| GateError::RefreshFailed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(GateError::RefreshFailed(format!(
                "HTTP {} from refresh endpoint",
                response.status()
            )));
        }

        let relay: Vec<HeaderValue> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .cloned()
            .collect();
        let body: RefreshBody = response
            .json()
            .await
            .map_err(|e| GateError::RefreshFailed(e.to_string()))?;

        if body.access_token.is_empty() {
            return Err(GateError::RefreshFailed("empty access token".to_string()));
        }

        Ok(RefreshGrant {
            access_token: body.access_token,
            relay,
        })
    }

    async fn logout(&self, request_headers: &HeaderMap) -> Result<Vec<HeaderValue>, GateError> {
        let mut request = self.client.get(self.endpoint("/auth/logout"));
        if let Some(token) = read_cookie(request_headers, SESSION_COOKIE) {
            request = request.header(AUTHORIZATION, bearer(Some(&token)));
        }
        let response = Self::with_cookies(request, request_headers)
            .send()
            .await
            .map_err(|e| GateError::ServiceUnreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GateError::TokenRejected(response.status()));
        }
        Ok(response.headers().get_all(SET_COOKIE).iter().cloned().collect())
    }

    async fn is_ready(&self) -> bool {
        match self.client.get(self.endpoint("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Authorization service health check failed");
                false
            }
        }
    }
}
