// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted authorization service for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode};

use super::authority::{Authority, RefreshGrant};
use super::cors::CorsPolicy;
use super::decision::Verdict;
use super::error::GateError;
use super::gatekeeper::Gatekeeper;
use super::routes::RouteTable;
use crate::config::RefreshPolicy;

pub const ALLOWED_ORIGIN: &str = "https://persons.example.com";

/// Accepts exactly one token; refreshes to `refresh_to` when set.
#[derive(Default)]
pub struct ScriptedAuthority {
    pub valid_token: Option<String>,
    pub refresh_to: Option<String>,
    pub relay: Vec<HeaderValue>,
    pub delay: Option<Duration>,
    pub authorize_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl ScriptedAuthority {
    pub fn accepting(token: &str) -> Self {
        Self {
            valid_token: Some(token.to_string()),
            ..Self::default()
        }
    }

    pub fn refreshing_to(mut self, token: &str) -> Self {
        self.refresh_to = Some(token.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Authority for ScriptedAuthority {
    async fn authorize(&self, token: &str, _request_headers: &HeaderMap) -> Verdict {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.valid_token.as_deref() == Some(token) {
            Verdict::Valid
        } else {
            Verdict::Invalid(GateError::TokenRejected(StatusCode::UNAUTHORIZED))
        }
    }

    async fn refresh(&self, _request_headers: &HeaderMap) -> Result<RefreshGrant, GateError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match &self.refresh_to {
            Some(token) => Ok(RefreshGrant {
                access_token: token.clone(),
                relay: self.relay.clone(),
            }),
            None => Err(GateError::RefreshFailed("HTTP 401".to_string())),
        }
    }

    async fn logout(&self, _request_headers: &HeaderMap) -> Result<Vec<HeaderValue>, GateError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(vec![HeaderValue::from_static("refresh_token=; Max-Age=0")])
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

/// Gatekeeper over the persons route table with a one-second timeout.
pub fn gatekeeper(policy: RefreshPolicy, authority: Arc<ScriptedAuthority>) -> Gatekeeper {
    Gatekeeper::new(
        RouteTable::persons(policy),
        policy,
        CorsPolicy::new([ALLOWED_ORIGIN]),
        authority,
        Duration::from_secs(1),
    )
}
