// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The request gatekeeper: runs the decision state machine against the
//! authorization service.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method};

use super::authority::{Authority, RefreshGrant};
use super::cookie::{read_cookie, CookieInstruction, SESSION_COOKIE};
use super::cors::CorsPolicy;
use super::decision::{decide, decide_after_refresh, Decision, Outcome, Step, Verdict};
use super::error::GateError;
use super::routes::{RouteClass, RouteTable};
use crate::config::RefreshPolicy;

/// The parts of an inbound request the gatekeeper looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

/// Session gatekeeper for one route table.
#[derive(Clone)]
pub struct Gatekeeper {
    routes: RouteTable,
    policy: RefreshPolicy,
    cors: CorsPolicy,
    authority: Arc<dyn Authority>,
    timeout: Duration,
}

impl Gatekeeper {
    pub fn new(
        routes: RouteTable,
        policy: RefreshPolicy,
        cors: CorsPolicy,
        authority: Arc<dyn Authority>,
        timeout: Duration,
    ) -> Self {
        Self {
            routes,
            policy,
            cors,
            authority,
            timeout,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    pub fn authority(&self) -> &Arc<dyn Authority> {
        &self.authority
    }

    /// Decide what happens to a gated request.
    ///
    /// Preflights are answered without consulting the authorization service.
    /// Otherwise the service is called at most once to authorize and, under
    /// the inline refresh policy, at most once more to refresh.
    pub async fn evaluate(&self, request: RequestContext<'_>) -> Decision {
        if *request.method == Method::OPTIONS {
            return Decision::respond_direct();
        }

        let token = read_cookie(request.headers, SESSION_COOKIE);
        let verdict = match self.routes.classify(request.path) {
            None | Some(RouteClass::Public) => return Decision::forward(),
            Some(_) => self.verdict(token.as_deref(), request.headers).await,
        };

        if let Verdict::Invalid(reason) = &verdict {
            tracing::info!(
                path = request.path,
                reason = reason.code(),
                "Session not accepted"
            );
        }

        let token_presented = token.is_some();
        match decide(&self.routes, self.policy, request.path, &verdict, token_presented) {
            Step::Done(decision) => decision,
            Step::AttemptRefresh => {
                let refresh = self.refresh(request.headers).await;
                if let Err(reason) = &refresh {
                    tracing::info!(path = request.path, reason = %reason, "Inline refresh failed");
                }
                decide_after_refresh(&self.routes, request.path, refresh, token_presented)
            }
        }
    }

    /// End the session: revoke it at the authorization service and send the
    /// browser to login with the session cookie cleared.
    ///
    /// The local cookie is cleared even when the service cannot be reached.
    pub async fn logout(&self, headers: &HeaderMap) -> Decision {
        let mut cookies = Vec::new();
        match tokio::time::timeout(self.timeout, self.authority.logout(headers)).await {
            Ok(Ok(relay)) => cookies.extend(relay.into_iter().map(CookieInstruction::Relay)),
            Ok(Err(e)) => tracing::warn!(error = %e, "Logout at authorization service failed"),
            Err(_) => tracing::warn!("Logout at authorization service timed out"),
        }
        cookies.push(CookieInstruction::Delete);

        Decision {
            outcome: Outcome::RedirectTo(self.routes.login().to_string()),
            cookies,
        }
    }

    async fn verdict(&self, token: Option<&str>, headers: &HeaderMap) -> Verdict {
        let Some(token) = token else {
            return Verdict::Invalid(GateError::Unauthenticated);
        };
        match tokio::time::timeout(self.timeout, self.authority.authorize(token, headers)).await {
            Ok(verdict) => verdict,
            Err(_) => Verdict::Invalid(GateError::ServiceUnreachable(format!(
                "authorize timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn refresh(&self, headers: &HeaderMap) -> Result<RefreshGrant, GateError> {
        match tokio::time::timeout(self.timeout, self.authority.refresh(headers)).await {
            Ok(result) => result.map_err(|e| match e {
                GateError::RefreshFailed(_) => e,
                other => GateError::RefreshFailed(other.to_string()),
            }),
            Err(_) => Err(GateError::RefreshFailed(format!(
                "refresh timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
