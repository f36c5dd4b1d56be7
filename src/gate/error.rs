// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reasons a session is not accepted.

use axum::http::StatusCode;
use thiserror::Error;

/// Why the gatekeeper treats a request as unauthenticated.
///
/// Every variant collapses into a redirect toward re-authentication; the
/// distinction only matters for logging and for [`GateError::RefreshFailed`],
/// which ends the refresh chain at the login route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// No session cookie was presented.
    #[error("no access token presented")]
    Unauthenticated,
    /// The authorization service answered with a non-200 status.
    #[error("access token rejected with status {0}")]
    TokenRejected(StatusCode),
    /// Transport failure or timeout talking to the authorization service.
    #[error("authorization service unreachable: {0}")]
    ServiceUnreachable(String),
    /// The refresh call failed or returned an unusable response.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

impl GateError {
    /// Short machine-readable code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Unauthenticated => "unauthenticated",
            GateError::TokenRejected(_) => "token_rejected",
            GateError::ServiceUnreachable(_) => "service_unreachable",
            GateError::RefreshFailed(_) => "refresh_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(GateError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(
            GateError::TokenRejected(StatusCode::UNAUTHORIZED).code(),
            "token_rejected"
        );
        assert_eq!(
            GateError::ServiceUnreachable("refused".into()).code(),
            "service_unreachable"
        );
        assert_eq!(GateError::RefreshFailed("401".into()).code(), "refresh_failed");
    }

    #[test]
    fn display_includes_detail() {
        let err = GateError::TokenRejected(StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "access token rejected with status 401 Unauthorized");

        let err = GateError::ServiceUnreachable("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
