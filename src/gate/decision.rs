// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pure routing decisions.
//!
//! The gatekeeper is a small state machine: given the request path and the
//! authorization verdict it yields either a final [`Decision`] or asks for a
//! token refresh first ([`Step::AttemptRefresh`]), whose result is folded in
//! by [`decide_after_refresh`]. Nothing here performs I/O, so every branch
//! is unit-testable with a hand-made verdict.

use super::authority::RefreshGrant;
use super::cookie::CookieInstruction;
use super::error::GateError;
use super::routes::{RouteClass, RouteTable};
use crate::config::RefreshPolicy;

/// Result of checking the session against the authorization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(GateError),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// What happens to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Pass the request on to the upstream.
    Forward,
    /// Send the browser elsewhere.
    RedirectTo(String),
    /// Answer without touching the upstream (preflight).
    RespondDirect,
}

/// A routing outcome plus the cookie side effects that go with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    pub cookies: Vec<CookieInstruction>,
}

impl Decision {
    pub fn forward() -> Self {
        Self {
            outcome: Outcome::Forward,
            cookies: Vec::new(),
        }
    }

    pub fn respond_direct() -> Self {
        Self {
            outcome: Outcome::RespondDirect,
            cookies: Vec::new(),
        }
    }

    fn with_cookies(outcome: Outcome, cookies: Vec<CookieInstruction>) -> Self {
        Self { outcome, cookies }
    }
}

/// Intermediate state of the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Done(Decision),
    /// The session was not accepted; ask the authorization service for a new
    /// access token before deciding.
    AttemptRefresh,
}

/// Decide what to do with a gated request given its authorization verdict.
///
/// `token_presented` is whether the request carried a session cookie; only
/// then is a delete instruction emitted.
pub fn decide(
    routes: &RouteTable,
    policy: RefreshPolicy,
    path: &str,
    verdict: &Verdict,
    token_presented: bool,
) -> Step {
    let class = match routes.classify(path) {
        None | Some(RouteClass::Public) => return Step::Done(Decision::forward()),
        Some(class) => class,
    };

    if verdict.is_valid() {
        return Step::Done(authenticated(routes, path, class, Vec::new()));
    }

    match (class, policy) {
        (
            RouteClass::Protected | RouteClass::Entry | RouteClass::Guest,
            RefreshPolicy::Inline,
        ) => Step::AttemptRefresh,
        (RouteClass::Protected | RouteClass::Entry, RefreshPolicy::Redirect) => Step::Done(
            redirect(routes, path, routes.refresh(), expire(token_presented)),
        ),
        (RouteClass::Guest, RefreshPolicy::Redirect) => Step::Done(Decision::with_cookies(
            Outcome::Forward,
            expire(token_presented),
        )),
        (RouteClass::ErrorTerminal | RouteClass::Public, _) => Step::Done(redirect(
            routes,
            path,
            routes.login(),
            expire(token_presented),
        )),
    }
}

/// Finish a [`Step::AttemptRefresh`] with the outcome of the refresh call.
pub fn decide_after_refresh(
    routes: &RouteTable,
    path: &str,
    refresh: Result<RefreshGrant, GateError>,
    token_presented: bool,
) -> Decision {
    let class = routes.classify(path).unwrap_or(RouteClass::Protected);

    match refresh {
        Ok(grant) => {
            let mut cookies = vec![CookieInstruction::Set(grant.access_token)];
            cookies.extend(grant.relay.into_iter().map(CookieInstruction::Relay));
            authenticated(routes, path, class, cookies)
        }
        Err(_) if class == RouteClass::Guest => {
            Decision::with_cookies(Outcome::Forward, expire(token_presented))
        }
        Err(_) => redirect(routes, path, routes.login(), expire(token_presented)),
    }
}

fn authenticated(
    routes: &RouteTable,
    path: &str,
    class: RouteClass,
    cookies: Vec<CookieInstruction>,
) -> Decision {
    match class {
        RouteClass::Entry | RouteClass::Guest | RouteClass::ErrorTerminal => {
            redirect(routes, path, routes.landing(), cookies)
        }
        RouteClass::Protected | RouteClass::Public => {
            Decision::with_cookies(Outcome::Forward, cookies)
        }
    }
}

/// Redirect to `target`, never to the current path.
///
/// A self-redirect escalates to the login route; on the login route itself
/// the request is forwarded.
fn redirect(
    routes: &RouteTable,
    path: &str,
    target: &str,
    cookies: Vec<CookieInstruction>,
) -> Decision {
    let outcome = if !RouteTable::same_route(path, target) {
        Outcome::RedirectTo(target.to_string())
    } else if !RouteTable::same_route(path, routes.login()) {
        Outcome::RedirectTo(routes.login().to_string())
    } else {
        Outcome::Forward
    };
    Decision::with_cookies(outcome, cookies)
}

fn expire(token_presented: bool) -> Vec<CookieInstruction> {
    if token_presented {
        vec![CookieInstruction::Delete]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn table(policy: RefreshPolicy) -> RouteTable {
        RouteTable::persons(policy)
    }

    fn rejected() -> Verdict {
        Verdict::Invalid(GateError::TokenRejected(StatusCode::UNAUTHORIZED))
    }

    fn missing() -> Verdict {
        Verdict::Invalid(GateError::Unauthenticated)
    }

    fn done(step: Step) -> Decision {
        match step {
            Step::Done(decision) => decision,
            Step::AttemptRefresh => panic!("expected a final decision"),
        }
    }

    fn redirect_to(target: &str) -> Outcome {
        Outcome::RedirectTo(target.to_string())
    }

    #[test]
    fn valid_session_on_protected_route_forwards() {
        let routes = table(RefreshPolicy::Redirect);
        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/persons", &Verdict::Valid, true));
        assert_eq!(decision, Decision::forward());
    }

    #[test]
    fn valid_session_on_entry_routes_goes_to_landing() {
        let routes = table(RefreshPolicy::Redirect);
        for path in ["/", "/login", "/signup"] {
            let decision = done(decide(&routes, RefreshPolicy::Redirect, path, &Verdict::Valid, true));
            assert_eq!(decision.outcome, redirect_to("/persons"), "path {path}");
            assert!(decision.cookies.is_empty());
        }
    }

    #[test]
    fn valid_session_on_refresh_error_goes_to_landing() {
        let routes = table(RefreshPolicy::Redirect);
        let decision = done(decide(
            &routes,
            RefreshPolicy::Redirect,
            "/refresh-error",
            &Verdict::Valid,
            true,
        ));
        assert_eq!(decision.outcome, redirect_to("/persons"));
    }

    #[test]
    fn missing_session_on_protected_route_redirects_to_refresh() {
        let routes = table(RefreshPolicy::Redirect);
        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/persons", &missing(), false));
        assert_eq!(decision.outcome, redirect_to("/refresh"));
        assert!(decision.cookies.is_empty());
    }

    #[test]
    fn rejected_session_is_deleted_before_redirect() {
        let routes = table(RefreshPolicy::Redirect);
        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/persons", &rejected(), true));
        assert_eq!(decision.outcome, redirect_to("/refresh"));
        assert_eq!(decision.cookies, vec![CookieInstruction::Delete]);
    }

    #[test]
    fn unreachable_service_fails_closed() {
        let routes = table(RefreshPolicy::Redirect);
        let verdict = Verdict::Invalid(GateError::ServiceUnreachable("timeout".into()));
        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/persons", &verdict, true));
        assert_eq!(decision.outcome, redirect_to("/refresh"));
        assert_eq!(decision.cookies, vec![CookieInstruction::Delete]);
    }

    #[test]
    fn unauthenticated_guest_routes_forward() {
        let routes = table(RefreshPolicy::Redirect);
        for path in ["/login", "/signup"] {
            let decision = done(decide(&routes, RefreshPolicy::Redirect, path, &missing(), false));
            assert_eq!(decision, Decision::forward(), "path {path}");
        }
        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/login", &rejected(), true));
        assert_eq!(decision.outcome, Outcome::Forward);
        assert_eq!(decision.cookies, vec![CookieInstruction::Delete]);
    }

    #[test]
    fn unauthenticated_root_goes_through_refresh() {
        let routes = table(RefreshPolicy::Redirect);

        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/", &missing(), false));
        assert_eq!(decision.outcome, redirect_to("/refresh"));
        assert!(decision.cookies.is_empty());

        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/", &rejected(), true));
        assert_eq!(decision.outcome, redirect_to("/refresh"));
        assert_eq!(decision.cookies, vec![CookieInstruction::Delete]);
    }

    #[test]
    fn failed_inline_refresh_on_root_goes_to_login() {
        let routes = table(RefreshPolicy::Inline);
        assert_eq!(
            decide(&routes, RefreshPolicy::Inline, "/", &missing(), false),
            Step::AttemptRefresh
        );

        let decision = decide_after_refresh(
            &routes,
            "/",
            Err(GateError::RefreshFailed("status 401".into())),
            false,
        );
        assert_eq!(decision.outcome, redirect_to("/login"));
    }

    #[test]
    fn refresh_error_without_session_ends_at_login() {
        let routes = table(RefreshPolicy::Redirect);
        let decision = done(decide(
            &routes,
            RefreshPolicy::Redirect,
            "/refresh-error",
            &missing(),
            false,
        ));
        assert_eq!(decision.outcome, redirect_to("/login"));
    }

    #[test]
    fn public_routes_forward_regardless_of_verdict() {
        let routes = table(RefreshPolicy::Redirect);
        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/refresh", &rejected(), true));
        assert_eq!(decision, Decision::forward());
    }

    #[test]
    fn self_redirect_escalates_to_login() {
        let routes = RouteTable::new("/persons", "/login", "/refresh")
            .with_route("/refresh", RouteClass::Protected)
            .with_route("/login", RouteClass::ErrorTerminal);

        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/refresh", &missing(), false));
        assert_eq!(decision.outcome, redirect_to("/login"));

        let decision = done(decide(&routes, RefreshPolicy::Redirect, "/login", &missing(), false));
        assert_eq!(decision.outcome, Outcome::Forward);
    }

    #[test]
    fn never_redirects_to_itself() {
        for policy in [RefreshPolicy::Redirect, RefreshPolicy::Inline] {
            let routes = table(policy);
            for path in ["/", "/login", "/signup", "/persons", "/refresh", "/refresh-error"] {
                for verdict in [Verdict::Valid, rejected(), missing()] {
                    let decision = match decide(&routes, policy, path, &verdict, true) {
                        Step::Done(decision) => decision,
                        Step::AttemptRefresh => decide_after_refresh(
                            &routes,
                            path,
                            Err(GateError::RefreshFailed("401".into())),
                            true,
                        ),
                    };
                    if let Outcome::RedirectTo(target) = &decision.outcome {
                        assert!(
                            !RouteTable::same_route(path, target),
                            "{path} redirected to itself"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn decisions_are_repeatable() {
        let routes = table(RefreshPolicy::Redirect);
        let first = decide(&routes, RefreshPolicy::Redirect, "/persons", &Verdict::Valid, true);
        let second = decide(&routes, RefreshPolicy::Redirect, "/persons", &Verdict::Valid, true);
        assert_eq!(first, second);
    }

    #[test]
    fn inline_policy_asks_for_refresh() {
        let routes = table(RefreshPolicy::Inline);
        for path in ["/persons", "/login"] {
            assert_eq!(
                decide(&routes, RefreshPolicy::Inline, path, &rejected(), true),
                Step::AttemptRefresh
            );
        }
        let decision = done(decide(&routes, RefreshPolicy::Inline, "/refresh", &missing(), false));
        assert_eq!(decision.outcome, redirect_to("/login"));
    }

    #[test]
    fn successful_refresh_sets_cookie_and_forwards() {
        let routes = table(RefreshPolicy::Inline);
        let grant = RefreshGrant {
            access_token: "fresh".into(),
            relay: vec![HeaderValue::from_static("refresh_token=r2; HttpOnly")],
        };
        let decision = decide_after_refresh(&routes, "/persons", Ok(grant), true);
        assert_eq!(decision.outcome, Outcome::Forward);
        assert_eq!(
            decision.cookies,
            vec![
                CookieInstruction::Set("fresh".into()),
                CookieInstruction::Relay(HeaderValue::from_static("refresh_token=r2; HttpOnly")),
            ]
        );
    }

    #[test]
    fn successful_refresh_on_guest_route_goes_to_landing() {
        let routes = table(RefreshPolicy::Inline);
        let grant = RefreshGrant {
            access_token: "fresh".into(),
            relay: Vec::new(),
        };
        let decision = decide_after_refresh(&routes, "/login", Ok(grant), false);
        assert_eq!(decision.outcome, redirect_to("/persons"));
        assert_eq!(decision.cookies, vec![CookieInstruction::Set("fresh".into())]);
    }

    #[test]
    fn failed_refresh_goes_to_login() {
        let routes = table(RefreshPolicy::Inline);
        let decision = decide_after_refresh(
            &routes,
            "/persons",
            Err(GateError::RefreshFailed("status 401".into())),
            true,
        );
        assert_eq!(decision.outcome, redirect_to("/login"));
        assert_eq!(decision.cookies, vec![CookieInstruction::Delete]);
    }

    #[test]
    fn failed_refresh_on_guest_route_forwards() {
        let routes = table(RefreshPolicy::Inline);
        let decision = decide_after_refresh(
            &routes,
            "/signup",
            Err(GateError::RefreshFailed("status 401".into())),
            false,
        );
        assert_eq!(decision, Decision::forward());
    }
}
