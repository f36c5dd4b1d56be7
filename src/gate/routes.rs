// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static route table: which paths are gated and how each is classified.

use crate::config::RefreshPolicy;

/// Landing route for authenticated users.
pub const PERSONS_ROUTE: &str = "/persons";
/// Terminal re-authentication route.
pub const LOGIN_ROUTE: &str = "/login";
/// Route of the page that performs the token refresh.
pub const REFRESH_ROUTE: &str = "/refresh";
/// Route the refresh page navigates to when the refresh fails.
pub const REFRESH_ERROR_ROUTE: &str = "/refresh-error";

/// How a gated path treats authenticated and unauthenticated users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Forwarded without any authorization work.
    Public,
    /// Requires a valid session.
    Protected,
    /// Entry point that restores a session; authenticated users are sent to
    /// the landing route, unauthenticated users through refresh.
    Entry,
    /// Entry route serving unauthenticated users (login, signup); forwarded
    /// without a session, authenticated users are sent to the landing route.
    Guest,
    /// End of the refresh chain: unauthenticated users go to login,
    /// authenticated users go to the landing route.
    ErrorTerminal,
}

/// The set of gated paths and their classification.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<(String, RouteClass)>,
    landing: String,
    login: String,
    refresh: String,
}

impl RouteTable {
    /// Start an empty table with the given special routes.
    pub fn new(
        landing: impl Into<String>,
        login: impl Into<String>,
        refresh: impl Into<String>,
    ) -> Self {
        Self {
            routes: Vec::new(),
            landing: landing.into(),
            login: login.into(),
            refresh: refresh.into(),
        }
    }

    /// Add (or reclassify) a gated path.
    pub fn with_route(mut self, path: impl Into<String>, class: RouteClass) -> Self {
        let path = path.into();
        self.routes.retain(|(p, _)| *p != path);
        self.routes.push((path, class));
        self
    }

    /// The persons front-end table for the given refresh policy.
    ///
    /// Under [`RefreshPolicy::Redirect`] the `/refresh` page performs the
    /// refresh in the browser and must be reachable without a session. Under
    /// [`RefreshPolicy::Inline`] the gatekeeper refreshes itself and nothing
    /// is bypassed, so `/refresh` is only ever a dead end.
    pub fn persons(policy: RefreshPolicy) -> Self {
        let refresh_class = match policy {
            RefreshPolicy::Redirect => RouteClass::Public,
            RefreshPolicy::Inline => RouteClass::ErrorTerminal,
        };

        Self::new(PERSONS_ROUTE, LOGIN_ROUTE, REFRESH_ROUTE)
            .with_route("/", RouteClass::Entry)
            .with_route(LOGIN_ROUTE, RouteClass::Guest)
            .with_route("/signup", RouteClass::Guest)
            .with_route(PERSONS_ROUTE, RouteClass::Protected)
            .with_route(REFRESH_ROUTE, refresh_class)
            .with_route(REFRESH_ERROR_ROUTE, RouteClass::ErrorTerminal)
    }

    /// Classify a path, or `None` when the gatekeeper does not run for it.
    ///
    /// Matching is exact apart from a single trailing slash.
    pub fn classify(&self, path: &str) -> Option<RouteClass> {
        let path = normalize(path);
        self.routes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, class)| *class)
    }

    /// Whether the gatekeeper runs for this path at all.
    pub fn is_gated(&self, path: &str) -> bool {
        self.classify(path).is_some()
    }

    pub fn landing(&self) -> &str {
        &self.landing
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn refresh(&self) -> &str {
        &self.refresh
    }

    /// Compare a request path with a route, ignoring a trailing slash.
    pub fn same_route(path: &str, route: &str) -> bool {
        normalize(path) == normalize(route)
    }
}

fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}
