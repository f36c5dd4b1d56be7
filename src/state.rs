// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::GatekeeperConfig;
use crate::gate::{CorsPolicy, Gatekeeper, HttpAuthority, RouteTable};
use crate::proxy::Upstream;

#[derive(Clone)]
pub struct AppState {
    pub gatekeeper: Arc<Gatekeeper>,
    pub upstream: Arc<Upstream>,
}

impl AppState {
    pub fn new(gatekeeper: Gatekeeper, upstream: Upstream) -> Self {
        Self {
            gatekeeper: Arc::new(gatekeeper),
            upstream: Arc::new(upstream),
        }
    }

    /// Wire the HTTP authorization client, route table and upstream from
    /// configuration.
    pub fn from_config(config: &GatekeeperConfig) -> Result<Self, reqwest::Error> {
        let authority = HttpAuthority::new(config.api_endpoint.as_str(), config.auth_timeout)?;
        let gatekeeper = Gatekeeper::new(
            RouteTable::persons(config.refresh_policy),
            config.refresh_policy,
            CorsPolicy::new(config.allowed_origins.iter().cloned()),
            Arc::new(authority),
            config.auth_timeout,
        );
        let upstream = Upstream::new(config.upstream_url.as_str())?;
        Ok(Self::new(gatekeeper, upstream))
    }
}
