// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Gatekeeper
//!
//! Runs in front of every page request of the persons front-end and decides
//! whether to forward it, redirect it, or answer it directly.
//!
//! ## Flow
//!
//! 1. `OPTIONS` requests are preflights: answered with CORS headers only.
//! 2. The path is classified (see [`routes`]); public paths are forwarded.
//! 3. The `access_token` cookie is checked with the authorization service.
//! 4. [`decision`] maps path and verdict to forward / redirect, plus cookie
//!    instructions (delete a rejected token, set a refreshed one).
//! 5. CORS headers are merged into every response.
//!
//! ## Failure
//!
//! Any failure of the authorization service (non-200, transport error,
//! timeout) is treated as "not authenticated". The gatekeeper never fails
//! open and never produces an error response of its own.

pub mod authority;
pub mod cookie;
pub mod cors;
pub mod decision;
pub mod error;
pub mod gatekeeper;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

pub use authority::{Authority, HttpAuthority, RefreshGrant};
pub use cookie::CookieInstruction;
pub use cors::CorsPolicy;
pub use decision::{Decision, Outcome, Verdict};
pub use error::GateError;
pub use gatekeeper::{Gatekeeper, RequestContext};
pub use routes::{RouteClass, RouteTable};
