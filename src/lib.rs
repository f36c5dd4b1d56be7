// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persons Gatekeeper - edge session gatekeeper for the persons directory
//!
//! Every page request of the persons front-end passes through this service.
//! It validates the `access_token` cookie with the authorization service and
//! forwards, redirects, or answers CORS preflights accordingly.
//!
//! ## Modules
//!
//! - `api` - Router, health probes and logout
//! - `gate` - Gatekeeper decision logic and middleware
//! - `proxy` - Reverse proxy to the front-end server
//! - `config` - Environment configuration

pub mod api;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod proxy;
pub mod state;
