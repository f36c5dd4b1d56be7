// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookie parsing and the cookie side effects of a decision.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

/// Name of the cookie holding the access token.
pub const SESSION_COOKIE: &str = "access_token";

/// A cookie side effect to apply to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieInstruction {
    /// Store a fresh access token.
    Set(String),
    /// Expire the session cookie.
    Delete,
    /// Pass a `Set-Cookie` issued by the authorization service through to
    /// the browser unchanged (e.g. a rotated refresh token).
    Relay(HeaderValue),
}

/// Read a cookie value from every `Cookie` header of a request.
///
/// An empty value counts as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    cookie_pairs(headers)
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn cookie_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let pair = pair.trim();
            let (key, value) = pair.split_once('=')?;
            Some((key.trim(), value.trim()))
        })
}

/// Render the `Set-Cookie` header for an instruction.
///
/// Returns `None` when a token cannot be carried in a header; the caller
/// then leaves the cookie untouched.
pub fn set_cookie_header(instruction: &CookieInstruction) -> Option<HeaderValue> {
    match instruction {
        CookieInstruction::Set(token) => {
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}; Path=/; SameSite=Lax")).ok()
        }
        CookieInstruction::Delete => Some(HeaderValue::from_static(
            "access_token=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        )),
        CookieInstruction::Relay(value) => Some(value.clone()),
    }
}

/// Append the `Set-Cookie` headers for all instructions.
pub fn apply_to_response(headers: &mut HeaderMap, instructions: &[CookieInstruction]) {
    for instruction in instructions {
        match set_cookie_header(instruction) {
            Some(value) => {
                headers.append(SET_COOKIE, value);
            }
            None => tracing::warn!("Refreshed access token is not a valid header value, cookie not set"),
        }
    }
}

/// Rewrite the `Cookie` header of a request that is about to be forwarded so
/// the upstream sees the session state the browser will have after the
/// response.
///
/// Relayed cookies are left to the browser; only the session cookie changes.
pub fn apply_to_request(headers: &mut HeaderMap, instructions: &[CookieInstruction]) {
    let mut session = None;
    let mut touched = false;
    for instruction in instructions {
        match instruction {
            CookieInstruction::Set(token) => {
                session = Some(token.as_str());
                touched = true;
            }
            CookieInstruction::Delete => {
                session = None;
                touched = true;
            }
            CookieInstruction::Relay(_) => {}
        }
    }
    if !touched {
        return;
    }

    let mut pairs: Vec<String> = cookie_pairs(headers)
        .filter(|(key, _)| *key != SESSION_COOKIE)
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    if let Some(token) = session {
        pairs.push(format!("{SESSION_COOKIE}={token}"));
    }

    headers.remove(COOKIE);
    if pairs.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
        headers.insert(COOKIE, value);
    }
}
