//! Session authentication gate
//!
//! Decides whether a request carries a valid, unexpired session. The gate is
//! a pure function over the session payload; clearing an expired session is
//! left to the caller so the decision stays testable in isolation.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::SessionData;

/// Outcome of evaluating a session against the configured TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No session, or a session already cleared
    Anonymous,
    /// Valid session within its TTL
    Authenticated(SessionData),
    /// Session older than the TTL; the caller must clear it, after which
    /// re-evaluation yields `Anonymous`
    Expired,
}

/// Evaluate a session payload.
///
/// A `ttl` of `None` disables age-based expiry entirely; sessions then stay
/// valid until explicit logout.
pub fn evaluate(data: Option<SessionData>, now: DateTime<Utc>, ttl: Option<Duration>) -> AuthState {
    let data = match data {
        Some(data) => data,
        None => return AuthState::Anonymous,
    };

    if let Some(ttl) = ttl {
        if now - data.login_time > ttl {
            return AuthState::Expired;
        }
    }

    AuthState::Authenticated(data)
}

/// Static username -> password mapping for the login form.
#[derive(Debug, Clone)]
pub struct Credentials {
    users: HashMap<String, String>,
}

/// Fallback pair used when the configured mapping cannot be parsed
const FALLBACK_USER: &str = "admin";
const FALLBACK_PASSWORD: &str = "admin";

impl Credentials {
    /// Parse the credential mapping from its JSON encoding.
    ///
    /// A malformed or empty mapping logs the condition and falls back to the
    /// hardcoded default pair; startup never fails on bad credentials config.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<HashMap<String, String>>(raw) {
            Ok(users) if !users.is_empty() => Credentials { users },
            Ok(_) => {
                log::warn!("Credential mapping is empty, falling back to default credentials");
                Self::fallback()
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse credential mapping ({}), falling back to default credentials",
                    e
                );
                Self::fallback()
            }
        }
    }

    fn fallback() -> Self {
        let mut users = HashMap::new();
        users.insert(FALLBACK_USER.to_string(), FALLBACK_PASSWORD.to_string());
        Credentials { users }
    }

    /// Check a username/password pair against the mapping
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|expected| expected == password)
            .unwrap_or(false)
    }
}
