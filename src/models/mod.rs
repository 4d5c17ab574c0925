use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated session payload stored in the cookie-backed session store.
///
/// Both fields are written together at login time; a session that carries a
/// `user` always carries the matching `login_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: String,
    pub login_time: DateTime<Utc>,
}

/// Command forwarded to the upstream execution service.
///
/// Constructed per request from form fields, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub platform: String,
    pub device_id: String,
    pub event_name: String,
}

/// Normalized outcome of an upstream call, returned directly to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyResult {
    pub success: bool,
    pub message: String,
}

/// Kind of user action the security tracker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Login,
    Event,
}

/// Anomaly category raised by the security tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// A username was seen from more than one source IP.
    IpChange,
    /// A username exceeded the per-window event threshold.
    RateAbuse,
}

/// A single anomaly observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub kind: AlertKind,
    pub severity: u8,
    pub user: String,
    pub source_ip: String,
    pub observed_ips: Vec<String>,
    pub event_count: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// Accumulated tracker state for one reporting window, handed to the
/// report sink when the window closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub users_seen: usize,
    pub alerts: Vec<SecurityAlert>,
}

/// App/event catalog served by the upstream: app name to its event names.
pub type AppCatalog = HashMap<String, Vec<String>>;
