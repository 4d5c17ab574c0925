//! Security tracker
//!
//! Correlates usernames with their observed source IPs and event counts to
//! flag possible credential sharing and event-rate abuse. Detection only,
//! no enforcement: a flagged request still proceeds.
//!
//! The tracker is an owned, injectable component; one mutex guards the whole
//! mapping plus the accumulated alert buffer. Critical sections are small
//! and the lock is never held across an await point.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::models::{ActionKind, AlertKind, SecurityAlert, SecurityReport};

/// Per-username observations within the current reporting window
#[derive(Debug, Clone)]
pub struct SecurityRecord {
    pub known_ips: HashSet<String>,
    pub event_count: u64,
}

struct TrackerState {
    records: HashMap<String, SecurityRecord>,
    alerts: Vec<SecurityAlert>,
    window_start: DateTime<Utc>,
}

/// Tracks user/IP/event anomalies across requests
pub struct SecurityTracker {
    event_threshold: u64,
    state: Mutex<TrackerState>,
}

impl SecurityTracker {
    /// Create a tracker with the given per-window event threshold
    pub fn new(event_threshold: u64) -> Self {
        SecurityTracker {
            event_threshold,
            state: Mutex::new(TrackerState {
                records: HashMap::new(),
                alerts: Vec::new(),
                window_start: Utc::now(),
            }),
        }
    }

    /// Record an action for a username and return any alerts it raised.
    ///
    /// Alerts are also written to the log and buffered for the next report.
    /// This never fails; a poisoned lock is treated as an empty result.
    pub fn track(&self, username: &str, source_ip: &str, kind: ActionKind) -> Vec<SecurityAlert> {
        let mut alerts = Vec::new();
        let now = Utc::now();

        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(e) => {
                log::error!("Security tracker lock poisoned: {}", e);
                return alerts;
            }
        };

        let record = state
            .records
            .entry(username.to_string())
            .or_insert_with(|| SecurityRecord {
                known_ips: HashSet::from([source_ip.to_string()]),
                event_count: 0,
            });

        // Every new IP beyond the first re-triggers the alert, not just the
        // second one ever seen.
        if record.known_ips.insert(source_ip.to_string()) && record.known_ips.len() > 1 {
            let mut observed: Vec<String> = record.known_ips.iter().cloned().collect();
            observed.sort();
            alerts.push(SecurityAlert {
                kind: AlertKind::IpChange,
                severity: 8,
                user: username.to_string(),
                source_ip: source_ip.to_string(),
                observed_ips: observed.clone(),
                event_count: record.event_count,
                timestamp: now,
                description: format!(
                    "User '{}' seen from new IP {} ({} IPs this window). \
                     Possible credential sharing.",
                    username,
                    source_ip,
                    observed.len()
                ),
            });
        }

        if kind == ActionKind::Event {
            record.event_count += 1;
            if record.event_count > self.event_threshold {
                let mut observed: Vec<String> = record.known_ips.iter().cloned().collect();
                observed.sort();
                alerts.push(SecurityAlert {
                    kind: AlertKind::RateAbuse,
                    severity: rate_severity(record.event_count, self.event_threshold),
                    user: username.to_string(),
                    source_ip: source_ip.to_string(),
                    observed_ips: observed,
                    event_count: record.event_count,
                    timestamp: now,
                    description: format!(
                        "User '{}' sent {} events this window (threshold: {}). \
                         Possible automated abuse.",
                        username, record.event_count, self.event_threshold
                    ),
                });
            }
        }

        for alert in &alerts {
            log::warn!("ALERT [{:?}] {}", alert.kind, alert.description);
        }
        state.alerts.extend(alerts.iter().cloned());

        alerts
    }

    /// Close the current reporting window: drain all records and buffered
    /// alerts atomically and return them as a report. Tracking resumes with
    /// a fresh window.
    pub fn reset(&self) -> SecurityReport {
        let now = Utc::now();

        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(e) => {
                log::error!("Security tracker lock poisoned: {}", e);
                return SecurityReport {
                    window_start: now,
                    window_end: now,
                    users_seen: 0,
                    alerts: Vec::new(),
                };
            }
        };

        let users_seen = state.records.len();
        state.records.clear();
        let alerts = std::mem::take(&mut state.alerts);
        let window_start = std::mem::replace(&mut state.window_start, now);

        SecurityReport {
            window_start,
            window_end: now,
            users_seen,
            alerts,
        }
    }

    /// Snapshot of a single user's record, if any
    pub fn record(&self, username: &str) -> Option<SecurityRecord> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.records.get(username).cloned())
    }
}

fn rate_severity(count: u64, threshold: u64) -> u8 {
    let ratio = count as f64 / threshold as f64;
    if ratio > 5.0 {
        10
    } else if ratio > 3.0 {
        9
    } else if ratio > 2.0 {
        8
    } else {
        7
    }
}
