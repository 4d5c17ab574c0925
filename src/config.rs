use std::env;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

/// Runtime configuration for the gateway daemon.
///
/// Every value is sourced from the environment and every value has a default;
/// a malformed variable logs a warning and falls back rather than aborting
/// startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Base URL of the upstream execution service (trailing slash stripped)
    pub upstream_url: String,
    /// Pre-shared secret sent to the upstream as `x-api-key`
    pub api_key: String,
    /// Session cookie signing secret
    pub session_secret: String,
    /// Maximum session age; `None` disables age-based expiry
    pub session_ttl: Option<ChronoDuration>,
    /// Raw JSON credential mapping (username -> password)
    pub users_json: String,
    /// Timeout for upstream execute calls
    pub upstream_timeout: Duration,
    /// Timeout for the dashboard catalog fetch
    pub catalog_timeout: Duration,
    /// Event count above which a rate-abuse alert fires
    pub event_threshold: u64,
    /// Interval between security report emissions (and tracker resets)
    pub report_interval: Duration,
    /// Own externally reachable URL; enables the keep-alive pinger when set
    pub self_url: Option<String>,
    /// Interval between keep-alive pings
    pub keepalive_interval: Duration,
}

const DEFAULT_SESSION_TTL_SECS: i64 = 7200;

impl Config {
    /// Load configuration from the environment
    pub fn from_env() -> Self {
        Config {
            bind_addr: env_str("BIND_ADDR", "0.0.0.0:8080"),
            upstream_url: normalize_base_url(&env_str("UPSTREAM_URL", "http://127.0.0.1:9000")),
            api_key: env::var("INTERNAL_API_KEY").unwrap_or_else(|_| {
                log::warn!("INTERNAL_API_KEY not set, upstream calls will be unauthenticated");
                String::new()
            }),
            session_secret: env::var("SESSION_SECRET").unwrap_or_default(),
            session_ttl: session_ttl_from_env(),
            users_json: env::var("USERS_JSON").unwrap_or_default(),
            upstream_timeout: Duration::from_secs(env_u64("UPSTREAM_TIMEOUT_SECS", 30)),
            catalog_timeout: Duration::from_secs(env_u64("CATALOG_TIMEOUT_SECS", 5)),
            event_threshold: env_u64("EVENT_ALERT_THRESHOLD", 40),
            report_interval: Duration::from_secs(env_u64("REPORT_INTERVAL_SECS", 3600)),
            self_url: env::var("SELF_URL").ok().filter(|s| !s.is_empty()),
            keepalive_interval: Duration::from_secs(env_u64("KEEPALIVE_INTERVAL_SECS", 600)),
        }
    }
}

/// Strip trailing slashes so path joins stay predictable
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn env_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        log::info!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            log::warn!("Invalid {} value '{}': {}, using default {}", key, raw, e, default);
            default
        }),
        Err(_) => default,
    }
}

/// `SESSION_TTL` in seconds; `0` or `none` disables age-based expiry
fn session_ttl_from_env() -> Option<ChronoDuration> {
    match env::var("SESSION_TTL") {
        Ok(raw) if raw == "0" || raw.eq_ignore_ascii_case("none") => None,
        Ok(raw) => match raw.parse::<i64>() {
            Ok(secs) => Some(ChronoDuration::seconds(secs)),
            Err(e) => {
                log::warn!(
                    "Invalid SESSION_TTL value '{}': {}, using default {}s",
                    raw,
                    e,
                    DEFAULT_SESSION_TTL_SECS
                );
                Some(ChronoDuration::seconds(DEFAULT_SESSION_TTL_SECS))
            }
        },
        Err(_) => Some(ChronoDuration::seconds(DEFAULT_SESSION_TTL_SECS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_slash() {
        assert_eq!(normalize_base_url("http://zone-c:9000/"), "http://zone-c:9000");
        assert_eq!(normalize_base_url("http://zone-c:9000///"), "http://zone-c:9000");
    }

    #[test]
    fn test_normalize_leaves_clean_url_alone() {
        assert_eq!(normalize_base_url("http://zone-c:9000"), "http://zone-c:9000");
    }
}
