use std::{env, time::Duration};

use crate::services::reconnect::ReconnectPolicy;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    // external backend API (alerts + alert stream)
    pub backend_url: String,
    pub alert_stream_path: String,
    pub request_timeout_secs: u64,

    // auth provider session cookie (HS256 JWT)
    pub jwt_secret: String,
    pub session_cookie_name: String,

    // 0 = unbounded
    pub notification_capacity: usize,

    pub reconnect_max_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
}

impl Settings {
    pub fn capacity(&self) -> Option<usize> {
        (self.notification_capacity > 0).then_some(self.notification_capacity)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::exponential(
            self.reconnect_max_attempts,
            Duration::from_millis(self.reconnect_base_delay_ms),
            Duration::from_millis(self.reconnect_max_delay_ms),
        )
    }

    pub fn alerts_url(&self) -> String {
        join_url(&self.backend_url, "/alerts")
    }

    pub fn alert_stream_url(&self) -> String {
        join_url(&self.backend_url, &self.alert_stream_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    Settings {
        host: var_or("HOST", "127.0.0.1"),
        port: parsed_or("PORT", 3000),
        backend_url: var_or("BACKEND_URL", "http://localhost:8080"),
        alert_stream_path: var_or("ALERT_STREAM_PATH", "/alerts/subscribe"),
        request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", 10),
        jwt_secret: var_or("AUTH_JWT_SECRET", "change-me-dev-secret"),
        session_cookie_name: var_or("SESSION_COOKIE_NAME", "sb-access-token"),
        notification_capacity: parsed_or("NOTIFICATION_CAPACITY", 50),
        reconnect_max_attempts: parsed_or("RECONNECT_MAX_ATTEMPTS", 5),
        reconnect_base_delay_ms: parsed_or("RECONNECT_BASE_DELAY_MS", 500),
        reconnect_max_delay_ms: parsed_or("RECONNECT_MAX_DELAY_MS", 30_000),
    }
}
