use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::error::ApiError;

pub const DEFAULT_LIMIT: u64 = 1000;
pub const DEFAULT_WINDOW_MS: u64 = 60 * 1000;

/// Map size at which expired windows are swept out.
const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

/// Request count for one client in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u64,
    pub window_start_ms: u64,
}

/// Storage for per-client windows.
///
/// `record_hit` opens a fresh window when the current one is at least
/// `window_ms` old, otherwise bumps the count, and returns the updated window.
/// A shared implementation is needed for multi-instance deployments.
pub trait RateLimitStore: Send + Sync {
    fn record_hit(&self, client_id: &str, now_ms: u64, window_ms: u64) -> RateWindow;
}

/// Windows held in process memory. Lost on restart, not shared.
#[derive(Debug)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<HashMap<String, RateWindow>>,
    sweep_threshold: usize,
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self::with_sweep_threshold(DEFAULT_SWEEP_THRESHOLD)
    }
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_threshold(sweep_threshold: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            sweep_threshold,
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn record_hit(&self, client_id: &str, now_ms: u64, window_ms: u64) -> RateWindow {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if windows.len() >= self.sweep_threshold && !windows.contains_key(client_id) {
            windows.retain(|_, window| now_ms.saturating_sub(window.window_start_ms) < window_ms);
        }
        let window = windows
            .entry(client_id.to_string())
            .or_insert(RateWindow {
                count: 0,
                window_start_ms: now_ms,
            });
        if window.count == 0 || now_ms.saturating_sub(window.window_start_ms) >= window_ms {
            *window = RateWindow {
                count: 1,
                window_start_ms: now_ms,
            };
        } else {
            window.count += 1;
        }
        *window
    }
}

/// Fixed-window limiter: at most `limit` hits per client per window.
pub struct FixedWindowLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u64,
    window_ms: u64,
    trust_forwarded_headers: bool,
}

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, limit: u64, window_ms: u64) -> Self {
        Self {
            store,
            limit,
            window_ms,
            trust_forwarded_headers: false,
        }
    }

    /// Identify clients by `X-Forwarded-For` / `CF-Connecting-IP`. Only safe
    /// behind a proxy that overwrites those headers.
    pub fn with_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    pub fn allow(&self, client_id: &str) -> bool {
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.allow_at(client_id, now_ms)
    }

    pub fn allow_at(&self, client_id: &str, now_ms: u64) -> bool {
        let window = self.store.record_hit(client_id, now_ms, self.window_ms);
        window.count <= self.limit
    }
}

/// Identifies the caller by peer address. With `trust_forwarded` set, the
/// first `X-Forwarded-For` hop, then `CF-Connecting-IP`, take precedence.
pub fn client_id(request: &Request, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(value) = forwarded_client(request) {
            return value;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client(request: &Request) -> Option<String> {
    let headers = request.headers();
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let connecting = headers
        .get("cf-connecting-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    forwarded.or(connecting).map(str::to_string)
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_id(&request, limiter.trust_forwarded_headers);
    if !limiter.allow(&client) {
        tracing::warn!(%client, path = %request.uri().path(), "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http;

    use super::*;

    fn limiter(limit: u64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(Arc::new(InMemoryRateLimitStore::new()), limit, DEFAULT_WINDOW_MS)
    }

    #[test]
    fn allows_limit_then_denies_until_window_elapses() {
        let store = Arc::new(InMemoryRateLimitStore::new());
        let limiter = FixedWindowLimiter::new(store.clone(), DEFAULT_LIMIT, DEFAULT_WINDOW_MS);
        let start = 1_000_000;

        for offset in 0..DEFAULT_LIMIT {
            assert!(limiter.allow_at("x", start + offset));
        }
        assert!(!limiter.allow_at("x", start + 59_999));

        assert!(limiter.allow_at("x", start + DEFAULT_WINDOW_MS));
        let window = store.record_hit("x", start + DEFAULT_WINDOW_MS, DEFAULT_WINDOW_MS);
        assert_eq!(window.count, 2);
        assert_eq!(window.window_start_ms, start + DEFAULT_WINDOW_MS);
    }

    #[test]
    fn window_reset_counts_from_one() {
        let store = InMemoryRateLimitStore::new();
        store.record_hit("x", 0, 100);
        store.record_hit("x", 50, 100);
        let window = store.record_hit("x", 100, 100);
        assert_eq!(
            window,
            RateWindow {
                count: 1,
                window_start_ms: 100
            }
        );
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = limiter(1);
        assert!(limiter.allow_at("a", 0));
        assert!(!limiter.allow_at("a", 1));
        assert!(limiter.allow_at("b", 1));
    }

    #[test]
    fn denied_hits_still_count() {
        let limiter = limiter(2);
        assert!(limiter.allow_at("a", 0));
        assert!(limiter.allow_at("a", 1));
        assert!(!limiter.allow_at("a", 2));
        assert!(!limiter.allow_at("a", 3));
    }

    #[test]
    fn expired_windows_are_swept() {
        let store = InMemoryRateLimitStore::with_sweep_threshold(3);
        for client in ["a", "b", "c"] {
            store.record_hit(client, 0, 100);
        }
        assert_eq!(store.tracked_clients(), 3);

        store.record_hit("a", 50, 100);
        assert_eq!(store.tracked_clients(), 3);

        store.record_hit("d", 100, 100);
        assert_eq!(store.tracked_clients(), 1);
    }

    fn request_from(addr: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let addr: SocketAddr = addr.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[test]
    fn forwarded_headers_ignored_by_default() {
        let request = request_from(
            "192.0.2.10:4242",
            &[("x-forwarded-for", "203.0.113.7"), ("cf-connecting-ip", "198.51.100.2")],
        );
        assert_eq!(client_id(&request, false), "192.0.2.10");
    }

    #[test]
    fn trusted_forwarded_headers_take_precedence() {
        let request = request_from(
            "192.0.2.10:4242",
            &[("x-forwarded-for", "203.0.113.7, 10.0.0.1"), ("cf-connecting-ip", "198.51.100.2")],
        );
        assert_eq!(client_id(&request, true), "203.0.113.7");

        let request = request_from("192.0.2.10:4242", &[("cf-connecting-ip", "198.51.100.2")]);
        assert_eq!(client_id(&request, true), "198.51.100.2");

        let request = request_from("192.0.2.10:4242", &[]);
        assert_eq!(client_id(&request, true), "192.0.2.10");
    }

    #[test]
    fn client_id_without_peer_is_unknown() {
        let request = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_id(&request, false), "unknown");
    }
}
