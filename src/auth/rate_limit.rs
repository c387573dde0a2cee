// src/auth/rate_limit.rs
// Per-client-IP request limiting backed by governor's keyed GCRA limiter

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::ApiError;
use super::AuthState;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

type KeyedLimiter = GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// `max_requests` may arrive back to back; the budget then refills evenly
/// over `window`, one request every `window / max_requests`.
pub struct RateLimiter {
    limiter: KeyedLimiter,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            limiter: GovRateLimiter::keyed(quota(max_requests, window)),
        }
    }

    /// Count a request from `key`; false once its budget is spent
    pub fn check(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Drop clients whose budget has fully refilled
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(clients = self.limiter.len(), "Rate limiter swept");
    }

    pub fn len(&self) -> usize {
        self.limiter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiter.is_empty()
    }
}

fn quota(max_requests: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
    // A zero window yields no period; treat it as one second
    Quota::with_period(window / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Client key: peer IP when the server was started with connect info
pub fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(State(state): State<AuthState>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    if !state.limiter.check(&key) {
        warn!(client = %key, "Rate limit exceeded");
        return ApiError::too_many_requests(RATE_LIMIT_MESSAGE).into_response();
    }
    next.run(req).await
}
