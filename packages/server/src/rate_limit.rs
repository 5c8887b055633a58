//! Per-client request limiting for the `/api` scope.
//!
//! Sliding window counters keyed by peer IP, held in memory. Suitable for a
//! single instance; counts are not shared between processes.

use std::time::{Duration, Instant};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{ResponseError as _, web};
use dashmap::DashMap;

use crate::error::ApiError;

/// Limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window.
    pub max_requests: usize,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Returned when a client is over its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    /// Seconds until the oldest counted request leaves the window.
    pub retry_after_seconds: u64,
}

/// In-memory sliding window limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    requests: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            requests: DashMap::new(),
        }
    }

    /// Records a request from `client` and checks it against the limit.
    ///
    /// Rejected requests are not counted.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitExceeded`] if `client` has already made
    /// `max_requests` requests within the window.
    pub fn check(&self, client: &str) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let window = self.config.window;

        let mut entry = self.requests.entry(client.to_string()).or_default();
        entry.retain(|&t| now.duration_since(t) < window);

        if entry.len() >= self.config.max_requests {
            let retry_after = entry
                .first()
                .map_or(window, |&oldest| window.saturating_sub(now.duration_since(oldest)));

            return Err(RateLimitExceeded {
                retry_after_seconds: retry_after.as_secs() + 1,
            });
        }

        entry.push(now);

        Ok(())
    }

    /// Drops clients with no requests inside the window.
    pub fn prune(&self) {
        let now = Instant::now();
        let window = self.config.window;

        self.requests.retain(|_, timestamps| {
            timestamps.retain(|&t| now.duration_since(t) < window);
            !timestamps.is_empty()
        });
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

/// Middleware applying the [`RateLimiter`] registered as app data.
///
/// Over-limit requests are answered with `429` and a `Retry-After` header
/// without reaching the handler. Requests pass through untouched when no
/// limiter is registered.
///
/// # Errors
///
/// Returns whatever error the wrapped service produces.
pub async fn limit_requests<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    if let Some(limiter) = req.app_data::<web::Data<RateLimiter>>() {
        let client = req
            .peer_addr()
            .map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string());

        if let Err(exceeded) = limiter.check(&client) {
            log::warn!(
                "Rate limit exceeded for {client} on {} {}",
                req.method(),
                req.path()
            );
            let response = ApiError::RateLimited {
                retry_after_seconds: exceeded.retry_after_seconds,
            }
            .error_response();
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}
