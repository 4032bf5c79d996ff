use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::timeout::RequestDeadline;
use crate::config::Config;
use crate::error::AppError;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("no token available before the deadline")]
    DeadlineExceeded { retry_after: Duration },
    #[error("request cancelled while waiting for a token")]
    Cancelled,
}

/// One token bucket shared by every request in the process.
pub struct RateLimiter {
    limiter: DirectLimiter,
    clock: DefaultClock,
}

impl RateLimiter {
    pub fn new(per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(rate);
        Self {
            limiter: governor::RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            clock: DefaultClock::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rate_limit_per_second, config.burst_size)
    }

    /// Takes a token, waiting for one as long as it arrives before `deadline`.
    pub async fn acquire(
        &self,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), RateLimitError> {
        loop {
            let wait = match self.limiter.check() {
                Ok(()) => return Ok(()),
                Err(not_until) => not_until.wait_time_from(self.clock.now()),
            };
            if Instant::now() + wait > deadline {
                return Err(RateLimitError::DeadlineExceeded { retry_after: wait });
            }

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return Err(RateLimitError::Cancelled),
            }
        }
    }
}

/// Without a deadline from the timeout stage the limiter does not wait at all.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let deadline = req
        .extensions()
        .get::<RequestDeadline>()
        .map(|d| d.0)
        .unwrap_or_else(Instant::now);
    let cancel = req
        .extensions()
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_default();

    match limiter.acquire(deadline, &cancel).await {
        Ok(()) => next.run(req).await,
        Err(RateLimitError::DeadlineExceeded { retry_after }) => {
            tracing::warn!(path = %req.uri().path(), retry_after_ms = retry_after.as_millis() as u64, "rate limit exceeded");
            AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
        Err(RateLimitError::Cancelled) => AppError::Timeout.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_is_served_then_rejected_without_waiting() {
        let limiter = RateLimiter::new(1, 3);
        let cancel = CancellationToken::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.acquire(now, &cancel).await, Ok(()));
        }
        assert!(matches!(
            limiter.acquire(now, &cancel).await,
            Err(RateLimitError::DeadlineExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn waits_for_a_token_within_the_deadline() {
        let limiter = RateLimiter::new(20, 1);
        let cancel = CancellationToken::new();

        assert_eq!(limiter.acquire(Instant::now(), &cancel).await, Ok(()));
        let deadline = Instant::now() + Duration::from_millis(500);
        assert_eq!(limiter.acquire(deadline, &cancel).await, Ok(()));
    }

    #[tokio::test]
    async fn cancellation_stops_the_wait() {
        let limiter = RateLimiter::new(1, 1);
        let cancel = CancellationToken::new();
        let deadline = Instant::now() + Duration::from_secs(5);

        assert_eq!(limiter.acquire(deadline, &cancel).await, Ok(()));
        cancel.cancel();
        assert_eq!(
            limiter.acquire(deadline, &cancel).await,
            Err(RateLimitError::Cancelled)
        );
    }

    #[test]
    fn zero_configuration_falls_back_to_one_per_second() {
        let limiter = RateLimiter::new(0, 0);
        assert!(limiter.limiter.check().is_ok());
        assert!(limiter.limiter.check().is_err());
    }
}
