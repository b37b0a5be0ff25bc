//! Per-user mutation rate limiting.
//!
//! Two GCRA windows keyed by `(user, operation)`: a per-minute quota and a
//! per-hour quota, each allowing a burst of its full limit. A limit of 0
//! disables that window. Idle keys are pruned every `PRUNE_INTERVAL` checks.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use thiserror::Error;
use tracing::{debug, warn};

const PRUNE_INTERVAL: u64 = 1024;

type Key = (String, &'static str);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitExceeded {
    #[error("Rate limit of {limit} requests per minute exceeded; retry in {retry_after_ms}ms")]
    PerMinute { limit: u32, retry_after_ms: u64 },

    #[error("Rate limit of {limit} requests per hour exceeded; retry in {retry_after_ms}ms")]
    PerHour { limit: u32, retry_after_ms: u64 },
}

impl RateLimitExceeded {
    pub fn retry_after_ms(&self) -> u64 {
        match self {
            Self::PerMinute { retry_after_ms, .. } | Self::PerHour { retry_after_ms, .. } => {
                *retry_after_ms
            }
        }
    }
}

struct Window {
    limiter: DefaultKeyedRateLimiter<Key>,
    limit: u32,
}

impl Window {
    fn new(quota: Quota) -> Self {
        Self {
            limit: quota.burst_size().get(),
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Milliseconds until the key may try again, if it is over quota.
    fn check(&self, key: &Key) -> Option<u64> {
        match self.limiter.check_key(key) {
            Ok(()) => None,
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Some(wait.as_millis().max(1) as u64)
            }
        }
    }
}

pub struct MutationRateLimiter {
    per_minute: Option<Window>,
    per_hour: Option<Window>,
    checks: AtomicU64,
}

impl MutationRateLimiter {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self::from_quotas(
            NonZeroU32::new(per_minute).map(Quota::per_minute),
            NonZeroU32::new(per_hour).map(Quota::per_hour),
        )
    }

    /// No limits at all
    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    pub(crate) fn from_quotas(per_minute: Option<Quota>, per_hour: Option<Quota>) -> Self {
        Self {
            per_minute: per_minute.map(Window::new),
            per_hour: per_hour.map(Window::new),
            checks: AtomicU64::new(0),
        }
    }

    /// Count one request against both windows.
    pub fn check(&self, user_id: &str, operation: &'static str) -> Result<(), RateLimitExceeded> {
        if self.per_minute.is_none() && self.per_hour.is_none() {
            return Ok(());
        }

        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1 {
            self.prune();
        }

        let key = (user_id.to_string(), operation);

        if let Some(window) = &self.per_minute {
            if let Some(retry_after_ms) = window.check(&key) {
                warn!(user_id, operation, limit = window.limit, "Per-minute mutation rate limit exceeded");
                return Err(RateLimitExceeded::PerMinute {
                    limit: window.limit,
                    retry_after_ms,
                });
            }
        }
        if let Some(window) = &self.per_hour {
            if let Some(retry_after_ms) = window.check(&key) {
                warn!(user_id, operation, limit = window.limit, "Hourly mutation rate limit exceeded");
                return Err(RateLimitExceeded::PerHour {
                    limit: window.limit,
                    retry_after_ms,
                });
            }
        }
        Ok(())
    }

    /// Drop keys whose windows have fully replenished.
    pub fn prune(&self) {
        let before = self.tracked_keys();
        for window in self.per_minute.iter().chain(self.per_hour.iter()) {
            window.limiter.retain_recent();
            window.limiter.shrink_to_fit();
        }
        debug!(before, after = self.tracked_keys(), "Pruned idle rate limit keys");
    }

    /// Keys currently held across both windows.
    pub fn tracked_keys(&self) -> usize {
        self.per_minute
            .iter()
            .chain(self.per_hour.iter())
            .map(|window| window.limiter.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn burst(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn short_quota(period_ms: u64, n: u32) -> Quota {
        Quota::with_period(Duration::from_millis(period_ms))
            .unwrap()
            .allow_burst(burst(n))
    }

    #[test]
    fn test_minute_window_limits_per_user_and_operation() {
        let limiter = MutationRateLimiter::new(2, 100);

        assert!(limiter.check("ops-1", "retry").is_ok());
        assert!(limiter.check("ops-1", "retry").is_ok());
        let err = limiter.check("ops-1", "retry").unwrap_err();
        assert!(matches!(err, RateLimitExceeded::PerMinute { limit: 2, .. }));
        assert!(err.retry_after_ms() > 0);
        assert!(err.to_string().starts_with("Rate limit of 2 requests per minute exceeded"));

        // Different operation and different user are independent
        assert!(limiter.check("ops-1", "acknowledge").is_ok());
        assert!(limiter.check("ops-2", "retry").is_ok());
    }

    #[test]
    fn test_hour_window() {
        let limiter = MutationRateLimiter::new(0, 3);
        for _ in 0..3 {
            assert!(limiter.check("ops-1", "retry").is_ok());
        }
        let err = limiter.check("ops-1", "retry").unwrap_err();
        assert!(matches!(err, RateLimitExceeded::PerHour { limit: 3, .. }));
        assert!(err.to_string().contains("per hour"));
    }

    #[test]
    fn test_disabled_never_limits() {
        let limiter = MutationRateLimiter::disabled();
        for _ in 0..1000 {
            assert!(limiter.check("ops-1", "retry").is_ok());
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_window_replenishes() {
        let limiter = MutationRateLimiter::from_quotas(Some(short_quota(20, 1)), None);

        assert!(limiter.check("ops-1", "retry").is_ok());
        assert!(limiter.check("ops-1", "retry").is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check("ops-1", "retry").is_ok());
    }

    #[tokio::test]
    async fn test_idle_keys_are_pruned() {
        let limiter =
            MutationRateLimiter::from_quotas(Some(short_quota(250, 1)), Some(short_quota(250, 1)));

        for i in 0..10_001 {
            let _ = limiter.check(&format!("user-{}", i), "retry");
        }
        assert!(limiter.tracked_keys() > 10_000);

        tokio::time::sleep(Duration::from_millis(600)).await;
        limiter.prune();
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_checks_prune_on_their_own() {
        let limiter = MutationRateLimiter::from_quotas(Some(short_quota(20, 1)), None);

        for i in 0..5_000 {
            let _ = limiter.check(&format!("user-{}", i), "retry");
        }
        tokio::time::sleep(Duration::from_millis(60)).await;

        // One busy caller is enough to sweep the idle ones
        for _ in 0..PRUNE_INTERVAL {
            let _ = limiter.check("ops-1", "retry");
        }
        assert!(limiter.tracked_keys() <= 1);
    }
}
