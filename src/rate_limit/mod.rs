//! Call-count gate in front of the MyPay API.
//!
//! `SlidingWindowLimiter` is process-local: every instance of the service
//! keeps its own window. Deployments running several instances that need a
//! global ceiling use `RedisWindowLimiter` instead.

pub mod redis;

pub use self::redis::RedisWindowLimiter;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MAX_CALLS: usize = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records the call and returns true when it fits in the window.
    async fn allow(&self) -> bool;
}

pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS, DEFAULT_WINDOW)
    }
}

impl SlidingWindowLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            calls: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());

        // A call exactly `window` old still counts.
        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) > self.window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() >= self.max_calls {
            return false;
        }

        calls.push_back(now);
        true
    }

    /// Calls currently counted against the window.
    pub fn in_window(&self) -> usize {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        calls
            .iter()
            .filter(|at| now.duration_since(**at) <= self.window)
            .count()
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn allow(&self) -> bool {
        self.try_acquire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_exactly_max_calls_per_window() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.allow().await);
        }
        assert!(!limiter.allow().await);
        assert_eq!(limiter.in_window(), 5);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!limiter.allow().await);

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(limiter.allow().await);
        assert_eq!(limiter.in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn call_exactly_one_window_old_still_counts() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow().await);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!limiter.allow().await);
        assert_eq!(limiter.in_window(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.allow().await);
    }

    #[tokio::test(start_paused = true)]
    async fn slots_free_up_one_by_one() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));

        assert!(limiter.allow().await);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(limiter.allow().await);
        assert!(!limiter.allow().await);

        tokio::time::advance(Duration::from_millis(5001)).await;
        assert!(limiter.allow().await);
        assert!(!limiter.allow().await);
    }

    #[tokio::test]
    async fn default_allows_one_hundred_calls() {
        let limiter = SlidingWindowLimiter::default();
        for _ in 0..DEFAULT_MAX_CALLS {
            assert!(limiter.allow().await);
        }
        assert!(!limiter.allow().await);
    }
}
