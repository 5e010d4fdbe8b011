use std::time::Duration;
use uuid::Uuid;

/// HTTP statuses worth another attempt.
pub const RETRYABLE_STATUS: [u16; 4] = [500, 502, 503, 504];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt that follows `attempt` (1-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn is_final(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUS.contains(&status)
    }
}

/// Scope of the `X-Request-ID` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdempotencyStrategy {
    /// A fresh key on every attempt. Retries are not deduplicated remotely.
    #[default]
    PerAttempt,
    /// One key shared by all attempts of a logical call.
    PerOperation,
}

impl IdempotencyStrategy {
    pub fn from_flag(stable: bool) -> Self {
        if stable {
            IdempotencyStrategy::PerOperation
        } else {
            IdempotencyStrategy::PerAttempt
        }
    }
}

pub fn new_idempotency_key() -> String {
    format!("mypay_{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert!(policy.is_final(3));
        assert!(!policy.is_final(2));
    }

    #[test]
    fn only_gateway_errors_are_retryable() {
        assert!(RetryPolicy::is_retryable_status(503));
        assert!(!RetryPolicy::is_retryable_status(501));
        assert!(!RetryPolicy::is_retryable_status(429));
    }

    #[test]
    fn idempotency_keys_are_prefixed_and_unique() {
        let a = new_idempotency_key();
        let b = new_idempotency_key();
        assert!(a.starts_with("mypay_"));
        assert_ne!(a, b);
    }
}
