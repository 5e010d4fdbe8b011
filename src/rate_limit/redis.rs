//! Sliding window shared by every instance through a Redis sorted set.

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use super::RateLimiter;

const WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local max_calls = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window_ms = tonumber(ARGV[3])
local member = ARGV[4]

redis.call('ZREMRANGEBYSCORE', key, 0, '(' .. (now - window_ms))

if redis.call('ZCARD', key) >= max_calls then
    return 0
end

redis.call('ZADD', key, now, member)
redis.call('PEXPIRE', key, window_ms + 1)
return 1
"#;

pub struct RedisWindowLimiter {
    redis_client: redis::Client,
    key: String,
    max_calls: usize,
    window: Duration,
}

impl RedisWindowLimiter {
    pub fn new(redis_url: &str, max_calls: usize, window: Duration) -> anyhow::Result<Self> {
        let redis_client = redis::Client::open(redis_url)?;
        Ok(Self {
            redis_client,
            key: "mypay:ratelimit".to_string(),
            max_calls,
            window,
        })
    }

    async fn check(&self) -> redis::RedisResult<bool> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;

        let admitted: i32 = redis::Script::new(WINDOW_SCRIPT)
            .key(&self.key)
            .arg(self.max_calls)
            .arg(now)
            .arg(self.window.as_millis() as i64)
            .arg(Uuid::new_v4().to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(admitted == 1)
    }
}

#[async_trait]
impl RateLimiter for RedisWindowLimiter {
    async fn allow(&self) -> bool {
        match self.check().await {
            Ok(admitted) => admitted,
            Err(e) => {
                // Fail open.
                tracing::error!(error = %e, "Rate limiter store unavailable");
                true
            }
        }
    }
}
