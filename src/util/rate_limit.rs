use redis::aio::ConnectionManager;
use sea_orm::prelude::Uuid;
use tracing::{debug, warn};

use crate::error::ActionError;

/// Length of one counting window.
pub const WINDOW_SECS: u64 = 60;

/// Fixed-window request counter shared by every app instance through Redis.
/// Without Redis every request is let through.
#[derive(Clone)]
pub struct RateLimiter {
    redis: Option<ConnectionManager>,
    per_window: u64,
}

impl RateLimiter {
    pub async fn connect(redis_url: Option<&str>, per_window: u64) -> anyhow::Result<Self> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                Some(client.get_connection_manager().await?)
            }
            None => {
                warn!("REDIS_URL not set, rate limiting is disabled");
                None
            }
        };
        Ok(Self { redis, per_window })
    }

    /// Counts one hit for `user` in `scope` and refuses it once the window is full.
    /// Redis failures let the request through.
    pub async fn check(&self, scope: &str, user: Uuid, now_secs: u64) -> Result<(), ActionError> {
        let Some(redis) = &self.redis else {
            return Ok(());
        };
        let mut conn = redis.clone();
        let key = window_key(scope, user, now_secs);

        let counted: Result<(u64, i64), redis::RedisError> = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, WINDOW_SECS as i64)
            .query_async(&mut conn)
            .await;

        match counted {
            Ok((hits, _)) if hits > self.per_window => {
                debug!(scope, %user, hits, "rate limited");
                Err(ActionError::RateLimited {
                    retry_after_secs: retry_after(now_secs),
                })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, scope, "rate limiter unavailable");
                Ok(())
            }
        }
    }
}

pub fn window_key(scope: &str, user: Uuid, now_secs: u64) -> String {
    format!("rate:{scope}:{}:{}", user.simple(), now_secs / WINDOW_SECS)
}

/// Seconds until the current window rolls over.
pub fn retry_after(now_secs: u64) -> u64 {
    WINDOW_SECS - now_secs % WINDOW_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_in_the_same_minute_share_a_key() {
        let user = Uuid::nil();
        assert_eq!(window_key("extract", user, 120), window_key("extract", user, 179));
        assert_ne!(window_key("extract", user, 179), window_key("extract", user, 180));
        assert_ne!(window_key("extract", user, 120), window_key("upload", user, 120));
        assert_eq!(
            window_key("upload", user, 125),
            "rate:upload:00000000000000000000000000000000:2"
        );
    }

    #[test]
    fn retry_after_counts_down_to_the_next_window() {
        assert_eq!(retry_after(120), 60);
        assert_eq!(retry_after(179), 1);
    }

    #[tokio::test]
    async fn without_redis_everything_passes() {
        let limiter = RateLimiter {
            redis: None,
            per_window: 1,
        };
        for _ in 0..100 {
            limiter
                .check("extract", Uuid::nil(), 0)
                .await
                .expect("disabled limiter allows");
        }
    }
}
