//! In-memory fixed-window rate limiter for credential endpoints.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Record an attempt for `key` (an IP, a user id) and report whether it
    /// is allowed. Opens a fresh window once the current one has elapsed;
    /// stale entries for other keys are pruned on the way through.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(!limiter.check("10.0.0.1").await);

        // Other keys have their own window.
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, 1);

        assert!(limiter.check("key").await);
        assert!(!limiter.check("key").await);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.check("key").await);
    }

    #[tokio::test]
    async fn stale_entries_are_pruned() {
        let limiter = RateLimiter::new(5, 1);
        limiter.check("a").await;
        limiter.check("b").await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.check("c").await;

        let windows = limiter.windows.read().await;
        assert!(!windows.contains_key("a"));
        assert!(!windows.contains_key("b"));
        assert!(windows.contains_key("c"));
    }
}
