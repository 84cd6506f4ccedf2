//! Rate Limiting Infrastructure
//!
//! Fixed-window counters keyed by an arbitrary string (usually client IP).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Whole seconds until the window resets (at least 1 when blocked)
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let remaining_ms = (self.reset_at_ms - now_ms).max(0) as u64;
        remaining_ms.div_ceil(1000).max(1)
    }
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Check and increment rate limit counter
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at_ms: i64,
    count: u32,
}

/// Process-local fixed-window store
///
/// Counters live only as long as the process; a restart resets every window.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, Window>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request for `key` at `now_ms`.
    pub fn hit(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> RateLimitResult {
        let window_ms = config.window_ms();
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started_at_ms: now_ms,
            count: 0,
        });

        if now_ms - window.started_at_ms >= window_ms {
            *window = Window {
                started_at_ms: now_ms,
                count: 0,
            };
        }

        let reset_at_ms = window.started_at_ms + window_ms;

        if window.count >= config.max_requests {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            };
        }

        window.count += 1;
        RateLimitResult {
            allowed: true,
            remaining: config.max_requests - window.count,
            reset_at_ms,
        }
    }

    /// Drop windows that ended before `now_ms`.
    pub fn purge_expired(&self, config: &RateLimitConfig, now_ms: i64) -> usize {
        let before = self.windows.len();
        let window_ms = config.window_ms();
        self.windows
            .retain(|_, window| now_ms - window.started_at_ms < window_ms);
        before - self.windows.len()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.hit(key, config, now_ms()))
    }
}

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_window_blocks_after_limit() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(2, 60);

        assert!(store.hit("1.1.1.1", &config, 0).allowed);
        let second = store.hit("1.1.1.1", &config, 1_000);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let blocked = store.hit("1.1.1.1", &config, 2_000);
        assert!(!blocked.allowed);
        assert_eq!(blocked.retry_after_secs(2_000), 58);

        // Other keys are independent.
        assert!(store.hit("2.2.2.2", &config, 2_000).allowed);
    }

    #[test]
    fn test_window_resets() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(1, 1);

        assert!(store.hit("k", &config, 0).allowed);
        assert!(!store.hit("k", &config, 999).allowed);
        assert!(store.hit("k", &config, 1_000).allowed);
    }

    #[test]
    fn test_purge_expired() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(5, 1);

        store.hit("old", &config, 0);
        store.hit("fresh", &config, 1_500);

        assert_eq!(store.purge_expired(&config, 2_000), 1);
    }

    #[tokio::test]
    async fn test_store_trait() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(1, 60);

        // Both trait variants are in scope here; name the Send one.
        let first = RateLimitStore::check_and_increment(&store, "k", &config)
            .await
            .unwrap();
        let second = RateLimitStore::check_and_increment(&store, "k", &config)
            .await
            .unwrap();
        assert!(first.allowed);
        assert!(!second.allowed);
    }
}
