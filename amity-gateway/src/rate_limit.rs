//! Per-user rate limiting.
//!
//! Fixed one-minute windows per user id, consulted before an inbound event
//! is dispatched. Rate-limited events are dropped; the connection stays
//! usable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    max_per_minute: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_per_minute: u32) -> Self {
        RateLimiter {
            max_per_minute,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Accounts one event for the user. Returns false when the user has
    /// exhausted the current window.
    pub fn allow(&self, user_id: &str) -> bool {
        let mut windows = self.windows.lock().unwrap();
        let window = windows.entry(user_id.to_string()).or_insert(Window {
            started: Instant::now(),
            count: 0,
        });
        if window.started.elapsed() >= WINDOW {
            window.started = Instant::now();
            window.count = 0;
        }
        if window.count < self.max_per_minute {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// Drops the user's window on disconnect.
    pub fn forget(&self, user_id: &str) {
        self.windows.lock().unwrap().remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn test_forget_resets() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        limiter.forget("a");
        assert!(limiter.allow("a"));
    }
}
