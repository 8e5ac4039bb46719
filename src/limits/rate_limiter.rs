use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::constants::{DEFAULT_MAX_REQUESTS_PER_MINUTE, RATE_LIMIT_WINDOW_SECS};

/// Per-user admission control over a sliding window.
///
/// Each user owns a queue of admission timestamps. Entries older than the
/// window are pruned on every check, so a bucket never holds more than
/// `ceiling` entries after a decision. This prevents gross abuse; it is not
/// an exact fairness guarantee.
#[derive(Debug)]
pub struct RateLimiter {
    ceiling: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(ceiling: usize, window: Duration) -> Self {
        Self {
            ceiling,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// A limiter with a one-minute window
    pub fn per_minute(ceiling: usize) -> Self {
        Self::new(ceiling, Duration::from_secs(RATE_LIMIT_WINDOW_SECS))
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Admit or reject a request from `user_id` now
    pub fn admit(&self, user_id: &str) -> bool {
        self.admit_at(user_id, Instant::now())
    }

    /// Admission decision at an explicit instant
    pub fn admit_at(&self, user_id: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(user_id.to_string()).or_default();
        prune(bucket, now, self.window);

        if bucket.len() >= self.ceiling {
            debug!("Rate limit reached for {} ({} in window)", user_id, bucket.len());
            return false;
        }

        bucket.push_back(now);
        true
    }

    /// Requests still admissible for `user_id` in the current window
    pub fn remaining(&self, user_id: &str) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        match buckets.get_mut(user_id) {
            Some(bucket) => {
                prune(bucket, now, self.window);
                self.ceiling.saturating_sub(bucket.len())
            }
            None => self.ceiling,
        }
    }

    /// Drop buckets with no timestamps left in the window; returns how many went
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            prune(bucket, now, self.window);
            !bucket.is_empty()
        });
        before - buckets.len()
    }

    pub fn tracked_users(&self) -> usize {
        self.buckets.lock().len()
    }

    #[cfg(test)]
    fn bucket(&self, user_id: &str) -> Vec<Instant> {
        self.buckets
            .lock()
            .get(user_id)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(DEFAULT_MAX_REQUESTS_PER_MINUTE)
    }
}

fn prune(bucket: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = bucket.front() {
        if now.saturating_duration_since(*oldest) >= window {
            bucket.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_request_over_ceiling() {
        let limiter = RateLimiter::per_minute(30);
        let start = Instant::now();

        for i in 0..30 {
            assert!(limiter.admit_at("alice", start + Duration::from_millis(i * 100)));
        }
        let now = start + Duration::from_secs(5);
        assert!(!limiter.admit_at("alice", now));

        let bucket = limiter.bucket("alice");
        assert_eq!(bucket.len(), 30);
        assert!(bucket.iter().all(|t| now.duration_since(*t) < Duration::from_secs(60)));
    }

    #[test]
    fn test_admission_resumes_after_window() {
        let limiter = RateLimiter::per_minute(2);
        let start = Instant::now();

        assert!(limiter.admit_at("bob", start));
        assert!(limiter.admit_at("bob", start + Duration::from_secs(1)));
        assert!(!limiter.admit_at("bob", start + Duration::from_secs(30)));

        // First entry leaves the window, one slot frees up
        assert!(limiter.admit_at("bob", start + Duration::from_secs(60)));
        assert!(!limiter.admit_at("bob", start + Duration::from_secs(60)));
        assert_eq!(limiter.bucket("bob").len(), 2);
    }

    #[test]
    fn test_users_are_isolated() {
        let limiter = RateLimiter::per_minute(1);
        assert!(limiter.admit("alice"));
        assert!(!limiter.admit("alice"));
        assert!(limiter.admit("bob"));
        assert_eq!(limiter.remaining("carol"), 1);
        assert_eq!(limiter.remaining("alice"), 0);
    }

    #[test]
    fn test_sweep_drops_idle_buckets() {
        let limiter = RateLimiter::per_minute(5);
        let start = Instant::now();
        limiter.admit_at("alice", start);
        limiter.admit_at("bob", start + Duration::from_secs(50));

        assert_eq!(limiter.sweep_at(start + Duration::from_secs(70)), 1);
        assert_eq!(limiter.tracked_users(), 1);
    }

    #[test]
    fn test_rejected_requests_are_not_recorded() {
        let limiter = RateLimiter::per_minute(1);
        let start = Instant::now();
        assert!(limiter.admit_at("dave", start));
        for s in 1..10 {
            assert!(!limiter.admit_at("dave", start + Duration::from_secs(s)));
        }
        assert!(limiter.admit_at("dave", start + Duration::from_secs(60)));
    }
}
