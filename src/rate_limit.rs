use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

// Admitted request timestamps for one identity key, oldest first
pub type RateLimitEntry = VecDeque<Instant>;

/// Exact sliding-window limiter keyed by caller identity.
///
/// Buckets are created on first use and only ever pruned from the front.
/// Idle keys are never evicted: a rotating session id leaves one (possibly
/// empty) bucket behind per value, so key cardinality bounds memory.
pub struct RateLimiter {
    buckets: DashMap<String, RateLimitEntry>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request for `key`. Only admitted requests take a slot.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();

        // the entry guard holds the shard lock for prune + count + append
        let mut bucket = self.buckets.entry(key.to_string()).or_default();

        while let Some(oldest) = bucket.front() {
            if now.duration_since(*oldest) > self.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() >= self.max_requests {
            tracing::debug!(key, in_window = bucket.len(), "rate limit exceeded");
            return false;
        }

        bucket.push_back(now);
        true
    }

    // Drop all state for a key, missing keys are fine
    pub fn reset(&self, key: &str) {
        self.buckets.remove(key);
    }

    // Number of buckets currently held, including idle ones
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_exactly_max_within_one_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        let results: Vec<bool> = (0..5).map(|_| limiter.allow("session-a")).collect();

        assert_eq!(results, vec![true, true, true, false, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn slots_free_up_once_the_window_has_passed() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));

        assert!(limiter.allow("k"));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));

        // first admit is now 11s old, second one 7s old
        tokio::time::advance(Duration::from_secs(7)).await;
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(limiter.allow("k"));
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn timestamp_exactly_at_window_edge_still_counts() {
        let limiter = RateLimiter::new(1, Duration::from_secs(5));

        assert!(limiter.allow("k"));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!limiter.allow("k"));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_attempts_do_not_extend_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));

        assert!(limiter.allow("k"));
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(2)).await;
            assert!(!limiter.allow("k"));
        }
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_always_readmits() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("k"));
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));

        limiter.reset("k");
        assert!(limiter.allow("k"));

        // unknown key is a no-op
        limiter.reset("never-seen");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_rejects_everything() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        assert!(!limiter.allow("k"));
        limiter.reset("k");
        assert!(!limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_window_only_counts_the_current_instant() {
        let limiter = RateLimiter::new(1, Duration::ZERO);

        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent_and_not_normalized() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.allow("Alice"));
        assert!(limiter.allow("alice"));
        assert!(limiter.allow(" alice"));
        assert!(!limiter.allow("Alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_buckets_are_retained() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));

        for i in 0..100 {
            assert!(limiter.allow(&format!("rotating-{i}")));
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        // nothing evicts them until the key is touched again or reset
        assert_eq!(limiter.tracked_keys(), 100);
        assert!(limiter.allow("rotating-0"));
        assert_eq!(limiter.tracked_keys(), 100);
        limiter.reset("rotating-0");
        assert_eq!(limiter.tracked_keys(), 99);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_exceed_the_cap() {
        let limiter = std::sync::Arc::new(RateLimiter::new(50, Duration::from_secs(600)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                (0..25).filter(|_| limiter.allow("shared")).count()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            admitted += handle.await.unwrap();
        }
        assert_eq!(admitted, 50);
    }
}
