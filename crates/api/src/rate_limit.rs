use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Sliding-window request counter keyed by client address.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests: max_requests.max(1),
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut hits = self.hits.lock();
        // Idle clients are dropped so the map does not grow without bound.
        hits.retain(|_, queue| {
            queue
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) <= self.window)
        });

        let queue = hits.entry(key.to_string()).or_default();
        while queue
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) > self.window)
        {
            queue.pop_front();
        }

        if queue.len() >= self.max_requests {
            let retry_after = queue
                .front()
                .map(|first| self.window.saturating_sub(now.saturating_duration_since(*first)))
                .unwrap_or(self.window);
            return RateDecision::Limited { retry_after };
        }

        queue.push_back(now);
        RateDecision::Allowed
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_each_client_independently() {
        let limiter = IpRateLimiter::new(Duration::from_secs(60), 2);
        let now = Instant::now();

        assert_eq!(limiter.check_at("a", now), RateDecision::Allowed);
        assert_eq!(limiter.check_at("a", now), RateDecision::Allowed);
        assert!(matches!(
            limiter.check_at("a", now),
            RateDecision::Limited { .. }
        ));
        assert_eq!(limiter.check_at("b", now), RateDecision::Allowed);
    }

    #[test]
    fn window_slides_forward() {
        let limiter = IpRateLimiter::new(Duration::from_secs(10), 1);
        let start = Instant::now();

        assert_eq!(limiter.check_at("a", start), RateDecision::Allowed);
        match limiter.check_at("a", start + Duration::from_secs(4)) {
            RateDecision::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(6))
            }
            RateDecision::Allowed => panic!("second hit inside the window must be limited"),
        }
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(11)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn idle_clients_are_forgotten() {
        let limiter = IpRateLimiter::new(Duration::from_secs(5), 3);
        let start = Instant::now();
        limiter.check_at("a", start);
        limiter.check_at("b", start + Duration::from_secs(20));
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
