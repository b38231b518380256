use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct WindowState {
    request_count: u32,
    window_start: Option<Instant>,
}

/// Fixed-window limiter: at most `max_requests` upstream calls per `window`.
///
/// Check and increment happen under one lock, so concurrent handlers can never
/// push the count past the ceiling.
pub struct WindowRateLimiter {
    state: Mutex<WindowState>,
    max_requests: u32,
    window: Duration,
}

impl WindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            state: Mutex::new(WindowState {
                request_count: 0,
                window_start: None,
            }),
            max_requests,
            window,
        }
    }

    /// Claim a slot for one upstream call; `false` when the ceiling is reached
    ///
    /// The window is anchored at its first request; later calls do not extend it.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();

        let expired = match state.window_start {
            Some(start) => now.duration_since(start) > self.window,
            None => true,
        };

        if expired {
            state.request_count = 0;
            state.window_start = Some(now);
        }

        if state.request_count >= self.max_requests {
            return false;
        }

        state.request_count += 1;
        true
    }

    /// Calls left in the current window
    pub fn remaining(&self) -> u32 {
        let state = self.state.lock();
        let expired = match state.window_start {
            Some(start) => start.elapsed() > self.window,
            None => true,
        };

        if expired {
            self.max_requests
        } else {
            self.max_requests.saturating_sub(state.request_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_reached_within_window() {
        let limiter = WindowRateLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_expiry() {
        let limiter = WindowRateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.try_acquire());
        assert_eq!(limiter.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_anchored_at_first_request() {
        let limiter = WindowRateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(limiter.try_acquire());
        assert_eq!(limiter.remaining(), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(limiter.try_acquire());
        assert_eq!(limiter.remaining(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_never_exceeds_ceiling() {
        let limiter = Arc::new(WindowRateLimiter::new(10, Duration::from_secs(60)));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.try_acquire() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 10);
    }
}
