use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Sliding-window rate limiter for uploads.
///
/// Keeps, per owner, the timestamps of recently admitted uploads. An upload is
/// admitted while fewer than `max_per_window` timestamps fall inside the
/// trailing window. Pruning, the check and the append happen under a single
/// lock acquisition, so concurrent handlers never lose each other's entries.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<i64, VecDeque<Instant>>>>,
    max_per_window: usize,
    window: Duration,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_per_window` uploads per `window`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filerelay::core::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::new(3, Duration::from_secs(60));
    /// ```
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_per_window,
            window,
        }
    }

    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decides admission for `owner_id` at the current instant.
    ///
    /// Returns `true` and records the attempt if admitted, `false` otherwise.
    pub async fn admit(&self, owner_id: i64) -> bool {
        self.admit_at(owner_id, Instant::now()).await
    }

    /// Same as [`admit`](Self::admit) with an explicit clock reading.
    pub async fn admit_at(&self, owner_id: i64, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        let entries = windows.entry(owner_id).or_default();
        prune(entries, now, self.window);

        if entries.len() >= self.max_per_window {
            return false;
        }
        entries.push_back(now);
        true
    }

    /// Time until the oldest entry leaves the window, if the owner is currently limited.
    pub async fn retry_after(&self, owner_id: i64) -> Option<Duration> {
        self.retry_after_at(owner_id, Instant::now()).await
    }

    pub async fn retry_after_at(&self, owner_id: i64, now: Instant) -> Option<Duration> {
        let mut windows = self.windows.lock().await;
        let entries = windows.get_mut(&owner_id)?;
        prune(entries, now, self.window);
        if entries.len() < self.max_per_window {
            return None;
        }
        entries
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
    }

    /// Number of uploads still admitted for `owner_id` in the current window.
    pub async fn remaining(&self, owner_id: i64) -> usize {
        self.remaining_at(owner_id, Instant::now()).await
    }

    pub async fn remaining_at(&self, owner_id: i64, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        match windows.get_mut(&owner_id) {
            Some(entries) => {
                prune(entries, now, self.window);
                self.max_per_window.saturating_sub(entries.len())
            }
            None => self.max_per_window,
        }
    }

    /// Forgets every window. Used by the admin restart command.
    pub async fn clear(&self) {
        self.windows.lock().await.clear();
    }

    /// Number of owners currently tracked.
    pub async fn tracked_owners(&self) -> usize {
        self.windows.lock().await.len()
    }

    /// Drops windows whose entries have all expired.
    pub async fn cleanup_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, entries| {
            prune(entries, now, self.window);
            !entries.is_empty()
        });
        before - windows.len()
    }

    /// Spawns a background task that periodically drops expired windows.
    pub fn spawn_cleanup_task(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = self.cleanup_at(Instant::now()).await;
                if removed > 0 {
                    log::debug!("Rate limiter cleanup dropped {} idle windows", removed);
                }
            }
        })
    }
}

fn prune(entries: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = entries.front() {
        if now.saturating_duration_since(*oldest) >= window {
            entries.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admits_up_to_ceiling_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.admit_at(1, t0).await);
        assert!(limiter.admit_at(1, t0 + Duration::from_secs(1)).await);
        assert!(limiter.admit_at(1, t0 + Duration::from_secs(2)).await);
        assert!(!limiter.admit_at(1, t0 + Duration::from_secs(3)).await);
    }

    #[tokio::test]
    async fn test_rejection_is_not_recorded() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.admit_at(1, t0).await);
        for i in 1..10 {
            assert!(!limiter.admit_at(1, t0 + Duration::from_secs(i)).await);
        }
        // Only the admitted entry counts, so admission resumes exactly one window later.
        assert!(limiter.admit_at(1, t0 + Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_admission_resumes_after_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.admit_at(7, t0).await);
        assert!(limiter.admit_at(7, t0 + Duration::from_secs(30)).await);
        assert!(!limiter.admit_at(7, t0 + Duration::from_secs(59)).await);
        // First entry expired, second still counts.
        assert!(limiter.admit_at(7, t0 + Duration::from_secs(61)).await);
        assert!(!limiter.admit_at(7, t0 + Duration::from_secs(62)).await);
    }

    #[tokio::test]
    async fn test_owners_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.admit_at(1, t0).await);
        assert!(limiter.admit_at(2, t0).await);
        assert!(!limiter.admit_at(1, t0).await);
        assert_eq!(limiter.remaining_at(1, t0).await, 0);
        assert_eq!(limiter.remaining_at(3, t0).await, 1);
    }

    #[tokio::test]
    async fn test_retry_after() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert_eq!(limiter.retry_after_at(1, t0).await, None);
        assert!(limiter.admit_at(1, t0).await);
        assert_eq!(
            limiter.retry_after_at(1, t0 + Duration::from_secs(20)).await,
            Some(Duration::from_secs(40))
        );
    }

    #[tokio::test]
    async fn test_clear_and_cleanup() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(limiter.admit_at(1, t0).await);
        assert!(limiter.admit_at(2, t0 + Duration::from_secs(5)).await);
        assert_eq!(limiter.tracked_owners().await, 2);

        assert_eq!(limiter.cleanup_at(t0 + Duration::from_secs(11)).await, 1);
        assert_eq!(limiter.tracked_owners().await, 1);

        limiter.clear().await;
        assert_eq!(limiter.tracked_owners().await, 0);
        assert!(limiter.admit_at(2, t0 + Duration::from_secs(6)).await);
    }

    #[tokio::test]
    async fn test_concurrent_admissions_never_exceed_ceiling() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(60)));
        let now = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.admit_at(42, now).await }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }
}
