use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Per-domain request gate.
///
/// Caps concurrent requests to each host and sleeps a random slice of
/// `random_delay` before letting a request through, so the crawler never
/// bursts against the site.
pub struct DomainLimiter {
    parallelism: usize,
    random_delay: Duration,
    domains: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl DomainLimiter {
    pub fn new(parallelism: usize, random_delay: Duration) -> Self {
        Self {
            parallelism: parallelism.max(1),
            random_delay,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for a slot on `host`. Hold the permit for the whole request.
    pub async fn acquire(&self, host: &str) -> Result<OwnedSemaphorePermit, AcquireError> {
        let semaphore = self.semaphore_for(host);
        let permit = semaphore.acquire_owned().await?;

        let delay = self.jitter();
        if !delay.is_zero() {
            debug!(host, delay_ms = delay.as_millis() as u64, "Delaying request");
            tokio::time::sleep(delay).await;
        }

        Ok(permit)
    }

    fn semaphore_for(&self, host: &str) -> Arc<Semaphore> {
        let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.parallelism)))
            .clone()
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.random_delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn caps_concurrency_per_host() {
        let limiter = Arc::new(DomainLimiter::new(2, Duration::ZERO));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire("www.example.com").await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hosts_do_not_share_slots() {
        let limiter = DomainLimiter::new(1, Duration::ZERO);
        let _a = limiter.acquire("a.example.com").await.unwrap();
        let b = tokio::time::timeout(Duration::from_millis(100), limiter.acquire("b.example.com")).await;
        assert!(b.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_stays_within_bound() {
        let limiter = DomainLimiter::new(1, Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        let _permit = limiter.acquire("www.example.com").await.unwrap();
        assert!(start.elapsed() <= Duration::from_millis(500));
    }
}
