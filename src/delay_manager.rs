use std::thread;
use std::time::{Duration, Instant};
use log::{debug, info, warn};

/// Enforces a minimum gap between consecutive requests of one fetcher.
/// Instances do not coordinate with each other.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter {
            min_interval,
            last_request: None,
        }
    }

    /// Blocks until `min_interval` has passed since the last recorded request.
    pub fn wait(&self) {
        let Some(last) = self.last_request else {
            return;
        };
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            let sleep_for = self.min_interval - elapsed;
            debug!("Rate limiting: sleeping for {:.2}s", sleep_for.as_secs_f64());
            thread::sleep(sleep_for);
        }
    }

    pub fn mark(&mut self) {
        self.last_request = Some(Instant::now());
    }
}

pub fn retry_pause(delay: Duration) {
    info!("Retrying in {:.1}s...", delay.as_secs_f64());
    thread::sleep(delay);
}

pub fn rate_limit_backoff(delay: Duration) {
    warn!("Rate limited, waiting {:.1}s before the next attempt...", delay.as_secs_f64());
    thread::sleep(delay);
}
