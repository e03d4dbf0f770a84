use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::info;

const WINDOW: Duration = Duration::from_secs(60);
/// One second of slack past the window edge.
const SLACK: Duration = Duration::from_secs(1);

/// Sliding one-minute call window. Owned by a single collector run.
#[derive(Debug)]
pub struct RateLimiter {
    calls_per_minute: usize,
    calls: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(calls_per_minute: u32) -> Self {
        Self {
            calls_per_minute: (calls_per_minute as usize).max(1),
            calls: VecDeque::new(),
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.calls.front() {
            if now.duration_since(oldest) >= WINDOW {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Block until a call is admitted, then record it.
    pub async fn wait(&mut self) {
        self.evict(Instant::now());

        if self.calls.len() >= self.calls_per_minute {
            if let Some(&oldest) = self.calls.front() {
                let wait = (WINDOW + SLACK).saturating_sub(Instant::now().duration_since(oldest));
                info!("Rate limit reached, waiting {:.0?}", wait);
                sleep(wait).await;
            }
            self.evict(Instant::now());
        }

        self.calls.push_back(Instant::now());
    }
}
