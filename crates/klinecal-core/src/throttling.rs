use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_MAX_REQUESTS: usize = 1200;
pub const DEFAULT_TIME_WINDOW: Duration = Duration::from_millis(60_000);
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(100);

/// Request quota enforced by [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: usize,
    pub time_window: Duration,
    pub safety_margin: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            time_window: DEFAULT_TIME_WINDOW,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}

impl RateLimitPolicy {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            max_requests,
            time_window,
            ..Self::default()
        }
    }

    pub fn with_safety_margin(mut self, safety_margin: Duration) -> Self {
        self.safety_margin = safety_margin;
        self
    }
}

/// Sliding-window request log shared by every fetch issued through one client.
///
/// Callers await [`RateLimiter::wait_if_needed`] before each outbound request.
/// The timestamp queue has a single writer at a time: the lock is held across
/// the suspension, so queued callers are released in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    issued: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            issued: Mutex::new(VecDeque::with_capacity(policy.max_requests.min(4096))),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Suspends until one more request fits the quota, then records it.
    pub async fn wait_if_needed(&self) {
        let mut issued = self.issued.lock().await;
        let max_requests = self.policy.max_requests.max(1);

        loop {
            let now = Instant::now();
            self.evict_expired(&mut issued, now);

            if issued.len() < max_requests {
                issued.push_back(now);
                return;
            }

            let Some(&oldest) = issued.front() else {
                issued.push_back(now);
                return;
            };
            let wait = self
                .policy
                .time_window
                .saturating_sub(now.duration_since(oldest))
                + self.policy.safety_margin;

            debug!(
                wait_ms = wait.as_millis() as u64,
                in_window = issued.len(),
                "rate limit reached, suspending request"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Requests recorded inside the current window.
    pub async fn in_window(&self) -> usize {
        let mut issued = self.issued.lock().await;
        self.evict_expired(&mut issued, Instant::now());
        issued.len()
    }

    fn evict_expired(&self, issued: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = issued.front() {
            if now.duration_since(oldest) >= self.policy.time_window {
                issued.pop_front();
            } else {
                break;
            }
        }
    }
}
