//! Behavior-driven tests for request throttling
//!
//! The tokio clock is paused in every test, so waits are measured in virtual
//! time and the assertions are exact.

use std::sync::Arc;
use std::time::Duration;

use klinecal_core::{RateLimitPolicy, RateLimiter};
use tokio::time::Instant;

fn two_per_second() -> RateLimitPolicy {
    RateLimitPolicy::new(2, Duration::from_millis(1_000))
}

#[tokio::test(start_paused = true)]
async fn when_quota_is_exhausted_third_call_waits_for_the_window_plus_margin() {
    // Given: A limiter allowing two requests per second
    let limiter = RateLimiter::new(two_per_second());
    let started = Instant::now();

    // When: Three calls are issued back to back
    limiter.wait_if_needed().await;
    limiter.wait_if_needed().await;
    let before_third = started.elapsed();
    limiter.wait_if_needed().await;

    // Then: The first two pass immediately, the third waits window + margin
    assert_eq!(before_third, Duration::ZERO);
    assert_eq!(started.elapsed(), Duration::from_millis(1_100));
}

#[tokio::test(start_paused = true)]
async fn when_time_already_passed_system_waits_only_the_remainder() {
    // Given: Two requests issued, then 400ms of unrelated work
    let limiter = RateLimiter::new(two_per_second());
    limiter.wait_if_needed().await;
    limiter.wait_if_needed().await;
    tokio::time::advance(Duration::from_millis(400)).await;
    let resumed = Instant::now();

    // When: A third request arrives
    limiter.wait_if_needed().await;

    // Then: It waits the rest of the window plus the safety margin
    assert_eq!(resumed.elapsed(), Duration::from_millis(600 + 100));
}

#[tokio::test(start_paused = true)]
async fn when_margin_is_zero_wait_ends_exactly_at_window_edge() {
    // Given: A limiter without a safety margin
    let limiter = RateLimiter::new(two_per_second().with_safety_margin(Duration::ZERO));
    let started = Instant::now();

    // When: Three calls are issued back to back
    for _ in 0..3 {
        limiter.wait_if_needed().await;
    }

    // Then: The third call is admitted once the first entry expires
    assert_eq!(started.elapsed(), Duration::from_millis(1_000));
    assert_eq!(limiter.in_window().await, 1);
}

#[tokio::test(start_paused = true)]
async fn when_tasks_share_a_limiter_no_window_exceeds_the_quota() {
    // Given: Six concurrent tasks sharing one limiter
    let limiter = Arc::new(RateLimiter::new(
        two_per_second().with_safety_margin(Duration::ZERO),
    ));
    let started = Instant::now();

    // When: Every task waits for a slot
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter.wait_if_needed().await;
                started.elapsed()
            })
        })
        .collect();

    let mut admitted = Vec::new();
    for handle in handles {
        admitted.push(handle.await.expect("task should finish"));
    }
    admitted.sort();

    // Then: Admissions come in pairs, one window apart
    let expected: Vec<_> = [0, 0, 1_000, 1_000, 2_000, 2_000]
        .into_iter()
        .map(Duration::from_millis)
        .collect();
    assert_eq!(admitted, expected);
}
