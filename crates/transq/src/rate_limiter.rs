//! Fixed-window throttle in front of the translation service.
//!
//! A window opens on the first admitted call and lasts one second. Up to
//! `queries_per_sec` calls are admitted inside it; the next caller sleeps
//! until the window has run its course and then opens a fresh window
//! counting itself as the first call. A call arriving after the window
//! expired on its own also opens a fresh window.
//!
//! This is a fixed window, not a sliding one: a burst at the end of one
//! window may be followed immediately by a full burst at the start of the
//! next, so up to `2 * queries_per_sec` calls can land within a span shorter
//! than one second around a window boundary.

use core::{num::NonZeroU32, time::Duration};
use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};

/// Length of one accounting window.
pub const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Window {
    start: Option<Instant>,
    calls: u32,
}

/// Shared per-second call throttle.
///
/// The whole check-sleep-reset-increment sequence of [`admit`] runs while
/// holding one async lock, so concurrent callers are serialized and can never
/// jointly overshoot the ceiling. A caller that has to wait keeps the lock
/// while sleeping; everyone queued behind it is admitted in lock order once
/// the new window opens.
///
/// [`admit`]: RateLimiter::admit
#[derive(Debug)]
pub struct RateLimiter {
    queries_per_sec: NonZeroU32,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(queries_per_sec: NonZeroU32) -> Self {
        Self {
            queries_per_sec,
            window: Mutex::new(Window::default()),
        }
    }

    pub const fn queries_per_sec(&self) -> NonZeroU32 {
        self.queries_per_sec
    }

    /// Reserves one call slot, sleeping first if the current window is full.
    ///
    /// Returns how long the caller was held back ([`Duration::ZERO`] when the
    /// call was admitted immediately).
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    pub async fn admit(&self) -> Duration {
        let mut window = self.window.lock().await;

        let now = Instant::now();
        let start = *window.start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);

        if elapsed >= WINDOW {
            #[cfg(feature = "tracing")]
            tracing::trace!(calls = window.calls, "window expired, opening a new one");
            window.start = Some(now);
            window.calls = 0;
        }

        if window.calls >= self.queries_per_sec.get() {
            let wait = WINDOW - elapsed;
            #[cfg(feature = "tracing")]
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            sleep(wait).await;
            window.start = Some(Instant::now());
            window.calls = 1;
            return wait;
        }

        window.calls += 1;
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::{collections::BTreeMap, sync::Arc};

    fn limiter(qps: u32) -> RateLimiter {
        RateLimiter::new(NonZeroU32::new(qps).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_ceiling_without_waiting() {
        let limiter = limiter(3);
        let t0 = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.admit().await, Duration::ZERO);
        }
        assert_eq!(Instant::now(), t0);
    }

    #[tokio::test(start_paused = true)]
    async fn call_over_ceiling_blocks_until_window_rolls_over() {
        let limiter = limiter(2);
        let t0 = Instant::now();

        limiter.admit().await;
        limiter.admit().await;
        let waited = limiter.admit().await;

        assert_eq!(waited, WINDOW);
        assert!(Instant::now() - t0 >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_only_sleeps_for_the_rest_of_the_window() {
        let limiter = limiter(1);
        let t0 = Instant::now();

        limiter.admit().await;
        tokio::time::advance(Duration::from_millis(400)).await;
        let waited = limiter.admit().await;

        assert_eq!(waited, Duration::from_millis(600));
        assert_eq!(Instant::now() - t0, WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_window_is_reset_before_counting() {
        let limiter = limiter(1);

        limiter.admit().await;
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(limiter.admit().await, Duration::ZERO);

        // The fresh window is full again, so the ceiling still applies.
        assert_eq!(limiter.admit().await, WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_ceiling_per_window() {
        const QPS: u32 = 3;
        const CALLERS: usize = 20;

        let limiter = Arc::new(limiter(QPS));
        let t0 = Instant::now();

        let admitted = join_all((0..CALLERS).map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter.admit().await;
                Instant::now()
            })
        }))
        .await;

        let mut per_window: BTreeMap<u64, u32> = BTreeMap::new();
        for at in admitted {
            let second = (at.unwrap() - t0).as_secs();
            *per_window.entry(second).or_default() += 1;
        }

        assert_eq!(per_window.values().sum::<u32>(), CALLERS as u32);
        assert!(per_window.values().all(|&calls| calls <= QPS), "{per_window:?}");
        // 20 calls at 3 per window need 7 windows.
        assert_eq!(per_window.len(), 7);
    }
}
