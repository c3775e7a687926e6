//! Shared upstream backoff tracking.
//!
//! Providers that throttle clients send a `backoff` hint (in seconds) with
//! their responses. [`BackoffTracker`] turns those hints into a single
//! process-wide "blocked until" deadline that every provider client and the
//! enrichment pipeline consult before issuing a request.
//!
//! The deadline only ever moves later. Concurrent writers race through an
//! atomic `fetch_max`, so a later deadline is never lost to an earlier one.
//!
//! ```text
//!   register_hint(30) at T0
//!   ──────────[ blocked ]──────────┤ T0+30s ├──── unblocked ────►
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide cooldown signalled by throttling upstreams.
///
/// Share one instance (behind an `Arc`) between every component that talks
/// to the throttled upstream.
#[derive(Debug)]
pub struct BackoffTracker {
    /// Reference point for the millisecond offsets below.
    origin: Instant,
    /// Deadline as milliseconds since `origin`. Zero means never blocked.
    blocked_until_ms: AtomicU64,
}

impl Default for BackoffTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffTracker {
    /// Create an unblocked tracker.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            blocked_until_ms: AtomicU64::new(0),
        }
    }

    /// Whether requests should currently be suppressed.
    pub fn is_active(&self) -> bool {
        self.is_active_at(Instant::now())
    }

    /// Whether requests are suppressed at the given instant.
    pub fn is_active_at(&self, now: Instant) -> bool {
        self.offset_ms(now) < self.blocked_until_ms.load(Ordering::Acquire)
    }

    /// Time left until the backoff expires, floored at zero.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    /// Time left at the given instant, floored at zero.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        let blocked_until = self.blocked_until_ms.load(Ordering::Acquire);
        Duration::from_millis(blocked_until.saturating_sub(self.offset_ms(now)))
    }

    /// Record an upstream backoff hint of `seconds`.
    ///
    /// Zero is ignored. The deadline becomes `max(current, now + seconds)`.
    pub fn register_hint(&self, seconds: u64) {
        self.register_hint_at(seconds, Instant::now());
    }

    /// Record a backoff hint observed at the given instant.
    pub fn register_hint_at(&self, seconds: u64, now: Instant) {
        if seconds == 0 {
            return;
        }
        let candidate = self
            .offset_ms(now)
            .saturating_add(seconds.saturating_mul(1_000));
        let previous = self.blocked_until_ms.fetch_max(candidate, Ordering::AcqRel);
        if candidate > previous {
            tracing::warn!(seconds, "upstream requested backoff");
        }
    }

    fn offset_ms(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_millis();
        u64::try_from(elapsed).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn new_tracker_is_inactive() {
        let tracker = BackoffTracker::new();
        assert!(!tracker.is_active());
        assert_eq!(tracker.remaining(), Duration::ZERO);
    }

    #[test]
    fn zero_hint_is_ignored() {
        let tracker = BackoffTracker::new();
        tracker.register_hint(0);
        assert!(!tracker.is_active());
    }

    #[test]
    fn active_for_whole_window_and_clears_exactly_at_deadline() {
        let tracker = BackoffTracker::new();
        let t0 = Instant::now();
        tracker.register_hint_at(30, t0);

        assert!(tracker.is_active_at(t0));
        assert!(tracker.is_active_at(t0 + Duration::from_secs(15)));
        assert!(tracker.is_active_at(t0 + Duration::from_millis(29_999)));
        assert!(!tracker.is_active_at(t0 + Duration::from_secs(30)));
        assert!(!tracker.is_active_at(t0 + Duration::from_secs(31)));
    }

    #[test]
    fn remaining_counts_down_and_floors_at_zero() {
        let tracker = BackoffTracker::new();
        let t0 = Instant::now();
        tracker.register_hint_at(10, t0);

        assert_eq!(tracker.remaining_at(t0), Duration::from_secs(10));
        assert_eq!(
            tracker.remaining_at(t0 + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            tracker.remaining_at(t0 + Duration::from_secs(60)),
            Duration::ZERO
        );
    }

    #[test]
    fn shorter_hint_never_moves_deadline_earlier() {
        let tracker = BackoffTracker::new();
        let t0 = Instant::now();
        tracker.register_hint_at(60, t0);
        tracker.register_hint_at(5, t0 + Duration::from_secs(1));

        assert!(tracker.is_active_at(t0 + Duration::from_secs(59)));
        assert_eq!(tracker.remaining_at(t0), Duration::from_secs(60));
    }

    #[test]
    fn later_hint_extends_deadline() {
        let tracker = BackoffTracker::new();
        let t0 = Instant::now();
        tracker.register_hint_at(10, t0);
        tracker.register_hint_at(10, t0 + Duration::from_secs(5));

        assert!(tracker.is_active_at(t0 + Duration::from_secs(14)));
        assert!(!tracker.is_active_at(t0 + Duration::from_secs(15)));
    }

    #[test]
    fn concurrent_writers_keep_latest_deadline() {
        let tracker = Arc::new(BackoffTracker::new());
        let t0 = Instant::now();

        let handles: Vec<_> = (1..=16u64)
            .map(|seconds| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.register_hint_at(seconds, t0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread panicked");
        }

        assert_eq!(tracker.remaining_at(t0), Duration::from_secs(16));
    }
}
