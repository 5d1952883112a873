//! Advisory pacing for the stepping loop.
//!
//! The target rate is in generations per second. A rate of zero (or any
//! non-finite or negative value) means "as fast as possible". Stepping
//! itself never depends on the rate; the runner sleeps for whatever
//! [`pacing_delay`] returns after each step.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long to sleep after a step that took `elapsed`, to hold
/// `target_rate` generations per second.
pub fn pacing_delay(target_rate: f64, elapsed: Duration) -> Duration {
    if !target_rate.is_finite() || target_rate <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(target_rate.recip())
        .map_or(Duration::ZERO, |interval| interval.saturating_sub(elapsed))
}

/// Measured generation rate over a sliding time window.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window: Duration,
    samples: VecDeque<Instant>,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RateMeter {
    /// A meter averaging over `window`.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Record one completed generation at `now`.
    pub fn record(&mut self, now: Instant) {
        self.samples.push_back(now);
        while let Some(&oldest) = self.samples.front() {
            if now.saturating_duration_since(oldest) <= self.window {
                break;
            }
            self.samples.pop_front();
        }
    }

    /// Generations per second over the window, or `None` with fewer than
    /// two samples.
    pub fn rate(&self) -> Option<f64> {
        let (first, last) = (self.samples.front()?, self.samples.back()?);
        let span = last.saturating_duration_since(*first).as_secs_f64();
        let intervals = u32::try_from(self.samples.len().saturating_sub(1)).ok()?;
        if intervals == 0 || span <= 0.0 {
            return None;
        }
        Some(f64::from(intervals) / span)
    }
}
