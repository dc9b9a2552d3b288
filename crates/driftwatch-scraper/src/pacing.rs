//! Adaptive request pacing.
//!
//! Tracks consecutive work-unit failures within a run and stretches the
//! inter-request delay accordingly. The multiplier grows by 0.5 per failure
//! up to a 4x ceiling and relaxes gradually on success rather than snapping
//! back, so a burst of rate-limit responses keeps the run slow for a while
//! even after it recovers.

use std::time::Duration;

const FAILURE_STEP: f64 = 0.5;
const MAX_MULTIPLIER: f64 = 4.0;

/// Per-run pacing state owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct PacingState {
    consecutive_failures: u32,
    multiplier: f64,
}

impl Default for PacingState {
    fn default() -> Self {
        Self::new()
    }
}

impl PacingState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            consecutive_failures: 0,
            multiplier: 1.0,
        }
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// The delay to wait before the next request, given the configured base.
    #[must_use]
    pub fn delay(&self, base: Duration) -> Duration {
        base.mul_f64(self.multiplier)
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.multiplier = (self.multiplier + FAILURE_STEP).min(MAX_MULTIPLIER);
    }

    /// Clears the failure streak and halves the multiplier's distance to 1.0.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.multiplier = 1.0 + (self.multiplier - 1.0) / 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_base_rate() {
        let state = PacingState::new();
        assert_eq!(state.consecutive_failures(), 0);
        assert!((state.multiplier() - 1.0).abs() < f64::EPSILON);
        assert_eq!(state.delay(Duration::from_millis(1000)), Duration::from_millis(1000));
    }

    #[test]
    fn failures_increase_delay() {
        let mut state = PacingState::new();
        state.record_failure();
        assert_eq!(state.consecutive_failures(), 1);
        assert!((state.multiplier() - 1.5).abs() < f64::EPSILON);
        assert_eq!(state.delay(Duration::from_millis(1000)), Duration::from_millis(1500));

        state.record_failure();
        assert!((state.multiplier() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn multiplier_caps_at_four() {
        let mut state = PacingState::new();
        for _ in 0..20 {
            state.record_failure();
        }
        assert!((state.multiplier() - 4.0).abs() < f64::EPSILON);
        assert_eq!(state.delay(Duration::from_millis(500)), Duration::from_millis(2000));
    }

    #[test]
    fn success_relaxes_gradually() {
        let mut state = PacingState::new();
        for _ in 0..6 {
            state.record_failure();
        }
        let elevated = state.multiplier();
        assert!((elevated - 4.0).abs() < f64::EPSILON);

        state.record_success();
        assert_eq!(state.consecutive_failures(), 0);
        assert!(state.multiplier() < elevated);
        assert!(state.multiplier() > 1.0, "one success does not snap back to base");

        // Repeated successes converge toward the base rate.
        for _ in 0..20 {
            state.record_success();
        }
        assert!((state.multiplier() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn success_on_fresh_state_is_a_noop() {
        let mut state = PacingState::new();
        state.record_success();
        assert!((state.multiplier() - 1.0).abs() < f64::EPSILON);
    }
}
