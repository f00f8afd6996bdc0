use crate::constants::{PROGRESS_EASING, PROGRESS_SNAP_EPSILON};

/// Eases a displayed progress value toward the authoritative server value.
///
/// Each `tick` covers a fixed fraction of the remaining distance, so the
/// displayed value approaches the target continuously and never overshoots.
#[derive(Debug, Clone, Default)]
pub struct ProgressSmoother {
    displayed: f64,
    target: f64,
}

impl ProgressSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value to approach, clamped into [0, 100].
    pub fn set_target(&mut self, target: f64) {
        self.target = if target.is_finite() {
            target.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Advance one step and return the new displayed value.
    pub fn tick(&mut self) -> f64 {
        let remaining = self.target - self.displayed;
        if remaining.abs() < PROGRESS_SNAP_EPSILON {
            self.displayed = self.target;
        } else {
            self.displayed += remaining * PROGRESS_EASING;
        }
        self.displayed
    }

    /// Jump both values to zero (used when a job fails).
    pub fn reset(&mut self) {
        self.displayed = 0.0;
        self.target = 0.0;
    }

    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.displayed == self.target
    }
}
