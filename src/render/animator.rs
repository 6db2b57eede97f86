use serde::{Deserialize, Serialize};

/// Identifies one animation phase of a render.
///
/// Every animated plot registers the `Reset` and `Main` pair; plot kinds may
/// register additional named phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimatorKey {
    /// Resets visual elements before the main transition.
    Reset,
    /// The main transition into the final visualization.
    Main,
    Custom(&'static str),
}

/// Animation timing contract. Easing math is external; the core only needs
/// the duration a draw step occupies.
pub trait Animator {
    /// Total time in milliseconds to animate `num_steps` elements.
    fn total_time(&self, num_steps: usize) -> f64;
}

/// Applies instantly with zero duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn total_time(&self, _num_steps: usize) -> f64 {
        0.0
    }
}

/// Duration/delay arithmetic for a staggered transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EasingAnimator {
    pub start_delay_ms: f64,
    pub step_duration_ms: f64,
    pub step_delay_ms: f64,
    pub max_total_duration_ms: f64,
}

impl Default for EasingAnimator {
    fn default() -> Self {
        Self {
            start_delay_ms: 0.0,
            step_duration_ms: 300.0,
            step_delay_ms: 15.0,
            max_total_duration_ms: 600.0,
        }
    }
}

impl EasingAnimator {
    #[must_use]
    pub fn with_max_total_duration(mut self, max_total_duration_ms: f64) -> Self {
        self.max_total_duration_ms = max_total_duration_ms;
        self
    }

    #[must_use]
    pub fn with_step_duration(mut self, step_duration_ms: f64) -> Self {
        self.step_duration_ms = step_duration_ms;
        self
    }
}

impl Animator for EasingAnimator {
    fn total_time(&self, num_steps: usize) -> f64 {
        if num_steps == 0 {
            return 0.0;
        }
        let stagger_slots = (num_steps - 1) as f64;
        // Squeeze the per-step delay so the whole transition fits under the
        // max total duration.
        let adjusted_delay = if stagger_slots > 0.0 {
            self.step_delay_ms
                .min((self.max_total_duration_ms - self.step_duration_ms).max(0.0) / stagger_slots)
        } else {
            0.0
        };
        self.start_delay_ms + adjusted_delay * stagger_slots + self.step_duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::{Animator, EasingAnimator, NullAnimator};

    #[test]
    fn null_animator_takes_no_time() {
        assert_eq!(NullAnimator.total_time(1_000), 0.0);
    }

    #[test]
    fn easing_total_time_is_capped_by_max_duration() {
        let animator = EasingAnimator::default();
        assert_eq!(animator.total_time(1), 300.0);
        assert!(animator.total_time(10_000) <= animator.max_total_duration_ms + 1e-9);
    }
}
