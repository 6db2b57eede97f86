//! Single-slot cancellable deferred-redraw task.
//!
//! During rapid scale updates (continuous pan/zoom) a plot applies a cheap
//! approximation immediately and defers the true re-render until updates
//! stop for a quiescence window. This is a debounce: scheduling replaces
//! any pending deadline, and only the most recent one can fire. Time is
//! injected by the embedding driver, so there is no timer dependency.

pub const DEFAULT_QUIESCENCE_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredRedrawTask {
    quiescence_ms: f64,
    deadline_ms: Option<f64>,
}

impl Default for DeferredRedrawTask {
    fn default() -> Self {
        Self::new(DEFAULT_QUIESCENCE_MS)
    }
}

impl DeferredRedrawTask {
    #[must_use]
    pub fn new(quiescence_ms: f64) -> Self {
        Self {
            quiescence_ms: quiescence_ms.max(0.0),
            deadline_ms: None,
        }
    }

    #[must_use]
    pub fn quiescence_ms(&self) -> f64 {
        self.quiescence_ms
    }

    /// Schedules (or re-schedules) the redraw. A superseded deadline is
    /// dropped, never queued.
    pub fn schedule(&mut self, now_ms: f64) {
        self.deadline_ms = Some(now_ms + self.quiescence_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Returns `true` exactly once when the pending deadline has elapsed,
    /// clearing it.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DeferredRedrawTask;

    #[test]
    fn rescheduling_supersedes_the_previous_deadline() {
        let mut task = DeferredRedrawTask::new(100.0);
        task.schedule(0.0);
        task.schedule(50.0);
        assert!(!task.poll(120.0));
        assert!(task.poll(150.0));
        assert!(!task.poll(10_000.0));
    }

    #[test]
    fn cancel_drops_the_pending_deadline() {
        let mut task = DeferredRedrawTask::new(100.0);
        task.schedule(0.0);
        task.cancel();
        assert!(!task.is_pending());
        assert!(!task.poll(1_000.0));
    }
}
