use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Wall-clock deadline plus a cooperative cancellation flag for one run.
///
/// Strategies poll it between steps; nothing is interrupted preemptively.
#[derive(Debug, Clone)]
pub struct Budget {
    deadline: Option<Instant>,
    cancellation_token: Arc<AtomicBool>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_time_limit(limit: Duration) -> Self {
        Self::unlimited().deadline_in(limit)
    }

    pub fn deadline_in(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::Relaxed)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True once the run should stop for any reason.
    pub fn is_exhausted(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}
