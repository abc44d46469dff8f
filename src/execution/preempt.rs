use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the orchestrator and a state.
///
/// Setting it never interrupts an in-flight call; polling states observe it once per tick.
#[derive(Debug, Clone, Default)]
pub struct PreemptSignal {
    requested: Arc<AtomicBool>,
}

impl PreemptSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Acknowledge a handled preemption so the next visit runs normally.
    ///
    /// Returns whether a request was pending.
    pub fn clear(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}
