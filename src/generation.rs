use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Tag attached to one request so its result can be dropped once a newer
/// request has been issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Debounce-and-discard bookkeeping shared between the code issuing
/// requests and the code receiving their results.
#[derive(Debug, Clone, Default)]
pub struct GenerationTracker {
    latest: Arc<AtomicU64>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new generation, superseding every earlier one.
    pub fn advance(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> Generation {
        Generation(self.latest.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }

    /// Passes `value` through only if `generation` is still the latest.
    pub fn accept<T>(&self, generation: Generation, value: T) -> Option<T> {
        self.is_current(generation).then_some(value)
    }

    /// Waits `delay` after `generation` was issued; returns it only if
    /// nothing newer was issued in the meantime.
    pub async fn debounce(&self, generation: Generation, delay: Duration) -> Option<Generation> {
        tokio::time::sleep(delay).await;
        self.is_current(generation).then_some(generation)
    }
}
