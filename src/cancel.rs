//! Cooperative cancellation for a prediction request

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{MatchError, Result};

/// Shared flag checked between pipeline stages and training batches
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Return `Err(Cancelled)` once cancellation has been requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(flag.check().is_ok());

        other.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(MatchError::Cancelled)));
    }
}
