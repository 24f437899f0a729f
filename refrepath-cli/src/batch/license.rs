use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Single-slot token standing for the host's license/session.
///
/// A worker may only be spawned while its holder keeps the permit, which
/// bounds the batch to one worker in flight.
#[derive(Debug, Clone)]
pub struct HostLicense {
    slots: Arc<Semaphore>,
}

impl HostLicense {
    pub const SLOTS: usize = 1;

    pub fn new() -> Self {
        Self {
            slots: Arc::new(Semaphore::new(Self::SLOTS)),
        }
    }

    /// Wait for the slot. Released when the permit is dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.slots.clone().acquire_owned().await
    }

    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.slots.clone().try_acquire_owned().ok()
    }

    pub fn in_flight(&self) -> usize {
        Self::SLOTS - self.slots.available_permits()
    }
}

impl Default for HostLicense {
    fn default() -> Self {
        Self::new()
    }
}
