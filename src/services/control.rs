//! Pollable cancellation backed by the property store's run-control flag

use std::sync::Arc;

use crate::error::{AltgenError, AltgenResult};
use crate::services::store::{self, PropertyStore, RunStatus};

/// Cooperative cancellation condition.
///
/// The orchestrator polls this at its checkpoints (row start, slot start,
/// inside backoff waits); a separate `altgen stop` invocation flips the flag
/// in the store and the running batch observes it at the next poll.
#[derive(Clone)]
pub struct RunControl {
    store: Arc<dyn PropertyStore>,
}

impl RunControl {
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self { store }
    }

    pub async fn is_cancelled(&self) -> AltgenResult<bool> {
        Ok(store::run_status(&*self.store).await? == RunStatus::Stop)
    }

    /// Fails with [`AltgenError::Cancelled`] when the flag is set.
    pub async fn ensure_active(&self) -> AltgenResult<()> {
        if self.is_cancelled().await? {
            Err(AltgenError::Cancelled)
        } else {
            Ok(())
        }
    }
}
