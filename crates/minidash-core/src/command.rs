//! Single-flight guard for user-triggered commands.
//!
//! Each command owns a one-permit semaphore. Invoking the command while a
//! previous invocation still holds the permit is rejected immediately
//! (never queued), which keeps a double-click from issuing two writes.
//! The permit is released when the call finishes, whether it succeeded,
//! failed, or was dropped.

use std::future::Future;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{0} is already in progress")]
    Busy(&'static str),
}

pub struct SingleFlight {
    name: &'static str,
    permit: Semaphore,
}

impl SingleFlight {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            permit: Semaphore::new(1),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a call would be accepted right now.
    pub fn can_execute(&self) -> bool {
        self.permit.available_permits() > 0
    }

    /// Run `action` unless this command is already running.
    ///
    /// When rejected, `action` is never called.
    pub async fn run<F, Fut, T>(&self, action: F) -> Result<T, CommandError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let Ok(_permit) = self.permit.try_acquire() else {
            debug!(command = self.name, "Rejected re-entrant command");
            return Err(CommandError::Busy(self.name));
        };
        Ok(action().await)
    }
}
