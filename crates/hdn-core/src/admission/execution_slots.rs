//! Global execution slot reservation: `N-1` general + 1 interactive.
//!
//! A request marked interactive tries the interactive slot first, then
//! falls back to general. Non-interactive requests use only the general
//! partition. On exhaustion, synchronous callers see `Overloaded`
//! immediately; async callers may wait up to a deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default total concurrency, overridden by `HDN_MAX_CONCURRENT_EXECUTIONS`.
pub const DEFAULT_MAX_CONCURRENT_EXECUTIONS: usize = 3;

/// How long an async launch waits before failing the owning workflow.
pub const ADMISSION_WAIT_DEADLINE: Duration = Duration::from_secs(60);

pub struct ExecutionPermit {
    _general: Option<OwnedSemaphorePermit>,
    _interactive: Option<OwnedSemaphorePermit>,
}

/// Two independent semaphores: `general` sized `N-1`, `interactive` sized 1.
pub struct ExecutionAdmission {
    general: Arc<Semaphore>,
    interactive: Arc<Semaphore>,
}

#[derive(Debug, thiserror::Error)]
#[error("no execution slot available")]
pub struct AdmissionExhausted;

impl ExecutionAdmission {
    pub fn new(total: usize) -> Self {
        let total = total.max(1);
        let general = (total - 1).max(1);
        Self {
            general: Arc::new(Semaphore::new(general)),
            interactive: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn from_env() -> Self {
        let total = std::env::var("HDN_MAX_CONCURRENT_EXECUTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENT_EXECUTIONS);
        Self::new(total)
    }

    /// Best-effort immediate acquisition (synchronous handler path): returns
    /// `Err(AdmissionExhausted)` rather than waiting.
    pub async fn acquire(&self, interactive: bool) -> Result<ExecutionPermit, AdmissionExhausted> {
        if interactive {
            if let Ok(permit) = self.interactive.clone().try_acquire_owned() {
                return Ok(ExecutionPermit {
                    _general: None,
                    _interactive: Some(permit),
                });
            }
        }
        match self.general.clone().try_acquire_owned() {
            Ok(permit) => Ok(ExecutionPermit {
                _general: Some(permit),
                _interactive: None,
            }),
            Err(_) => Err(AdmissionExhausted),
        }
    }

    /// Bounded wait for an async launch, capped at a 60s deadline.
    pub async fn acquire_with_deadline(
        &self,
        interactive: bool,
        deadline: Duration,
    ) -> Result<ExecutionPermit, AdmissionExhausted> {
        let fut = async {
            if interactive {
                if let Ok(permit) = self.interactive.clone().acquire_owned().await {
                    return ExecutionPermit {
                        _general: None,
                        _interactive: Some(permit),
                    };
                }
            }
            let permit = self.general.clone().acquire_owned().await.expect("semaphore not closed");
            ExecutionPermit {
                _general: Some(permit),
                _interactive: None,
            }
        };
        tokio::time::timeout(deadline, fut)
            .await
            .map_err(|_| AdmissionExhausted)
    }

    pub fn available_general(&self) -> usize {
        self.general.available_permits()
    }

    pub fn available_interactive(&self) -> usize {
        self.interactive.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn general_slots_are_n_minus_one() {
        let admission = ExecutionAdmission::new(3);
        assert_eq!(admission.available_general(), 2);
        assert_eq!(admission.available_interactive(), 1);
    }

    #[tokio::test]
    async fn exhaustion_rejects_synchronously() {
        let admission = ExecutionAdmission::new(1);
        let _p1 = admission.acquire(false).await.unwrap();
        assert!(admission.acquire(false).await.is_err());
    }

    #[tokio::test]
    async fn interactive_falls_back_to_general_when_reserved_slot_taken() {
        let admission = ExecutionAdmission::new(2);
        let _p1 = admission.acquire(true).await.unwrap();
        // Second interactive request falls back to the general partition.
        let p2 = admission.acquire(true).await.unwrap();
        drop(p2);
    }
}
