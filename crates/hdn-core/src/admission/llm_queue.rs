//! LLM slot admission: bounded concurrency `M` fed by a dispatcher that
//! strictly prefers a high-priority FIFO over a low-priority FIFO, with a
//! re-queue discipline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_LLM_MAX_CONCURRENT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LlmPriority {
    Low,
    High,
}

pub struct LlmTicketGuard {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LlmAdmissionError {
    #[error("timed out waiting for an LLM slot")]
    Timeout,
    #[error("background LLM work is disabled")]
    BackgroundDisabled,
    #[error("cancelled before acquisition")]
    Cancelled,
}

struct Ticket {
    respond: oneshot::Sender<Result<OwnedSemaphorePermit, LlmAdmissionError>>,
}

/// Single background dispatcher owning the high/low FIFOs, matching §9's
/// "process-wide by contract, lazily initialized" lifecycle.
pub struct LlmQueue {
    semaphore: Arc<Semaphore>,
    high_tx: mpsc::UnboundedSender<Ticket>,
    low_tx: mpsc::UnboundedSender<Ticket>,
}

impl LlmQueue {
    pub fn new(max_concurrent: usize) -> Self {
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let (high_tx, mut high_rx) = mpsc::unbounded_channel::<Ticket>();
        let (low_tx, mut low_rx) = mpsc::unbounded_channel::<Ticket>();

        let sem = semaphore.clone();
        let low_tx_for_requeue = low_tx.clone();
        tokio::spawn(async move {
            loop {
                // Strict priority: always drain the high queue first.
                let ticket = tokio::select! {
                    biased;
                    Some(t) = high_rx.recv() => t,
                    Some(t) = low_rx.recv() => {
                        // Re-queue discipline: double-check the high queue
                        // before consuming a slot for a low ticket; if a
                        // high ticket is waiting, serve it and put the low
                        // ticket back at the tail of its own queue.
                        if let Ok(high) = high_rx.try_recv() {
                            let _ = low_tx_for_requeue.send(t);
                            high
                        } else {
                            t
                        }
                    }
                    else => break,
                };
                match sem.clone().acquire_owned().await {
                    Ok(permit) => {
                        let _ = ticket.respond.send(Ok(permit));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            semaphore,
            high_tx,
            low_tx,
        }
    }

    pub fn from_env() -> Self {
        let max = std::env::var("LLM_MAX_CONCURRENT_REQUESTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LLM_MAX_CONCURRENT);
        Self::new(max)
    }

    fn background_disabled() -> bool {
        matches!(
            std::env::var("DISABLE_BACKGROUND_LLM").as_deref(),
            Ok("1") | Ok("true")
        )
    }

    /// Acquire a slot at `priority`, honoring `cancel` and `timeout`.
    pub async fn acquire(
        &self,
        priority: LlmPriority,
        mut cancel: oneshot::Receiver<()>,
        timeout: Duration,
    ) -> Result<LlmTicketGuard, LlmAdmissionError> {
        if priority == LlmPriority::Low && Self::background_disabled() {
            return Err(LlmAdmissionError::BackgroundDisabled);
        }

        let (respond_tx, respond_rx) = oneshot::channel();
        let ticket = Ticket { respond: respond_tx };
        let sender = match priority {
            LlmPriority::High => &self.high_tx,
            LlmPriority::Low => &self.low_tx,
        };
        if sender.send(ticket).is_err() {
            return Err(LlmAdmissionError::Timeout);
        }

        tokio::select! {
            biased;
            _ = &mut cancel => Err(LlmAdmissionError::Cancelled),
            result = tokio::time::timeout(timeout, respond_rx) => {
                match result {
                    Ok(Ok(Ok(permit))) => Ok(LlmTicketGuard { _permit: permit }),
                    Ok(Ok(Err(e))) => Err(e),
                    Ok(Err(_)) => Err(LlmAdmissionError::Timeout),
                    Err(_) => Err(LlmAdmissionError::Timeout),
                }
            }
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_low_ticket_acquires_when_slot_free() {
        let queue = LlmQueue::new(1);
        let (_tx, rx) = oneshot::channel();
        let guard = queue
            .acquire(LlmPriority::Low, rx, Duration::from_millis(500))
            .await
            .unwrap();
        drop(guard);
    }

    #[tokio::test]
    async fn background_disabled_drops_low_priority() {
        std::env::set_var("DISABLE_BACKGROUND_LLM", "1");
        let queue = LlmQueue::new(1);
        let (_tx, rx) = oneshot::channel();
        let err = queue
            .acquire(LlmPriority::Low, rx, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err, LlmAdmissionError::BackgroundDisabled);
        std::env::remove_var("DISABLE_BACKGROUND_LLM");
    }

    #[tokio::test]
    async fn cancellation_before_acquisition_is_observed() {
        let queue = LlmQueue::new(1);
        let (tx, rx) = oneshot::channel();
        tx.send(()).unwrap();
        let err = queue
            .acquire(LlmPriority::Low, rx, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, LlmAdmissionError::Cancelled);
    }

    /// With a single slot held, queue a low-priority waiter and then a
    /// high-priority one; once the slot frees, the high ticket must be
    /// served first even though it arrived second. Relies on the
    /// current-thread test runtime: neither spawned task nor the
    /// dispatcher runs until this task hits its own `.await`, so both
    /// tickets are guaranteed to be queued before the slot is released.
    #[tokio::test]
    async fn high_priority_waiter_is_served_before_earlier_low_priority_waiter() {
        let queue = Arc::new(LlmQueue::new(1));
        let (_cancel0_tx, cancel0_rx) = oneshot::channel();
        let guard0 = queue
            .acquire(LlmPriority::Low, cancel0_rx, Duration::from_secs(5))
            .await
            .unwrap();

        let (order_tx, mut order_rx) = mpsc::unbounded_channel::<&'static str>();

        let q_low = queue.clone();
        let tx_low = order_tx.clone();
        let (_cancel_low_tx, cancel_low_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _guard = q_low
                .acquire(LlmPriority::Low, cancel_low_rx, Duration::from_secs(5))
                .await
                .unwrap();
            tx_low.send("low").unwrap();
        });

        let q_high = queue.clone();
        let tx_high = order_tx.clone();
        let (_cancel_high_tx, cancel_high_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _guard = q_high
                .acquire(LlmPriority::High, cancel_high_rx, Duration::from_secs(5))
                .await
                .unwrap();
            tx_high.send("high").unwrap();
        });

        drop(guard0);

        assert_eq!(order_rx.recv().await.unwrap(), "high");
        assert_eq!(order_rx.recv().await.unwrap(), "low");
    }
}
