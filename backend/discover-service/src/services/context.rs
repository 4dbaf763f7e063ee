use crate::error::{RecommendError, Result};
use tokio::sync::watch;
use uuid::Uuid;

/// Per-request context shared by every stage of one recommendation.
///
/// Clones observe the same cancellation flag. Cancellation is one-way.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    cancel_rx: watch::Receiver<bool>,
}

/// Owner side of a [`RequestContext`]'s cancellation flag.
#[derive(Debug)]
pub struct CancelHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

impl RequestContext {
    pub fn new() -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (
            Self {
                request_id: Uuid::new_v4(),
                cancel_rx,
            },
            CancelHandle { cancel_tx },
        )
    }

    /// A context nobody can cancel.
    pub fn detached() -> Self {
        Self::new().0
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Returns `Err(Cancelled)` once the request has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RecommendError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the request is cancelled. Never resolves for a detached context.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // handle dropped without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}
