//! Cooperative cancellation shared between the CLI and the pipeline.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Clonable cancellation flag.
///
/// All clones observe the same state; once cancelled a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation; wakes every waiter.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of the token, so this only
        // returns early if every token was dropped.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Run `fut` unless cancellation wins the race; `None` means cancelled.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn run_completes_when_not_cancelled() {
        let token = CancelToken::new();
        assert_eq!(token.run(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn run_returns_none_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(token.run(async { 7 }).await, None);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_future() {
        let token = CancelToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = token
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert!(result.is_none());
    }
}
