//! Caller-supplied cancellation signal.
//!
//! A [`CancelHandle`] / [`Cancellation`] pair wraps a `tokio::sync::watch`
//! channel carrying a single boolean. Cancellation is level-triggered: once
//! fired it stays fired, and every clone of the [`Cancellation`] observes it,
//! including clones taken after the fact.
//!
//! Long-running operations take `&Cancellation` and race their suspension
//! points against [`Cancellation::cancelled`], typically with `tokio::select!`.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

/// The operation was abandoned because its cancellation signal fired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Fires the cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// A fresh receiver bound to this handle.
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes a cancellation signal.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle/token pair.
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, Cancellation { rx })
}

impl Cancellation {
    /// A token that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal fires. Pends forever if the handle is dropped
    /// without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `fut` to completion unless the signal fires first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn run_completes_when_not_cancelled() {
        let (_handle, token) = cancellation();
        assert_eq!(token.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn already_cancelled_short_circuits() {
        let (handle, token) = cancellation();
        handle.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.run(async { 7 }).await, Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_pending_future() {
        let (handle, token) = cancellation();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });
        let out = token
            .run(tokio::time::sleep(Duration::from_secs(3600)))
            .await;
        assert_eq!(out, Err(Cancelled));
    }

    #[tokio::test]
    async fn clones_observe_cancellation() {
        let (handle, token) = cancellation();
        let clone = token.clone();
        handle.cancel();
        let late = handle.token();
        assert!(clone.is_cancelled());
        assert!(late.is_cancelled());
        clone.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn never_does_not_fire() {
        let token = Cancellation::never();
        let out = tokio::time::timeout(Duration::from_secs(5), token.cancelled()).await;
        assert!(out.is_err());
    }
}
