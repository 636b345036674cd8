//! Bounded worker pool for multi-item store operations.
//!
//! [`run_bounded`] runs one task per input item on a `JoinSet`, with a
//! semaphore capping the number of tasks doing I/O at once. Each task
//! reports its input index, so outputs land in pre-sized slots and the
//! result vector is aligned with the input regardless of completion order.
//!
//! Waiting for results races the caller's cancellation signal. On
//! cancellation every outstanding task is aborted and [`Cancelled`] is
//! returned; partial results are discarded.

use std::future::Future;
use std::sync::Arc;

use dab_core::{Cancellation, Cancelled};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::StoreError;

/// Run `work` over every item with at most `concurrency` in flight.
///
/// The returned vector has one entry per input item, in input order.
pub async fn run_bounded<I, T, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    cancel: &Cancellation,
    work: F,
) -> Result<Vec<Result<T, StoreError>>, Cancelled>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }

    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut slots: Vec<Option<Result<T, StoreError>>> = (0..total).map(|_| None).collect();
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let fut = work(item);
        tasks.spawn(async move {
            let out = match semaphore.acquire_owned().await {
                Ok(_permit) => fut.await,
                Err(_) => Err(StoreError::Worker("worker pool closed".into())),
            };
            (index, out)
        });
    }

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tasks.abort_all();
                return Err(Cancelled);
            }
            joined = tasks.join_next() => joined,
        };
        match joined {
            None => break,
            Some(Ok((index, out))) => slots[index] = Some(out),
            Some(Err(e)) => {
                tracing::error!(error = %e, "store worker did not complete");
            }
        }
    }

    Ok(slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(StoreError::Worker("worker panicked before reporting".into())))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn results_follow_input_order() {
        let n = 8u64;
        let out = run_bounded(
            (0..n).collect(),
            3,
            &Cancellation::never(),
            move |i| async move {
                // Later items finish first.
                tokio::time::sleep(Duration::from_millis((n - i) * 10)).await;
                Ok(i * 100)
            },
        )
        .await
        .unwrap();
        let values: Vec<u64> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..n).map(|i| i * 100).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_never_exceeds_limit() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (c, p) = (current.clone(), peak.clone());

        let out = run_bounded((0..20).collect(), 4, &Cancellation::never(), move |i: u64| {
            let (c, p) = (c.clone(), p.clone());
            async move {
                let now = c.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5 + i % 3)).await;
                c.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(out.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failures_stay_in_their_slot() {
        let out = run_bounded(vec![1, 2, 3], 2, &Cancellation::never(), |i: u32| async move {
            if i == 2 {
                Err(StoreError::NotFound { key: "two".into() })
            } else {
                Ok(i)
            }
        })
        .await
        .unwrap();
        assert_eq!(out[0].as_ref().unwrap(), &1);
        assert!(matches!(out[1], Err(StoreError::NotFound { .. })));
        assert_eq!(out[2].as_ref().unwrap(), &3);
    }

    #[tokio::test]
    async fn panicking_worker_reports_failure() {
        let out = run_bounded(vec![0u8, 1], 2, &Cancellation::never(), |i| async move {
            if i == 1 {
                panic!("worker blew up");
            }
            Ok(i)
        })
        .await
        .unwrap();
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(StoreError::Worker(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_outstanding_work() {
        let (handle, token) = dab_core::cancellation();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });
        let out = run_bounded(vec![(); 3], 1, &token, |_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;
        assert_eq!(out.err(), Some(Cancelled));
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let out = run_bounded(Vec::<u8>::new(), 5, &Cancellation::never(), |i| async move {
            Ok(i)
        })
        .await
        .unwrap();
        assert!(out.is_empty());
    }
}
