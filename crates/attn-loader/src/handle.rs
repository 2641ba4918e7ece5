//! Awaitable per-wave result.

use crate::error::{LoaderError, LoaderResult};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Resolves once with the outcome of one wave.
///
/// If the producing task goes away without reporting (runtime shutdown,
/// abort), the handle resolves to `LoaderError::Cancelled`.
#[derive(Debug)]
pub struct WaveHandle<T> {
    rx: oneshot::Receiver<LoaderResult<T>>,
}

impl<T> WaveHandle<T> {
    pub(crate) fn channel() -> (oneshot::Sender<LoaderResult<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Non-blocking check. `None` while the wave is still running.
    pub fn try_take(&mut self) -> Option<LoaderResult<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(LoaderError::Cancelled)),
        }
    }
}

impl<T> Future for WaveHandle<T> {
    type Output = LoaderResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(LoaderError::Cancelled)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_with_sent_value() {
        let (tx, handle) = WaveHandle::<u32>::channel();
        tx.send(Ok(7)).unwrap();
        assert_eq!(handle.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_dropped_sender_is_cancelled() {
        let (tx, handle) = WaveHandle::<u32>::channel();
        drop(tx);
        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_pending_until_sent() {
        let (tx, handle) = WaveHandle::<u32>::channel();
        let mut task = tokio_test::task::spawn(handle);
        tokio_test::assert_pending!(task.poll());

        tx.send(Ok(3)).unwrap();
        assert!(task.is_woken());
        assert_eq!(tokio_test::assert_ready_ok!(task.poll()), 3);
    }

    #[test]
    fn test_try_take() {
        let (tx, mut handle) = WaveHandle::<u32>::channel();
        assert!(handle.try_take().is_none());
        tx.send(Ok(1)).unwrap();
        assert_eq!(handle.try_take().unwrap().unwrap(), 1);
    }
}
