use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use log::debug;

use crate::async_util::{Notifier, NotifierReceiver};

/// An advisory cancellation signal shared between a caller and the operations it started.
///
/// Every wait in this crate checks the token when it is polled and is woken when the token
/// fires, so a cancelled wait resolves to [`crate::Outcome::Cancelled`] and releases its event
/// subscription. In-flight writes to a characteristic are never interrupted.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    fired: Notifier<()>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token. Calling it more than once has no further effect.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            debug!("cancellation requested");
            self.inner.fired.notify(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once the token has fired.
    pub async fn cancelled(&self) {
        let mut listener = self.listen();
        std::future::poll_fn(|cx| listener.poll_cancelled(cx)).await
    }

    pub(crate) fn listen(&self) -> CancelListener {
        // subscribe before reading the flag, so a concurrent `cancel` is never missed
        let fired = self.inner.fired.listen();
        CancelListener {
            token: self.clone(),
            fired,
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Registration of one wait on a [`CancellationToken`].
pub(crate) struct CancelListener {
    token: CancellationToken,
    fired: NotifierReceiver<()>,
}

impl CancelListener {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn poll_cancelled(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }
        match Pin::new(&mut self.fired).poll_next(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending if self.token.is_cancelled() => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::{block_on, poll_once};

    #[test]
    fn cancel_is_sticky_and_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
        block_on(clone.cancelled());
    }

    #[test]
    fn cancelled_waits_for_the_signal() {
        let token = CancellationToken::new();
        let mut fut = Box::pin(token.cancelled());
        assert!(block_on(poll_once(&mut fut)).is_none());
        token.cancel();
        assert!(block_on(poll_once(&mut fut)).is_some());
    }

    #[test]
    fn wakes_from_another_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            remote.cancel();
        });
        block_on(token.cancelled());
        handle.join().unwrap();
    }
}
