use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task;

use async_broadcast::{Receiver, Sender};
use async_lock::Mutex;

/// An event source fired from "foreign" callbacks of the platform binding.
///
/// Every [`NotifierReceiver`] obtained from [`Notifier::listen`] is one subscription; dropping
/// it unsubscribes. Values raised while nobody listens are discarded, and dropping the
/// `Notifier` ends the stream of every receiver.
pub struct Notifier<T: Send + Clone> {
    capacity: usize,
    inner: Mutex<Weak<NotifierInner<T>>>,
}

struct NotifierInner<T: Send + Clone> {
    sender: Sender<Option<T>>,
}

/// A subscription to a [`Notifier`], yielding every value raised after it was created.
pub struct NotifierReceiver<T: Send + Clone> {
    holder: Option<Arc<NotifierInner<T>>>,
    receiver: Receiver<Option<T>>,
}

impl<T: Send + Clone> Notifier<T> {
    /// Creates a new `Notifier` without listeners.
    ///
    /// Each receiver buffers up to `capacity` values; on overflow the oldest value is dropped.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Weak::new()),
        }
    }

    /// Checks if anyone is listening.
    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }

    /// Returns the number of live receivers.
    pub fn listener_count(&self) -> usize {
        self.inner.lock_blocking().strong_count()
    }

    /// Creates a new `NotifierReceiver` for the caller to receive values raised from now on.
    pub fn listen(&self) -> NotifierReceiver<T> {
        let mut guard_inner = self.inner.lock_blocking();
        if let Some(inner) = guard_inner.upgrade() {
            let receiver = inner.sender.new_receiver();
            NotifierReceiver {
                holder: Some(inner),
                receiver,
            }
        } else {
            let (mut sender, receiver) = async_broadcast::broadcast(self.capacity.max(1));
            sender.set_overflow(true);
            sender.set_await_active(false);
            let new_inner = Arc::new(NotifierInner { sender });
            *guard_inner = Arc::downgrade(&new_inner);
            NotifierReceiver {
                holder: Some(new_inner),
                receiver,
            }
        }
    }

    /// Sends a value from the "foreign" callback. Never blocks.
    pub fn notify(&self, value: T) {
        let inner = self.inner.lock_blocking().upgrade();
        if let Some(inner) = inner {
            let _ = inner.sender.try_broadcast(Some(value));
        }
    }
}

impl<T: Send + Clone> Default for Notifier<T> {
    fn default() -> Self {
        Self::new(16)
    }
}

impl<T: Send + Clone> std::fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("capacity", &self.capacity)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<T: Send + Clone> Drop for Notifier<T> {
    fn drop(&mut self) {
        let inner = self.inner.lock_blocking().upgrade();
        if let Some(inner) = inner {
            let _ = inner.sender.try_broadcast(None);
        }
    }
}

impl<T: Send + Clone> futures_core::Stream for NotifierReceiver<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> task::Poll<Option<T>> {
        if self.holder.is_none() {
            task::Poll::Ready(None)
        } else if let task::Poll::Ready(result) = std::pin::pin!(&mut self.receiver).poll_next(cx) {
            if let Some(value) = result.flatten() {
                task::Poll::Ready(Some(value))
            } else {
                let _ = self.holder.take();
                task::Poll::Ready(None)
            }
        } else {
            task::Poll::Pending
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.receiver.size_hint()
    }
}
