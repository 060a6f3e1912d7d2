use std::sync::atomic::{AtomicBool, Ordering};

use async_lock::{Semaphore, SemaphoreGuard};
use futures_lite::FutureExt;
use log::debug;

use crate::cancel::CancellationToken;
use crate::Outcome;

/// Single-flight admission control of a serial channel.
///
/// A binary semaphore: at most one [`GatePermit`] exists at a time, and dropping it hands the
/// gate to the next waiter. Waiters are served in the order the semaphore wakes them, which is
/// not guaranteed to be FIFO.
#[derive(Debug)]
pub struct ReadinessGate {
    permits: Semaphore,
    held: AtomicBool,
}

/// Exclusive use of a [`ReadinessGate`]; released when dropped.
#[must_use = "the gate is released as soon as the permit is dropped"]
pub struct GatePermit<'a> {
    gate: &'a ReadinessGate,
    _guard: SemaphoreGuard<'a>,
}

impl ReadinessGate {
    /// Creates a gate that is ready.
    pub const fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
            held: AtomicBool::new(false),
        }
    }

    /// A snapshot: `true` if nobody holds the gate right now.
    pub fn is_ready(&self) -> bool {
        !self.held.load(Ordering::SeqCst)
    }

    /// Takes the gate if it is ready, without waiting.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        self.permits.try_acquire().map(|guard| self.permit(guard))
    }

    /// Waits until the gate is ready and takes it.
    ///
    /// A ready gate is taken inline without suspending. A cancelled token wins over a
    /// ready gate, so a cancelled caller never proceeds holding the gate.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Outcome<GatePermit<'_>> {
        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        if let Some(permit) = self.try_acquire() {
            return Outcome::Completed(permit);
        }
        debug!("serial gate busy, waiting");
        let cancelled = async {
            cancel.cancelled().await;
            Outcome::Cancelled
        };
        let acquired = async { Outcome::Completed(self.permit(self.permits.acquire().await)) };
        cancelled.or(acquired).await
    }

    fn permit<'a>(&'a self, guard: SemaphoreGuard<'a>) -> GatePermit<'a> {
        let was_held = self.held.swap(true, Ordering::SeqCst);
        debug_assert!(!was_held, "serial gate handed out twice");
        debug!("serial gate acquired");
        GatePermit {
            gate: self,
            _guard: guard,
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.held.store(false, Ordering::SeqCst);
        debug!("serial gate released");
    }
}

impl std::fmt::Debug for GatePermit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatePermit").finish_non_exhaustive()
    }
}
