//! # Foreign-Driven Futures (native side)
//!
//! The reverse direction of the bridge: native code awaiting a computation
//! the foreign side drives. The foreign side hands back a `ForeignFuture`
//! (its handle plus a free callback); when the work finishes it invokes a
//! native completion callback, which lands here and resolves the awaiting
//! task.
//!
//! The foreign handle is released through its free callback exactly once,
//! whether the wait completes, fails, or is abandoned — the guard's drop
//! is the single release point.

use dashmap::DashMap;
use std::any::Any;
use std::sync::LazyLock;
use tokio::sync::oneshot;
use tracing::warn;

use trestle_core::foreign::{ForeignFuture, ForeignFutureResult};
use trestle_core::status::{CALL_CANCELLED, CALL_DOMAIN_ERROR, CALL_SUCCESS};
use trestle_core::{BridgeError, BridgeResult, CallFault};

use crate::future::Outcome;
use crate::registry::HandleAllocator;

/// Pending completions keyed by the word handed to the foreign side
pub struct PendingForeignCalls {
    entries: DashMap<u64, Box<dyn Any + Send + Sync>>,
    allocator: HandleAllocator,
}

impl PendingForeignCalls {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            allocator: HandleAllocator::new(),
        }
    }

    /// Create a pending slot; returns the key to hand to the foreign side
    /// and the receiver the native task awaits
    pub fn register<T: Send + 'static>(&self) -> (u64, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel::<Outcome<T>>();
        let key = self.allocator.allocate();
        self.entries.insert(key, Box::new(tx));
        (key, rx)
    }

    /// Deliver a completion for a pending key
    ///
    /// Invoked by the generated completion entry point. The key is
    /// consumed; delivering twice observes `UnknownHandle`.
    pub fn complete<T: Send + 'static>(&self, key: u64, outcome: Outcome<T>) -> BridgeResult<()> {
        let (_, slot) = self
            .entries
            .remove(&key)
            .ok_or(BridgeError::UnknownHandle(key))?;
        let tx = slot
            .downcast::<oneshot::Sender<Outcome<T>>>()
            .map_err(|_| BridgeError::TypeMismatch(key))?;
        if tx.send(outcome).is_err() {
            // The awaiting task gave up; nothing left to resolve
            warn!(key, "foreign completion arrived after the waiter was dropped");
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for PendingForeignCalls {
    fn default() -> Self {
        Self::new()
    }
}

/// Global pending-completion table
static FOREIGN_CALLS: LazyLock<PendingForeignCalls> = LazyLock::new(PendingForeignCalls::new);

/// Get reference to the global pending-completion table
pub fn pending_foreign_calls() -> &'static PendingForeignCalls {
    &FOREIGN_CALLS
}

/// Releases the foreign future's resources on drop
///
/// Owning this guard is owning the foreign handle; it is released exactly
/// once, on whatever path the wait ends.
pub struct ForeignFutureGuard {
    future: ForeignFuture,
}

impl ForeignFutureGuard {
    pub fn new(future: ForeignFuture) -> Self {
        Self { future }
    }
}

impl Drop for ForeignFutureGuard {
    fn drop(&mut self) {
        (self.future.free)(self.future.handle);
    }
}

/// Lift a raw foreign completion record into an outcome
///
/// The return value is meaningful only on success; on failure the payload
/// in the status buffer travels onward as an opaque domain error.
pub fn lift_foreign_result<T>(result: ForeignFutureResult<T>) -> Outcome<T> {
    let ForeignFutureResult {
        return_value,
        mut status,
    } = result;
    match status.code {
        CALL_SUCCESS => Ok(return_value),
        CALL_DOMAIN_ERROR => {
            let payload = std::mem::take(&mut status.error_buf).into_vec();
            Err(CallFault::Domain(payload))
        }
        CALL_CANCELLED => Err(CallFault::Cancelled),
        _ => {
            let payload = std::mem::take(&mut status.error_buf).into_vec();
            Err(CallFault::Internal(
                String::from_utf8_lossy(&payload).into_owned(),
            ))
        }
    }
}

/// Await a foreign-driven computation
///
/// Pairs the receiver from `register` with the foreign future returned by
/// the call that started the work. The foreign handle is freed when the
/// wait ends, on every path.
pub async fn await_foreign<T: Send + 'static>(
    future: ForeignFuture,
    rx: oneshot::Receiver<Outcome<T>>,
) -> Outcome<T> {
    let _guard = ForeignFutureGuard::new(future);
    match rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(CallFault::Internal(
            "foreign future dropped without completing".to_string(),
        )),
    }
}
