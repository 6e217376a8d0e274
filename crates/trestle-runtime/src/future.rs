//! # Future Bridge
//!
//! Lets a foreign single-threaded event loop drive a native asynchronous
//! computation to completion without any native thread blocking on its
//! behalf. One generic implementation backs every result type; the FFI
//! layer instantiates it per family at compile time.
//!
//! State machine per operation handle:
//!
//! ```text
//! Pending --poll(parks continuation)--> Pending
//! Pending --(executor fulfills, fires continuation)--> Ready
//! Pending --cancel()--> Cancelling --(cancellation observed)--> Ready
//! Ready --complete()--> Retrieved --free()--> gone
//! ```
//!
//! `poll` never blocks and never invokes the continuation re-entrantly on
//! the polling thread: an operation that is already ready has its
//! continuation fired from the executor instead. Cancellation is advisory;
//! it is observed at the operation's next suspension point and surfaces as
//! a cancellation status on the eventual completion.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use trestle_core::{BridgeError, BridgeResult, CallFault};

use crate::registry::HandleAllocator;

/// Wake code: the operation is ready; retrieve the result with `complete`.
pub const WAKE_READY: i8 = 0;
/// Wake code: the operation is not ready; register a fresh poll.
pub const WAKE_REPOLL: i8 = 1;

/// Continuation callback signature: (callback data word, wake code)
pub type ContinuationCallback = extern "C" fn(u64, i8);

/// What an asynchronous operation produces
pub type Outcome<T> = Result<T, CallFault>;

/// A parked continuation, fired exactly once
#[derive(Clone, Copy)]
struct Continuation {
    callback: ContinuationCallback,
    data: u64,
}

impl Continuation {
    fn fire(self, wake_code: i8) {
        (self.callback)(self.data, wake_code);
    }
}

enum CellState<T> {
    Pending { parked: Option<Continuation> },
    Ready { outcome: Outcome<T> },
    Retrieved,
}

/// Result of registering a poll against the current state
enum PollRegistration {
    /// Continuation parked; the executor will fire it on fulfillment
    Parked,
    /// Already ready (or retrieved); fire from the executor immediately
    AlreadyReady(Continuation),
    /// A continuation was already parked; the displaced one is returned so
    /// its caller is not stranded
    Displaced {
        displaced: Continuation,
    },
}

/// One in-flight asynchronous operation with result type `T`
pub(crate) struct FutureCell<T> {
    state: Mutex<CellState<T>>,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl<T: Send + 'static> FutureCell<T> {
    fn new() -> (Arc<Self>, oneshot::Receiver<()>) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let cell = Arc::new(Self {
            state: Mutex::new(CellState::Pending { parked: None }),
            cancel: Mutex::new(Some(cancel_tx)),
        });
        (cell, cancel_rx)
    }

    /// Record the outcome and fire any parked continuation
    ///
    /// Called exactly once, from the executor task driving the operation.
    fn fulfill(&self, outcome: Outcome<T>) {
        let parked = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, CellState::Ready { outcome }) {
                CellState::Pending { parked } => parked,
                // already fulfilled; keep the earlier state, notify no one
                previous => {
                    *state = previous;
                    None
                }
            }
        };
        // Fired outside the lock: the continuation may re-enter the bridge
        if let Some(continuation) = parked {
            continuation.fire(WAKE_READY);
        }
    }

    fn register_poll(&self, continuation: Continuation) -> PollRegistration {
        let mut state = self.state.lock();
        match &mut *state {
            CellState::Pending { parked } => match parked.replace(continuation) {
                None => PollRegistration::Parked,
                Some(displaced) => PollRegistration::Displaced { displaced },
            },
            CellState::Ready { .. } | CellState::Retrieved => {
                PollRegistration::AlreadyReady(continuation)
            }
        }
    }

    /// Move Ready -> Retrieved and hand out the outcome
    fn take_ready(&self, handle: u64) -> BridgeResult<Outcome<T>> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, CellState::Retrieved) {
            CellState::Ready { outcome } => Ok(outcome),
            CellState::Pending { parked } => {
                // Completion before readiness: restore and flag
                *state = CellState::Pending { parked };
                Err(BridgeError::NotReady(handle))
            }
            CellState::Retrieved => Err(BridgeError::AlreadyRetrieved(handle)),
        }
    }

    /// Request cooperative cancellation; a no-op once the operation
    /// finished or cancellation was already requested
    fn request_cancel(&self) {
        if let Some(tx) = self.cancel.lock().take() {
            // Receiver gone means the task already completed
            let _ = tx.send(());
        }
    }
}

/// Type-erased view over a `FutureCell<T>` for the untyped entry points
trait OperationCell: Send + Sync {
    fn register_poll_erased(&self, continuation: Continuation) -> PollRegistration;
    fn request_cancel_erased(&self);
    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

impl<T: Send + 'static> OperationCell for FutureCell<T> {
    fn register_poll_erased(&self, continuation: Continuation) -> PollRegistration {
        self.register_poll(continuation)
    }

    fn request_cancel_erased(&self) {
        self.request_cancel();
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

// ============================================================================
// OPERATION TABLE
// ============================================================================

/// Table of in-flight asynchronous operations
///
/// Async-operation handles are single-use: once the result is retrieved
/// and the handle freed, the value never comes back.
pub struct OperationTable {
    entries: DashMap<u64, Arc<dyn OperationCell>>,
    allocator: HandleAllocator,
}

impl OperationTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            allocator: HandleAllocator::new(),
        }
    }

    fn insert(&self, cell: Arc<dyn OperationCell>) -> u64 {
        let handle = self.allocator.allocate();
        self.entries.insert(handle, cell);
        handle
    }

    fn get(&self, handle: u64) -> Option<Arc<dyn OperationCell>> {
        self.entries.get(&handle).map(|entry| Arc::clone(&entry))
    }

    fn remove(&self, handle: u64) -> Option<Arc<dyn OperationCell>> {
        self.entries.remove(&handle).map(|(_, cell)| cell)
    }

    /// Number of live operation handles
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for OperationTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Spawn a native asynchronous operation and return its handle
///
/// The operation runs on the global executor, racing a cooperative
/// cancellation signal. Whatever finishes first fulfills the cell and
/// fires the parked continuation, if any.
pub fn spawn_operation<T, F>(table: &'static OperationTable, fut: F) -> u64
where
    T: Send + 'static,
    F: Future<Output = Outcome<T>> + Send + 'static,
{
    let (cell, cancel_rx) = FutureCell::<T>::new();
    let handle = table.insert(cell.clone() as Arc<dyn OperationCell>);

    crate::executor().spawn(async move {
        let outcome = tokio::select! {
            _ = cancel_rx => Err(CallFault::Cancelled),
            outcome = fut => outcome,
        };
        cell.fulfill(outcome);
    });

    debug!(handle, "operation spawned");
    handle
}

/// Register interest in an operation's completion
///
/// Parks the continuation and returns immediately; the continuation fires
/// at most once per poll, and never on the polling thread before this
/// returns. Polling an unknown handle is a caller contract violation with
/// no status channel: it is logged and ignored.
pub fn poll_operation(
    table: &'static OperationTable,
    handle: u64,
    callback: ContinuationCallback,
    callback_data: u64,
) {
    let Some(cell) = table.get(handle) else {
        warn!(handle, "poll on unknown operation handle");
        return;
    };

    let continuation = Continuation {
        callback,
        data: callback_data,
    };
    match cell.register_poll_erased(continuation) {
        PollRegistration::Parked => {}
        PollRegistration::AlreadyReady(continuation) => {
            crate::executor().spawn(async move {
                continuation.fire(WAKE_READY);
            });
        }
        PollRegistration::Displaced { displaced } => {
            warn!(handle, "second poll displaced a parked continuation");
            crate::executor().spawn(async move {
                displaced.fire(WAKE_REPOLL);
            });
        }
    }
}

/// Request cooperative cancellation of an operation
///
/// Advisory and asynchronous: the operation observes the request at its
/// next suspension point and completes with a cancellation status.
/// Cancelling a completed operation is a no-op.
pub fn cancel_operation(table: &'static OperationTable, handle: u64) {
    match table.get(handle) {
        Some(cell) => cell.request_cancel_erased(),
        None => warn!(handle, "cancel on unknown operation handle"),
    }
}

/// Retrieve the final result of a ready operation
///
/// Valid only after a continuation fired with `WAKE_READY`; calling
/// earlier is a contract violation reported as `NotReady` rather than
/// undefined behavior.
pub fn complete_operation<T: Send + 'static>(
    table: &'static OperationTable,
    handle: u64,
) -> BridgeResult<Outcome<T>> {
    let cell = table
        .get(handle)
        .ok_or(BridgeError::UnknownHandle(handle))?;
    let typed = cell
        .as_any()
        .downcast_ref::<FutureCell<T>>()
        .ok_or(BridgeError::TypeMismatch(handle))?;
    typed.take_ready(handle)
}

/// Release an operation handle
///
/// Must be called exactly once per handle. Freeing an operation that is
/// still pending tears down the in-flight work through the cancellation
/// path. Freeing an unknown handle is logged and ignored.
pub fn free_operation(table: &'static OperationTable, handle: u64) {
    match table.remove(handle) {
        Some(cell) => {
            cell.request_cancel_erased();
            debug!(handle, "operation freed");
        }
        None => warn!(handle, "free on unknown operation handle"),
    }
}
