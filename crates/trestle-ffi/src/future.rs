//! # Future Bridge Entry Points
//!
//! The per-result-type poll/cancel/free/complete families. One generic
//! implementation lives in `trestle-runtime`; this module instantiates the
//! thirteen families the boundary exposes — eight integer widths, two float
//! widths, object handle, byte buffer, and void — at compile time.
//!
//! `poll`, `cancel`, and `free` carry no status out-parameter; contract
//! violations on those calls are logged and ignored. `complete` reports
//! through `CallStatus` like every other fallible entry point.

use std::panic::{catch_unwind, AssertUnwindSafe};

use trestle_core::{ByteBuffer, CallFault, CallStatus};
use trestle_runtime::registry::ObjectHandle;
use trestle_runtime::{
    cancel_operation, complete_operation, free_operation, operation_table, poll_operation,
    ContinuationCallback,
};

use crate::call::guarded_call;

/// Swallow panics on the status-less entry points
fn shielded(name: &'static str, body: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(body)).is_err() {
        tracing::warn!(entry_point = name, "panic contained at the boundary");
    }
}

macro_rules! future_entry_points {
    (
        result = $result:ty,
        ret = $ret:ty,
        poll = $poll:ident,
        cancel = $cancel:ident,
        free = $free:ident,
        complete = $complete:ident,
        lower = $lower:expr
    ) => {
        /// Register interest in the operation's completion
        ///
        /// Returns immediately after parking the continuation; the callback
        /// fires at most once per poll, with the wake code, never before
        /// this call returns on the polling thread.
        #[no_mangle]
        pub extern "C" fn $poll(handle: u64, callback: ContinuationCallback, callback_data: u64) {
            shielded(stringify!($poll), || {
                poll_operation(operation_table(), handle, callback, callback_data);
            });
        }

        /// Request cooperative cancellation (advisory, asynchronous)
        #[no_mangle]
        pub extern "C" fn $cancel(handle: u64) {
            shielded(stringify!($cancel), || {
                cancel_operation(operation_table(), handle);
            });
        }

        /// Release the operation handle (exactly once, after completion)
        #[no_mangle]
        pub extern "C" fn $free(handle: u64) {
            shielded(stringify!($free), || {
                free_operation(operation_table(), handle);
            });
        }

        /// Retrieve the final result
        ///
        /// Valid only after a continuation fired with the ready wake code;
        /// calling earlier writes an internal-error status.
        #[no_mangle]
        pub extern "C" fn $complete(handle: u64, out_status: *mut CallStatus) -> $ret {
            guarded_call(out_status, || {
                let outcome =
                    complete_operation::<$result>(operation_table(), handle).map_err(CallFault::from)?;
                outcome.map($lower)
            })
        }
    };
}

future_entry_points! {
    result = u8, ret = u8,
    poll = trestle_future_poll_u8, cancel = trestle_future_cancel_u8,
    free = trestle_future_free_u8, complete = trestle_future_complete_u8,
    lower = |value| value
}

future_entry_points! {
    result = i8, ret = i8,
    poll = trestle_future_poll_i8, cancel = trestle_future_cancel_i8,
    free = trestle_future_free_i8, complete = trestle_future_complete_i8,
    lower = |value| value
}

future_entry_points! {
    result = u16, ret = u16,
    poll = trestle_future_poll_u16, cancel = trestle_future_cancel_u16,
    free = trestle_future_free_u16, complete = trestle_future_complete_u16,
    lower = |value| value
}

future_entry_points! {
    result = i16, ret = i16,
    poll = trestle_future_poll_i16, cancel = trestle_future_cancel_i16,
    free = trestle_future_free_i16, complete = trestle_future_complete_i16,
    lower = |value| value
}

future_entry_points! {
    result = u32, ret = u32,
    poll = trestle_future_poll_u32, cancel = trestle_future_cancel_u32,
    free = trestle_future_free_u32, complete = trestle_future_complete_u32,
    lower = |value| value
}

future_entry_points! {
    result = i32, ret = i32,
    poll = trestle_future_poll_i32, cancel = trestle_future_cancel_i32,
    free = trestle_future_free_i32, complete = trestle_future_complete_i32,
    lower = |value| value
}

future_entry_points! {
    result = u64, ret = u64,
    poll = trestle_future_poll_u64, cancel = trestle_future_cancel_u64,
    free = trestle_future_free_u64, complete = trestle_future_complete_u64,
    lower = |value| value
}

future_entry_points! {
    result = i64, ret = i64,
    poll = trestle_future_poll_i64, cancel = trestle_future_cancel_i64,
    free = trestle_future_free_i64, complete = trestle_future_complete_i64,
    lower = |value| value
}

future_entry_points! {
    result = f32, ret = f32,
    poll = trestle_future_poll_f32, cancel = trestle_future_cancel_f32,
    free = trestle_future_free_f32, complete = trestle_future_complete_f32,
    lower = |value| value
}

future_entry_points! {
    result = f64, ret = f64,
    poll = trestle_future_poll_f64, cancel = trestle_future_cancel_f64,
    free = trestle_future_free_f64, complete = trestle_future_complete_f64,
    lower = |value| value
}

future_entry_points! {
    result = ObjectHandle, ret = u64,
    poll = trestle_future_poll_handle, cancel = trestle_future_cancel_handle,
    free = trestle_future_free_handle, complete = trestle_future_complete_handle,
    lower = |handle: ObjectHandle| handle.0
}

future_entry_points! {
    result = Vec<u8>, ret = ByteBuffer,
    poll = trestle_future_poll_bytes, cancel = trestle_future_cancel_bytes,
    free = trestle_future_free_bytes, complete = trestle_future_complete_bytes,
    lower = ByteBuffer::from_vec
}

future_entry_points! {
    result = (), ret = (),
    poll = trestle_future_poll_void, cancel = trestle_future_cancel_void,
    free = trestle_future_free_void, complete = trestle_future_complete_void,
    lower = |value| value
}
