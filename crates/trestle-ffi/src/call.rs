//! # Guarded Calls
//!
//! Every fallible entry point runs its body through `guarded_call`, which
//! writes the `CallStatus` out-parameter exactly once and converts panics
//! into an internal-error status instead of unwinding across the boundary.

use std::panic::{catch_unwind, AssertUnwindSafe};

use trestle_core::{ByteBuffer, CallFault, CallStatus};

/// Placeholder return values for entry points whose status is non-zero
///
/// The C ABI requires *some* value in every return register; callers must
/// ignore it whenever `CallStatus.code != 0`.
pub trait FfiReturn {
    fn ffi_placeholder() -> Self;
}

macro_rules! zero_placeholder {
    ($($ty:ty => $value:expr),* $(,)?) => {
        $(
            impl FfiReturn for $ty {
                fn ffi_placeholder() -> Self {
                    $value
                }
            }
        )*
    };
}

zero_placeholder! {
    u8 => 0, i8 => 0, u16 => 0, i16 => 0,
    u32 => 0, i32 => 0, u64 => 0, i64 => 0,
    f32 => 0.0, f64 => 0.0,
    () => (),
}

impl FfiReturn for ByteBuffer {
    fn ffi_placeholder() -> Self {
        ByteBuffer::empty()
    }
}

/// Run an entry-point body, writing the status out-parameter exactly once
///
/// # Arguments
/// * `out_status` - Pointer to the caller's CallStatus (must be valid and
///   writable)
/// * `body` - The fallible call body
///
/// # Returns
/// The body's value on success; the type's placeholder on any fault.
///
/// # Safety
/// Dereferences `out_status`. The caller contract requires a valid,
/// aligned, writable pointer; a null pointer makes the fault unreportable,
/// so the body's result is discarded in that case.
pub fn guarded_call<T, F>(out_status: *mut CallStatus, body: F) -> T
where
    T: FfiReturn,
    F: FnOnce() -> Result<T, CallFault>,
{
    let result = catch_unwind(AssertUnwindSafe(body));

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(panic) => Err(CallFault::Internal(describe_panic(panic))),
    };

    if out_status.is_null() {
        tracing::warn!("null status out-parameter; fault channel unavailable");
        return T::ffi_placeholder();
    }
    let status = unsafe { &mut *out_status };

    match outcome {
        Ok(value) => {
            status.write_success();
            value
        }
        Err(fault) => {
            status.write_fault(fault);
            T::ffi_placeholder()
        }
    }
}

fn describe_panic(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic: <non-string payload>".to_string()
    }
}
