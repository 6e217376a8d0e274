//! # Object Lifecycle Entry Points
//!
//! Retain/release for foreign-owned native objects. The registry is
//! type-erased, so a single pair of entry points covers every exported
//! object type; constructors and methods are generated per type on top of
//! `guarded_call` and the registry.

use trestle_core::{CallFault, CallStatus};
use trestle_runtime::object_registry;

use crate::call::guarded_call;

/// Add an owner to a live object handle
///
/// # Arguments
/// * `handle` - Handle returned by a constructor entry point
/// * `out_status` - Status out-parameter (must be valid and writable)
///
/// # Returns
/// The same handle value, now with one more owner. An unknown handle is a
/// caller contract violation and writes an internal-error status.
#[no_mangle]
pub extern "C" fn trestle_object_retain(handle: u64, out_status: *mut CallStatus) -> u64 {
    guarded_call(out_status, || {
        object_registry().retain(handle).map_err(CallFault::from)
    })
}

/// Remove an owner; the object is destroyed at zero owners
///
/// # Arguments
/// * `handle` - Handle returned by a constructor entry point
/// * `out_status` - Status out-parameter (must be valid and writable)
///
/// # Errors
/// Releasing an already-destroyed handle is a caller contract violation:
/// it writes an internal-error status, never silently succeeds.
#[no_mangle]
pub extern "C" fn trestle_object_release(handle: u64, out_status: *mut CallStatus) {
    guarded_call(out_status, || {
        object_registry()
            .release(handle)
            .map(|_| ())
            .map_err(CallFault::from)
    })
}
