//! # Buffer Transport Entry Points
//!
//! Allocation, import, growth, and release of the owned byte buffers that
//! carry serialized arguments, results, and error payloads across the
//! boundary. Ownership transfers with the buffer on every call; each
//! buffer is released through exactly one free.

use trestle_core::{ByteBuffer, CallStatus, ForeignBytes};

use crate::call::guarded_call;

/// Allocate a zeroed buffer
///
/// # Arguments
/// * `size` - Requested capacity in bytes
/// * `out_status` - Status out-parameter (must be valid and writable)
///
/// # Returns
/// Buffer with `capacity == size`, `len == 0`. Allocation failure aborts
/// the process (the global allocator's behavior); it is not a recoverable
/// status.
#[no_mangle]
pub extern "C" fn trestle_buffer_alloc(size: u64, out_status: *mut CallStatus) -> ByteBuffer {
    guarded_call(out_status, || Ok(ByteBuffer::allocate(size)))
}

/// Copy a borrowed foreign view into a newly owned buffer
///
/// The only path by which foreign-owned memory becomes a buffer the native
/// side may retain past the call's duration.
///
/// # Arguments
/// * `bytes` - Borrowed view, valid only for the duration of this call
/// * `out_status` - Status out-parameter (must be valid and writable)
///
/// # Safety
/// * `bytes.data` must point at `bytes.len` readable bytes when non-null
#[no_mangle]
pub extern "C" fn trestle_buffer_from_bytes(
    bytes: ForeignBytes,
    out_status: *mut CallStatus,
) -> ByteBuffer {
    guarded_call(out_status, || Ok(ByteBuffer::from_foreign(bytes)))
}

/// Grow a buffer's capacity by at least `additional` bytes
///
/// Consumes the input buffer; the returned buffer replaces it (the
/// allocation may have moved). The first `len` bytes of content are
/// preserved.
///
/// # Safety
/// * `buf` must be an owned buffer previously produced by this library and
///   not yet freed or forwarded
#[no_mangle]
pub extern "C" fn trestle_buffer_reserve(
    buf: ByteBuffer,
    additional: u64,
    out_status: *mut CallStatus,
) -> ByteBuffer {
    guarded_call(out_status, || Ok(buf.reserve(additional)))
}

/// Release a buffer's backing storage
///
/// Must be called exactly once per owned buffer. Freeing a buffer with
/// `capacity == 0` is a no-op.
///
/// # Safety
/// * `buf` must be an owned buffer previously produced by this library and
///   not yet freed or forwarded
#[no_mangle]
pub extern "C" fn trestle_buffer_free(buf: ByteBuffer, out_status: *mut CallStatus) {
    guarded_call(out_status, || {
        drop(buf.into_vec());
        Ok(())
    })
}
