//! # Byte Buffer Transport
//!
//! The only mechanism for passing variable-length data across the boundary.
//! `ByteBuffer` is an owned, growable byte sequence; `ForeignBytes` is a
//! borrowed read-only view valid only for the duration of the receiving call.
//!
//! Ownership is linear: a buffer belongs to whichever side last received it,
//! moves across the boundary at most once per call, and is released through
//! exactly one matching free. There is no aliasing and no implicit copy.

use std::slice;

/// Owned byte buffer crossing the FFI boundary
///
/// **Memory Layout (24 bytes, 8-byte aligned)**:
/// - Offset 0: `capacity` (u64, 8 bytes)
/// - Offset 8: `len` (u64, 8 bytes)
/// - Offset 16: `data` (pointer, 8 bytes)
///
/// Invariants: `len <= capacity`; `data` is non-null iff `capacity > 0`.
#[repr(C)]
#[derive(Debug)]
pub struct ByteBuffer {
    /// Total allocated bytes
    pub capacity: u64,
    /// Valid data bytes
    pub len: u64,
    /// Pointer to buffer data (null iff capacity == 0)
    pub data: *mut u8,
}

// The pointer is uniquely owned; a ByteBuffer is a moved Vec<u8>, and moving
// it between threads is as sound as moving the Vec would be.
unsafe impl Send for ByteBuffer {}

impl ByteBuffer {
    /// The canonical empty buffer (null data, zero capacity)
    pub const fn empty() -> Self {
        Self {
            capacity: 0,
            len: 0,
            data: std::ptr::null_mut(),
        }
    }

    /// Allocate a zeroed buffer with `capacity == size` and `len == 0`
    pub fn allocate(size: u64) -> Self {
        if size == 0 {
            return Self::empty();
        }
        let mut backing = vec![0u8; size as usize];
        backing.clear();
        Self::from_vec(backing)
    }

    /// Take ownership of a Vec's allocation without copying
    pub fn from_vec(mut v: Vec<u8>) -> Self {
        if v.capacity() == 0 {
            return Self::empty();
        }
        let buf = Self {
            capacity: v.capacity() as u64,
            len: v.len() as u64,
            data: v.as_mut_ptr(),
        };
        std::mem::forget(v);
        buf
    }

    /// Copy a borrowed view into a newly owned buffer
    ///
    /// The only path by which foreign-owned memory becomes a buffer the
    /// native side may retain past the call's duration.
    pub fn from_foreign(bytes: ForeignBytes) -> Self {
        Self::from_vec(bytes.as_slice().to_vec())
    }

    /// Reconstitute the backing Vec, consuming the buffer
    ///
    /// Must be called exactly once per owned buffer; this is the sole
    /// release path. A zero-capacity buffer yields an empty Vec and frees
    /// nothing.
    pub fn into_vec(self) -> Vec<u8> {
        if self.capacity == 0 {
            return Vec::new();
        }
        // SAFETY: (data, len, capacity) came from a Vec<u8> surrendered via
        // from_vec, and ownership is linear: no other reconstitution exists.
        unsafe { Vec::from_raw_parts(self.data, self.len as usize, self.capacity as usize) }
    }

    /// Grow capacity by at least `additional`, preserving the first `len`
    /// bytes. Consumes the input; the returned buffer is the one to use
    /// thereafter (the allocation may have moved).
    pub fn reserve(self, additional: u64) -> Self {
        let mut backing = self.into_vec();
        backing.reserve(additional as usize);
        Self::from_vec(backing)
    }

    /// View the valid bytes
    ///
    /// # Safety
    /// The buffer must currently own its allocation (not already consumed
    /// by `into_vec`) and `data`/`len` must be unmodified since then.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.capacity == 0 {
            return &[];
        }
        slice::from_raw_parts(self.data, self.len as usize)
    }

    /// Check structural invariants hold
    pub fn is_valid(&self) -> bool {
        if self.data.is_null() {
            return self.capacity == 0 && self.len == 0;
        }
        self.capacity > 0 && self.len <= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

/// Borrowed byte view handed in by the foreign caller
///
/// Valid only for the duration of the call that received it; never owned,
/// never freed by the receiver.
///
/// **Memory Layout (16 bytes, 8-byte aligned)**:
/// - Offset 0: `len` (i32, 4 bytes) + 4 bytes padding
/// - Offset 8: `data` (pointer, 8 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ForeignBytes {
    /// Number of readable bytes
    pub len: i32,
    /// Borrowed pointer into foreign-owned memory (may be null iff len == 0)
    pub data: *const u8,
}

impl ForeignBytes {
    /// Wrap a borrowed slice for handing across the boundary
    pub fn from_slice(s: &[u8]) -> Self {
        Self {
            len: s.len() as i32,
            data: s.as_ptr(),
        }
    }

    /// Borrow the viewed bytes
    ///
    /// Returns an empty slice for a null or non-positive view rather than
    /// dereferencing a bad pointer.
    pub fn as_slice(&self) -> &[u8] {
        if self.data.is_null() || self.len <= 0 {
            return &[];
        }
        // SAFETY: the caller contract guarantees `data` points at `len`
        // readable bytes for the duration of the borrow.
        unsafe { slice::from_raw_parts(self.data, self.len as usize) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn byte_buffer_size_and_align() {
        assert_eq!(
            mem::size_of::<ByteBuffer>(),
            24,
            "ByteBuffer must be exactly 24 bytes"
        );
        assert_eq!(
            mem::align_of::<ByteBuffer>(),
            8,
            "ByteBuffer must be 8-byte aligned"
        );
    }

    #[test]
    fn foreign_bytes_size_and_align() {
        assert_eq!(mem::size_of::<ForeignBytes>(), 16);
        assert_eq!(mem::align_of::<ForeignBytes>(), 8);
    }

    #[test]
    fn empty_buffer_is_valid() {
        let buf = ByteBuffer::empty();
        assert!(buf.data.is_null());
        assert_eq!(buf.capacity, 0);
        assert_eq!(buf.len, 0);
        assert!(buf.is_valid());
        // Releasing the canonical empty buffer is a no-op
        assert!(buf.into_vec().is_empty());
    }

    #[test]
    fn allocate_sets_capacity_not_len() {
        let buf = ByteBuffer::allocate(64);
        assert_eq!(buf.capacity, 64);
        assert_eq!(buf.len, 0);
        assert!(!buf.data.is_null());
        assert!(buf.is_valid());
        drop(buf.into_vec());
    }

    #[test]
    fn allocate_zero_is_empty() {
        let buf = ByteBuffer::allocate(0);
        assert!(buf.data.is_null());
        assert!(buf.into_vec().is_empty());
    }

    #[test]
    fn vec_round_trip_preserves_allocation() {
        let v = vec![1u8, 2, 3, 4];
        let ptr = v.as_ptr();
        let buf = ByteBuffer::from_vec(v);
        assert_eq!(buf.len, 4);
        assert_eq!(buf.data as *const u8, ptr, "no copy on transfer");

        let back = buf.into_vec();
        assert_eq!(back, vec![1, 2, 3, 4]);
        assert_eq!(back.as_ptr(), ptr);
    }

    #[test]
    fn from_foreign_copies_the_view() {
        let owned = vec![9u8, 8, 7];
        let view = ForeignBytes::from_slice(&owned);
        let buf = ByteBuffer::from_foreign(view);
        assert_ne!(buf.data as *const u8, owned.as_ptr(), "must copy");
        assert_eq!(buf.into_vec(), owned);
    }

    #[test]
    fn reserve_preserves_content_and_grows() {
        let buf = ByteBuffer::from_vec(vec![5u8, 6, 7]);
        let grown = buf.reserve(100);
        assert!(grown.capacity >= 3 + 100);
        assert_eq!(grown.len, 3);
        assert_eq!(grown.into_vec(), vec![5, 6, 7]);
    }

    #[test]
    fn foreign_bytes_null_view_is_empty() {
        let view = ForeignBytes {
            len: 0,
            data: std::ptr::null(),
        };
        assert!(view.as_slice().is_empty());

        let negative = ForeignBytes {
            len: -1,
            data: std::ptr::null(),
        };
        assert!(negative.as_slice().is_empty());
    }

    #[test]
    fn invariant_violations_detected() {
        let bad = ByteBuffer {
            capacity: 0,
            len: 4,
            data: std::ptr::null_mut(),
        };
        assert!(!bad.is_valid());

        let v = vec![0u8; 8];
        let mut buf = ByteBuffer::from_vec(v);
        buf.len = buf.capacity + 1;
        assert!(!buf.is_valid());
        buf.len = 0;
        drop(buf.into_vec());
    }
}
