//! # Call Status Protocol
//!
//! Every fallible entry point takes an out-parameter `CallStatus` that it
//! writes exactly once before returning. Code 0 means success and the
//! primary return value is valid; nonzero codes carry a serialized error
//! payload in the status buffer, which the caller owns and must free.
//!
//! The bridge never interprets payload contents; it only guarantees
//! delivery and ownership transfer.

use crate::buffer::ByteBuffer;
use std::fmt;

/// Call succeeded; return value is valid, error buffer is empty.
pub const CALL_SUCCESS: i8 = 0;
/// Domain failure; error buffer holds a serialized domain error.
pub const CALL_DOMAIN_ERROR: i8 = 1;
/// Bridge-internal failure (panic, contract violation); error buffer holds
/// a UTF-8 message.
pub const CALL_INTERNAL_ERROR: i8 = 2;
/// The operation was cancelled before producing a result.
pub const CALL_CANCELLED: i8 = 3;

/// Out-parameter status written by every fallible entry point
///
/// **Memory Layout (32 bytes, 8-byte aligned)**:
/// - Offset 0: `code` (i8, 1 byte) + 7 bytes padding
/// - Offset 8: `error_buf` (ByteBuffer, 24 bytes)
#[repr(C)]
#[derive(Debug)]
pub struct CallStatus {
    /// One of the CALL_* codes
    pub code: i8,
    /// Populated only when `code != CALL_SUCCESS`; owned by the caller,
    /// released through the buffer free entry point like any other buffer
    pub error_buf: ByteBuffer,
}

impl CallStatus {
    /// A fresh success status with the canonical empty buffer
    pub const fn success() -> Self {
        Self {
            code: CALL_SUCCESS,
            error_buf: ByteBuffer::empty(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CALL_SUCCESS
    }

    /// Record success in place
    pub fn write_success(&mut self) {
        self.code = CALL_SUCCESS;
        self.error_buf = ByteBuffer::empty();
    }

    /// Record a fault in place, transferring its payload into the status
    pub fn write_fault(&mut self, fault: CallFault) {
        let (code, payload) = fault.into_parts();
        self.code = code;
        self.error_buf = ByteBuffer::from_vec(payload);
    }
}

impl Default for CallStatus {
    fn default() -> Self {
        Self::success()
    }
}

/// Boundary-facing fault carried out of a guarded call
///
/// `Domain` payloads are opaque to the bridge: the exporting layer decides
/// the encoding and the foreign binding decodes it with matching knowledge.
#[derive(Debug)]
pub enum CallFault {
    /// Domain-level failure with a serialized error payload
    Domain(Vec<u8>),
    /// Bridge-internal failure (panic, caller contract violation)
    Internal(String),
    /// Cooperative cancellation observed before completion
    Cancelled,
}

impl CallFault {
    /// Lower a serializable domain error into an opaque JSON payload
    pub fn domain_json<E: serde::Serialize>(err: &E) -> Self {
        match serde_json::to_vec(err) {
            Ok(payload) => CallFault::Domain(payload),
            Err(e) => CallFault::Internal(format!("error payload serialization failed: {}", e)),
        }
    }

    /// Split into (status code, payload bytes)
    pub fn into_parts(self) -> (i8, Vec<u8>) {
        match self {
            CallFault::Domain(payload) => (CALL_DOMAIN_ERROR, payload),
            CallFault::Internal(message) => (CALL_INTERNAL_ERROR, message.into_bytes()),
            CallFault::Cancelled => (CALL_CANCELLED, Vec::new()),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, CallFault::Cancelled)
    }
}

impl fmt::Display for CallFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFault::Domain(payload) => write!(f, "domain error ({} payload bytes)", payload.len()),
            CallFault::Internal(message) => write!(f, "internal error: {}", message),
            CallFault::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for CallFault {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn call_status_size_and_align() {
        assert_eq!(
            mem::size_of::<CallStatus>(),
            32,
            "CallStatus must be exactly 32 bytes"
        );
        assert_eq!(mem::align_of::<CallStatus>(), 8);
    }

    #[test]
    fn success_status_has_empty_buffer() {
        let status = CallStatus::success();
        assert!(status.is_success());
        assert_eq!(status.error_buf.capacity, 0);
        assert!(status.error_buf.data.is_null());
    }

    #[test]
    fn domain_fault_carries_payload() {
        let mut status = CallStatus::success();
        status.write_fault(CallFault::Domain(vec![1, 2, 3]));
        assert_eq!(status.code, CALL_DOMAIN_ERROR);

        let payload = std::mem::take(&mut status.error_buf).into_vec();
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[test]
    fn internal_fault_carries_utf8_message() {
        let mut status = CallStatus::success();
        status.write_fault(CallFault::Internal("boom".to_string()));
        assert_eq!(status.code, CALL_INTERNAL_ERROR);

        let payload = std::mem::take(&mut status.error_buf).into_vec();
        assert_eq!(String::from_utf8(payload).unwrap(), "boom");
    }

    #[test]
    fn cancellation_has_empty_payload() {
        let mut status = CallStatus::success();
        status.write_fault(CallFault::Cancelled);
        assert_eq!(status.code, CALL_CANCELLED);
        assert_eq!(status.error_buf.capacity, 0);
    }

    #[test]
    fn rewriting_success_clears_previous_fault() {
        let mut status = CallStatus::success();
        status.write_fault(CallFault::Cancelled);
        status.write_success();
        assert!(status.is_success());
        assert!(status.error_buf.data.is_null());
    }

    #[test]
    fn domain_json_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct SignError {
            kind: String,
            detail: String,
        }

        let err = SignError {
            kind: "verify".to_string(),
            detail: "bad signature".to_string(),
        };

        let (code, payload) = CallFault::domain_json(&err).into_parts();
        assert_eq!(code, CALL_DOMAIN_ERROR);

        let decoded: SignError = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded, err);
    }
}
