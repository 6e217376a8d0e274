//! # Trestle FFI - C ABI Surface
//!
//! The `extern "C"` boundary of the call bridge. Everything a generated
//! foreign binding links against lives here; everything it passes through
//! here is defined in `trestle-core` and serviced by `trestle-runtime`.
//!
//! ## Features
//!
//! - **Handle-Based Identity**: objects and operations cross as u64 handles,
//!   never as pointers
//! - **Panic-Safe Entry Points**: every call is wrapped; a panic becomes an
//!   internal-error status, never an unwind across the boundary
//! - **Status-Only Failure Channel**: faults travel exclusively through the
//!   `CallStatus` out-parameter
//! - **One Generic Future**: the 13 per-type future families are compile-time
//!   instantiations of a single implementation
//! - **Load-Time Contract Guard**: version and per-symbol checksums are pure
//!   functions a binding verifies before its first real call
//!
//! Per-business-method entry points (constructors, methods of exported
//! objects) are generated code layered on `call::guarded_call`,
//! `trestle_runtime::spawn_operation`, and the object registry; see the
//! integration tests for the expansion a generator produces.

pub mod buffer;
pub mod call;
pub mod contract;
pub mod future;
pub mod object;

pub use call::{guarded_call, FfiReturn};

// Re-export the vocabulary types alongside the surface
pub use trestle_core::{ByteBuffer, CallFault, CallStatus, ForeignBytes};

/// Library version
pub const TRESTLE_FFI_VERSION: &str = "0.1.0";
