//! # Bridge Error Types & Codes
//!
//! Internal fault taxonomy for the bridge itself. These never cross the
//! boundary directly: entry points lower them into a `CallFault` (and from
//! there into a `CallStatus`). Codes are stable so hosts can classify
//! diagnostics without parsing messages.

use std::fmt;

/// Bridge-internal error
///
/// Caller contract violations (unknown handle, completion before readiness,
/// double release) surface here first. They are flagged, never silently
/// ignored, and never undefined behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Handle does not name a live object or operation
    UnknownHandle(u64),
    /// Handle is live but its result type does not match the requested family
    TypeMismatch(u64),
    /// Completion requested before the operation signaled readiness
    NotReady(u64),
    /// The operation's result was already retrieved
    AlreadyRetrieved(u64),
    /// Binding contract mismatch detected at load time
    ContractMismatch {
        symbol: &'static str,
        expected: u32,
        actual: u32,
    },
    /// Executor configuration was submitted after the executor started,
    /// or twice
    ExecutorConfigured,
    /// Configuration rejected by validation
    InvalidConfig(String),
}

impl BridgeError {
    /// Stable numeric code for diagnostics
    pub fn code(&self) -> u32 {
        match self {
            BridgeError::UnknownHandle(_) => 1000,
            BridgeError::TypeMismatch(_) => 1001,
            BridgeError::NotReady(_) => 1002,
            BridgeError::AlreadyRetrieved(_) => 1003,
            BridgeError::ContractMismatch { .. } => 2000,
            BridgeError::ExecutorConfigured => 3000,
            BridgeError::InvalidConfig(_) => 3001,
        }
    }

    /// True for errors that indicate a caller contract violation rather
    /// than a bridge defect
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownHandle(_)
                | BridgeError::TypeMismatch(_)
                | BridgeError::NotReady(_)
                | BridgeError::AlreadyRetrieved(_)
        )
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::UnknownHandle(h) => write!(f, "unknown handle {}", h),
            BridgeError::TypeMismatch(h) => {
                write!(f, "handle {} does not carry the requested result type", h)
            }
            BridgeError::NotReady(h) => {
                write!(f, "operation {} completed before readiness was signaled", h)
            }
            BridgeError::AlreadyRetrieved(h) => {
                write!(f, "operation {} result was already retrieved", h)
            }
            BridgeError::ContractMismatch {
                symbol,
                expected,
                actual,
            } => write!(
                f,
                "contract mismatch on {}: expected 0x{:x}, found 0x{:x}",
                symbol, expected, actual
            ),
            BridgeError::ExecutorConfigured => {
                write!(f, "executor already configured")
            }
            BridgeError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<BridgeError> for crate::status::CallFault {
    fn from(err: BridgeError) -> Self {
        crate::status::CallFault::Internal(err.to_string())
    }
}

/// Bridge result type for convenience
pub type BridgeResult<T> = Result<T, BridgeError>;
