//! # Trestle Runtime
//!
//! The native half of the call bridge: handle tables, the global executor,
//! and the caller-polled future state machine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │   Foreign event loop     │
//! │   (single-threaded,      │
//! │    cooperative)          │
//! └────────────┬─────────────┘
//!              │ poll / complete / free
//!              ▼
//! ┌──────────────────────────┐
//! │   trestle-runtime        │
//! │   - Object Registry      │
//! │   - Operation Table      │
//! │   - Executor (tokio)     │
//! └──────────────────────────┘
//! ```
//!
//! The foreign side never blocks in here: `poll` parks a one-shot
//! continuation and returns; the executor drives the operation on its own
//! threads and fires the continuation when the result is ready. Handles —
//! never pointers — are the only identity that crosses the boundary.

pub mod foreign;
pub mod future;
pub mod registry;

pub use future::{
    cancel_operation, complete_operation, free_operation, poll_operation, spawn_operation,
    ContinuationCallback, OperationTable, Outcome, WAKE_READY, WAKE_REPOLL,
};
pub use registry::{HandleAllocator, ObjectHandle, ObjectRegistry};

use std::sync::{LazyLock, OnceLock};

use trestle_core::{BridgeConfig, BridgeError, BridgeResult};

/// Library version
pub const TRESTLE_RUNTIME_VERSION: &str = "0.1.0";

// ============================================================================
// GLOBAL STATE & EXECUTOR
// ============================================================================

static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

/// Global executor driving all bridged operations
static EXECUTOR: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    let config = CONFIG.get_or_init(BridgeConfig::default).clone();
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name(config.thread_name);
    if let Some(workers) = config.worker_threads {
        builder.worker_threads(workers);
    }
    builder.build().expect("Failed to create bridge executor")
});

/// Global object registry (thread-safe)
static OBJECTS: LazyLock<ObjectRegistry> = LazyLock::new(ObjectRegistry::new);

/// Global table of in-flight asynchronous operations
static OPERATIONS: LazyLock<OperationTable> = LazyLock::new(OperationTable::new);

/// Install the executor configuration
///
/// Must be called before the first asynchronous operation is spawned.
/// Fails with `ExecutorConfigured` once the configuration is sealed —
/// there is no reconfiguration path.
pub fn configure(config: BridgeConfig) -> BridgeResult<()> {
    config.validate()?;
    CONFIG
        .set(config)
        .map_err(|_| BridgeError::ExecutorConfigured)
}

/// Get reference to the global executor
pub fn executor() -> &'static tokio::runtime::Runtime {
    &EXECUTOR
}

/// Get reference to the global object registry
pub fn object_registry() -> &'static ObjectRegistry {
    &OBJECTS
}

/// Get reference to the global operation table
pub fn operation_table() -> &'static OperationTable {
    &OPERATIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_is_available() {
        let _rt = executor();
    }

    #[test]
    fn globals_start_empty_or_grow_monotonically() {
        // Other tests may have registered objects already; the accessors
        // must at least agree with themselves.
        let registry = object_registry();
        assert_eq!(registry.count(), registry.count());
    }

    #[test]
    fn invalid_config_rejected_before_sealing() {
        let bad = BridgeConfig {
            worker_threads: Some(0),
            ..BridgeConfig::new()
        };
        assert_eq!(
            configure(bad).unwrap_err(),
            BridgeError::InvalidConfig("worker_threads must be at least 1".to_string()),
        );
    }
}
