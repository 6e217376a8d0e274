//! # Bridge Configuration
//!
//! Host-supplied configuration for the native executor. Accepted once,
//! before the first asynchronous operation is spawned; the runtime crate
//! rejects later reconfiguration.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Executor configuration
///
/// Deserializable so hosts can load it from their own config files and
/// hand it across at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Worker threads for the executor; None uses the runtime default
    /// (one per core)
    pub worker_threads: Option<usize>,

    /// Name prefix for executor worker threads
    pub thread_name: String,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self {
            worker_threads: None,
            thread_name: "trestle-worker".to_string(),
        }
    }

    /// Reject configurations the executor cannot honor
    pub fn validate(&self) -> BridgeResult<()> {
        if let Some(0) = self.worker_threads {
            return Err(BridgeError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "thread_name must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
