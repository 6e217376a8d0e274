//! # Object Registry
//!
//! Issues, resolves, and retires integer handles for foreign-visible native
//! objects. Entries are reference counted: `retain` adds an owner to the
//! same handle value, `release` removes one, and the object is destroyed
//! exactly once when the last owner lets go.
//!
//! Handles are never reused while live and are never raw pointers, so the
//! foreign side cannot forge anything dereferenceable.

use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use trestle_core::{BridgeError, BridgeResult};

/// Result of an operation that resolves to a registered object
///
/// A distinct type so object-producing operations cannot be completed
/// through the plain integer family by mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHandle(pub u64);

// ============================================================================
// HANDLE ALLOCATION
// ============================================================================

/// Handle allocator for generating unique identifiers
///
/// Monotonic; a value handed out is never handed out again, so a stale
/// handle can only ever miss the table, never alias a newer object.
pub struct HandleAllocator {
    next_handle: AtomicU64,
}

impl HandleAllocator {
    /// Create new allocator starting at handle 1 (0 is reserved as "no handle")
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
        }
    }

    /// Allocate next unique handle
    pub fn allocate(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OBJECT REGISTRY
// ============================================================================

struct ObjectEntry {
    object: Arc<dyn Any + Send + Sync>,
    refcount: AtomicU32,
}

/// Thread-safe registry of foreign-owned native objects
///
/// Safe for concurrent retain/release from multiple threads: async work may
/// complete on a different thread than the one that issued the call.
pub struct ObjectRegistry {
    entries: DashMap<u64, ObjectEntry>,
    allocator: HandleAllocator,
}

impl ObjectRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            allocator: HandleAllocator::new(),
        }
    }

    /// Register a new object with reference count 1 and return its handle
    pub fn register<T: Send + Sync + 'static>(&self, object: T) -> u64 {
        let handle = self.allocator.allocate();
        self.entries.insert(
            handle,
            ObjectEntry {
                object: Arc::new(object),
                refcount: AtomicU32::new(1),
            },
        );
        handle
    }

    /// Add an owner to an existing handle
    ///
    /// Returns the same handle value. An unknown handle is a caller
    /// contract violation and is reported, not ignored.
    pub fn retain(&self, handle: u64) -> BridgeResult<u64> {
        let entry = self
            .entries
            .get(&handle)
            .ok_or(BridgeError::UnknownHandle(handle))?;
        entry.refcount.fetch_add(1, Ordering::AcqRel);
        Ok(handle)
    }

    /// Remove an owner; destroy the object when the count reaches zero
    ///
    /// Returns the remaining owner count. Releasing a handle that was
    /// already destroyed observes `UnknownHandle` — the double-release is
    /// flagged to the caller rather than silently ignored.
    pub fn release(&self, handle: u64) -> BridgeResult<u32> {
        let remaining = {
            let entry = self
                .entries
                .get(&handle)
                .ok_or(BridgeError::UnknownHandle(handle))?;
            entry.refcount.fetch_sub(1, Ordering::AcqRel) - 1
        };
        if remaining == 0 {
            self.entries
                .remove_if(&handle, |_, entry| entry.refcount.load(Ordering::Acquire) == 0);
        }
        Ok(remaining)
    }

    /// Resolve a handle to its object
    ///
    /// The returned Arc keeps the object alive for the duration of the
    /// native call even if the foreign side releases concurrently.
    pub fn get<T: Send + Sync + 'static>(&self, handle: u64) -> BridgeResult<Arc<T>> {
        let entry = self
            .entries
            .get(&handle)
            .ok_or(BridgeError::UnknownHandle(handle))?;
        Arc::clone(&entry.object)
            .downcast::<T>()
            .map_err(|_| BridgeError::TypeMismatch(handle))
    }

    /// Check whether a handle names a live object
    pub fn contains(&self, handle: u64) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Number of live objects
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        dropped: Arc<AtomicU32>,
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ObjectRegistry::new();
        let handle = registry.register(String::from("client"));

        assert!(handle > 0);
        assert!(registry.contains(handle));
        let resolved = registry.get::<String>(handle).unwrap();
        assert_eq!(*resolved, "client");
    }

    #[test]
    fn test_handles_are_unique() {
        let registry = ObjectRegistry::new();
        let h1 = registry.register(1u32);
        let h2 = registry.register(2u32);
        let h3 = registry.register(3u32);
        assert_ne!(h1, h2);
        assert_ne!(h2, h3);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_retain_returns_same_handle() {
        let registry = ObjectRegistry::new();
        let handle = registry.register(7i64);
        assert_eq!(registry.retain(handle).unwrap(), handle);
    }

    #[test]
    fn test_retain_unknown_handle_flagged() {
        let registry = ObjectRegistry::new();
        assert_eq!(
            registry.retain(99999).unwrap_err(),
            BridgeError::UnknownHandle(99999)
        );
    }

    #[test]
    fn test_destroyed_exactly_once_after_both_releases() {
        let dropped = Arc::new(AtomicU32::new(0));
        let registry = ObjectRegistry::new();
        let handle = registry.register(Probe {
            dropped: Arc::clone(&dropped),
        });

        registry.retain(handle).unwrap();
        assert_eq!(registry.release(handle).unwrap(), 1);
        assert_eq!(dropped.load(Ordering::SeqCst), 0, "still one owner left");

        assert_eq!(registry.release(handle).unwrap(), 0);
        assert_eq!(dropped.load(Ordering::SeqCst), 1, "destroyed at zero");
        assert!(!registry.contains(handle));
    }

    #[test]
    fn test_double_release_observed_as_unknown_handle() {
        let registry = ObjectRegistry::new();
        let handle = registry.register(0u8);
        registry.release(handle).unwrap();

        assert_eq!(
            registry.release(handle).unwrap_err(),
            BridgeError::UnknownHandle(handle)
        );
    }

    #[test]
    fn test_type_mismatch_detected() {
        let registry = ObjectRegistry::new();
        let handle = registry.register(5u32);
        assert_eq!(
            registry.get::<String>(handle).unwrap_err(),
            BridgeError::TypeMismatch(handle)
        );
    }

    #[test]
    fn test_resolved_arc_outlives_release() {
        let dropped = Arc::new(AtomicU32::new(0));
        let registry = ObjectRegistry::new();
        let handle = registry.register(Probe {
            dropped: Arc::clone(&dropped),
        });

        let held = registry.get::<Probe>(handle).unwrap();
        registry.release(handle).unwrap();
        assert_eq!(dropped.load(Ordering::SeqCst), 0, "in-flight call keeps it alive");
        drop(held);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_registration() {
        use std::thread;

        let registry = Arc::new(ObjectRegistry::new());

        let mut handles = vec![];
        for i in 0..10 {
            let reg = Arc::clone(&registry);
            let handle = thread::spawn(move || reg.register(i as u64)).join().unwrap();
            handles.push(handle);
        }

        assert_eq!(registry.count(), 10);
        for handle in handles {
            assert!(registry.contains(handle));
            assert!(registry.get::<u64>(handle).is_ok());
        }
    }

    #[test]
    fn test_concurrent_retain_release_balance() {
        use std::thread;

        let registry = Arc::new(ObjectRegistry::new());
        let handle = registry.register(String::from("shared"));

        let mut joins = vec![];
        for _ in 0..8 {
            let reg = Arc::clone(&registry);
            joins.push(thread::spawn(move || {
                reg.retain(handle).unwrap();
                reg.release(handle).unwrap();
            }));
        }
        for join in joins {
            join.join().unwrap();
        }

        // The original owner remains
        assert!(registry.contains(handle));
        assert_eq!(registry.release(handle).unwrap(), 0);
        assert!(!registry.contains(handle));
    }
}
