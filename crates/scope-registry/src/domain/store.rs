//! # Store Backends
//!
//! A store maps keys to descriptor slots for exactly one container.
//!
//! Backends advertise two optional capabilities:
//!
//! - **Enumerable** via [`Store::for_each`]
//! - **Clonable** via [`Store::try_clone`]
//!
//! Forking a container prefers `try_clone`; without it the entries are copied
//! through `for_each` into a fresh [`MemoryStore`]. A backend offering neither
//! cannot be forked.

use crate::domain::descriptor::Descriptor;
use crate::domain::key::Key;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by store backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend cannot enumerate its entries.
    #[error("store backend `{backend}` does not support enumeration")]
    EnumerationUnsupported {
        /// Backend type name.
        backend: &'static str,
    },
}

/// Pluggable key → slot map.
pub trait Store: Send + Sync {
    /// Look up the slot stored for `key`.
    fn get(&self, key: &Key) -> Option<Descriptor>;

    /// Store (or replace) the slot for `key`.
    fn set(&mut self, key: Key, descriptor: Descriptor);

    /// Visit every entry exactly once, in no particular order.
    fn for_each(&self, _visit: &mut dyn FnMut(&Key, &Descriptor)) -> Result<(), StoreError> {
        Err(StoreError::EnumerationUnsupported {
            backend: self.backend_name(),
        })
    }

    /// Shallow copy of this backend. The copy shares descriptors with `self`.
    fn try_clone(&self) -> Option<Box<dyn Store>> {
        None
    }

    /// Number of stored slots; `0` when enumeration is unsupported.
    fn len(&self) -> usize {
        let mut count = 0;
        let visited = self.for_each(&mut |_, _| count += 1);
        match visited {
            Ok(()) => count,
            Err(_) => 0,
        }
    }

    /// Whether no slot is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name used in diagnostics.
    fn backend_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Default in-memory backend.
#[derive(Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<Key, Descriptor>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` keys.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &Key) -> Option<Descriptor> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: Key, descriptor: Descriptor) {
        self.entries.insert(key, descriptor);
    }

    fn for_each(&self, visit: &mut dyn FnMut(&Key, &Descriptor)) -> Result<(), StoreError> {
        for (key, descriptor) in &self.entries {
            visit(key, descriptor);
        }
        Ok(())
    }

    fn try_clone(&self) -> Option<Box<dyn Store>> {
        Some(Box::new(self.clone()))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Copy every entry of `source` into a fresh [`MemoryStore`].
///
/// Used when a backend is enumerable but not clonable.
pub fn copy_entries(source: &dyn Store, capacity: usize) -> Result<MemoryStore, StoreError> {
    let mut copy = MemoryStore::with_capacity(capacity);
    source.for_each(&mut |key, descriptor| copy.set(key.clone(), descriptor.clone()))?;
    Ok(copy)
}
