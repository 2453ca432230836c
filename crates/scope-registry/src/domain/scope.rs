//! # Resolution Scopes
//!
//! A scope is the context a producer runs in. It pairs a container (where
//! lookups start) with an identity-bearing instance cache used by class
//! registrations: one instance per `(registration, scope)`.
//!
//! Entries are keyed by the slot the class was registered in (container and
//! key). Re-registering a class in the same slot evicts the instance built
//! for the previous registration.
//!
//! The cache lives on the scope itself, so dropping the last handle to a
//! scope drops its instances. Instances that want to remember the scope that
//! built them hold a [`WeakScope`], which never keeps the scope alive.

use crate::container::{Container, WeakContainer};
use crate::domain::descriptor::Dependency;
use crate::domain::ids::{ContainerId, RegistrationId, ScopeId};
use crate::domain::key::Key;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Registration slot a class instance belongs to.
pub(crate) type SlotKey = (ContainerId, Key);

/// Instances constructed for one scope, one per registration slot.
pub(crate) struct InstanceCache {
    id: ScopeId,
    instances: Mutex<HashMap<SlotKey, (RegistrationId, Dependency)>>,
}

impl InstanceCache {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ScopeId::next(),
            instances: Mutex::new(HashMap::new()),
        })
    }
}

/// Resolution context: a container plus a scope identity.
#[derive(Clone)]
pub struct Scope {
    container: Container,
    cache: Arc<InstanceCache>,
}

impl Scope {
    /// A fresh scope resolving through `container`.
    ///
    /// The new scope has its own identity, so class registrations construct
    /// new instances for it even when the container's own scope already has
    /// some.
    #[must_use]
    pub fn new(container: &Container) -> Self {
        Self::from_parts(container.clone(), InstanceCache::new())
    }

    pub(crate) fn from_parts(container: Container, cache: Arc<InstanceCache>) -> Self {
        Self { container, cache }
    }

    /// Identity of this scope.
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.cache.id
    }

    /// Container lookups start from.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Whether both handles denote the same scope.
    #[must_use]
    pub fn same_scope(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }

    /// Non-owning back-reference to this scope.
    #[must_use]
    pub fn downgrade(&self) -> WeakScope {
        WeakScope {
            container: self.container.downgrade(),
            cache: Arc::downgrade(&self.cache),
        }
    }

    /// Resolve `key` starting at this scope's container, producing against
    /// this scope.
    pub fn resolve(&self, key: impl Into<Key>) -> Option<Dependency> {
        self.container.resolve_in(key, self)
    }

    /// Typed variant of [`Scope::resolve`].
    pub fn resolve_as<T: Any + Send + Sync>(&self, key: impl Into<Key>) -> Option<Arc<T>> {
        self.container.resolve_in_as(key, self)
    }

    /// Number of instances cached for this scope.
    #[must_use]
    pub fn cached_instances(&self) -> usize {
        self.cache.instances.lock().len()
    }

    /// Return the instance cached for `registration` in `slot`,
    /// constructing it first if needed.
    ///
    /// The cache lock is released while `construct` runs; constructors may
    /// resolve further dependencies in this same scope. If a nested
    /// resolution already filled the entry for the same registration, the
    /// first stored instance wins. An entry left by an older registration of
    /// the slot is replaced.
    pub(crate) fn instance(
        &self,
        slot: &SlotKey,
        registration: RegistrationId,
        construct: impl FnOnce() -> Dependency,
    ) -> Dependency {
        if let Some((owner, existing)) = self.cache.instances.lock().get(slot) {
            if *owner == registration {
                return Arc::clone(existing);
            }
        }

        trace!(scope = %self.id(), registration = %registration, key = %slot.1, "Constructing scoped instance");
        let built = construct();

        let mut instances = self.cache.instances.lock();
        if let Some((owner, existing)) = instances.get(slot) {
            if *owner == registration {
                return Arc::clone(existing);
            }
            trace!(scope = %self.id(), key = %slot.1, "Evicting instance of replaced registration");
        }
        instances.insert(slot.clone(), (registration, Arc::clone(&built)));
        built
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id())
            .field("container", &self.container.id())
            .finish()
    }
}

/// Weak back-reference to a [`Scope`].
#[derive(Clone)]
pub struct WeakScope {
    container: WeakContainer,
    cache: Weak<InstanceCache>,
}

impl WeakScope {
    /// Recover the scope if both its container and its cache are alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Scope> {
        Some(Scope::from_parts(
            self.container.upgrade()?,
            self.cache.upgrade()?,
        ))
    }
}

impl fmt::Debug for WeakScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakScope")
            .field("alive", &(self.cache.strong_count() > 0))
            .finish()
    }
}
