//! # Container Nodes
//!
//! A container is one node in a tree of scopes. It owns a store of
//! descriptors, a subscriber list and the instance cache of its own default
//! scope. The parent link is fixed at construction.
//!
//! ## Resolution rules
//!
//! - Lookups start at the container and walk up through ancestors, stopping
//!   at the first container holding a filled slot for the key. A child
//!   therefore shadows its parent and never leaks upward.
//! - Registering a key the container already owns swaps the producer in
//!   place (same descriptor). Once a container has been forked, its existing
//!   slots are shared with the fork: registering over a shared slot, on
//!   either side, replaces it and decouples that key only.
//! - Every registration notifies this container's subscribers, which include
//!   subscribers attached at any descendant.
//!
//! `Container` is a cheap handle: `Clone` yields another handle to the same
//! node. Use [`Container::fork`] for a detached shallow copy.

use crate::config::ContainerConfig;
use crate::domain::descriptor::{Dependency, Descriptor, Producer};
use crate::domain::ids::{ContainerId, SubscriberId};
use crate::domain::key::Key;
use crate::domain::scope::{InstanceCache, Scope};
use crate::domain::store::{copy_entries, MemoryStore, Store};
use crate::error::{ContainerError, ResolveError};
use crate::metrics::Metrics;
use crate::resolution::Resolution;
use crate::subscriber::{Registration, Subscriber, SubscriberList, Subscription};
use parking_lot::{Mutex, RwLock};
use std::any::{type_name, Any};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Handle to a container node.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    id: ContainerId,
    parent: Option<Container>,
    store: RwLock<Box<dyn Store>>,
    subscribers: Mutex<SubscriberList>,
    cache: Arc<InstanceCache>,
    fork_epoch: AtomicU64,
    config: ContainerConfig,
    metrics: Arc<Metrics>,
}

/// Non-owning handle to a container.
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<ContainerInner>,
}

impl WeakContainer {
    /// Recover the container if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl fmt::Debug for WeakContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Create a root container with the default config and in-memory store.
    #[must_use]
    pub fn new() -> Self {
        let config = ContainerConfig::default();
        let store = Box::new(MemoryStore::with_capacity(config.initial_capacity));
        Self::from_parts(None, store, config, Arc::new(Metrics::new()))
    }

    /// Create a root container with a validated config.
    pub fn with_config(config: ContainerConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        let store = Box::new(MemoryStore::with_capacity(config.initial_capacity));
        Ok(Self::from_parts(None, store, config, Arc::new(Metrics::new())))
    }

    /// Create a root container backed by a custom store.
    #[must_use]
    pub fn with_store(store: Box<dyn Store>) -> Self {
        Self::from_parts(None, store, ContainerConfig::default(), Arc::new(Metrics::new()))
    }

    /// Create a child of `parent` inheriting its config and metrics.
    #[must_use]
    pub fn child(parent: &Container) -> Self {
        let config = parent.inner.config.clone();
        let store = Box::new(MemoryStore::with_capacity(config.initial_capacity));
        Self::from_parts(
            Some(parent.clone()),
            store,
            config,
            Arc::clone(&parent.inner.metrics),
        )
    }

    /// Create a child of `parent` with its own config.
    pub fn with_parent(parent: &Container, config: ContainerConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        let store = Box::new(MemoryStore::with_capacity(config.initial_capacity));
        Ok(Self::from_parts(
            Some(parent.clone()),
            store,
            config,
            Arc::clone(&parent.inner.metrics),
        ))
    }

    fn from_parts(
        parent: Option<Container>,
        store: Box<dyn Store>,
        config: ContainerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let container = Self {
            inner: Arc::new(ContainerInner {
                id: ContainerId::next(),
                parent,
                store: RwLock::new(store),
                subscribers: Mutex::new(SubscriberList::default()),
                cache: InstanceCache::new(),
                fork_epoch: AtomicU64::new(0),
                config,
                metrics,
            }),
        };
        debug!(
            container = %container.id(),
            name = container.name().unwrap_or("-"),
            parent = ?container.parent().map(Container::id),
            "Container created"
        );
        container
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Identity of this node.
    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// Configured name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.config.name.as_deref()
    }

    /// Configuration of this node.
    #[must_use]
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Shared counters.
    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Parent node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// Number of ancestors.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Container> {
        std::iter::successors(self.parent(), |container| container.parent())
    }

    /// Whether both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of forks taken from this container so far.
    pub(crate) fn fork_epoch(&self) -> u64 {
        self.inner.fork_epoch.load(Ordering::Acquire)
    }

    /// The container's own scope. Every call returns the same identity.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::from_parts(self.clone(), Arc::clone(&self.inner.cache))
    }

    // ---------------------------------------------------------------------
    // Slots
    // ---------------------------------------------------------------------

    /// The slot for `key` in this container, created empty if missing.
    ///
    /// Never consults ancestors.
    pub fn get_ref(&self, key: impl Into<Key>) -> Descriptor {
        let key = key.into();
        if let Some(existing) = self.inner.store.read().get(&key) {
            return existing;
        }

        let mut store = self.inner.store.write();
        if let Some(existing) = store.get(&key) {
            return existing;
        }
        let descriptor = Descriptor::empty(key.clone(), self);
        store.set(key, descriptor.clone());
        descriptor
    }

    /// Closest filled slot for `key`.
    ///
    /// With `only_local` the walk stops at this container. Empty slots
    /// created by [`Container::get_ref`] are skipped.
    pub fn find(&self, key: impl Into<Key>, only_local: bool) -> Option<Descriptor> {
        let key = key.into();
        let mut current = Some(self);
        while let Some(container) = current {
            let local = container
                .inner
                .store
                .read()
                .get(&key)
                .filter(Descriptor::is_filled);
            if local.is_some() || only_local {
                return local;
            }
            current = container.parent();
        }
        None
    }

    /// Whether `key` resolves from this container.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.find(key, false).is_some()
    }

    /// Whether `key` is registered in this container itself.
    pub fn contains_local(&self, key: impl Into<Key>) -> bool {
        self.find(key, true).is_some()
    }

    /// Keys with a filled slot in this container.
    ///
    /// Empty when the store backend cannot enumerate.
    pub fn local_keys(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        let visited = self.inner.store.read().for_each(&mut |key, descriptor| {
            if descriptor.is_filled() {
                keys.push(key.clone());
            }
        });
        if let Err(e) = visited {
            debug!(container = %self.id(), error = %e, "Store cannot list keys");
        }
        keys
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Register a producer invoked on every resolution of `key`.
    pub fn register_factory<F>(&self, key: impl Into<Key>, produce: F) -> Descriptor
    where
        F: Fn(&Scope) -> Dependency + Send + Sync + 'static,
    {
        self.install(key.into(), Arc::new(produce))
    }

    /// Register an already shared value.
    pub fn register(&self, key: impl Into<Key>, value: Dependency) -> Descriptor {
        self.install(key.into(), Arc::new(move |_: &Scope| Arc::clone(&value)))
    }

    /// Register a plain value.
    pub fn register_value<T: Any + Send + Sync>(&self, key: impl Into<Key>, value: T) -> Descriptor {
        self.register(key, Arc::new(value))
    }

    fn install(&self, key: Key, producer: Producer) -> Descriptor {
        let descriptor = {
            let mut store = self.inner.store.write();
            match store.get(&key) {
                Some(existing)
                    if existing.owner() == self.id() && existing.epoch() == self.fork_epoch() =>
                {
                    existing.replace_producer(producer);
                    existing
                }
                shared => {
                    if let Some(shared) = shared {
                        debug!(
                            container = %self.id(),
                            key = %key,
                            source = %shared.owner(),
                            "Decoupling slot shared through a fork"
                        );
                    }
                    let fresh = Descriptor::filled(key.clone(), self, producer);
                    store.set(key.clone(), fresh.clone());
                    fresh
                }
            }
        };

        self.inner.metrics.record_registration();
        debug!(container = %self.id(), key = %key, descriptor = %descriptor.id(), "Dependency registered");

        self.notify(&Registration {
            key,
            descriptor: descriptor.clone(),
            container: self.id(),
        });
        descriptor
    }

    // ---------------------------------------------------------------------
    // Resolution
    // ---------------------------------------------------------------------

    /// Resolve `key` against this container's own scope.
    pub fn resolve(&self, key: impl Into<Key>) -> Option<Dependency> {
        self.resolve_in(key, &self.scope())
    }

    /// Local value if present, otherwise the closest ancestor's.
    pub fn resolve_local_or_inherited(&self, key: impl Into<Key>) -> Option<Dependency> {
        self.resolve(key)
    }

    /// Resolve `key` starting here, producing against `scope`.
    pub fn resolve_in(&self, key: impl Into<Key>, scope: &Scope) -> Option<Dependency> {
        let key = key.into();
        let value = self
            .find(&key, false)
            .and_then(|descriptor| descriptor.produce(scope));

        self.inner.metrics.record_resolution(value.is_some());
        if self.inner.config.trace_resolutions {
            trace!(
                container = %self.id(),
                scope = %scope.id(),
                key = %key,
                found = value.is_some(),
                "Resolved dependency"
            );
        }
        value
    }

    /// Typed variant of [`Container::resolve`].
    pub fn resolve_as<T: Any + Send + Sync>(&self, key: impl Into<Key>) -> Option<Arc<T>> {
        self.resolve_in_as(key, &self.scope())
    }

    /// Typed variant of [`Container::resolve_in`].
    pub fn resolve_in_as<T: Any + Send + Sync>(
        &self,
        key: impl Into<Key>,
        scope: &Scope,
    ) -> Option<Arc<T>> {
        let key = key.into();
        let value = self.resolve_in(&key, scope)?;
        match value.downcast::<T>() {
            Ok(typed) => Some(typed),
            Err(_) => {
                warn!(
                    container = %self.id(),
                    key = %key,
                    expected = type_name::<T>(),
                    "Registered dependency has a different type"
                );
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Subscribers
    // ---------------------------------------------------------------------

    /// Attach `callback` here and at every ancestor.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Registration) + Send + Sync + 'static,
    {
        let subscription = self.attach(SubscriberId::next(), Arc::new(callback));
        debug!(
            container = %self.id(),
            subscriber = %subscription.id(),
            depth = subscription.depth(),
            "Subscriber attached"
        );
        subscription
    }

    fn attach(&self, id: SubscriberId, callback: Subscriber) -> Subscription {
        {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.push(id, Arc::clone(&callback));
            if subscribers.len() > self.inner.config.max_subscribers {
                warn!(
                    container = %self.id(),
                    subscribers = subscribers.len(),
                    max = self.inner.config.max_subscribers,
                    "Subscriber count above configured maximum"
                );
            }
        }

        let parent = self
            .inner
            .parent
            .as_ref()
            .map(|parent| Box::new(parent.attach(id, callback)));
        Subscription::new(id, self.downgrade(), parent)
    }

    pub(crate) fn detach_subscriber(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.lock().remove(id)
    }

    /// Subscribers in this container's own list.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn notify(&self, registration: &Registration) {
        let snapshot = self.inner.subscribers.lock().snapshot();
        for (id, subscriber) in snapshot {
            // Skip subscribers detached by an earlier callback in this round.
            if !self.inner.subscribers.lock().contains(id) {
                continue;
            }
            subscriber(registration);
        }
    }

    // ---------------------------------------------------------------------
    // Async resolution
    // ---------------------------------------------------------------------

    /// Resolve `key`, waiting for a registration if nothing is visible yet.
    ///
    /// The value is produced against this container's scope. A pending
    /// resolution that is dropped detaches its subscriber.
    pub fn resolve_async(&self, key: impl Into<Key>) -> Resolution<Infallible> {
        Resolution::start(self, key.into(), None)
    }

    /// Like [`Container::resolve_async`], failing with
    /// [`ResolveError::Cancelled`] once `cancel` completes.
    pub fn resolve_async_with_cancel<F>(&self, key: impl Into<Key>, cancel: F) -> Resolution<F::Output>
    where
        F: Future + Send + 'static,
    {
        Resolution::start(self, key.into(), Some(Box::pin(cancel)))
    }

    /// Typed variant of [`Container::resolve_async`].
    pub async fn resolve_async_as<T: Any + Send + Sync>(
        &self,
        key: impl Into<Key>,
    ) -> Result<Arc<T>, ResolveError<Infallible>> {
        let key = key.into();
        let value = self.resolve_async(key.clone()).await?;
        value.downcast::<T>().map_err(|_| ResolveError::TypeMismatch {
            key,
            expected: type_name::<T>(),
        })
    }

    // ---------------------------------------------------------------------
    // Fork
    // ---------------------------------------------------------------------

    /// Parentless shallow copy of this container.
    ///
    /// The copy shares descriptors with `self`: values set through a shared
    /// descriptor are visible in both until either side registers that key
    /// again. Subscribers and cached scope instances are not copied.
    pub fn fork(&self) -> Result<Container, ContainerError> {
        let store: Box<dyn Store> = {
            let source = self.inner.store.read();
            match source.try_clone() {
                Some(copy) => copy,
                None => {
                    let copy = copy_entries(source.as_ref(), self.inner.config.initial_capacity)
                        .map_err(|e| ContainerError::BackendContractViolation {
                            backend: source.backend_name(),
                            source: e,
                        })?;
                    Box::new(copy)
                }
            }
        };

        // Every slot that exists now is shared with the fork.
        self.inner.fork_epoch.fetch_add(1, Ordering::AcqRel);
        self.inner.metrics.record_fork();
        let fork = Self::from_parts(None, store, self.inner.config.clone(), Arc::new(Metrics::new()));
        debug!(source = %self.id(), fork = %fork.id(), "Container forked");
        Ok(fork)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("parent", &self.parent().map(Container::id))
            .finish()
    }
}
