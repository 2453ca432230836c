//! # Descriptors
//!
//! A descriptor is the slot stored for one key in one container. It doubles as
//! the reference cell of the flat store model: an empty descriptor is a slot
//! that was requested through `Container::get_ref` but never filled.
//!
//! The producer inside a descriptor is swapped in place on re-registration so
//! every holder of the descriptor observes the update. Descriptors remember
//! the owner's fork epoch at creation; a descriptor from an earlier epoch may
//! be shared with a fork and is never swapped in place.

use crate::container::{Container, WeakContainer};
use crate::domain::ids::{ContainerId, DescriptorId};
use crate::domain::key::Key;
use crate::domain::scope::Scope;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A resolved dependency value.
pub type Dependency = Arc<dyn Any + Send + Sync>;

/// A function of the resolving scope producing a dependency.
pub type Producer = Arc<dyn Fn(&Scope) -> Dependency + Send + Sync>;

/// Shared handle to a registered slot.
#[derive(Clone)]
pub struct Descriptor {
    inner: Arc<DescriptorInner>,
}

struct DescriptorInner {
    id: DescriptorId,
    key: Key,
    owner: ContainerId,
    epoch: u64,
    owner_ref: WeakContainer,
    producer: RwLock<Option<Producer>>,
}

impl Descriptor {
    /// Empty slot owned by `owner`.
    pub(crate) fn empty(key: Key, owner: &Container) -> Self {
        Self::with_producer(key, owner, None)
    }

    /// Filled slot owned by `owner`.
    pub(crate) fn filled(key: Key, owner: &Container, producer: Producer) -> Self {
        Self::with_producer(key, owner, Some(producer))
    }

    fn with_producer(key: Key, owner: &Container, producer: Option<Producer>) -> Self {
        Self {
            inner: Arc::new(DescriptorInner {
                id: DescriptorId::next(),
                key,
                owner: owner.id(),
                epoch: owner.fork_epoch(),
                owner_ref: owner.downgrade(),
                producer: RwLock::new(producer),
            }),
        }
    }

    /// Identity of this slot.
    #[must_use]
    pub fn id(&self) -> DescriptorId {
        self.inner.id
    }

    /// Key this slot was created for.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.inner.key
    }

    /// Container that created this slot.
    #[must_use]
    pub fn owner(&self) -> ContainerId {
        self.inner.owner
    }

    /// Owner's fork epoch when this slot was created.
    pub(crate) fn epoch(&self) -> u64 {
        self.inner.epoch
    }

    /// Whether a producer or value has been stored.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.inner.producer.read().is_some()
    }

    /// Whether both handles point at the same slot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Invoke the producer against `scope`.
    ///
    /// The producer is cloned out of the slot before it runs, so producers
    /// may freely resolve other dependencies.
    pub fn produce(&self, scope: &Scope) -> Option<Dependency> {
        let producer = self.inner.producer.read().clone()?;
        Some(producer(scope))
    }

    /// Read the current value against the owning container's own scope.
    ///
    /// Returns `None` for an empty slot or once the owner has been dropped.
    pub fn get(&self) -> Option<Dependency> {
        if !self.is_filled() {
            return None;
        }
        let owner = self.inner.owner_ref.upgrade()?;
        self.produce(&owner.scope())
    }

    /// Store a plain value in this slot.
    ///
    /// This mutates the shared cell: every container holding this descriptor
    /// (for example a fork made before the call) observes the new value.
    /// No subscribers are notified; use `Container::register` for that.
    pub fn set(&self, value: Dependency) {
        self.replace_producer(Arc::new(move |_: &Scope| Arc::clone(&value)));
    }

    /// Typed variant of [`Descriptor::set`].
    pub fn set_value<T: Any + Send + Sync>(&self, value: T) {
        self.set(Arc::new(value));
    }

    pub(crate) fn replace_producer(&self, producer: Producer) {
        *self.inner.producer.write() = Some(producer);
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.inner.id)
            .field("key", &self.inner.key)
            .field("owner", &self.inner.owner)
            .field("filled", &self.is_filled())
            .finish()
    }
}
