//! # Registration Subscribers
//!
//! Every container owns an ordered list of subscribers. Subscribing at a
//! container also attaches the same callback to each ancestor, so a
//! subscriber hears registrations made at its own container and anywhere up
//! the chain to the root, but never at siblings or descendants.
//!
//! ```text
//!   root  ◄── attach(id, cb)
//!    │
//!   mid   ◄── attach(id, cb)
//!    │
//!   leaf  ◄── subscribe(cb)  ──► Subscription { leaf, parent: { mid, parent: { root } } }
//! ```
//!
//! The returned [`Subscription`] detaches from every list when dropped.

use crate::container::WeakContainer;
use crate::domain::descriptor::{Dependency, Descriptor};
use crate::domain::ids::{ContainerId, SubscriberId};
use crate::domain::key::Key;
use crate::domain::scope::Scope;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Event delivered to subscribers after a registration.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Registered key.
    pub key: Key,
    /// Slot now holding the producer.
    pub descriptor: Descriptor,
    /// Container the registration happened in.
    pub container: ContainerId,
}

impl Registration {
    /// Produce the registered value against `scope`.
    pub fn value(&self, scope: &Scope) -> Option<Dependency> {
        self.descriptor.produce(scope)
    }
}

/// Callback invoked for each registration.
pub type Subscriber = Arc<dyn Fn(&Registration) + Send + Sync>;

/// Ordered subscriber list owned by one container.
#[derive(Default)]
pub(crate) struct SubscriberList {
    entries: Vec<(SubscriberId, Subscriber)>,
}

impl SubscriberList {
    pub(crate) fn push(&mut self, id: SubscriberId, subscriber: Subscriber) {
        self.entries.push((id, subscriber));
    }

    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy of the list in attachment order, for iteration without the lock.
    pub(crate) fn snapshot(&self) -> Vec<(SubscriberId, Subscriber)> {
        self.entries.clone()
    }
}

/// Handle for an attached subscriber.
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) removes
/// the subscriber from its container and from every ancestor it was
/// attached to. The handle holds containers weakly.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    container: WeakContainer,
    parent: Option<Box<Subscription>>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        container: WeakContainer,
        parent: Option<Box<Subscription>>,
    ) -> Self {
        Self {
            id,
            container,
            parent,
            active: true,
        }
    }

    /// Identity of the subscriber.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the subscriber is still attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of containers this subscriber is attached to.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |parent| parent.depth())
    }

    /// Detach from this container and all ancestors.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(parent) = self.parent.as_mut() {
            parent.detach();
        }

        if let Some(container) = self.container.upgrade() {
            if container.detach_subscriber(self.id) {
                debug!(container = %container.id(), subscriber = %self.id, "Subscriber detached");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .field("depth", &self.depth())
            .finish()
    }
}
