//! Process-unique identifiers for containers, scopes, registrations and
//! subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Allocate the next identifier.
            pub(crate) fn next() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(1);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Raw numeric value.
            #[must_use]
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a container node.
    ContainerId,
    "container"
);

define_id!(
    /// Identity of a resolution scope.
    ScopeId,
    "scope"
);

define_id!(
    /// Identity of a descriptor slot.
    DescriptorId,
    "descriptor"
);

define_id!(
    /// Identity of one class registration; keys the per-scope instance cache.
    RegistrationId,
    "registration"
);

define_id!(
    /// Identity of a subscriber, shared by every list it was attached to.
    SubscriberId,
    "subscriber"
);
