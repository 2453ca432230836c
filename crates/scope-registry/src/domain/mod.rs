//! Core registry types: keys, identifiers, descriptor slots, scopes and
//! store backends.

pub mod descriptor;
pub mod ids;
pub mod key;
pub mod scope;
pub mod store;

pub use descriptor::{Dependency, Descriptor, Producer};
pub use ids::{ContainerId, DescriptorId, RegistrationId, ScopeId, SubscriberId};
pub use key::Key;
pub use scope::{Scope, WeakScope};
pub use store::{copy_entries, MemoryStore, Store, StoreError};
