//! # Scope Registry - Hierarchical Service Registry
//!
//! A tree of containers mapping keys to producers. Lookups walk up from the
//! requesting container to the root; registrations notify subscribers
//! attached at the registering container or any of its descendants.
//!
//! ## Resolution
//!
//! ```text
//!            ┌──────────────┐
//!            │     root     │  flag = true, num = 7
//!            └──────┬───────┘
//!                   │ parent
//!            ┌──────┴───────┐
//!            │    child     │  flag = false
//!            └──────────────┘
//!
//!   child.resolve("flag") ──► false   (closest container wins)
//!   child.resolve("num")  ──► 7       (inherited)
//!   root.resolve("flag")  ──► true    (children never leak upward)
//! ```
//!
//! ## Pieces
//!
//! - [`Container`]: registration, walk-up lookup, subscriptions, fork.
//! - [`Scope`]: resolution context whose identity keys the per-scope
//!   instance cache used by class registrations.
//! - [`Resolution`]: future that waits for a key to be registered, with an
//!   optional cancel signal.
//! - [`Injection`] / [`Injected`]: fields resolved lazily through the scope
//!   that constructed their instance.
//! - [`Store`]: pluggable slot storage; [`MemoryStore`] by default.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod container;
pub mod domain;
pub mod error;
pub mod inject;
pub mod metrics;
pub mod resolution;
pub mod subscriber;

// Re-export main types
pub use config::{ContainerConfig, ContainerConfigBuilder, MAX_INITIAL_CAPACITY};
pub use container::{Container, WeakContainer};
pub use domain::{
    copy_entries, ContainerId, Dependency, Descriptor, DescriptorId, Key, MemoryStore, Producer,
    RegistrationId, Scope, ScopeId, Store, StoreError, SubscriberId, WeakScope,
};
pub use error::{ContainerError, ResolveError};
pub use inject::{Binding, Injected, Injection};
pub use metrics::{Metrics, MetricsSnapshot};
pub use resolution::{CancelSignal, Resolution, ResolutionState};
pub use subscriber::{Registration, Subscriber, Subscription};
