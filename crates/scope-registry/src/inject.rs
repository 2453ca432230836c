//! # Class Registration and Injected Fields
//!
//! Class registrations construct one instance per `(registration, scope)`.
//! Instances receive the scope that built them and typically keep it as a
//! [`WeakScope`] inside their [`Injected`] fields, so a field declared on a
//! type registered at the root still sees overrides made in the child that
//! resolved the instance.
//!
//! ```ignore
//! struct Handler {
//!     verbose: Injected<bool>,
//! }
//!
//! let verbose = root.injection::<bool>("verbose", Binding::Scope);
//! root.register_type(move |scope| Handler { verbose: verbose.bind(scope) });
//!
//! let child = Container::child(&root);
//! child.register_value("verbose", true);
//! let handler = child.resolve_as::<Handler>(Key::of::<Handler>()).unwrap();
//! assert_eq!(handler.verbose.get().as_deref(), Some(&true));
//! ```
//!
//! Declarations hold their container weakly, so a declaration captured by a
//! registration stored in that same container does not keep it alive.

use crate::container::{Container, WeakContainer};
use crate::domain::descriptor::{Dependency, Descriptor};
use crate::domain::ids::RegistrationId;
use crate::domain::key::Key;
use crate::domain::scope::{Scope, WeakScope};
use crate::error::ResolveError;
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

/// Where an injected field resolves from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// The scope that constructed the instance, falling back to the
    /// declaring container when the instance has no live scope.
    #[default]
    Scope,
    /// Always the declaring container.
    Container,
}

/// Declaration of an injected field of type `T`.
///
/// Built once per type and bound per instance.
pub struct Injection<T> {
    key: Key,
    binding: Binding,
    container: WeakContainer,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Injection<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            binding: self.binding,
            container: self.container.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> Injection<T> {
    /// Field for an instance constructed in `scope`.
    pub fn bind(&self, scope: &Scope) -> Injected<T> {
        self.field(Some(scope.downgrade()))
    }

    /// Field for an instance constructed outside any container.
    pub fn unbound(&self) -> Injected<T> {
        self.field(None)
    }

    fn field(&self, scope: Option<WeakScope>) -> Injected<T> {
        Injected {
            key: self.key.clone(),
            binding: self.binding,
            container: self.container.clone(),
            scope,
            _marker: PhantomData,
        }
    }

    /// Injected key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Binding mode.
    pub fn binding(&self) -> Binding {
        self.binding
    }
}

impl<T> fmt::Debug for Injection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injection")
            .field("key", &self.key)
            .field("binding", &self.binding)
            .field("type", &type_name::<T>())
            .finish()
    }
}

/// Injected field, resolved on every read.
pub struct Injected<T> {
    key: Key,
    binding: Binding,
    container: WeakContainer,
    scope: Option<WeakScope>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Injected<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            binding: self.binding,
            container: self.container.clone(),
            scope: self.scope.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> Injected<T> {
    /// Current value, or `None` when nothing visible is registered.
    pub fn get(&self) -> Option<Arc<T>> {
        let recorded = match self.binding {
            Binding::Scope => self.scope.as_ref().and_then(WeakScope::upgrade),
            Binding::Container => None,
        };
        match recorded {
            Some(scope) => scope.resolve_as::<T>(&self.key),
            None => self.container.upgrade()?.resolve_as::<T>(&self.key),
        }
    }

    /// Like [`Injected::get`], distinguishing absence from a type mismatch.
    pub fn get_or_err(&self) -> Result<Arc<T>, ResolveError<Infallible>> {
        let value = self.raw().ok_or_else(|| ResolveError::Unresolved {
            key: self.key.clone(),
        })?;
        value.downcast::<T>().map_err(|_| ResolveError::TypeMismatch {
            key: self.key.clone(),
            expected: type_name::<T>(),
        })
    }

    fn raw(&self) -> Option<Dependency> {
        if self.binding == Binding::Scope {
            if let Some(scope) = self.scope.as_ref().and_then(WeakScope::upgrade) {
                return scope.resolve(&self.key);
            }
        }
        self.container.upgrade()?.resolve(&self.key)
    }

    /// Injected key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the field was bound to a scope that is still alive.
    pub fn has_scope(&self) -> bool {
        self.scope.as_ref().and_then(WeakScope::upgrade).is_some()
    }
}

impl<T> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("key", &self.key)
            .field("binding", &self.binding)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Container {
    /// Declare an injected field resolving `key` as `T`.
    pub fn injection<T: Any + Send + Sync>(&self, key: impl Into<Key>, binding: Binding) -> Injection<T> {
        Injection {
            key: key.into(),
            binding,
            container: self.downgrade(),
            _marker: PhantomData,
        }
    }

    /// Register a class under `key`: one instance per resolving scope.
    ///
    /// `construct` runs at most once per scope, without any container lock
    /// held, and may resolve other dependencies through the scope it gets.
    pub fn register_class<T, F>(&self, key: impl Into<Key>, construct: F) -> Descriptor
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> T + Send + Sync + 'static,
    {
        let key = key.into();
        let slot = (self.id(), key.clone());
        let registration = RegistrationId::next();
        trace!(container = %self.id(), registration = %registration, class = type_name::<T>(), "Class registered");
        self.register_factory(key, move |scope: &Scope| {
            scope.instance(&slot, registration, || Arc::new(construct(scope)) as Dependency)
        })
    }

    /// Register a class under its own type key, [`Key::of::<T>()`](Key::of).
    pub fn register_type<T, F>(&self, construct: F) -> Descriptor
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> T + Send + Sync + 'static,
    {
        self.register_class(Key::of::<T>(), construct)
    }
}
