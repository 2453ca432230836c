//! # Dependency Keys
//!
//! A key is either a free-form name or a Rust type. Type keys stand in for
//! "the class itself" when a type is registered without an explicit name.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier under which a dependency is registered.
///
/// Two keys are equal when their names are equal or when they refer to the
/// same `TypeId`. The type name carried by `Key::Type` is diagnostic only.
#[derive(Clone)]
pub enum Key {
    /// A named dependency (`"SECRET_KEY"`, `"flag"`, ...).
    Name(Cow<'static, str>),

    /// A dependency keyed by its Rust type.
    Type {
        /// Identity of the type.
        id: TypeId,
        /// Human readable type name for logs.
        name: &'static str,
    },
}

impl Key {
    /// Key for a named dependency.
    pub fn name(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Name(name.into())
    }

    /// Key derived from the type `T`.
    #[must_use]
    pub fn of<T: Any + ?Sized>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Whether this key was derived from a type.
    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(self, Self::Type { .. })
    }

    /// Label used in log fields.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Name(name) => name.as_ref(),
            Self::Type { name, .. } => *name,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Name(a), Self::Name(b)) => a == b,
            (Self::Type { id: a, .. }, Self::Type { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Name(name) => {
                0u8.hash(state);
                name.hash(state);
            }
            Self::Type { id, .. } => {
                1u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "Key({name:?})"),
            Self::Type { name, .. } => write!(f, "Key(<{name}>)"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Type { name, .. } => write!(f, "<{name}>"),
        }
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
