//! Error types for the scope registry.

use crate::domain::key::Key;
use crate::domain::store::StoreError;
use thiserror::Error;

/// Errors raised by container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The store backend can neither clone nor enumerate itself.
    #[error("cannot fork container: backend `{backend}` is neither clonable nor enumerable")]
    BackendContractViolation {
        /// Backend type name.
        backend: &'static str,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// Rejected configuration.
    #[error("invalid container configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while resolving a dependency.
///
/// `E` is the failure reason carried by a cancellation signal. Resolutions
/// without a signal use `std::convert::Infallible`.
#[derive(Debug, Error)]
pub enum ResolveError<E> {
    /// The cancellation signal fired before the key was registered.
    #[error("resolution cancelled: {0}")]
    Cancelled(E),

    /// Nothing is registered for the key in the visible chain.
    #[error("dependency `{key}` is not registered")]
    Unresolved {
        /// Requested key.
        key: Key,
    },

    /// The registered value has a different type than requested.
    #[error("dependency `{key}` is not a `{expected}`")]
    TypeMismatch {
        /// Requested key.
        key: Key,
        /// Requested type name.
        expected: &'static str,
    },

    /// The resolution future was polled after completion.
    #[error("resolution already completed")]
    AlreadyCompleted,
}

impl<E> ResolveError<E> {
    /// Whether this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The cancellation reason, if any.
    pub fn into_cancel_reason(self) -> Option<E> {
        match self {
            Self::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }
}
