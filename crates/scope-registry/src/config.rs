//! Container configuration and validation.
//!
//! # Example
//!
//! ```ignore
//! use scope_registry::{Container, ContainerConfigBuilder};
//!
//! let config = ContainerConfigBuilder::new()
//!     .name("request")
//!     .initial_capacity(32)
//!     .build()?;
//! let container = Container::with_config(config)?;
//! ```

use crate::error::ContainerError;
use serde::{Deserialize, Serialize};

/// Upper bound for `initial_capacity`.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Per-container settings.
///
/// Children created through `Container::child` inherit their parent's config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Label used in log fields
    pub name: Option<String>,
    /// Pre-allocated slots in the default store
    pub initial_capacity: usize,
    /// Subscriber count above which attaching logs a warning
    pub max_subscribers: usize,
    /// Log every synchronous resolution at trace level
    pub trace_resolutions: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: None,
            initial_capacity: 16,
            max_subscribers: 1024,
            trace_resolutions: false,
        }
    }
}

impl ContainerConfig {
    /// Validate bounds.
    pub fn validate(&self) -> Result<(), ContainerError> {
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(ContainerError::InvalidConfig(format!(
                "initial_capacity {} exceeds {}",
                self.initial_capacity, MAX_INITIAL_CAPACITY
            )));
        }

        if self.max_subscribers == 0 {
            return Err(ContainerError::InvalidConfig(
                "max_subscribers cannot be 0".to_string(),
            ));
        }

        if matches!(self.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ContainerError::InvalidConfig(
                "name cannot be blank".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder-style method to set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder-style method to enable resolution tracing
    pub fn with_trace_resolutions(mut self, enabled: bool) -> Self {
        self.trace_resolutions = enabled;
        self
    }
}

/// Fluent builder for [`ContainerConfig`].
#[derive(Default)]
pub struct ContainerConfigBuilder {
    name: Option<String>,
    initial_capacity: Option<usize>,
    max_subscribers: Option<usize>,
    trace_resolutions: Option<bool>,
}

impl ContainerConfigBuilder {
    /// Create a builder with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the initial store capacity.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Set the subscriber warning threshold.
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = Some(max);
        self
    }

    /// Enable or disable resolution tracing.
    pub fn trace_resolutions(mut self, enabled: bool) -> Self {
        self.trace_resolutions = Some(enabled);
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<ContainerConfig, ContainerError> {
        let defaults = ContainerConfig::default();
        let config = ContainerConfig {
            name: self.name,
            initial_capacity: self.initial_capacity.unwrap_or(defaults.initial_capacity),
            max_subscribers: self.max_subscribers.unwrap_or(defaults.max_subscribers),
            trace_resolutions: self.trace_resolutions.unwrap_or(defaults.trace_resolutions),
        };
        config.validate()?;
        Ok(config)
    }
}
