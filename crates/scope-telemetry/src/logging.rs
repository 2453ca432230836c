//! Structured logging helpers.
//!
//! Registry log lines carry a `container` field so output from nested
//! containers can be told apart:
//! - `container`: container identifier (`container#N`)
//! - `key`: dependency key, when the event concerns one
//! - `message`: log message

/// Helper to create structured log entries tagged with a container.
#[macro_export]
macro_rules! log_event {
    // Info level with container
    (info, $container:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            container = %$container,
            $($($field)*,)?
            $msg
        )
    };

    // Warn level with container
    (warn, $container:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            container = %$container,
            $($($field)*,)?
            $msg
        )
    };

    // Error level with container
    (error, $container:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            container = %$container,
            $($($field)*,)?
            $msg
        )
    };

    // Debug level with container
    (debug, $container:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            container = %$container,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a key-related event with standard fields.
#[macro_export]
macro_rules! log_key_event {
    ($level:ident, $container:expr, $msg:expr, $key:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            container = %$container,
            key = %$key,
            $($($field)*,)?
            $msg
        )
    };
}
