//! # Scope Registry Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs       # override, inheritance, async waits, injection
//!     └── backends.rs    # custom store backends and forks
//!
//! tests/benches/
//! └── registry_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p scope-registry-tests
//! cargo test -p scope-registry-tests integration::flows
//! cargo bench -p scope-registry-tests
//! ```


/// Install a quiet global subscriber once for the whole test binary.
///
/// Set `SCOPE_REGISTRY_LOG_LEVEL=debug` to see registry events while
/// debugging a failing scenario.
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let mut config = scope_telemetry::TelemetryConfig::from_env();
        if std::env::var("SCOPE_REGISTRY_LOG_LEVEL").is_err() {
            config = config.with_log_level("warn");
        }
        // The global subscriber outlives the guard; only the service span ends.
        let _ = scope_telemetry::init_telemetry(config);
    });
}
