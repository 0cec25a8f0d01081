//! Global tracing initialization.
//!
//! Lives in its own test binary: installing the process-wide subscriber
//! would clash with `tracing-test` in the library's unit tests.

use ingress_core::observability::{init_tracing, init_tracing_with};
use ingress_core::types::ObservabilityConfig;

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    init_tracing_with(&ObservabilityConfig {
        json_logs: true,
        ..Default::default()
    });

    tracing::info!("still logging after repeated initialization");
}
