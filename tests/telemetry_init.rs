//! Global subscriber installation.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use gropius::{config::PipelineConfig, telemetry::init_tracing};

#[test]
fn subscriber_installs_once() {
    let config = PipelineConfig::default();

    init_tracing(&config.log_filter).expect("first installation succeeds");
    tracing::info!(max_iterations = config.max_iterations, "engine configured");

    let second = init_tracing(&config.log_filter);
    assert!(second.is_err(), "a second global subscriber is refused");
}
