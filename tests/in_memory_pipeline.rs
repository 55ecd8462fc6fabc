//! End-to-end task runs over in-memory adapters.
//!
//! Tests are organized into modules by functionality:
//! - `agent_pipeline_tests`: Runs driven by the production stage agents
//! - `concurrency_tests`: Independent runs and racing decisions

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

mod in_memory_pipeline {
    pub mod helpers;

    mod agent_pipeline_tests;
    mod concurrency_tests;
}
