//! Unit tests for the sandbox module.

mod executor_tests;
mod handle_tests;
