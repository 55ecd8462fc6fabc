//! Unit tests for the pipeline module.

mod checkpoint_tests;
mod support;
mod transition_tests;
