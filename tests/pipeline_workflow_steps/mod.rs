//! Step definitions for task run workflow scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
