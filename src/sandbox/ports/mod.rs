//! Port contracts for sandbox runtimes.
//!
//! Ports define infrastructure-agnostic interfaces used by the execution
//! service.

pub mod runtime;

pub use runtime::{SandboxRuntime, SandboxRuntimeError, SandboxRuntimeResult};
