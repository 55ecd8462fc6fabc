//! Application services for sandboxed execution.

mod executor;

pub use executor::{ExecutionSandbox, SandboxError, SandboxOutcome, SandboxResult};
