//! Domain model for sandboxed command execution.
//!
//! Requests, outputs, and the lifecycle of a single isolated environment.
//! Nothing here touches a container runtime.

mod error;
mod handle;
mod ids;
mod request;

pub use error::{ParseSandboxLifecycleError, SandboxDomainError};
pub use handle::{SandboxHandle, SandboxLifecycle};
pub use ids::SandboxId;
pub use request::{CommandOutput, EnvironmentSpec, ResourceLimits, SandboxRequest};
