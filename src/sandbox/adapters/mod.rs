//! Adapter implementations for sandbox ports.

pub mod docker;
pub mod memory;

pub use docker::DockerSandboxRuntime;
pub use memory::{ScriptedCommand, ScriptedSandboxRuntime};
