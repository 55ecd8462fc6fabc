//! Gropius: task orchestration engine for automated code changes.
//!
//! Given a natural-language task against a repository, the engine drives a
//! fixed sequence of stages (research, context, coding, testing, security,
//! approval, submission), persisting checkpoints at every boundary and
//! supporting a bounded testing-to-coding retry loop, a human approval gate,
//! and resume after restart.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure state and rules with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external collaborators
//! - **Adapters**: Concrete implementations of ports (docker, in-memory, etc.)
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`pipeline`]: Workflow state machine, coordinator, and stage agents
//! - [`sandbox`]: Isolated command execution with timeout and teardown
//! - [`config`]: Environment-driven engine settings
//! - [`telemetry`]: Logging set-up

pub mod config;
pub mod pipeline;
pub mod sandbox;
pub mod telemetry;
