//! Task orchestration engine.
//!
//! A [`services::PipelineWorkflow`] drives one [`domain::TaskRun`] at a time
//! through the stage graph in [`domain::TransitionTable`], delegating each
//! stage to a [`ports::StageAgent`] through the
//! [`services::StageCoordinator`]. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
